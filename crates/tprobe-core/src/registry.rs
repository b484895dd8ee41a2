//! Location to probe table.

use indexmap::IndexMap;

use crate::location::Location;
use crate::probe::Probe;

/// Probes keyed by location, in registration order.
///
/// Filled during setup only; once a session is armed the registry is frozen
/// and shared read-only between hits.
#[derive(Debug, Clone, Default)]
pub struct ProbeRegistry {
    probes: IndexMap<Location, Vec<Probe>>,
}

impl ProbeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a probe to the location's list. No de-duplication.
    pub fn register(&mut self, location: Location, probe: Probe) {
        self.probes.entry(location).or_default().push(probe);
    }

    /// Probes for a location in firing order; empty when none are registered.
    #[must_use]
    pub fn lookup(&self, location: &Location) -> &[Probe] {
        self.probes
            .get(location)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Locations in first-registration order with their probes.
    pub fn iter(&self) -> impl Iterator<Item = (&Location, &[Probe])> {
        self.probes
            .iter()
            .map(|(location, probes)| (location, probes.as_slice()))
    }

    /// Total number of probes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.probes.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }

    #[must_use]
    pub fn location_count(&self) -> usize {
        self.probes.len()
    }

    pub(crate) fn extend(&mut self, other: ProbeRegistry) {
        for (location, probes) in other.probes {
            self.probes.entry(location).or_default().extend(probes);
        }
    }
}
