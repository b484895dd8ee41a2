//! Hit dispatch.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::accessor::ContextAccessor;
use crate::emit::Emitter;
use crate::location::Location;
use crate::probe::ContinuationDecision;
use crate::registry::ProbeRegistry;

/// Counters kept by a [`Dispatcher`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Hits delivered by the host.
    pub hits: u64,
    /// Probes that fired and emitted a record.
    pub probes_fired: u64,
    /// Probes skipped because their condition was not met.
    pub probes_skipped: u64,
    /// Probes whose condition failed to evaluate; each emits a failure record.
    pub condition_failures: u64,
    /// Hits answered with a halt decision.
    pub halts: u64,
}

/// Runs the probes bound to a location when the host reports a hit.
///
/// The registry is shared read-only, so `on_hit` takes `&self` and may run
/// for several independently suspended threads at once, each with its own
/// context.
#[derive(Debug)]
pub struct Dispatcher {
    registry: Arc<ProbeRegistry>,
    emitter: Arc<Emitter>,
    hits: AtomicU64,
    probes_fired: AtomicU64,
    probes_skipped: AtomicU64,
    condition_failures: AtomicU64,
    halts: AtomicU64,
}

impl Dispatcher {
    #[must_use]
    pub fn new(registry: Arc<ProbeRegistry>, emitter: Arc<Emitter>) -> Self {
        Self {
            registry,
            emitter,
            hits: AtomicU64::new(0),
            probes_fired: AtomicU64::new(0),
            probes_skipped: AtomicU64::new(0),
            condition_failures: AtomicU64::new(0),
            halts: AtomicU64::new(0),
        }
    }

    /// Fire every probe at `location` in registration order.
    ///
    /// Records are emitted as soon as each probe fires. Any halt decision
    /// makes the aggregate a halt; no probes means resume.
    pub fn on_hit(
        &self,
        location: &Location,
        ctx: &mut dyn ContextAccessor,
    ) -> ContinuationDecision {
        self.hits.fetch_add(1, Ordering::Relaxed);
        let probes = self.registry.lookup(location);
        if probes.is_empty() {
            debug!(%location, "hit without probes");
            return ContinuationDecision::Resume;
        }

        let mut aggregate = ContinuationDecision::Resume;
        for (index, probe) in probes.iter().enumerate() {
            match probe.condition_met(ctx) {
                Ok(true) => {}
                Ok(false) => {
                    debug!(%location, index, "probe condition not met");
                    self.probes_skipped.fetch_add(1, Ordering::Relaxed);
                    continue;
                }
                Err(err) => {
                    debug!(%location, index, "probe condition failed: {err}");
                    let (record, decision) = probe.condition_failure(err);
                    self.emitter.emit(location, &record);
                    self.condition_failures.fetch_add(1, Ordering::Relaxed);
                    aggregate = aggregate.combine(decision);
                    continue;
                }
            }
            let (record, decision) = probe.fire(ctx);
            debug!(
                %location,
                index,
                probe = probe.name().unwrap_or(""),
                %decision,
                failures = record.has_failures(),
                "probe fired"
            );
            self.emitter.emit(location, &record);
            self.probes_fired.fetch_add(1, Ordering::Relaxed);
            aggregate = aggregate.combine(decision);
        }
        if aggregate.is_halt() {
            self.halts.fetch_add(1, Ordering::Relaxed);
        }
        aggregate
    }

    #[must_use]
    pub fn registry(&self) -> &ProbeRegistry {
        &self.registry
    }

    #[must_use]
    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    #[must_use]
    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            hits: self.hits.load(Ordering::Relaxed),
            probes_fired: self.probes_fired.load(Ordering::Relaxed),
            probes_skipped: self.probes_skipped.load(Ordering::Relaxed),
            condition_failures: self.condition_failures.load(Ordering::Relaxed),
            halts: self.halts.load(Ordering::Relaxed),
        }
    }
}
