//! Observation session lifecycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use crate::accessor::ContextAccessor;
use crate::config::SessionConfig;
use crate::definition::parse_definition;
use crate::dispatch::{DispatchStats, Dispatcher};
use crate::emit::{Emitter, EmitterStats};
use crate::error::ProbeError;
use crate::location::Location;
use crate::probe::{ContinuationDecision, Probe};
use crate::registry::ProbeRegistry;

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Probes may still be registered.
    Idle,
    /// Registry frozen; hits are dispatched.
    Armed,
    /// Hits are ignored and answered with resume.
    TornDown,
}

/// Session in the setup phase.
#[derive(Debug, Default)]
pub struct SessionBuilder {
    config: SessionConfig,
    registry: ProbeRegistry,
}

impl SessionBuilder {
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            registry: ProbeRegistry::new(),
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        SessionState::Idle
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &ProbeRegistry {
        &self.registry
    }

    pub fn register(&mut self, location: Location, probe: Probe) {
        self.registry.register(location, probe);
    }

    /// Parse a definition and register all of its probes.
    ///
    /// Nothing is registered when any part of the definition is malformed.
    /// Returns the number of probes added.
    pub fn load_definition(&mut self, text: &str) -> Result<usize, ProbeError> {
        let definitions = parse_definition(text, self.config.default_policy)?;
        let mut staged = ProbeRegistry::new();
        for definition in definitions {
            staged.register(definition.location, definition.probe);
        }
        let added = staged.len();
        self.registry.extend(staged);
        info!(probes = added, "loaded probe definition");
        Ok(added)
    }

    /// Freeze the registry and start accepting hits.
    #[must_use]
    pub fn arm(self, emitter: Emitter) -> Session {
        info!(
            probes = self.registry.len(),
            locations = self.registry.location_count(),
            "session armed"
        );
        Session {
            dispatcher: Dispatcher::new(Arc::new(self.registry), Arc::new(emitter)),
            torn_down: AtomicBool::new(false),
        }
    }
}

/// Armed session.
///
/// `Send + Sync`: independently suspended threads may deliver hits at the
/// same time, each with its own context.
#[derive(Debug)]
pub struct Session {
    dispatcher: Dispatcher,
    torn_down: AtomicBool,
}

impl Session {
    /// Handle a hit; after tear-down this is a no-op that resumes.
    pub fn on_hit(
        &self,
        location: &Location,
        ctx: &mut dyn ContextAccessor,
    ) -> ContinuationDecision {
        if self.torn_down.load(Ordering::Acquire) {
            debug!(%location, "hit after tear-down ignored");
            return ContinuationDecision::Resume;
        }
        self.dispatcher.on_hit(location, ctx)
    }

    /// End the session. Irreversible.
    pub fn tear_down(&self) {
        if !self.torn_down.swap(true, Ordering::AcqRel) {
            let stats = self.dispatcher.stats();
            info!(hits = stats.hits, fired = stats.probes_fired, "session torn down");
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        if self.torn_down.load(Ordering::Acquire) {
            SessionState::TornDown
        } else {
            SessionState::Armed
        }
    }

    #[must_use]
    pub fn registry(&self) -> &ProbeRegistry {
        self.dispatcher.registry()
    }

    #[must_use]
    pub fn dispatch_stats(&self) -> DispatchStats {
        self.dispatcher.stats()
    }

    #[must_use]
    pub fn emitter_stats(&self) -> EmitterStats {
        self.dispatcher.emitter().stats()
    }
}
