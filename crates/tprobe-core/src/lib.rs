//! `tprobe-core` - conditional trace probes for suspended execution contexts.
//!
//! When the host stops at a registered location, the [`Session`] looks up the
//! probes bound there, lets each read values through a [`ContextAccessor`],
//! emits one [`DiagnosticRecord`] per probe, and answers with a
//! [`ContinuationDecision`] in which a halt from any probe wins.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

/// Context accessor trait.
pub mod accessor;
/// Session configuration loading.
pub mod config;
/// Session-definition parsing.
pub mod definition;
/// Hit dispatch.
pub mod dispatch;
/// Record emitter and output sinks.
pub mod emit;
/// Probe errors.
pub mod error;
/// Probe locations.
pub mod location;
/// Probe definitions and firing.
pub mod probe;
/// Diagnostic records.
pub mod record;
/// Location to probe table.
pub mod registry;
/// Record rendering and parsing.
pub mod render;
/// Observation session lifecycle.
pub mod session;
/// Values read from a suspended frame.
pub mod value;

pub use accessor::ContextAccessor;
pub use config::{OutputConfig, SessionConfig};
pub use definition::{parse_definition, ProbeDefinition, TERMINATOR};
pub use dispatch::{DispatchStats, Dispatcher};
pub use emit::{Emitter, EmitterStats, MemorySink};
pub use error::ProbeError;
pub use location::Location;
pub use probe::{
    ContinuationDecision, ContinuationPolicy, DeriveOp, Derivation, Probe, ProbeBuilder, ReadSpec,
    CONDITION_LABEL,
};
pub use record::{DiagnosticRecord, RecordEntry};
pub use registry::ProbeRegistry;
pub use render::{
    parse_record_line, render_text, JsonEntry, JsonRecord, OutputFormat, ParsedRecord,
    RecordParseError, RenderedValue,
};
pub use session::{Session, SessionBuilder, SessionState};
pub use value::{CapturedValue, Value};
