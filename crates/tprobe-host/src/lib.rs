//! `tprobe-host` - a host backed by recorded frames.
//!
//! A [`HitTrace`] holds the arrivals a target made at probe locations, each
//! with a [`FrameSnapshot`] of the variables visible at that point. Frames
//! answer reads and evaluate a small C-like expression dialect, so a trace
//! can be replayed through a `tprobe_core::Session` without a live target.

#![forbid(unsafe_code)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod expr;
pub mod frame;
pub mod replay;
pub mod trace;
pub mod value;

pub use error::HostError;
pub use frame::FrameSnapshot;
pub use replay::{replay, ReplayOptions, ReplaySummary};
pub use trace::{HitTrace, RecordedHit, MAIN_THREAD};
pub use value::HostValue;
