//! Beacon replay: feeds a recorded signal trace through a manually clocked host.
pub mod logging;
mod trace;

pub use trace::{load_trace, replay, ReplayOptions, TraceEntry, TraceError};
