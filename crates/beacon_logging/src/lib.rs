#![deny(missing_docs)]
//! Shared logging utilities for the beacon workspace.
//!
//! This crate provides the `beacon_*` logging macros used across the codebase
//! and a minimal test initializer for the global logger. Every message is
//! prefixed with the sequence number of the signal currently being processed,
//! so log lines from one correlation step can be grouped.

use std::cell::Cell;

#[doc(hidden)]
pub use log;

thread_local! {
    /// Thread-local storage for the sequence number of the signal in flight.
    static SIGNAL_SEQ: Cell<u64> = const { Cell::new(0) };
}

/// Sets the signal sequence number for the current thread.
/// The host calls this once per dispatched signal.
pub fn set_signal_seq(seq: u64) {
    SIGNAL_SEQ.with(|v| v.set(seq));
}

/// Retrieves the signal sequence number for the current thread.
/// Returns 0 before the first signal has been dispatched.
pub fn signal_seq() -> u64 {
    SIGNAL_SEQ.with(|v| v.get())
}

/// Logs a trace-level message tagged with the current signal sequence.
#[macro_export]
macro_rules! beacon_trace {
    ($($arg:tt)*) => {{
        $crate::log::trace!("[sig {}] {}", $crate::signal_seq(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message tagged with the current signal sequence.
#[macro_export]
macro_rules! beacon_debug {
    ($($arg:tt)*) => {{
        $crate::log::debug!("[sig {}] {}", $crate::signal_seq(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message tagged with the current signal sequence.
#[macro_export]
macro_rules! beacon_info {
    ($($arg:tt)*) => {{
        $crate::log::info!("[sig {}] {}", $crate::signal_seq(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message tagged with the current signal sequence.
#[macro_export]
macro_rules! beacon_warn {
    ($($arg:tt)*) => {{
        $crate::log::warn!("[sig {}] {}", $crate::signal_seq(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message tagged with the current signal sequence.
#[macro_export]
macro_rules! beacon_error {
    ($($arg:tt)*) => {{
        $crate::log::error!("[sig {}] {}", $crate::signal_seq(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_seq_is_per_thread() {
        set_signal_seq(7);
        assert_eq!(signal_seq(), 7);
        let other = std::thread::spawn(signal_seq).join().unwrap();
        assert_eq!(other, 0);
    }
}
