use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use beacon_core::{InteractionRecord, RequestStatus};
use beacon_logging::beacon_warn;

use crate::collaborators::BeaconDispatcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification<'a> {
    Beacon(&'a InteractionRecord),
    RequestFailed {
        url: Option<&'a str>,
        status: RequestStatus,
    },
}

type Listener = Box<dyn FnMut(&Notification<'_>) + Send>;

/// Named consumers of beacons and request failures.
///
/// A panicking listener is logged and skipped; the others still run.
#[derive(Default)]
pub struct Listeners {
    entries: Vec<(String, Listener)>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, name: impl Into<String>, listener: F)
    where
        F: FnMut(&Notification<'_>) + Send + 'static,
    {
        self.entries.push((name.into(), Box::new(listener)));
    }

    /// Returns how many listeners failed.
    pub fn notify(&mut self, notification: &Notification<'_>) -> usize {
        let mut failures = 0;
        for (name, listener) in &mut self.entries {
            let ran = isolated(&format!("listener {name}"), false, || {
                listener(notification);
                true
            });
            if !ran {
                failures += 1;
            }
        }
        failures
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl BeaconDispatcher for Listeners {
    fn deliver(&mut self, record: &InteractionRecord) {
        self.notify(&Notification::Beacon(record));
    }
}

/// Runs one collaborator call. A panic is logged and replaced by `fallback`.
pub(crate) fn isolated<T>(name: &str, fallback: T, call: impl FnOnce() -> T) -> T {
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(value) => value,
        Err(payload) => {
            beacon_warn!("{} failed: {}", name, panic_message(payload.as_ref()));
            fallback
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
