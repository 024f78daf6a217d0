use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use beacon_core::{CorrelatorConfig, InteractionRecord, NavigationTiming, Signal, Timestamp};
use beacon_logging::{beacon_info, beacon_warn};
use beacon_runtime::{Collaborators, Host, ManualClock, NavigationTimingProvider, Notification};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// One recorded signal and the host time it arrived at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub at: Timestamp,
    pub signal: Signal,
}

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("failed to read trace {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse trace {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
}

pub fn load_trace(path: &Path) -> Result<Vec<TraceEntry>, TraceError> {
    let content = fs::read_to_string(path).map_err(|source| TraceError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    ron::from_str(&content).map_err(|source| TraceError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Clone, Default)]
pub struct ReplayOptions {
    pub page_url: Option<Url>,
    pub navigation: Option<NavigationTiming>,
    /// Upper bound on timers fired after the last entry.
    pub drain_limit: usize,
}

struct FixedNavigation(NavigationTiming);

impl NavigationTimingProvider for FixedNavigation {
    fn navigation_timing(&self) -> Option<NavigationTiming> {
        Some(self.0)
    }
}

/// Replays `entries` in time order and returns every delivered record.
pub fn replay(
    mut entries: Vec<TraceEntry>,
    config: CorrelatorConfig,
    options: &ReplayOptions,
) -> Vec<InteractionRecord> {
    if entries.windows(2).any(|pair| pair[1].at < pair[0].at) {
        beacon_warn!("trace entries out of order, sorting by time");
        entries.sort_by_key(|entry| entry.at);
    }

    let delivered = Arc::new(Mutex::new(Vec::new()));
    let mut collaborators = Collaborators {
        page_url: options.page_url.clone(),
        ..Collaborators::default()
    };
    if let Some(navigation) = options.navigation {
        collaborators.navigation_timing = Box::new(FixedNavigation(navigation));
    }
    let sink = delivered.clone();
    collaborators
        .listeners
        .subscribe("replay", move |notification: &Notification<'_>| {
            if let Notification::Beacon(record) = notification {
                if let Ok(mut records) = sink.lock() {
                    records.push((*record).clone());
                }
            }
        });

    let mut host = Host::new(config, ManualClock::new(0), collaborators);
    let count = entries.len();
    for entry in entries {
        host.advance_to(entry.at);
        host.dispatch(entry.signal);
    }
    let fired = host.drain(options.drain_limit);
    beacon_info!("replayed {} signals, {} timers after the last", count, fired);

    let records = delivered
        .lock()
        .map(|mut records| std::mem::take(&mut *records))
        .unwrap_or_default();
    records
}
