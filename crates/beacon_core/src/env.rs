use serde::{Deserialize, Serialize};
use url::Url;

use crate::Timestamp;

/// A higher-precision timing entry for one fetched URL.
///
/// A zero timestamp means the host did not expose that value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTimingEntry {
    pub start_time: Timestamp,
    pub request_start: Timestamp,
    pub response_start: Timestamp,
    pub response_end: Timestamp,
}

/// The browser timeline of the initial document load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationTiming {
    pub fetch_start: Timestamp,
    pub response_start: Timestamp,
}

/// Read-only view of the host, queried while a signal is processed.
pub trait Environment {
    fn now(&self) -> Timestamp;

    /// Every downstream consumer agrees a beacon may be emitted.
    fn ready_to_send(&self) -> bool;

    fn document_complete(&self) -> bool {
        true
    }

    /// Base for resolving relative request and node URLs.
    fn page_url(&self) -> Option<Url> {
        None
    }

    fn resource_timing(&self, _url: &str) -> Vec<ResourceTimingEntry> {
        Vec::new()
    }

    fn navigation_timing(&self) -> Option<NavigationTiming> {
        None
    }
}
