use serde::{Deserialize, Serialize};

use crate::ResourceKind;

/// Time given to clicks and requests to show they caused interesting activity.
pub const SHORT_TIMEOUT_MS: u64 = 50;
/// Grace period for navigations to settle after the last known activity.
pub const SETTLE_TIMEOUT_MS: u64 = 1000;
/// Delay between delivery attempts while the readiness gate is closed.
pub const GATE_RETRY_MS: u64 = 5000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelatorConfig {
    pub short_timeout_ms: u64,
    pub settle_timeout_ms: u64,
    pub gate_retry_ms: u64,
    /// Route changes drive interactions; clicks are ignored.
    pub single_page_app: bool,
    /// Track requests and clicks once instrumented.
    pub instrument_requests: bool,
    /// Beacon every finished request on its own, bypassing overlap policy.
    pub always_send_requests: bool,
    /// Constituent resource kinds counted as back-end time on soft navigations.
    pub back_end_kinds: Vec<ResourceKind>,
    /// Full URLs, hostnames or paths that are never instrumented.
    pub exclusions: Vec<String>,
}

impl Default for CorrelatorConfig {
    fn default() -> Self {
        Self {
            short_timeout_ms: SHORT_TIMEOUT_MS,
            settle_timeout_ms: SETTLE_TIMEOUT_MS,
            gate_retry_ms: GATE_RETRY_MS,
            single_page_app: false,
            instrument_requests: true,
            always_send_requests: false,
            back_end_kinds: vec![ResourceKind::Request, ResourceKind::Script],
            exclusions: Vec::new(),
        }
    }
}
