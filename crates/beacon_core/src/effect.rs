use serde::{Deserialize, Serialize};

use crate::{InteractionRecord, NodeHandle, RequestId, RequestStatus, TimerId, WatchId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    /// Fire `Signal::TimerFired(timer)` after `delay_ms`.
    ArmTimer { timer: TimerId, delay_ms: u64 },
    CancelTimer { timer: TimerId },
    StartObserver { filter: ObserverFilter },
    StopObserver,
    /// Attach load and error listeners that report `Signal::NodeSettled` for `watch`.
    ListenNode { node: NodeHandle, watch: WatchId },
    /// Let the real send of an instrumented request proceed.
    ForwardSend { request: RequestId },
    /// A request finished with an error status.
    RequestFailed {
        url: Option<String>,
        status: RequestStatus,
    },
    Deliver(InteractionRecord),
}

/// Which document changes the observer reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObserverFilter {
    pub child_list: bool,
    pub subtree: bool,
    pub attributes: Vec<String>,
}

impl Default for ObserverFilter {
    fn default() -> Self {
        Self {
            child_list: true,
            subtree: true,
            attributes: vec!["src".to_string(), "href".to_string()],
        }
    }
}
