use serde::{Deserialize, Serialize};

use crate::RequestStatus;

/// Millisecond timestamp on the host's monotonic clock.
pub type Timestamp = u64;

/// Key of an interaction in the pending queue. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(pub usize);

/// Host handle for an outgoing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(pub u64);

/// Opaque host handle for a document node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeHandle(pub u64);

/// Arena key of a node-watch record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WatchId(pub u64);

/// Handle of a single-shot timer armed through [`crate::Effect::ArmTimer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InteractionKind {
    Click,
    NetworkRequest,
    SoftNavigation,
    HardNavigation,
}

impl InteractionKind {
    pub fn is_navigation(self) -> bool {
        matches!(
            self,
            InteractionKind::SoftNavigation | InteractionKind::HardNavigation
        )
    }

    /// Initiator tag as it appears on a beacon.
    pub fn initiator(self) -> &'static str {
        match self {
            InteractionKind::Click => "click",
            InteractionKind::NetworkRequest => "xhr",
            InteractionKind::SoftNavigation => "spa",
            InteractionKind::HardNavigation => "spa_hard",
        }
    }
}

/// What a constituent resource is, used to pick back-end intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Image,
    Script,
    Frame,
    Stylesheet,
    Request,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTiming {
    pub fetch_start: Option<Timestamp>,
    pub request_start: Option<Timestamp>,
    pub response_start: Option<Timestamp>,
    pub response_end: Option<Timestamp>,
    pub dom_interactive: Option<Timestamp>,
    pub dom_complete: Option<Timestamp>,
    pub load_event_end: Option<Timestamp>,
}

/// The primary unit of work an interaction represents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub initiator: InteractionKind,
    pub url: Option<String>,
    pub method: Option<String>,
    pub timing: ResourceTiming,
    pub status: Option<RequestStatus>,
    pub synchronous: bool,
    /// Completion is deferred to an external `WaitComplete` signal.
    pub wait: bool,
}

impl Resource {
    pub fn new(initiator: InteractionKind) -> Self {
        Self {
            initiator,
            url: None,
            method: None,
            timing: ResourceTiming::default(),
            status: None,
            synchronous: false,
            wait: false,
        }
    }

    pub fn starting_at(initiator: InteractionKind, request_start: Timestamp) -> Self {
        let mut resource = Self::new(initiator);
        resource.timing.request_start = Some(request_start);
        resource
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// A resource discovered while an interaction was being watched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstituentResource {
    pub kind: ResourceKind,
    pub url: String,
    pub timing: ResourceTiming,
}

/// Back-end / front-end split attached to navigation beacons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaTimers {
    pub back_end: i64,
    pub front_end: i64,
    pub total: i64,
}

/// The finalized record handed to the beacon dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub initiator: InteractionKind,
    pub url: Option<String>,
    pub timing: ResourceTiming,
    pub status: Option<RequestStatus>,
    pub resources: Vec<ConstituentResource>,
    pub timers: Option<SpaTimers>,
}
