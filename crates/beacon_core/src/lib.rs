//! Beacon core: pure interaction correlator and view-model helpers.
mod config;
mod correlator;
mod effect;
mod env;
mod exclusion;
mod msg;
mod request;
mod state;
mod status;
mod timing;
mod types;
mod update;
mod view_model;
mod watcher;

pub use config::{CorrelatorConfig, GATE_RETRY_MS, SETTLE_TIMEOUT_MS, SHORT_TIMEOUT_MS};
pub use effect::{Effect, ObserverFilter};
pub use env::{Environment, NavigationTiming, ResourceTimingEntry};
pub use exclusion::{is_inert_url, resolve_url, ExclusionList};
pub use msg::{Mutation, NodeOutcome, NodeSnapshot, NodeTag, RequestOutcome, Signal};
pub use state::{CorrelatorState, Phase};
pub use status::RequestStatus;
pub use types::{
    ConstituentResource, EventId, InteractionKind, InteractionRecord, NodeHandle, RequestId,
    Resource, ResourceKind, ResourceTiming, SpaTimers, TimerId, Timestamp, WatchId,
};
pub use update::update;
pub use view_model::{CorrelatorView, PendingView};
