//! Beacon runtime: clocks, timers, collaborator seams and the hosts that drive the correlator.
mod clock;
mod collaborators;
mod config;
mod host;
mod listeners;
mod service;
mod timers;

pub use clock::{Clock, ManualClock, SystemClock};
pub use collaborators::{
    BeaconDispatcher, ChangeObserver, Collaborators, DocumentLoaded, DocumentState, GateSet,
    NavigationTimingProvider, NoNavigationTiming, NoResourceTiming, NodeListener, NoopForwarder,
    NoopNodeListener, NoopObserver, ReadinessGate, RequestForwarder, ResourceTimingProvider,
};
pub use config::{load_config, load_config_or_default, ConfigError};
pub use host::Host;
pub use listeners::{Listeners, Notification};
pub use service::{CorrelatorHandle, ServiceError};
pub use timers::TimerQueue;
