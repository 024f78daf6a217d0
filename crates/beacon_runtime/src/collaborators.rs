//! Host-side seams the correlator drives or queries.

use beacon_core::{
    InteractionRecord, NavigationTiming, NodeHandle, ObserverFilter, RequestId,
    ResourceTimingEntry, WatchId,
};
use beacon_logging::beacon_debug;
use url::Url;

use crate::listeners::{isolated, Listeners};

/// Reports document mutations back as `Signal::Mutations`.
pub trait ChangeObserver: Send {
    fn start(&mut self, filter: &ObserverFilter);
    fn stop(&mut self);
}

/// One downstream consumer's vote on whether a beacon may be emitted now.
pub trait ReadinessGate: Send {
    fn is_ready(&self) -> bool;
}

impl<F> ReadinessGate for F
where
    F: Fn() -> bool + Send,
{
    fn is_ready(&self) -> bool {
        self()
    }
}

pub trait BeaconDispatcher: Send {
    fn deliver(&mut self, record: &InteractionRecord);
}

/// Attaches load and error listeners that report `Signal::NodeSettled`.
pub trait NodeListener: Send {
    fn listen(&mut self, node: NodeHandle, watch: WatchId);
}

/// Lets an intercepted request's real send proceed.
pub trait RequestForwarder: Send {
    fn forward(&mut self, request: RequestId);
}

pub trait ResourceTimingProvider: Send {
    fn entries_for(&self, url: &str) -> Vec<ResourceTimingEntry>;
}

pub trait NavigationTimingProvider: Send {
    fn navigation_timing(&self) -> Option<NavigationTiming>;
}

pub trait DocumentState: Send {
    fn is_complete(&self) -> bool;
}

/// Every registered voter must agree before a beacon goes out.
#[derive(Default)]
pub struct GateSet {
    voters: Vec<(String, Box<dyn ReadinessGate>)>,
}

impl GateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, gate: impl ReadinessGate + 'static) {
        self.voters.push((name.into(), Box::new(gate)));
    }

    /// A voter that panics counts as not ready.
    pub fn is_ready(&self) -> bool {
        let veto = self.voters.iter().find(|(name, gate)| {
            !isolated(&format!("gate {name}"), false, || gate.is_ready())
        });
        match veto {
            Some((name, _)) => {
                beacon_debug!("beacon held by {}", name);
                false
            }
            None => true,
        }
    }

    pub fn len(&self) -> usize {
        self.voters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voters.is_empty()
    }
}

pub struct NoopObserver;

impl ChangeObserver for NoopObserver {
    fn start(&mut self, _filter: &ObserverFilter) {}
    fn stop(&mut self) {}
}

pub struct NoopNodeListener;

impl NodeListener for NoopNodeListener {
    fn listen(&mut self, _node: NodeHandle, _watch: WatchId) {}
}

pub struct NoopForwarder;

impl RequestForwarder for NoopForwarder {
    fn forward(&mut self, _request: RequestId) {}
}

pub struct NoResourceTiming;

impl ResourceTimingProvider for NoResourceTiming {
    fn entries_for(&self, _url: &str) -> Vec<ResourceTimingEntry> {
        Vec::new()
    }
}

pub struct NoNavigationTiming;

impl NavigationTimingProvider for NoNavigationTiming {
    fn navigation_timing(&self) -> Option<NavigationTiming> {
        None
    }
}

pub struct DocumentLoaded;

impl DocumentState for DocumentLoaded {
    fn is_complete(&self) -> bool {
        true
    }
}

/// Everything the host wires around the correlator.
pub struct Collaborators {
    pub observer: Box<dyn ChangeObserver>,
    pub gates: GateSet,
    pub listeners: Listeners,
    pub nodes: Box<dyn NodeListener>,
    pub forwarder: Box<dyn RequestForwarder>,
    pub resource_timing: Box<dyn ResourceTimingProvider>,
    pub navigation_timing: Box<dyn NavigationTimingProvider>,
    pub document: Box<dyn DocumentState>,
    pub page_url: Option<Url>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            observer: Box::new(NoopObserver),
            gates: GateSet::new(),
            listeners: Listeners::new(),
            nodes: Box::new(NoopNodeListener),
            forwarder: Box::new(NoopForwarder),
            resource_timing: Box::new(NoResourceTiming),
            navigation_timing: Box::new(NoNavigationTiming),
            document: Box::new(DocumentLoaded),
            page_url: None,
        }
    }
}
