use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::request::TrackedRequest;
use crate::view_model::{CorrelatorView, PendingView};
use crate::watcher::NodeWatch;
use crate::{
    ConstituentResource, CorrelatorConfig, EventId, ExclusionList, InteractionKind, NodeHandle,
    RequestId, Resource, TimerId, Timestamp, WatchId,
};

/// Lifecycle of one interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    Created,
    /// A timer or outstanding node is keeping the interaction open.
    Watching,
    /// At least one qualifying resource was found.
    Interesting,
    /// A timer fired without the interaction finishing.
    Stalled,
    Complete,
}

/// Why a completed interaction has not been delivered yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Hold {
    Gate,
    ExternalWait,
    Document,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimerPurpose {
    Settle(EventId),
    GateRetry(EventId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PendingEvent {
    pub(crate) kind: InteractionKind,
    pub(crate) resource: Resource,
    pub(crate) nodes_to_wait: u32,
    pub(crate) resources: Vec<ConstituentResource>,
    pub(crate) seen_urls: BTreeSet<String>,
    pub(crate) interesting: bool,
    pub(crate) phase: Phase,
    pub(crate) timer: Option<TimerId>,
    pub(crate) completed_at: Option<Timestamp>,
    pub(crate) hold: Option<Hold>,
    /// Delivery preparation (navigation backdating) has run.
    pub(crate) prepared: bool,
}

impl PendingEvent {
    pub(crate) fn new(resource: Resource) -> Self {
        Self {
            kind: resource.initiator,
            resource,
            nodes_to_wait: 0,
            resources: Vec::new(),
            seen_urls: BTreeSet::new(),
            interesting: false,
            phase: Phase::Created,
            timer: None,
            completed_at: None,
            hold: None,
            prepared: false,
        }
    }

    pub(crate) fn is_complete(&self) -> bool {
        self.phase == Phase::Complete
    }

    pub(crate) fn mark_interesting(&mut self) {
        self.interesting = true;
        if !self.is_complete() {
            self.phase = Phase::Interesting;
        }
    }
}

/// Everything the correlator owns: the pending queue, its counters and the
/// arenas of watched nodes, tracked requests and armed timers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelatorState {
    pub(crate) config: CorrelatorConfig,
    pub(crate) exclusions: ExclusionList,
    /// Live interactions only; finalized and dropped ones are removed.
    pub(crate) queue: BTreeMap<EventId, PendingEvent>,
    pub(crate) next_event: usize,
    /// The interaction most recently accepted through the overlap policy.
    pub(crate) latest: Option<EventId>,
    /// Number of incomplete interactions in the queue.
    pub(crate) watching: usize,
    pub(crate) observer_running: bool,
    pub(crate) instrumented: bool,
    /// Standalone request tracking; held off in SPA mode until the first navigation beacon.
    pub(crate) request_tracking: bool,
    pub(crate) route_change_in_progress: bool,
    pub(crate) timers: BTreeMap<TimerId, TimerPurpose>,
    pub(crate) next_timer: u64,
    pub(crate) watches: BTreeMap<WatchId, NodeWatch>,
    pub(crate) next_watch: u64,
    /// Attached nodes whose last watch completed; a later `src` change means a new fetch.
    pub(crate) settled_nodes: BTreeSet<NodeHandle>,
    pub(crate) requests: BTreeMap<RequestId, TrackedRequest>,
}

impl Default for CorrelatorState {
    fn default() -> Self {
        Self::new(CorrelatorConfig::default())
    }
}

impl CorrelatorState {
    pub fn new(config: CorrelatorConfig) -> Self {
        let exclusions = ExclusionList::new(config.exclusions.iter().cloned());
        let request_tracking = !(config.single_page_app && !config.always_send_requests);
        Self {
            config,
            exclusions,
            queue: BTreeMap::new(),
            next_event: 0,
            latest: None,
            watching: 0,
            observer_running: false,
            instrumented: false,
            request_tracking,
            route_change_in_progress: false,
            timers: BTreeMap::new(),
            next_timer: 1,
            watches: BTreeMap::new(),
            next_watch: 1,
            settled_nodes: BTreeSet::new(),
            requests: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &CorrelatorConfig {
        &self.config
    }

    pub fn watching(&self) -> usize {
        self.watching
    }

    /// True when nothing is outstanding on the most recent interaction.
    pub fn queue_is_empty(&self) -> bool {
        self.latest
            .and_then(|id| self.event(id))
            .map_or(true, |event| event.nodes_to_wait == 0)
    }

    pub fn view(&self) -> CorrelatorView {
        let events = self
            .queue
            .iter()
            .map(|(id, event)| PendingView {
                id: *id,
                kind: event.kind,
                url: event.resource.url.clone(),
                phase: event.phase,
                nodes_to_wait: event.nodes_to_wait,
                resource_count: event.resources.len(),
                interesting: event.interesting,
                held: event.hold.is_some(),
            })
            .collect();

        CorrelatorView {
            watching: self.watching,
            observer_running: self.observer_running,
            instrumented: self.instrumented,
            events,
            armed_timers: self.timers.len(),
            watched_nodes: self.watches.len(),
            tracked_requests: self.requests.len(),
            remembered_nodes: self.settled_nodes.len(),
        }
    }

    pub(crate) fn event(&self, id: EventId) -> Option<&PendingEvent> {
        self.queue.get(&id)
    }

    pub(crate) fn event_mut(&mut self, id: EventId) -> Option<&mut PendingEvent> {
        self.queue.get_mut(&id)
    }

    /// Stores a new interaction under a fresh id. Ids are never reused.
    pub(crate) fn push_event(&mut self, resource: Resource) -> EventId {
        let id = EventId(self.next_event);
        self.next_event += 1;
        self.queue.insert(id, PendingEvent::new(resource));
        self.watching += 1;
        id
    }

    /// The most recently pushed interaction that is not yet complete.
    pub(crate) fn last_active(&self) -> Option<EventId> {
        self.queue
            .iter()
            .rev()
            .find(|(_, event)| !event.is_complete())
            .map(|(id, _)| *id)
    }

    /// The latest interaction, if it still accepts resource registrations.
    pub(crate) fn current(&self) -> Option<EventId> {
        let id = self.latest?;
        self.event(id)
            .filter(|event| !event.is_complete())
            .map(|_| id)
    }
}
