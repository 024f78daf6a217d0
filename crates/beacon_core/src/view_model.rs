use crate::{EventId, InteractionKind, Phase};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CorrelatorView {
    pub watching: usize,
    pub observer_running: bool,
    pub instrumented: bool,
    pub events: Vec<PendingView>,
    pub armed_timers: usize,
    pub watched_nodes: usize,
    pub tracked_requests: usize,
    /// Settled nodes kept for `src` change detection.
    pub remembered_nodes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingView {
    pub id: EventId,
    pub kind: InteractionKind,
    pub url: Option<String>,
    pub phase: Phase,
    pub nodes_to_wait: u32,
    pub resource_count: usize,
    pub interesting: bool,
    /// Complete but waiting on the gate, the document or an external release.
    pub held: bool,
}

impl CorrelatorView {
    pub fn event(&self, id: EventId) -> Option<&PendingView> {
        self.events.iter().find(|event| event.id == id)
    }
}
