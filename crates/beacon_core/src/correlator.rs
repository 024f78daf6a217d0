//! The interaction queue: overlap policy, timeout policy and finalization.

use beacon_logging::{beacon_debug, beacon_info, beacon_trace, beacon_warn};

use crate::state::{Hold, PendingEvent, TimerPurpose};
use crate::timing;
use crate::update::Ctx;
use crate::{
    Effect, EventId, InteractionKind, InteractionRecord, ObserverFilter, Phase, Resource, TimerId,
    Timestamp,
};

/// How an incoming interaction relates to the active one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Overlap {
    /// Drop the active interaction silently, then track the incoming one.
    AbortActive,
    /// Do not track the incoming interaction.
    RejectIncoming,
    /// Track both; the incoming one becomes active.
    Proceed,
}

/// `active_resolved` is true when the active interaction awaits nodes and knows its URL.
pub(crate) fn overlap_policy(
    active: InteractionKind,
    active_resolved: bool,
    incoming: InteractionKind,
) -> Overlap {
    use InteractionKind::*;

    match (active, incoming) {
        (Click, _) if !active_resolved => Overlap::AbortActive,
        (Click, _) => Overlap::Proceed,
        (NetworkRequest, Click) => Overlap::RejectIncoming,
        (NetworkRequest, _) => Overlap::Proceed,
        (SoftNavigation | HardNavigation, NetworkRequest) => Overlap::RejectIncoming,
        (SoftNavigation | HardNavigation, _) => Overlap::Proceed,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AddOutcome {
    Tracking(EventId),
    /// Finalized on arrival: no observer, but the resource was already complete.
    Sent(EventId),
    Rejected,
    /// No observer and nothing to finalize.
    Dropped,
}

impl crate::CorrelatorState {
    pub(crate) fn add_event(&mut self, resource: Resource, ctx: &mut Ctx<'_>) -> AddOutcome {
        let incoming = resource.initiator;

        let active = self.last_active().and_then(|id| {
            self.event(id).map(|event| {
                let resolved = event.nodes_to_wait > 0 && event.resource.url.is_some();
                (id, event.kind, resolved)
            })
        });
        if let Some((active_id, active_kind, resolved)) = active {
            match overlap_policy(active_kind, resolved, incoming) {
                Overlap::AbortActive => {
                    beacon_debug!(
                        "aborting unresolved {} {:?} for incoming {}",
                        active_kind.initiator(),
                        active_id,
                        incoming.initiator()
                    );
                    self.drop_event(active_id, ctx);
                }
                Overlap::RejectIncoming => {
                    beacon_debug!(
                        "rejecting {} while {} {:?} is active",
                        incoming.initiator(),
                        active_kind.initiator(),
                        active_id
                    );
                    return AddOutcome::Rejected;
                }
                Overlap::Proceed => {}
            }
        }

        let finished = resource.url.is_some() && resource.timing.load_event_end.is_some();
        let id = self.push_event(resource);
        self.latest = Some(id);
        beacon_trace!("tracking {} as {:?}", incoming.initiator(), id);

        if !self.observer_running {
            if incoming.is_navigation() {
                self.start_observer(ctx);
                self.arm_settle(id, self.config.settle_timeout_ms, ctx);
                return AddOutcome::Tracking(id);
            }
            if finished {
                self.send_event(id, ctx);
                return AddOutcome::Sent(id);
            }
            beacon_debug!("no observer running, dropping {:?}", id);
            self.drop_event(id, ctx);
            return AddOutcome::Dropped;
        }

        let delay = self.detection_delay(incoming);
        self.arm_settle(id, delay, ctx);
        AddOutcome::Tracking(id)
    }

    /// Window in which an interaction must show interesting activity.
    pub(crate) fn detection_delay(&self, kind: InteractionKind) -> u64 {
        if kind.is_navigation() {
            self.config.settle_timeout_ms
        } else {
            self.config.short_timeout_ms
        }
    }

    /// Marks the interaction complete and attempts delivery. Idempotent.
    pub(crate) fn send_event(&mut self, id: EventId, ctx: &mut Ctx<'_>) {
        let now = ctx.env.now();
        let Some(event) = self.event_mut(id) else {
            return;
        };
        if event.is_complete() {
            return;
        }
        event.phase = Phase::Complete;
        event.completed_at = Some(now);

        self.watching = self.watching.saturating_sub(1);
        self.cancel_event_timer(id, ctx);
        self.try_deliver(id, ctx);
    }

    pub(crate) fn try_deliver(&mut self, id: EventId, ctx: &mut Ctx<'_>) {
        if self.event(id).is_none() {
            return;
        }
        if !ctx.env.ready_to_send() {
            beacon_debug!(
                "gate closed, retrying {:?} in {}ms",
                id,
                self.config.gate_retry_ms
            );
            let timer = self.arm_timer(
                TimerPurpose::GateRetry(id),
                self.config.gate_retry_ms,
                ctx,
            );
            if let Some(event) = self.event_mut(id) {
                event.hold = Some(Hold::Gate);
                event.timer = Some(timer);
            }
            return;
        }

        let settle = self.config.settle_timeout_ms;
        let document_complete = ctx.env.document_complete();
        let Some(event) = self.event_mut(id) else {
            return;
        };
        event.hold = None;

        if !event.prepared {
            event.prepared = true;
            // The settle window already elapsed without activity; it is not part of the interaction.
            if event.kind.is_navigation() && event.resources.is_empty() {
                let completed_at = event.completed_at.unwrap_or_default();
                event.resource.timing.load_event_end = Some(completed_at.saturating_sub(settle));
            }
        }

        if event.resource.wait {
            beacon_debug!("holding {:?} until released", id);
            event.hold = Some(Hold::ExternalWait);
            return;
        }
        if event.kind.is_navigation() && !document_complete {
            beacon_debug!("holding {:?} until the document loads", id);
            event.hold = Some(Hold::Document);
            return;
        }

        self.finalize(id, ctx);
    }

    /// Releases an interaction held for an external signal.
    pub(crate) fn wait_complete(&mut self, id: EventId, ctx: &mut Ctx<'_>) {
        let now = ctx.env.now();
        let Some(event) = self.event_mut(id) else {
            return;
        };
        if event.hold == Some(Hold::ExternalWait) {
            event.resource.timing.load_event_end = Some(now);
            event.resource.wait = false;
            self.finalize(id, ctx);
        } else {
            // Not complete yet: the release applies once it is.
            event.resource.wait = false;
        }
    }

    pub(crate) fn document_loaded(&mut self, ctx: &mut Ctx<'_>) {
        let now = ctx.env.now();
        let held: Vec<EventId> = self
            .queue
            .iter()
            .filter(|(_, event)| event.hold == Some(Hold::Document))
            .map(|(id, _)| *id)
            .collect();
        for id in held {
            if let Some(event) = self.event_mut(id) {
                event.resource.timing.load_event_end = Some(now);
            }
            self.finalize(id, ctx);
        }
    }

    fn finalize(&mut self, id: EventId, ctx: &mut Ctx<'_>) {
        let Some(event) = self.queue.remove(&id) else {
            return;
        };
        self.forget_watches(id);
        let PendingEvent {
            kind,
            mut resource,
            resources,
            ..
        } = event;

        let timers = if kind.is_navigation() {
            timing::navigation_timers(
                kind,
                &mut resource.timing,
                &resources,
                &self.config.back_end_kinds,
                ctx.env,
            )
        } else {
            None
        };

        if kind.is_navigation() {
            self.route_change_in_progress = false;
            if !self.request_tracking && self.config.instrument_requests {
                beacon_debug!("first navigation beacon, enabling request tracking");
                self.request_tracking = true;
            }
        }

        beacon_info!(
            "delivering {} beacon {:?} url={:?} resources={}",
            kind.initiator(),
            id,
            resource.url,
            resources.len()
        );
        ctx.effects.push(Effect::Deliver(InteractionRecord {
            initiator: kind,
            url: resource.url,
            timing: resource.timing,
            status: resource.status,
            resources,
            timers,
        }));
    }

    pub(crate) fn timedout(&mut self, id: EventId, ctx: &mut Ctx<'_>) {
        let Some(event) = self.event_mut(id) else {
            return;
        };
        if event.is_complete() {
            return;
        }
        event.timer = None;
        event.phase = Phase::Stalled;
        let (kind, outstanding) = (event.kind, event.nodes_to_wait);

        match kind {
            InteractionKind::NetworkRequest => {
                beacon_debug!("{:?} timed out, sending best-effort request beacon", id);
                self.send_event(id, ctx);
            }
            InteractionKind::SoftNavigation | InteractionKind::HardNavigation
                if outstanding == 0 =>
            {
                self.send_event(id, ctx);
            }
            InteractionKind::SoftNavigation
            | InteractionKind::HardNavigation
            | InteractionKind::Click => {
                beacon_debug!(
                    "discarding stalled {} {:?} with {} outstanding nodes",
                    kind.initiator(),
                    id,
                    outstanding
                );
                self.drop_event(id, ctx);
            }
        }
    }

    pub(crate) fn load_finished(&mut self, id: EventId, at: Timestamp, ctx: &mut Ctx<'_>) {
        let settle = self.config.settle_timeout_ms;
        let Some(event) = self.event_mut(id) else {
            beacon_trace!("load finished for dropped {:?}", id);
            return;
        };
        if event.is_complete() {
            return;
        }
        if event.nodes_to_wait == 0 {
            beacon_warn!("load finished for {:?} with nothing outstanding", id);
            return;
        }

        event.nodes_to_wait -= 1;
        if event.nodes_to_wait > 0 {
            self.arm_settle(id, settle, ctx);
            return;
        }

        event.resource.timing.load_event_end = Some(at);
        if event.kind.is_navigation() {
            // Frameworks often add more content right after the last fetch completes.
            self.arm_settle(id, settle, ctx);
        } else {
            self.send_event(id, ctx);
        }
    }

    pub(crate) fn timer_fired(&mut self, timer: TimerId, ctx: &mut Ctx<'_>) {
        let Some(purpose) = self.timers.remove(&timer) else {
            beacon_trace!("ignoring stale timer {:?}", timer);
            return;
        };
        match purpose {
            TimerPurpose::Settle(id) => self.timedout(id, ctx),
            TimerPurpose::GateRetry(id) => {
                let Some(event) = self.event_mut(id) else {
                    return;
                };
                event.timer = None;
                if event.hold == Some(Hold::Gate) {
                    self.try_deliver(id, ctx);
                }
            }
        }
    }

    /// Removes an interaction without a beacon.
    pub(crate) fn drop_event(&mut self, id: EventId, ctx: &mut Ctx<'_>) {
        self.cancel_event_timer(id, ctx);
        let Some(event) = self.queue.remove(&id) else {
            return;
        };
        self.forget_watches(id);
        if !event.is_complete() {
            self.watching = self.watching.saturating_sub(1);
        }
        if event.kind.is_navigation() {
            self.route_change_in_progress = false;
        }
    }

    /// Late load or error reports for a removed interaction are then ignored.
    fn forget_watches(&mut self, id: EventId) {
        self.watches.retain(|_, watch| watch.event != id);
    }

    /// Replaces the interaction's timer with a settle/detection timer.
    pub(crate) fn arm_settle(&mut self, id: EventId, delay_ms: u64, ctx: &mut Ctx<'_>) {
        if self.event(id).is_none() {
            return;
        }
        self.cancel_event_timer(id, ctx);
        let timer = self.arm_timer(TimerPurpose::Settle(id), delay_ms, ctx);
        if let Some(event) = self.event_mut(id) {
            event.timer = Some(timer);
            if event.phase == Phase::Created {
                event.phase = Phase::Watching;
            }
        }
    }

    fn arm_timer(&mut self, purpose: TimerPurpose, delay_ms: u64, ctx: &mut Ctx<'_>) -> TimerId {
        let timer = TimerId(self.next_timer);
        self.next_timer += 1;
        self.timers.insert(timer, purpose);
        ctx.effects.push(Effect::ArmTimer { timer, delay_ms });
        timer
    }

    pub(crate) fn cancel_event_timer(&mut self, id: EventId, ctx: &mut Ctx<'_>) {
        let Some(timer) = self.event_mut(id).and_then(|event| event.timer.take()) else {
            return;
        };
        if self.timers.remove(&timer).is_some() {
            ctx.effects.push(Effect::CancelTimer { timer });
        }
    }

    pub(crate) fn start_observer(&mut self, ctx: &mut Ctx<'_>) {
        if self.observer_running {
            return;
        }
        self.observer_running = true;
        ctx.effects.push(Effect::StartObserver {
            filter: ObserverFilter::default(),
        });
    }

    pub(crate) fn stop_observer(&mut self, ctx: &mut Ctx<'_>) {
        if !self.observer_running {
            return;
        }
        self.observer_running = false;
        ctx.effects.push(Effect::StopObserver);
    }
}
