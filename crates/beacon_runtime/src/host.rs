//! Deterministic single-threaded host: runs effects and fires due timers.

use beacon_core::{
    update, CorrelatorConfig, CorrelatorState, CorrelatorView, Effect, Environment,
    NavigationTiming, ResourceTimingEntry, Signal, Timestamp,
};
use beacon_logging::{beacon_trace, beacon_warn, set_signal_seq};
use url::Url;

use crate::clock::{Clock, ManualClock, SystemClock};
use crate::collaborators::{BeaconDispatcher, Collaborators};
use crate::listeners::{isolated, Notification};
use crate::timers::TimerQueue;

/// What the correlator sees of the host while a signal is processed.
struct HostEnv<'a> {
    now: Timestamp,
    collaborators: &'a Collaborators,
}

impl Environment for HostEnv<'_> {
    fn now(&self) -> Timestamp {
        self.now
    }

    fn ready_to_send(&self) -> bool {
        self.collaborators.gates.is_ready()
    }

    fn document_complete(&self) -> bool {
        isolated("document state", true, || {
            self.collaborators.document.is_complete()
        })
    }

    fn page_url(&self) -> Option<Url> {
        self.collaborators.page_url.clone()
    }

    fn resource_timing(&self, url: &str) -> Vec<ResourceTimingEntry> {
        isolated("resource timing", Vec::new(), || {
            self.collaborators.resource_timing.entries_for(url)
        })
    }

    fn navigation_timing(&self) -> Option<NavigationTiming> {
        isolated("navigation timing", None, || {
            self.collaborators.navigation_timing.navigation_timing()
        })
    }
}

pub struct Host<C: Clock = SystemClock> {
    clock: C,
    state: CorrelatorState,
    timers: TimerQueue,
    collaborators: Collaborators,
    signal_seq: u64,
}

impl<C: Clock> Host<C> {
    pub fn new(config: CorrelatorConfig, clock: C, collaborators: Collaborators) -> Self {
        Self {
            clock,
            state: CorrelatorState::new(config),
            timers: TimerQueue::new(),
            collaborators,
            signal_seq: 0,
        }
    }

    /// Processes one signal and runs the effects it produced.
    pub fn dispatch(&mut self, signal: Signal) {
        self.signal_seq += 1;
        set_signal_seq(self.signal_seq);
        beacon_trace!("dispatching {:?}", signal);

        let now = self.clock.now();
        let state = std::mem::take(&mut self.state);
        let env = HostEnv {
            now,
            collaborators: &self.collaborators,
        };
        let (state, effects) = update(state, signal, &env);
        self.state = state;

        for effect in effects {
            self.run_effect(effect, now);
        }
    }

    /// Fires every timer due at the clock's current time. Returns how many fired.
    pub fn run_due(&mut self) -> usize {
        let mut fired = 0;
        while let Some((timer, _)) = self.timers.pop_due(self.clock.now()) {
            self.dispatch(Signal::TimerFired(timer));
            fired += 1;
        }
        fired
    }

    pub fn next_deadline(&mut self) -> Option<Timestamp> {
        self.timers.next_deadline()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn view(&self) -> CorrelatorView {
        self.state.view()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn collaborators_mut(&mut self) -> &mut Collaborators {
        &mut self.collaborators
    }

    fn run_effect(&mut self, effect: Effect, now: Timestamp) {
        let collaborators = &mut self.collaborators;
        match effect {
            Effect::ArmTimer { timer, delay_ms } => {
                self.timers.arm(timer, now.saturating_add(delay_ms));
            }
            Effect::CancelTimer { timer } => self.timers.cancel(timer),
            Effect::StartObserver { filter } => {
                isolated("observer", (), || collaborators.observer.start(&filter));
            }
            Effect::StopObserver => isolated("observer", (), || collaborators.observer.stop()),
            Effect::ListenNode { node, watch } => {
                isolated("node listener", (), || collaborators.nodes.listen(node, watch));
            }
            Effect::ForwardSend { request } => {
                isolated("forwarder", (), || collaborators.forwarder.forward(request));
            }
            Effect::RequestFailed { url, status } => {
                collaborators.listeners.notify(&Notification::RequestFailed {
                    url: url.as_deref(),
                    status,
                });
            }
            Effect::Deliver(record) => collaborators.listeners.deliver(&record),
        }
    }
}

impl Host<ManualClock> {
    /// Moves the manual clock forward to `at`, firing due timers at their deadlines.
    pub fn advance_to(&mut self, at: Timestamp) {
        while let Some(deadline) = self.timers.next_deadline() {
            if deadline > at {
                break;
            }
            if deadline > self.clock.now() {
                self.clock.set(deadline);
            }
            self.run_due();
        }
        if at > self.clock.now() {
            self.clock.set(at);
        }
    }

    /// Fires armed timers in deadline order until none remain or `max_timers`
    /// have fired. A gate that never opens keeps its retry timer armed.
    pub fn drain(&mut self, max_timers: usize) -> usize {
        let mut fired = 0;
        while let Some(deadline) = self.timers.next_deadline() {
            if fired >= max_timers {
                beacon_warn!("stopped draining with {} timers armed", self.timers.len());
                break;
            }
            if deadline > self.clock.now() {
                self.clock.set(deadline);
            }
            fired += self.run_due();
        }
        fired
    }
}
