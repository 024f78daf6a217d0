#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::sync::Once;

use beacon_core::{
    update, CorrelatorConfig, CorrelatorState, Effect, Environment, InteractionRecord,
    NavigationTiming, NodeHandle, RequestId, RequestOutcome, RequestStatus, ResourceTimingEntry,
    Signal, TimerId, Timestamp, WatchId,
};
use url::Url;

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(beacon_logging::initialize_for_tests);
}

pub struct FakeEnv {
    pub now: Cell<Timestamp>,
    pub gate_open: Cell<bool>,
    pub document_complete: Cell<bool>,
    pub page_url: Option<Url>,
    pub navigation: Option<NavigationTiming>,
    pub entries: RefCell<HashMap<String, Vec<ResourceTimingEntry>>>,
}

impl Default for FakeEnv {
    fn default() -> Self {
        Self {
            now: Cell::new(0),
            gate_open: Cell::new(true),
            document_complete: Cell::new(true),
            page_url: Url::parse("https://shop.example.com/catalog/").ok(),
            navigation: None,
            entries: RefCell::new(HashMap::new()),
        }
    }
}

impl Environment for FakeEnv {
    fn now(&self) -> Timestamp {
        self.now.get()
    }

    fn ready_to_send(&self) -> bool {
        self.gate_open.get()
    }

    fn document_complete(&self) -> bool {
        self.document_complete.get()
    }

    fn page_url(&self) -> Option<Url> {
        self.page_url.clone()
    }

    fn resource_timing(&self, url: &str) -> Vec<ResourceTimingEntry> {
        self.entries.borrow().get(url).cloned().unwrap_or_default()
    }

    fn navigation_timing(&self) -> Option<NavigationTiming> {
        self.navigation
    }
}

/// Drives the correlator the way a host would: runs effects and fires due timers.
pub struct Harness {
    pub state: CorrelatorState,
    pub env: FakeEnv,
    timers: BTreeMap<TimerId, Timestamp>,
    pub records: Vec<InteractionRecord>,
    pub watches: Vec<(NodeHandle, WatchId)>,
    pub forwarded: Vec<RequestId>,
    pub failures: Vec<(Option<String>, RequestStatus)>,
    pub observer_starts: usize,
    pub observer_stops: usize,
}

impl Harness {
    pub fn new(config: CorrelatorConfig) -> Self {
        Self::with_env(config, FakeEnv::default())
    }

    pub fn with_env(config: CorrelatorConfig, env: FakeEnv) -> Self {
        Self {
            state: CorrelatorState::new(config),
            env,
            timers: BTreeMap::new(),
            records: Vec::new(),
            watches: Vec::new(),
            forwarded: Vec::new(),
            failures: Vec::new(),
            observer_starts: 0,
            observer_stops: 0,
        }
    }

    /// Instrumented harness with default configuration.
    pub fn instrumented() -> Self {
        let mut harness = Self::new(CorrelatorConfig::default());
        harness.send(Signal::Instrument);
        harness
    }

    pub fn spa() -> Self {
        let mut harness = Self::new(CorrelatorConfig {
            single_page_app: true,
            ..CorrelatorConfig::default()
        });
        harness.send(Signal::Instrument);
        harness
    }

    pub fn send(&mut self, signal: Signal) {
        let state = std::mem::take(&mut self.state);
        let (next, effects) = update(state, signal, &self.env);
        self.state = next;
        for effect in effects {
            self.apply(effect);
        }
    }

    fn apply(&mut self, effect: Effect) {
        let now = self.env.now.get();
        match effect {
            Effect::ArmTimer { timer, delay_ms } => {
                self.timers.insert(timer, now + delay_ms);
            }
            Effect::CancelTimer { timer } => {
                self.timers.remove(&timer);
            }
            Effect::StartObserver { .. } => self.observer_starts += 1,
            Effect::StopObserver => self.observer_stops += 1,
            Effect::ListenNode { node, watch } => self.watches.push((node, watch)),
            Effect::ForwardSend { request } => self.forwarded.push(request),
            Effect::RequestFailed { url, status } => self.failures.push((url, status)),
            Effect::Deliver(record) => self.records.push(record),
        }
    }

    /// Moves the clock to `at`, firing every timer due on the way.
    pub fn advance_to(&mut self, at: Timestamp) {
        loop {
            let due = self
                .timers
                .iter()
                .filter(|(_, deadline)| **deadline <= at)
                .min_by_key(|(timer, deadline)| (**deadline, **timer))
                .map(|(timer, deadline)| (*timer, *deadline));
            let Some((timer, deadline)) = due else {
                break;
            };
            self.timers.remove(&timer);
            self.env.now.set(deadline.max(self.env.now.get()));
            self.send(Signal::TimerFired(timer));
        }
        self.env.now.set(at.max(self.env.now.get()));
    }

    pub fn at(&mut self, at: Timestamp, signal: Signal) {
        self.advance_to(at);
        self.send(signal);
    }

    pub fn armed_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn watch_for(&self, node: u64) -> WatchId {
        self.watches
            .iter()
            .rev()
            .find(|(handle, _)| *handle == NodeHandle(node))
            .map(|(_, watch)| *watch)
            .expect("node is watched")
    }

    /// Opens, sends and completes a request at the current time.
    pub fn open_and_send(&mut self, request: u64, url: &str) {
        self.send(Signal::RequestOpened {
            request: RequestId(request),
            method: "GET".to_string(),
            url: url.to_string(),
            asynchronous: None,
        });
        self.send(Signal::RequestSent {
            request: RequestId(request),
        });
    }

    pub fn end_request(&mut self, request: u64, outcome: RequestOutcome) {
        self.send(Signal::RequestEnded {
            request: RequestId(request),
            outcome,
        });
    }
}
