use beacon_logging::{beacon_debug, beacon_trace};

use crate::correlator::AddOutcome;
use crate::{CorrelatorState, Effect, Environment, InteractionKind, Resource, Signal};

/// Per-signal context: the host view and the effects produced so far.
pub(crate) struct Ctx<'a> {
    pub(crate) env: &'a dyn Environment,
    pub(crate) effects: Vec<Effect>,
}

/// Applies one signal to the correlator state and returns the effects the host must run.
pub fn update(
    mut state: CorrelatorState,
    signal: Signal,
    env: &dyn Environment,
) -> (CorrelatorState, Vec<Effect>) {
    let mut ctx = Ctx {
        env,
        effects: Vec::new(),
    };

    match signal {
        Signal::Instrument => {
            state.instrumented = true;
            state.start_observer(&mut ctx);
        }
        Signal::Uninstrument => {
            state.instrumented = false;
        }
        Signal::PageUnload => {
            state.stop_observer(&mut ctx);
        }
        Signal::Click => {
            if !state.instrumented || !state.config.instrument_requests {
                beacon_trace!("click while uninstrumented");
            } else if state.config.single_page_app {
                beacon_trace!("click ignored in single-page-app mode");
            } else {
                let resource = Resource::starting_at(InteractionKind::Click, env.now());
                state.add_event(resource, &mut ctx);
            }
        }
        Signal::RouteChange { url, wait } => {
            if state.route_change_in_progress {
                beacon_debug!("route change already in progress, ignoring");
            } else {
                state.route_change_in_progress = true;
                let mut resource = Resource::starting_at(InteractionKind::SoftNavigation, env.now());
                resource.url = url;
                resource.wait = wait;
                track_navigation(&mut state, resource, &mut ctx);
            }
        }
        Signal::HardNavigation { url } => {
            let start = env
                .navigation_timing()
                .map_or_else(|| env.now(), |timing| timing.fetch_start);
            let mut resource = Resource::starting_at(InteractionKind::HardNavigation, start);
            resource.url = url;
            state.route_change_in_progress = true;
            track_navigation(&mut state, resource, &mut ctx);
        }
        Signal::Mutations(batch) => state.mutation_batch(batch, &mut ctx),
        Signal::NodeSettled { watch, outcome } => state.node_settled(watch, outcome, &mut ctx),
        Signal::RequestOpened {
            request,
            method,
            url,
            asynchronous,
        } => state.request_opened(request, method, url, asynchronous, &mut ctx),
        Signal::RequestOpenFailed { request } => state.request_open_failed(request, &mut ctx),
        Signal::RequestSent { request } => state.request_sent(request, &mut ctx),
        Signal::RequestProgress {
            request,
            ready_state,
            http_status,
        } => state.request_progress(request, ready_state, http_status, &mut ctx),
        Signal::RequestEnded { request, outcome } => {
            state.request_ended(request, outcome, &mut ctx)
        }
        Signal::TimerFired(timer) => state.timer_fired(timer, &mut ctx),
        Signal::WaitComplete(id) => state.wait_complete(id, &mut ctx),
        Signal::DocumentLoaded => state.document_loaded(&mut ctx),
    }

    (state, ctx.effects)
}

fn track_navigation(state: &mut CorrelatorState, resource: Resource, ctx: &mut Ctx<'_>) {
    match state.add_event(resource, ctx) {
        AddOutcome::Tracking(id) | AddOutcome::Sent(id) => {
            beacon_trace!("navigation tracked as {:?}", id);
        }
        AddOutcome::Rejected | AddOutcome::Dropped => {
            state.route_change_in_progress = false;
        }
    }
}
