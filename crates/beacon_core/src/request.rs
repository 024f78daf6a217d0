//! Request interception: per-request lifecycle and hand-off to the queue.

use beacon_logging::{beacon_debug, beacon_trace};

use crate::exclusion::{is_inert_url, resolve_url};
use crate::update::Ctx;
use crate::{
    ConstituentResource, CorrelatorState, Effect, EventId, InteractionKind, RequestId,
    RequestOutcome, RequestStatus, Resource, ResourceKind, ResourceTiming, Timestamp,
};

/// Requests with no entry pass straight through to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TrackedRequest {
    Active(ActiveRequest),
    /// Already reported; the pending send must not be forwarded.
    OpenFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ActiveRequest {
    pub(crate) resource: Resource,
    /// Interaction and resource slot this request was folded into.
    pub(crate) folded: Option<(EventId, usize)>,
}

impl CorrelatorState {
    pub(crate) fn request_opened(
        &mut self,
        request: RequestId,
        method: String,
        raw_url: String,
        asynchronous: Option<bool>,
        ctx: &mut Ctx<'_>,
    ) {
        if !self.instrumented || !self.config.instrument_requests {
            beacon_trace!("{:?} opened while uninstrumented", request);
            self.requests.remove(&request);
            return;
        }
        let page = ctx.env.page_url();
        let resolved = resolve_url(&raw_url, page.as_ref());
        let excluded = match &resolved {
            Some(url) => self.exclusions.excludes(url),
            None => is_inert_url(&raw_url),
        };
        if excluded {
            beacon_debug!("{:?} to {} is excluded", request, raw_url);
            self.requests.remove(&request);
            return;
        }

        let url = resolved.map_or(raw_url, |url| url.to_string());
        let mut resource = Resource::new(InteractionKind::NetworkRequest).with_url(url.clone());
        resource.method = Some(method);
        resource.synchronous = asynchronous == Some(false);

        let mut folded = None;
        if self.config.single_page_app && self.watching > 0 && !self.config.always_send_requests {
            let now = ctx.env.now();
            if let Some(id) = self.current() {
                if let Some(event) = self.event_mut(id) {
                    let slot = event.resources.len();
                    event.resources.push(ConstituentResource {
                        kind: ResourceKind::Request,
                        url,
                        timing: ResourceTiming {
                            request_start: Some(now),
                            ..ResourceTiming::default()
                        },
                    });
                    event.nodes_to_wait += 1;
                    event.mark_interesting();
                    beacon_debug!("folding {:?} into {:?}", request, id);
                    folded = Some((id, slot));
                }
            }
        }

        self.requests.insert(
            request,
            TrackedRequest::Active(ActiveRequest { resource, folded }),
        );
    }

    pub(crate) fn request_sent(&mut self, request: RequestId, ctx: &mut Ctx<'_>) {
        if self.requests.get(&request) == Some(&TrackedRequest::OpenFailed) {
            self.requests.remove(&request);
            beacon_debug!("{:?} failed to open, not sending", request);
            return;
        }

        let now = ctx.env.now();
        let folded = match self.requests.get_mut(&request) {
            Some(TrackedRequest::Active(active)) => {
                active.resource.timing.request_start = Some(now);
                active.folded
            }
            _ => None,
        };
        if let Some((id, slot)) = folded {
            if let Some(resource) = self
                .event_mut(id)
                .and_then(|event| event.resources.get_mut(slot))
            {
                resource.timing.request_start = Some(now);
            }
        }

        ctx.effects.push(Effect::ForwardSend { request });
    }

    /// The send that follows will never start, so the failure completes now.
    pub(crate) fn request_open_failed(&mut self, request: RequestId, ctx: &mut Ctx<'_>) {
        let now = ctx.env.now();
        let Some(TrackedRequest::Active(active)) = self.requests.get_mut(&request) else {
            return;
        };
        active.resource.status = Some(RequestStatus::OpenFailure);
        active.resource.timing.request_start = Some(now);
        self.finish_request(request, ctx);
    }

    pub(crate) fn request_progress(
        &mut self,
        request: RequestId,
        ready_state: u8,
        http_status: u16,
        ctx: &mut Ctx<'_>,
    ) {
        let now = ctx.env.now();
        let Some(TrackedRequest::Active(active)) = self.requests.get_mut(&request) else {
            return;
        };
        if active.resource.synchronous {
            return;
        }
        let timing = &mut active.resource.timing;
        match ready_state {
            2 => timing.response_start = Some(now),
            3 => timing.dom_interactive = Some(now),
            4 => timing.response_end = Some(now),
            _ => return,
        }
        if ready_state == 4 && http_status != 0 {
            active.resource.status = RequestStatus::from_http(http_status);
            self.finish_request(request, ctx);
        }
    }

    pub(crate) fn request_ended(
        &mut self,
        request: RequestId,
        outcome: RequestOutcome,
        ctx: &mut Ctx<'_>,
    ) {
        let Some(TrackedRequest::Active(active)) = self.requests.get_mut(&request) else {
            beacon_trace!("{:?} ended after finishing, ignoring {:?}", request, outcome);
            return;
        };
        active.resource.status = match outcome {
            RequestOutcome::Load { http_status } => RequestStatus::from_http(http_status),
            RequestOutcome::Timeout => Some(RequestStatus::Timeout),
            RequestOutcome::Error => Some(RequestStatus::NetworkError),
            RequestOutcome::Abort => Some(RequestStatus::Abort),
        };
        self.finish_request(request, ctx);
    }

    /// The single completion path for a request. Its entry is released here, so
    /// later terminal reports are ignored.
    fn finish_request(&mut self, request: RequestId, ctx: &mut Ctx<'_>) {
        let now = ctx.env.now();
        let Some(TrackedRequest::Active(ActiveRequest {
            mut resource,
            folded,
        })) = self.requests.remove(&request)
        else {
            return;
        };
        if resource.status == Some(RequestStatus::OpenFailure) {
            self.requests.insert(request, TrackedRequest::OpenFailed);
        }

        if let Some(status) = resource.status.filter(|status| is_error(*status)) {
            ctx.effects.push(Effect::RequestFailed {
                url: resource.url.clone(),
                status,
            });
        }

        resource.timing.load_event_end = Some(now);
        if let Some(url) = resource.url.as_deref() {
            refine_from_provider(&mut resource.timing, url, now, ctx);
        }

        if let Some((id, slot)) = folded {
            let end = resource.timing.response_end.unwrap_or(now);
            if let Some(constituent) = self
                .event_mut(id)
                .and_then(|event| event.resources.get_mut(slot))
            {
                constituent.timing.response_start = resource.timing.response_start;
                constituent.timing.response_end = Some(end);
                if resource.timing.request_start.is_some() {
                    constituent.timing.request_start = resource.timing.request_start;
                }
            }
            self.load_finished(id, end, ctx);
            return;
        }

        if self.config.always_send_requests {
            // Detached from the overlap policy: the active interaction keeps receiving mutations.
            let id = self.push_event(resource);
            beacon_debug!("sending {:?} on its own as {:?}", request, id);
            self.send_event(id, ctx);
            return;
        }

        if !self.config.single_page_app || self.request_tracking {
            self.add_event(resource, ctx);
        } else {
            beacon_debug!("{:?} finished before request tracking started", request);
        }
    }
}

fn is_error(status: RequestStatus) -> bool {
    match status {
        RequestStatus::Http(code) => RequestStatus::from_http(code).is_some(),
        RequestStatus::Timeout
        | RequestStatus::Abort
        | RequestStatus::NetworkError
        | RequestStatus::OpenFailure => true,
    }
}

fn refine_from_provider(timing: &mut ResourceTiming, url: &str, now: Timestamp, ctx: &Ctx<'_>) {
    let Some(entry) = ctx
        .env
        .resource_timing(url)
        .into_iter()
        .max_by_key(|entry| entry.response_end)
    else {
        return;
    };
    if entry.response_end == 0 || entry.response_end > now {
        return;
    }
    timing.response_end = Some(entry.response_end);
    if entry.response_start != 0 {
        timing.response_start = Some(entry.response_start);
    }
    if entry.start_time != 0 {
        timing.request_start = Some(entry.start_time);
    }
}
