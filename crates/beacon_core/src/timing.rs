//! Back-end / front-end split for navigation beacons.

use beacon_logging::{beacon_debug, beacon_trace};

use crate::{
    ConstituentResource, Environment, InteractionKind, ResourceKind, ResourceTiming, SpaTimers,
    Timestamp,
};

/// Total length covered by `intervals`, counting overlaps once.
pub(crate) fn interval_union(intervals: &[(i64, i64)]) -> i64 {
    let mut sorted: Vec<(i64, i64)> = intervals
        .iter()
        .copied()
        .filter(|(start, end)| end > start)
        .collect();
    sorted.sort_unstable();

    let mut total = 0;
    let mut current: Option<(i64, i64)> = None;
    for (start, end) in sorted {
        current = match current {
            Some((open, close)) if start <= close => Some((open, close.max(end))),
            Some((open, close)) => {
                total += close - open;
                Some((start, end))
            }
            None => Some((start, end)),
        };
    }
    if let Some((open, close)) = current {
        total += close - open;
    }
    total
}

/// Computes the timers attached to a navigation record. Hard navigations may
/// copy the browser timeline into `timing`.
pub(crate) fn navigation_timers(
    kind: InteractionKind,
    timing: &mut ResourceTiming,
    resources: &[ConstituentResource],
    back_end_kinds: &[ResourceKind],
    env: &dyn Environment,
) -> Option<SpaTimers> {
    match kind {
        InteractionKind::HardNavigation => match env.navigation_timing() {
            Some(_) => hard_navigation_timers(timing, env),
            None => {
                beacon_trace!("no navigation timeline, using the soft computation");
                soft_navigation_timers(timing, resources, back_end_kinds, env)
            }
        },
        InteractionKind::SoftNavigation => {
            soft_navigation_timers(timing, resources, back_end_kinds, env)
        }
        InteractionKind::Click | InteractionKind::NetworkRequest => None,
    }
}

fn hard_navigation_timers(timing: &mut ResourceTiming, env: &dyn Environment) -> Option<SpaTimers> {
    let navigation = env.navigation_timing()?;
    let end = as_ms(timing.load_event_end?);
    timing.fetch_start = Some(navigation.fetch_start);
    timing.response_start = Some(navigation.response_start);

    let fetch_start = as_ms(navigation.fetch_start);
    let response_start = as_ms(navigation.response_start);
    checked(SpaTimers {
        back_end: response_start - fetch_start,
        front_end: end - response_start,
        total: end - fetch_start,
    })
}

fn soft_navigation_timers(
    timing: &ResourceTiming,
    resources: &[ConstituentResource],
    back_end_kinds: &[ResourceKind],
    env: &dyn Environment,
) -> Option<SpaTimers> {
    let start = as_ms(timing.request_start?);
    let end = as_ms(timing.load_event_end?);
    let total = end - start;

    let intervals: Vec<(i64, i64)> = resources
        .iter()
        .filter(|resource| back_end_kinds.contains(&resource.kind))
        .filter_map(|resource| resource_interval(resource, env))
        .map(|(from, to)| (from.max(start), to.min(end)))
        .filter(|(from, to)| to > from)
        .collect();
    let back_end = interval_union(&intervals);

    checked(SpaTimers {
        back_end,
        front_end: total - back_end,
        total,
    })
}

/// Prefers the provider's measurement of the fetch over the locally tracked one.
fn resource_interval(resource: &ConstituentResource, env: &dyn Environment) -> Option<(i64, i64)> {
    let measured = env
        .resource_timing(&resource.url)
        .into_iter()
        .filter(|entry| entry.start_time != 0 && entry.response_end != 0)
        .max_by_key(|entry| entry.response_end);
    if let Some(entry) = measured {
        return Some((as_ms(entry.start_time), as_ms(entry.response_end)));
    }
    let start = resource.timing.request_start?;
    let end = resource.timing.response_end?;
    Some((as_ms(start), as_ms(end)))
}

fn checked(timers: SpaTimers) -> Option<SpaTimers> {
    if timers.total < 0 || timers.back_end < 0 {
        beacon_debug!("discarding inconsistent navigation timers {:?}", timers);
        return None;
    }
    Some(timers)
}

fn as_ms(timestamp: Timestamp) -> i64 {
    i64::try_from(timestamp).unwrap_or(i64::MAX)
}
