use std::time::Duration;

use beacon_core::{
    CorrelatorConfig, InteractionKind, RequestId, RequestOutcome, RequestStatus, Signal,
};
use beacon_runtime::{Collaborators, CorrelatorHandle};
use pretty_assertions::assert_eq;

fn init_logging() {
    beacon_logging::initialize_for_tests();
}

fn fast_config() -> CorrelatorConfig {
    CorrelatorConfig {
        short_timeout_ms: 5,
        settle_timeout_ms: 20,
        gate_retry_ms: 20,
        ..CorrelatorConfig::default()
    }
}

fn finished_request(handle: &CorrelatorHandle, request: u64, outcome: RequestOutcome) {
    handle.send(Signal::RequestOpened {
        request: RequestId(request),
        method: "GET".to_string(),
        url: format!("https://api.example.com/items/{request}"),
        asynchronous: Some(true),
    });
    handle.send(Signal::RequestSent {
        request: RequestId(request),
    });
    handle.send(Signal::RequestEnded {
        request: RequestId(request),
        outcome,
    });
}

#[test]
fn request_beacon_arrives_after_the_detection_window() {
    init_logging();
    let handle =
        CorrelatorHandle::spawn(fast_config(), Collaborators::default()).expect("spawn");

    assert!(handle.send(Signal::Instrument));
    finished_request(&handle, 1, RequestOutcome::Timeout);

    let record = handle
        .recv_timeout(Duration::from_secs(5))
        .expect("request beacon");
    assert_eq!(record.initiator, InteractionKind::NetworkRequest);
    assert_eq!(record.status, Some(RequestStatus::Timeout));
    assert_eq!(
        record.url.as_deref(),
        Some("https://api.example.com/items/1")
    );
    assert!(handle.try_recv().is_none());

    handle.shutdown();
}

#[test]
fn view_reflects_processed_signals() {
    init_logging();
    let handle = CorrelatorHandle::spawn(
        CorrelatorConfig {
            settle_timeout_ms: 60_000,
            ..fast_config()
        },
        Collaborators::default(),
    )
    .expect("spawn");

    handle.send(Signal::Instrument);
    handle.send(Signal::RouteChange {
        url: Some("/inbox".to_string()),
        wait: false,
    });

    let view = handle.view().expect("view");
    assert!(view.instrumented);
    assert!(view.observer_running);
    assert_eq!(view.watching, 1);
    assert_eq!(view.events[0].kind, InteractionKind::SoftNavigation);
    assert_eq!(view.armed_timers, 1);
}

#[test]
fn navigation_beacon_carries_timers() {
    init_logging();
    let handle =
        CorrelatorHandle::spawn(fast_config(), Collaborators::default()).expect("spawn");

    handle.send(Signal::Instrument);
    handle.send(Signal::RouteChange {
        url: Some("/settings".to_string()),
        wait: false,
    });

    let record = handle
        .recv_timeout(Duration::from_secs(5))
        .expect("navigation beacon");
    assert_eq!(record.initiator, InteractionKind::SoftNavigation);
    let timers = record.timers.expect("timers");
    assert_eq!(timers.back_end, 0);
    assert_eq!(timers.front_end, timers.total);
}
