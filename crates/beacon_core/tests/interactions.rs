mod support;

use beacon_core::{
    EventId, InteractionKind, Mutation, NodeOutcome, NodeSnapshot, Phase, RequestOutcome, Signal,
};
use pretty_assertions::assert_eq;
use support::{init_logging, Harness};

fn added(nodes: Vec<NodeSnapshot>) -> Signal {
    Signal::Mutations(vec![Mutation::ChildList {
        added: nodes,
        removed: Vec::new(),
    }])
}

fn removed(nodes: Vec<NodeSnapshot>) -> Signal {
    Signal::Mutations(vec![Mutation::ChildList {
        added: Vec::new(),
        removed: nodes,
    }])
}

#[test]
fn click_that_loads_an_image_is_reported() {
    init_logging();
    let mut h = Harness::instrumented();

    h.at(0, Signal::Click);
    h.at(10, added(vec![NodeSnapshot::image(1, "/img/hero.png")]));
    assert_eq!(h.state.view().events[0].phase, Phase::Interesting);

    let watch = h.watch_for(1);
    h.at(
        200,
        Signal::NodeSettled {
            watch,
            outcome: NodeOutcome::Load,
        },
    );

    assert_eq!(h.records.len(), 1);
    let record = &h.records[0];
    assert_eq!(record.initiator, InteractionKind::Click);
    assert_eq!(
        record.url.as_deref(),
        Some("https://shop.example.com/img/hero.png")
    );
    assert_eq!(record.timing.request_start, Some(0));
    assert_eq!(record.timing.load_event_end, Some(200));
    assert_eq!(record.resources.len(), 1);
    assert_eq!(record.resources[0].timing.request_start, Some(10));
    assert_eq!(record.resources[0].timing.response_end, Some(200));
    assert!(record.timers.is_none());
    assert_eq!(h.state.watching(), 0);
    assert_eq!(h.armed_timers(), 0);
}

#[test]
fn completion_is_reported_once() {
    init_logging();
    let mut h = Harness::instrumented();

    h.at(0, Signal::Click);
    h.at(5, added(vec![NodeSnapshot::image(1, "https://cdn.example.com/a.png")]));
    let watch = h.watch_for(1);
    for outcome in [NodeOutcome::Load, NodeOutcome::Error, NodeOutcome::Load] {
        h.at(
            100,
            Signal::NodeSettled {
                watch,
                outcome,
            },
        );
    }
    h.advance_to(10_000);

    assert_eq!(h.records.len(), 1);
}

#[test]
fn click_without_resources_is_discarded() {
    init_logging();
    let mut h = Harness::instrumented();

    h.at(0, Signal::Click);
    h.at(20, added(vec![NodeSnapshot::element(7, Vec::new())]));
    h.advance_to(100);

    assert!(h.records.is_empty());
    assert_eq!(h.state.watching(), 0);
    assert!(h.state.view().events.is_empty());
}

#[test]
fn already_loaded_image_is_not_watched() {
    init_logging();
    let mut h = Harness::instrumented();

    h.at(0, Signal::Click);
    h.at(
        10,
        added(vec![NodeSnapshot::image(1, "/logo.png").loaded(640)]),
    );
    assert_eq!(h.state.view().events[0].nodes_to_wait, 0);
    assert!(h.watches.is_empty());

    h.advance_to(100);
    assert!(h.records.is_empty());
}

#[test]
fn placeholder_and_inert_images_are_ignored() {
    init_logging();
    let mut h = Harness::instrumented();

    let mut placeholder = NodeSnapshot::image(1, "https://shop.example.com/catalog/");
    placeholder.src_attribute = Some(String::new());

    h.at(0, Signal::Click);
    h.at(
        10,
        added(vec![
            placeholder,
            NodeSnapshot::image(2, "data:image/gif;base64,R0lGODlhAQABAAAAACw="),
            NodeSnapshot::script(3, "javascript:void(0)"),
        ]),
    );

    assert!(h.watches.is_empty());
    h.advance_to(100);
    assert!(h.records.is_empty());
}

#[test]
fn descendant_images_of_added_elements_are_watched() {
    init_logging();
    let mut h = Harness::instrumented();

    h.at(0, Signal::Click);
    h.at(
        10,
        added(vec![NodeSnapshot::element(
            1,
            vec![
                NodeSnapshot::image(2, "/a.png"),
                NodeSnapshot::image(3, "/a.png"),
                NodeSnapshot::image(4, "/b.png"),
            ],
        )]),
    );

    // Duplicate URLs are only watched once.
    assert_eq!(h.state.view().events[0].nodes_to_wait, 2);
}

#[test]
fn removed_frame_completes_its_slot() {
    init_logging();
    let mut h = Harness::instrumented();

    h.at(0, Signal::Click);
    h.at(
        10,
        added(vec![
            NodeSnapshot::image(1, "/a.png"),
            NodeSnapshot::iframe(2, "/widget.html"),
        ]),
    );
    let image = h.watch_for(1);
    h.at(
        50,
        Signal::NodeSettled {
            watch: image,
            outcome: NodeOutcome::Load,
        },
    );
    assert!(h.records.is_empty());

    h.at(80, removed(vec![NodeSnapshot::iframe(2, "/widget.html")]));

    assert_eq!(h.records.len(), 1);
    assert_eq!(h.records[0].resources[1].timing.response_end, Some(80));
    assert_eq!(h.records[0].timing.load_event_end, Some(80));
}

#[test]
fn stalled_click_is_discarded() {
    init_logging();
    let mut h = Harness::instrumented();

    h.at(0, Signal::Click);
    h.at(10, added(vec![NodeSnapshot::image(1, "/slow.png")]));
    h.advance_to(5_000);

    assert!(h.records.is_empty());
    assert_eq!(h.state.watching(), 0);
}

#[test]
fn unresolved_click_yields_to_network_request() {
    init_logging();
    let mut h = Harness::instrumented();

    h.at(0, Signal::Click);
    h.advance_to(10);
    h.open_and_send(1, "/api/cart");
    h.at(30, Signal::RequestEnded {
        request: beacon_core::RequestId(1),
        outcome: RequestOutcome::Load { http_status: 200 },
    });
    h.advance_to(1_000);

    assert_eq!(h.records.len(), 1);
    assert_eq!(h.records[0].initiator, InteractionKind::NetworkRequest);
    assert_eq!(
        h.records[0].url.as_deref(),
        Some("https://shop.example.com/api/cart")
    );
}

#[test]
fn resolved_click_keeps_finishing_alongside_request() {
    init_logging();
    let mut h = Harness::instrumented();

    h.at(0, Signal::Click);
    h.at(5, added(vec![NodeSnapshot::image(1, "/a.png")]));
    h.advance_to(10);
    h.open_and_send(1, "/api/cart");
    h.at(20, Signal::RequestEnded {
        request: beacon_core::RequestId(1),
        outcome: RequestOutcome::Load { http_status: 200 },
    });
    let watch = h.watch_for(1);
    h.at(
        40,
        Signal::NodeSettled {
            watch,
            outcome: NodeOutcome::Load,
        },
    );
    h.advance_to(1_000);

    let initiators: Vec<InteractionKind> =
        h.records.iter().map(|record| record.initiator).collect();
    assert_eq!(
        initiators,
        vec![InteractionKind::Click, InteractionKind::NetworkRequest]
    );
}

#[test]
fn active_request_rejects_clicks() {
    init_logging();
    let mut h = Harness::instrumented();

    h.open_and_send(1, "/api/search");
    h.at(10, Signal::RequestEnded {
        request: beacon_core::RequestId(1),
        outcome: RequestOutcome::Load { http_status: 200 },
    });
    h.at(20, Signal::Click);

    assert_eq!(h.state.view().events.len(), 1);
    assert_eq!(h.state.view().events[0].kind, InteractionKind::NetworkRequest);
}

#[test]
fn closed_gate_defers_delivery_until_it_opens() {
    init_logging();
    let mut h = Harness::instrumented();
    h.env.gate_open.set(false);

    h.at(0, Signal::Click);
    h.at(5, added(vec![NodeSnapshot::image(1, "/a.png")]));
    let watch = h.watch_for(1);
    h.at(
        100,
        Signal::NodeSettled {
            watch,
            outcome: NodeOutcome::Load,
        },
    );
    h.advance_to(10_100);
    assert!(h.records.is_empty());
    let view = h.state.view();
    assert!(view.event(EventId(0)).is_some_and(|event| event.held));
    assert_eq!(view.watching, 0);

    h.env.gate_open.set(true);
    h.advance_to(15_100);

    assert_eq!(h.records.len(), 1);
    assert_eq!(h.records[0].timing.load_event_end, Some(100));
    assert_eq!(h.armed_timers(), 0);
}

#[test]
fn uninstrumented_clicks_are_ignored() {
    init_logging();
    let mut h = Harness::instrumented();
    h.send(Signal::Uninstrument);

    h.at(0, Signal::Click);

    assert!(h.state.view().events.is_empty());
}

#[test]
fn observer_start_and_stop_are_idempotent() {
    init_logging();
    let mut h = Harness::instrumented();
    h.send(Signal::Instrument);
    assert_eq!(h.observer_starts, 1);

    h.send(Signal::PageUnload);
    h.send(Signal::PageUnload);
    assert_eq!(h.observer_stops, 1);
    assert!(!h.state.view().observer_running);
}

#[test]
fn image_whose_src_changed_is_watched_again() {
    init_logging();
    let mut h = Harness::instrumented();

    h.at(0, Signal::Click);
    h.at(10, added(vec![NodeSnapshot::image(1, "/slide-1.png")]));
    let first = h.watch_for(1);
    h.at(
        50,
        Signal::NodeSettled {
            watch: first,
            outcome: NodeOutcome::Load,
        },
    );
    assert_eq!(h.records.len(), 1);

    h.at(100, Signal::Click);
    h.at(
        110,
        Signal::Mutations(vec![Mutation::Attributes {
            target: NodeSnapshot::image(1, "/slide-2.png").loaded(800),
        }]),
    );
    let second = h.watch_for(1);
    assert_ne!(first, second);

    h.at(
        300,
        Signal::NodeSettled {
            watch: second,
            outcome: NodeOutcome::Error,
        },
    );
    assert_eq!(h.records.len(), 2);
    assert_eq!(
        h.records[1].url.as_deref(),
        Some("https://shop.example.com/slide-2.png")
    );
}

#[test]
fn detached_nodes_are_forgotten() {
    init_logging();
    let mut h = Harness::instrumented();

    h.at(0, Signal::Click);
    h.at(10, added(vec![NodeSnapshot::image(1, "/slide-1.png")]));
    let watch = h.watch_for(1);
    h.at(
        50,
        Signal::NodeSettled {
            watch,
            outcome: NodeOutcome::Load,
        },
    );
    assert_eq!(h.records.len(), 1);
    assert_eq!(h.state.view().remembered_nodes, 1);

    // Removed while nothing is being watched.
    h.at(
        500,
        removed(vec![NodeSnapshot::element(
            2,
            vec![NodeSnapshot::image(1, "/slide-1.png").loaded(800)],
        )]),
    );

    let view = h.state.view();
    assert_eq!(view.remembered_nodes, 0);
    assert_eq!(view.watched_nodes, 0);
    assert!(view.events.is_empty());
}
