//! Node inspection: decides which added or changed nodes an interaction waits on.

use beacon_logging::{beacon_debug, beacon_trace};

use crate::exclusion::{is_inert_url, resolve_url};
use crate::update::Ctx;
use crate::{
    ConstituentResource, CorrelatorState, Effect, EventId, Mutation, NodeHandle, NodeOutcome,
    NodeSnapshot, NodeTag, ResourceKind, ResourceTiming, WatchId,
};

/// Links a watched node to the interaction slot it reports into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NodeWatch {
    pub(crate) node: NodeHandle,
    pub(crate) event: EventId,
    pub(crate) slot: usize,
}

fn resource_kind(node: &NodeSnapshot) -> Option<ResourceKind> {
    match node.tag {
        NodeTag::Image => Some(ResourceKind::Image),
        NodeTag::Script => Some(ResourceKind::Script),
        NodeTag::Iframe => Some(ResourceKind::Frame),
        NodeTag::Link => {
            let stylesheet = node.rel.as_deref().is_some_and(|rel| {
                rel.split_whitespace()
                    .any(|token| token.eq_ignore_ascii_case("stylesheet"))
            });
            stylesheet.then_some(ResourceKind::Stylesheet)
        }
        NodeTag::Element | NodeTag::Text => None,
    }
}

impl CorrelatorState {
    pub(crate) fn mutation_batch(&mut self, batch: Vec<Mutation>, ctx: &mut Ctx<'_>) {
        self.forget_detached(&batch);
        if self.watching == 0 {
            return;
        }
        let Some(id) = self.current() else {
            return;
        };
        let now = ctx.env.now();
        if !batch.is_empty() {
            if let Some(event) = self.event_mut(id) {
                event.resource.timing.dom_complete = Some(now);
            }
        }

        let mut found = false;
        for mutation in batch {
            match mutation {
                Mutation::Attributes { target } => {
                    found |= self.wait_for_node(&target, id, ctx);
                }
                Mutation::ChildList { added, removed } => {
                    for node in &added {
                        found |= self.wait_for_node(node, id, ctx);
                    }
                    // Removed frames never fire load or error.
                    for node in removed.iter().filter(|node| node.tag == NodeTag::Iframe) {
                        self.node_removed(node.handle, ctx);
                    }
                }
            }
        }

        let Some(event) = self.event_mut(id) else {
            return;
        };
        if event.is_complete() {
            return;
        }
        if found {
            event.mark_interesting();
            let settle = self.config.settle_timeout_ms;
            self.arm_settle(id, settle, ctx);
        } else if !event.interesting {
            let kind = event.kind;
            let delay = self.detection_delay(kind);
            self.arm_settle(id, delay, ctx);
        }
    }

    /// Registers `node` (or its descendant images) on the interaction. Returns
    /// true when anything new is being waited on.
    pub(crate) fn wait_for_node(
        &mut self,
        node: &NodeSnapshot,
        id: EventId,
        ctx: &mut Ctx<'_>,
    ) -> bool {
        let Some(kind) = resource_kind(node) else {
            if node.tag != NodeTag::Element {
                return false;
            }
            let mut interesting = false;
            for image in &node.descendant_images {
                interesting |= self.wait_for_node(image, id, ctx);
            }
            return interesting;
        };

        let src_changed = self.settled_nodes.contains(&node.handle);
        if kind == ResourceKind::Image {
            if node.natural_width > 0 && !src_changed {
                beacon_trace!("image {:?} already loaded", node.handle);
                return false;
            }
            if node.src_attribute.as_deref() == Some("") {
                return false;
            }
        }

        let Some(raw) = node.url.as_deref().map(str::trim).filter(|url| !url.is_empty()) else {
            return false;
        };
        if is_inert_url(raw) {
            return false;
        }
        let page = ctx.env.page_url();
        let Some(url) = resolve_url(raw, page.as_ref()) else {
            return false;
        };
        let excluded = self.exclusions.excludes(&url);
        let url = url.to_string();
        let now = ctx.env.now();

        let Some(event) = self.event_mut(id) else {
            return false;
        };
        if event.seen_urls.contains(&url) {
            return false;
        }
        if event.resource.url.is_none()
            && matches!(kind, ResourceKind::Image | ResourceKind::Script)
        {
            if excluded {
                beacon_debug!("skipping excluded node url {}", url);
                return false;
            }
            event.resource.url = Some(url.clone());
        }

        let slot = event.resources.len();
        event.resources.push(ConstituentResource {
            kind,
            url: url.clone(),
            timing: ResourceTiming {
                request_start: Some(now),
                ..ResourceTiming::default()
            },
        });
        event.nodes_to_wait += 1;
        event.seen_urls.insert(url);

        let watch = WatchId(self.next_watch);
        self.next_watch += 1;
        self.watches.insert(
            watch,
            NodeWatch {
                node: node.handle,
                event: id,
                slot,
            },
        );
        self.settled_nodes.remove(&node.handle);
        ctx.effects.push(Effect::ListenNode {
            node: node.handle,
            watch,
        });
        true
    }

    /// Load, error and removal all land here; only the first report per watch counts.
    pub(crate) fn node_settled(&mut self, watch: WatchId, outcome: NodeOutcome, ctx: &mut Ctx<'_>) {
        let Some(record) = self.watches.remove(&watch) else {
            beacon_trace!("{:?} already settled, ignoring {:?}", watch, outcome);
            return;
        };
        let now = ctx.env.now();
        self.settled_nodes.insert(record.node);
        if let Some(resource) = self
            .event_mut(record.event)
            .and_then(|event| event.resources.get_mut(record.slot))
        {
            resource.timing.response_end = Some(now);
        }
        self.load_finished(record.event, now, ctx);
    }

    /// Detached nodes can no longer change `src`.
    fn forget_detached(&mut self, batch: &[Mutation]) {
        if self.settled_nodes.is_empty() {
            return;
        }
        for mutation in batch {
            let Mutation::ChildList { removed, .. } = mutation else {
                continue;
            };
            for node in removed {
                self.settled_nodes.remove(&node.handle);
                for image in &node.descendant_images {
                    self.settled_nodes.remove(&image.handle);
                }
            }
        }
    }

    fn node_removed(&mut self, node: NodeHandle, ctx: &mut Ctx<'_>) {
        let watches: Vec<WatchId> = self
            .watches
            .iter()
            .filter(|(_, record)| record.node == node)
            .map(|(watch, _)| *watch)
            .collect();
        for watch in watches {
            self.node_settled(watch, NodeOutcome::Removed, ctx);
        }
    }
}
