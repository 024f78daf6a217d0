use serde::{Deserialize, Serialize};

use crate::{EventId, NodeHandle, RequestId, TimerId, WatchId};

/// Every input the correlator reacts to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    /// Start observing the document and tracking requests and clicks.
    Instrument,
    /// Stop tracking new requests and clicks.
    Uninstrument,
    /// The page is going away; the observer is stopped.
    PageUnload,
    /// The user clicked or submitted a form.
    Click,
    /// A client-side route change started.
    RouteChange {
        url: Option<String>,
        /// Hold the beacon until `WaitComplete` for this interaction.
        #[serde(default)]
        wait: bool,
    },
    /// The initial document load of a single-page app.
    HardNavigation { url: Option<String> },
    /// One batch from the change observer.
    Mutations(Vec<Mutation>),
    /// A watched node fired load or error, or was removed.
    NodeSettled { watch: WatchId, outcome: NodeOutcome },
    RequestOpened {
        request: RequestId,
        method: String,
        url: String,
        asynchronous: Option<bool>,
    },
    /// Issuing the request threw.
    RequestOpenFailed { request: RequestId },
    RequestSent { request: RequestId },
    /// A ready-state transition of an asynchronous request.
    RequestProgress {
        request: RequestId,
        ready_state: u8,
        http_status: u16,
    },
    RequestEnded {
        request: RequestId,
        outcome: RequestOutcome,
    },
    TimerFired(TimerId),
    /// Releases a held interaction.
    WaitComplete(EventId),
    /// The document finished loading.
    DocumentLoaded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mutation {
    /// A `src` or `href` attribute changed on `target`.
    Attributes { target: NodeSnapshot },
    ChildList {
        added: Vec<NodeSnapshot>,
        removed: Vec<NodeSnapshot>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeOutcome {
    Load,
    Error,
    Removed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestOutcome {
    Load { http_status: u16 },
    Timeout,
    Error,
    Abort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeTag {
    Image,
    Script,
    Iframe,
    Link,
    /// Any other element; its descendant images are inspected.
    Element,
    Text,
}

/// What the host knew about a node when the mutation was observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub handle: NodeHandle,
    pub tag: NodeTag,
    /// Resolved `src` or `href`.
    pub url: Option<String>,
    /// The literal `src` attribute, when present.
    #[serde(default)]
    pub src_attribute: Option<String>,
    #[serde(default)]
    pub natural_width: u32,
    #[serde(default)]
    pub rel: Option<String>,
    #[serde(default)]
    pub descendant_images: Vec<NodeSnapshot>,
}

impl NodeSnapshot {
    fn resource(handle: u64, tag: NodeTag, url: &str) -> Self {
        Self {
            handle: NodeHandle(handle),
            tag,
            url: Some(url.to_string()),
            src_attribute: Some(url.to_string()),
            natural_width: 0,
            rel: None,
            descendant_images: Vec::new(),
        }
    }

    pub fn image(handle: u64, url: &str) -> Self {
        Self::resource(handle, NodeTag::Image, url)
    }

    pub fn script(handle: u64, url: &str) -> Self {
        Self::resource(handle, NodeTag::Script, url)
    }

    pub fn iframe(handle: u64, url: &str) -> Self {
        Self::resource(handle, NodeTag::Iframe, url)
    }

    pub fn stylesheet(handle: u64, url: &str) -> Self {
        let mut node = Self::resource(handle, NodeTag::Link, url);
        node.src_attribute = None;
        node.rel = Some("stylesheet".to_string());
        node
    }

    pub fn element(handle: u64, descendant_images: Vec<NodeSnapshot>) -> Self {
        Self {
            handle: NodeHandle(handle),
            tag: NodeTag::Element,
            url: None,
            src_attribute: None,
            natural_width: 0,
            rel: None,
            descendant_images,
        }
    }

    /// Marks an image as already decoded when observed.
    pub fn loaded(mut self, natural_width: u32) -> Self {
        self.natural_width = natural_width;
        self
    }
}
