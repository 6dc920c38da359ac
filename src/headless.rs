//! In-memory document for running overlays without a browser.
//!
//! Nodes are plain indexes into a vector, geometry is whatever the caller sets, and events are
//! delivered synchronously by [`HeadlessDocument::resize`], [`HeadlessDocument::scroll_from`] and
//! [`HeadlessDocument::click`]. Scroll events from nested nodes do not bubble, so only listeners
//! registered with capture see them, as in a browser.

use crate::error::HostError;
use crate::overlay::{
    ClickOutcome, ClickTarget, GeometrySignal, LayerConfig, ListenerId, OverlayHost, OverlayNodes,
};
use crate::placement::{OverlayPositionStyle, Rect};
use crate::portal::PortalRegistry;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

pub type NodeId = usize;

const BODY: NodeId = 0;

#[derive(Debug, Default)]
struct Node {
    id_attr: Option<String>,
    parent: Option<NodeId>,
    rect: Option<Rect>,
    z_index: Option<i32>,
    background: Option<String>,
    style: Option<OverlayPositionStyle>,
}

enum Listener {
    Geometry {
        signal: GeometrySignal,
        capture: bool,
        callback: Rc<dyn Fn()>,
    },
    Click {
        layer: NodeId,
        callback: Rc<dyn Fn(ClickTarget) -> ClickOutcome>,
    },
}

pub struct HeadlessDocument {
    live: bool,
    content_size: (f64, f64),
    nodes: RefCell<Vec<Node>>,
    listeners: RefCell<BTreeMap<ListenerId, Listener>>,
    next_listener: Cell<ListenerId>,
    listener_budget: Cell<Option<usize>>,
    portals: PortalRegistry<NodeId>,
}

impl Default for HeadlessDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessDocument {
    /// A live document whose overlay containers measure 320x240.
    pub fn new() -> Self {
        Self::with_content_size(320.0, 240.0)
    }

    pub fn with_content_size(width: f64, height: f64) -> Self {
        HeadlessDocument {
            live: true,
            content_size: (width, height),
            nodes: RefCell::new(vec![Node::default()]),
            listeners: RefCell::new(BTreeMap::new()),
            next_listener: Cell::new(1),
            listener_budget: Cell::new(None),
            portals: PortalRegistry::new(),
        }
    }

    /// No live document, as during server-side rendering.
    pub fn without_document() -> Self {
        HeadlessDocument {
            live: false,
            ..Self::new()
        }
    }

    fn push_node(&self, node: Node) -> NodeId {
        let mut nodes = self.nodes.borrow_mut();
        nodes.push(node);
        nodes.len() - 1
    }

    /// Add an element under the body, e.g. an anchor.
    pub fn add_element(&self, rect: Option<Rect>) -> NodeId {
        self.push_node(Node {
            parent: Some(BODY),
            rect,
            ..Node::default()
        })
    }

    pub fn append_child(&self, parent: NodeId) -> NodeId {
        self.push_node(Node {
            parent: Some(parent),
            ..Node::default()
        })
    }

    pub fn set_rect(&self, node: NodeId, rect: Option<Rect>) {
        if let Some(n) = self.nodes.borrow_mut().get_mut(node) {
            n.rect = rect;
        }
    }

    pub fn children(&self, parent: NodeId) -> Vec<NodeId> {
        self.nodes
            .borrow()
            .iter()
            .enumerate()
            .filter(|(_, n)| n.parent == Some(parent))
            .map(|(id, _)| id)
            .collect()
    }

    fn is_attached(&self, node: NodeId) -> bool {
        let nodes = self.nodes.borrow();
        let mut current = node;
        loop {
            if current == BODY {
                return true;
            }
            match nodes.get(current).and_then(|n| n.parent) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    fn is_within(&self, node: NodeId, ancestor: NodeId) -> bool {
        let nodes = self.nodes.borrow();
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = nodes.get(id).and_then(|n| n.parent);
        }
        false
    }

    pub fn style_of(&self, node: NodeId) -> Option<OverlayPositionStyle> {
        self.nodes.borrow().get(node).and_then(|n| n.style)
    }

    pub fn container_css(&self, node: NodeId) -> Option<String> {
        self.style_of(node).map(|s| s.container_css())
    }

    pub fn z_index(&self, node: NodeId) -> Option<i32> {
        self.nodes.borrow().get(node).and_then(|n| n.z_index)
    }

    pub fn background(&self, node: NodeId) -> Option<String> {
        self.nodes
            .borrow()
            .get(node)
            .and_then(|n| n.background.clone())
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn capture_listener_count(&self, wanted: GeometrySignal) -> usize {
        self.listeners
            .borrow()
            .values()
            .filter(|l| {
                matches!(l, Listener::Geometry { signal, capture: true, .. } if *signal == wanted)
            })
            .count()
    }

    /// Let the next `n` registrations succeed and fail every one after them.
    pub fn fail_listeners_after(&self, n: usize) {
        self.listener_budget.set(Some(n));
    }

    fn geometry_callbacks(&self, wanted: GeometrySignal, capture_only: bool) -> Vec<Rc<dyn Fn()>> {
        self.listeners
            .borrow()
            .values()
            .filter_map(|l| match l {
                Listener::Geometry {
                    signal,
                    capture,
                    callback,
                } if *signal == wanted && (*capture || !capture_only) => Some(Rc::clone(callback)),
                _ => None,
            })
            .collect()
    }

    /// Window resize. Returns how many listeners ran.
    pub fn resize(&self) -> usize {
        let callbacks = self.geometry_callbacks(GeometrySignal::Resize, false);
        callbacks.iter().for_each(|cb| cb());
        callbacks.len()
    }

    /// Scroll of the document (`None`) or of a nested scroll container.
    pub fn scroll_from(&self, origin: Option<NodeId>) -> usize {
        let callbacks = self.geometry_callbacks(GeometrySignal::Scroll, origin.is_some());
        callbacks.iter().for_each(|cb| cb());
        callbacks.len()
    }

    /// Click on `node`. Returns the outcome of the overlay layer that contains it, if any.
    pub fn click(&self, node: NodeId) -> Option<ClickOutcome> {
        let handler = self
            .listeners
            .borrow()
            .values()
            .find_map(|l| match l {
                Listener::Click { layer, callback } if self.is_within(node, *layer) => {
                    Some((*layer, Rc::clone(callback)))
                }
                _ => None,
            });

        let (layer, callback) = handler?;
        let target = if node == layer {
            ClickTarget::Layer
        } else {
            ClickTarget::Content
        };
        Some(callback(target))
    }

    fn register(&self, event: &'static str, listener: Listener) -> Result<ListenerId, HostError> {
        if let Some(budget) = self.listener_budget.get() {
            if budget == 0 {
                return Err(HostError::Listener {
                    event,
                    reason: "listener budget exhausted".to_string(),
                });
            }
            self.listener_budget.set(Some(budget - 1));
        }

        let id = self.next_listener.get();
        self.next_listener.set(id + 1);
        self.listeners.borrow_mut().insert(id, listener);
        Ok(id)
    }
}

impl OverlayHost for HeadlessDocument {
    type Element = NodeId;

    fn body(&self) -> Option<NodeId> {
        self.live.then_some(BODY)
    }

    fn find_by_id(&self, id: &str) -> Option<NodeId> {
        let found = self
            .nodes
            .borrow()
            .iter()
            .position(|n| n.id_attr.as_deref() == Some(id));
        found.filter(|node| self.is_attached(*node))
    }

    fn create_portal_container(&self, body: &NodeId, id: &str) -> Result<NodeId, HostError> {
        Ok(self.push_node(Node {
            id_attr: Some(id.to_string()),
            parent: Some(*body),
            ..Node::default()
        }))
    }

    fn portals(&self) -> &PortalRegistry<NodeId> {
        &self.portals
    }

    fn create_layer(
        &self,
        portal: &NodeId,
        config: &LayerConfig<'_>,
    ) -> Result<OverlayNodes<NodeId>, HostError> {
        if !self.is_attached(*portal) {
            return Err(HostError::UnknownElement);
        }
        let layer = self.push_node(Node {
            parent: Some(*portal),
            z_index: Some(config.z_index),
            background: config.background.map(str::to_string),
            ..Node::default()
        });
        let (width, height) = self.content_size;
        let container = self.push_node(Node {
            parent: Some(layer),
            rect: Some(Rect::new(0.0, 0.0, width, height)),
            ..Node::default()
        });
        Ok(OverlayNodes { layer, container })
    }

    fn remove_node(&self, node: &NodeId) {
        if let Some(n) = self.nodes.borrow_mut().get_mut(*node) {
            n.parent = None;
        }
    }

    fn measure(&self, node: &NodeId) -> Option<Rect> {
        if !self.is_attached(*node) {
            return None;
        }
        self.nodes.borrow().get(*node).and_then(|n| n.rect)
    }

    fn apply_style(&self, nodes: &OverlayNodes<NodeId>, style: &OverlayPositionStyle) {
        if let Some(n) = self.nodes.borrow_mut().get_mut(nodes.container) {
            n.style = Some(*style);
        }
    }

    fn add_listener(
        &self,
        signal: GeometrySignal,
        callback: Rc<dyn Fn()>,
    ) -> Result<ListenerId, HostError> {
        self.register(
            signal.event_name(),
            Listener::Geometry {
                signal,
                capture: signal.uses_capture(),
                callback,
            },
        )
    }

    fn add_click_listener(
        &self,
        layer: &NodeId,
        callback: Rc<dyn Fn(ClickTarget) -> ClickOutcome>,
    ) -> Result<ListenerId, HostError> {
        self.register(
            "click",
            Listener::Click {
                layer: *layer,
                callback,
            },
        )
    }

    fn remove_listener(&self, id: ListenerId) {
        self.listeners.borrow_mut().remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_scroll_reaches_only_capture_listeners() {
        let doc = HeadlessDocument::new();
        let bubbling = doc.register(
            "scroll",
            Listener::Geometry {
                signal: GeometrySignal::Scroll,
                capture: false,
                callback: Rc::new(|| {}),
            },
        );
        assert!(bubbling.is_ok());
        doc.add_listener(GeometrySignal::Scroll, Rc::new(|| {}))
            .unwrap();

        let nested = doc.add_element(None);
        assert_eq!(doc.scroll_from(Some(nested)), 1);
        assert_eq!(doc.scroll_from(None), 2);
    }

    #[test]
    fn removed_nodes_do_not_measure() {
        let doc = HeadlessDocument::new();
        let node = doc.add_element(Some(Rect::new(1.0, 2.0, 3.0, 4.0)));
        assert!(doc.measure(&node).is_some());
        doc.remove_node(&node);
        assert!(doc.measure(&node).is_none());
    }
}
