//! Anchored overlay positioning.
//!
//! An [`Overlay`] renders a viewport-filling background layer with a floating container inside
//! it, attached to a shared portal container under the document body rather than to its
//! logical parent. Its position is re-derived through [`placement::resolve`] on mount and on
//! every resize or scroll signal until it is dropped.
//!
//! [`placement::resolve`]: crate::placement::resolve

use crate::error::HostError;
use crate::placement::{AnchorGeometry, Offsets, OverlayPositionStyle, Placement, Rect, resolve};
use crate::portal::{DEFAULT_CONTAINER_ID, PortalRegistry, attachment_point};
use std::cell::Cell;
use std::rc::Rc;

pub const DEFAULT_Z_INDEX: i32 = 100;

pub type ListenerId = u64;

/// Environment signals after which geometry may have changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GeometrySignal {
    Resize,
    Scroll,
}

impl GeometrySignal {
    pub fn event_name(self) -> &'static str {
        match self {
            GeometrySignal::Resize => "resize",
            GeometrySignal::Scroll => "scroll",
        }
    }

    /// Scroll must be observed in the capture phase so nested scroll containers are seen too.
    pub fn uses_capture(self) -> bool {
        matches!(self, GeometrySignal::Scroll)
    }
}

/// Which part of the overlay a click landed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClickTarget {
    Layer,
    Content,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClickOutcome {
    pub dismissed: bool,
    pub propagation_stopped: bool,
}

/// Background layer and the floating container inside it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OverlayNodes<E> {
    pub layer: E,
    pub container: E,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayerConfig<'a> {
    pub z_index: i32,
    pub background: Option<&'a str>,
}

/// Document the overlay renders into.
pub trait OverlayHost {
    type Element: Clone;

    /// Root new portal containers are appended to. `None` when there is no live document.
    fn body(&self) -> Option<Self::Element>;

    fn find_by_id(&self, id: &str) -> Option<Self::Element>;

    fn create_portal_container(
        &self,
        body: &Self::Element,
        id: &str,
    ) -> Result<Self::Element, HostError>;

    fn portals(&self) -> &PortalRegistry<Self::Element>;

    fn create_layer(
        &self,
        portal: &Self::Element,
        config: &LayerConfig<'_>,
    ) -> Result<OverlayNodes<Self::Element>, HostError>;

    /// Detach a node and everything below it.
    fn remove_node(&self, node: &Self::Element);

    fn measure(&self, node: &Self::Element) -> Option<Rect>;

    fn apply_style(&self, nodes: &OverlayNodes<Self::Element>, style: &OverlayPositionStyle);

    /// Register a document-wide listener. Hosts must honour [`GeometrySignal::uses_capture`].
    fn add_listener(
        &self,
        signal: GeometrySignal,
        callback: Rc<dyn Fn()>,
    ) -> Result<ListenerId, HostError>;

    fn add_click_listener(
        &self,
        layer: &Self::Element,
        callback: Rc<dyn Fn(ClickTarget) -> ClickOutcome>,
    ) -> Result<ListenerId, HostError>;

    fn remove_listener(&self, id: ListenerId);
}

/// Caller supplied configuration of one overlay.
#[derive(Clone, Debug)]
pub struct OverlayProps<E> {
    pub placement: Placement,
    pub anchor: Option<E>,
    pub offsets: Offsets,
    pub z_index: i32,
    pub overlay_color: Option<String>,
    pub container_id: String,
}

impl<E> Default for OverlayProps<E> {
    fn default() -> Self {
        OverlayProps {
            placement: Placement::Centered,
            anchor: None,
            offsets: Offsets::default(),
            z_index: DEFAULT_Z_INDEX,
            overlay_color: None,
            container_id: DEFAULT_CONTAINER_ID.to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeasurePhase {
    Unmeasured,
    Measured,
}

struct OverlayState<H: OverlayHost> {
    host: Rc<H>,
    placement: Placement,
    anchor: Option<H::Element>,
    offsets: Offsets,
    nodes: OverlayNodes<H::Element>,
    style: Cell<OverlayPositionStyle>,
    phase: Cell<MeasurePhase>,
    on_outside_click: Option<Box<dyn Fn()>>,
}

impl<H: OverlayHost> OverlayState<H> {
    fn reposition(&self) {
        let anchor = self.anchor.as_ref().and_then(|a| self.host.measure(a));
        let container = self.host.measure(&self.nodes.container);
        let geometry = match (anchor, container) {
            (Some(anchor), Some(container)) => Some(AnchorGeometry { anchor, container }),
            _ => None,
        };

        let style = resolve(self.placement, geometry.as_ref(), &self.offsets);
        self.host.apply_style(&self.nodes, &style);
        self.style.set(style);
        self.phase.set(MeasurePhase::Measured);
    }

    fn handle_click(&self, target: ClickTarget) -> ClickOutcome {
        let dismissed = match (&self.on_outside_click, target) {
            (Some(dismiss), ClickTarget::Layer) => {
                dismiss();
                true
            }
            _ => false,
        };
        ClickOutcome {
            dismissed,
            propagation_stopped: true,
        }
    }
}

/// Listeners and nodes an overlay acquired, released on drop.
struct Subscriptions<H: OverlayHost> {
    host: Rc<H>,
    listeners: Vec<ListenerId>,
    layer: Option<H::Element>,
}

impl<H: OverlayHost> Drop for Subscriptions<H> {
    fn drop(&mut self) {
        for id in self.listeners.drain(..) {
            self.host.remove_listener(id);
        }
        if let Some(layer) = self.layer.take() {
            self.host.remove_node(&layer);
        }
        log::trace!("Overlay released");
    }
}

/// A mounted overlay. Dropping it unmounts.
pub struct Overlay<H: OverlayHost> {
    state: Rc<OverlayState<H>>,
    subscriptions: Subscriptions<H>,
}

impl<H> Overlay<H>
where
    H: OverlayHost + 'static,
    H::Element: 'static,
{
    /// Mount an overlay into the host's portal container.
    ///
    /// Returns `Ok(None)` when the host has no live document. Anything acquired before a
    /// failure is released before the error is returned.
    pub fn mount(
        host: Rc<H>,
        props: OverlayProps<H::Element>,
        on_outside_click: Option<Box<dyn Fn()>>,
    ) -> Result<Option<Self>, HostError> {
        let Some(portal) = attachment_point(host.as_ref(), &props.container_id)? else {
            log::debug!("No document, overlay not rendered");
            return Ok(None);
        };

        let nodes = host.create_layer(
            &portal,
            &LayerConfig {
                z_index: props.z_index,
                background: props.overlay_color.as_deref(),
            },
        )?;
        let mut subscriptions = Subscriptions {
            host: Rc::clone(&host),
            listeners: Vec::new(),
            layer: Some(nodes.layer.clone()),
        };

        let hidden = OverlayPositionStyle::hidden(props.placement);
        host.apply_style(&nodes, &hidden);
        let state = Rc::new(OverlayState {
            host: Rc::clone(&host),
            placement: props.placement,
            anchor: props.anchor,
            offsets: props.offsets,
            nodes,
            style: Cell::new(hidden),
            phase: Cell::new(MeasurePhase::Unmeasured),
            on_outside_click,
        });
        state.reposition();

        for signal in [GeometrySignal::Resize, GeometrySignal::Scroll] {
            let weak = Rc::downgrade(&state);
            let id = host.add_listener(
                signal,
                Rc::new(move || {
                    if let Some(state) = weak.upgrade() {
                        state.reposition();
                    }
                }),
            )?;
            subscriptions.listeners.push(id);
        }

        let weak = Rc::downgrade(&state);
        let id = host.add_click_listener(
            &state.nodes.layer,
            Rc::new(move |target| match weak.upgrade() {
                Some(state) => state.handle_click(target),
                None => ClickOutcome {
                    dismissed: false,
                    propagation_stopped: true,
                },
            }),
        )?;
        subscriptions.listeners.push(id);

        log::debug!(
            "Overlay mounted in #{} ({}, z-index {})",
            props.container_id,
            props.placement,
            props.z_index
        );
        Ok(Some(Overlay {
            state,
            subscriptions,
        }))
    }
}

impl<H: OverlayHost> Overlay<H> {
    /// Re-read anchor and container geometry and re-apply the resolved style
    ///
    /// Resize and scroll signals call this on their own; callers only need it when geometry
    /// changes without either, e.g. after content inside the container was replaced.
    pub fn reposition(&self) {
        self.state.reposition();
    }

    /// Handle a click inside the overlay
    ///
    /// # Arguments
    /// * `target` - `Layer` for the background, `Content` for anything inside the container
    ///
    /// # Returns
    /// * `ClickOutcome` - `dismissed` only for a layer click with a dismiss callback;
    ///   `propagation_stopped` is always `true`
    pub fn handle_click(&self, target: ClickTarget) -> ClickOutcome {
        self.state.handle_click(target)
    }

    /// Style applied by the last reposition pass
    pub fn style(&self) -> OverlayPositionStyle {
        self.state.style.get()
    }

    pub fn phase(&self) -> MeasurePhase {
        self.state.phase.get()
    }

    pub fn nodes(&self) -> &OverlayNodes<H::Element> {
        &self.state.nodes
    }

    pub fn placement(&self) -> Placement {
        self.state.placement
    }

    /// Listeners this overlay holds on the host: resize, scroll and click
    pub fn listener_count(&self) -> usize {
        self.subscriptions.listeners.len()
    }

    /// Release every listener and detach the layer. Same as dropping the overlay.
    pub fn unmount(self) {
        drop(self);
    }
}
