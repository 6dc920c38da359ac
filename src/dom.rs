//! Browser host for overlays and downloads, built on `web-sys`.

use crate::download::{SaveSink, SavedArtifact};
use crate::error::HostError;
use crate::overlay::{
    ClickOutcome, ClickTarget, GeometrySignal, LayerConfig, ListenerId, OverlayHost, OverlayNodes,
};
use crate::placement::{OverlayPositionStyle, PositionRule, Rect};
use crate::portal::PortalRegistry;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::io;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen::closure::Closure;
use web_sys::{
    Blob, BlobPropertyBag, CssStyleDeclaration, Document, Element, Event, EventTarget,
    HtmlAnchorElement, HtmlElement, Url, Window,
};

/// Class marking the background layer; clicks whose target carries it are outside clicks.
pub const LAYER_CLASS: &str = "portalPopupOverlay";

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

thread_local! {
    static HOST: Rc<DomHost> = Rc::new(DomHost::new());
}

/// The page's host. One per document, so its portal registry is shared by every overlay.
pub fn host() -> Rc<DomHost> {
    HOST.with(Rc::clone)
}

struct Registration {
    target: EventTarget,
    event: &'static str,
    capture: bool,
    closure: Closure<dyn FnMut(Event)>,
}

pub struct DomHost {
    window: Option<Window>,
    document: Option<Document>,
    portals: PortalRegistry<Element>,
    listeners: RefCell<HashMap<ListenerId, Registration>>,
    // Closures removed while possibly running; freed on the next registration.
    retired: RefCell<Vec<Registration>>,
    next_id: Cell<ListenerId>,
}

fn create_err(what: &'static str) -> impl Fn(JsValue) -> HostError {
    move |err| HostError::CreateNode {
        what,
        reason: format!("{:?}", err),
    }
}

fn style_of(el: &Element) -> Option<CssStyleDeclaration> {
    el.dyn_ref::<HtmlElement>().map(HtmlElement::style)
}

fn set_props(style: &CssStyleDeclaration, props: &[(&str, Option<&str>)]) {
    for (name, value) in props {
        let _ = match value {
            Some(value) => style.set_property(name, value),
            None => style.remove_property(name).map(|_| ()),
        };
    }
}

impl Default for DomHost {
    fn default() -> Self {
        Self::new()
    }
}

impl DomHost {
    pub fn new() -> Self {
        let window = web_sys::window();
        let document = window.as_ref().and_then(Window::document);
        DomHost {
            window,
            document,
            portals: PortalRegistry::new(),
            listeners: RefCell::new(HashMap::new()),
            retired: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
        }
    }

    fn register(&self, registration: Registration) -> Result<ListenerId, HostError> {
        self.retired.borrow_mut().clear();

        registration
            .target
            .add_event_listener_with_callback_and_bool(
                registration.event,
                registration.closure.as_ref().unchecked_ref(),
                registration.capture,
            )
            .map_err(|err| HostError::Listener {
                event: registration.event,
                reason: format!("{:?}", err),
            })?;

        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.listeners.borrow_mut().insert(id, registration);
        Ok(id)
    }
}

impl OverlayHost for DomHost {
    type Element = Element;

    fn body(&self) -> Option<Element> {
        self.document.as_ref()?.body().map(Element::from)
    }

    fn find_by_id(&self, id: &str) -> Option<Element> {
        self.document.as_ref()?.get_element_by_id(id)
    }

    fn create_portal_container(&self, body: &Element, id: &str) -> Result<Element, HostError> {
        let document = self.document.as_ref().ok_or(HostError::UnknownElement)?;
        let div = document
            .create_element("div")
            .map_err(create_err("portal container"))?;
        div.set_id(id);
        body.append_child(&div)
            .map_err(create_err("portal container"))?;
        Ok(div)
    }

    fn portals(&self) -> &PortalRegistry<Element> {
        &self.portals
    }

    fn create_layer(
        &self,
        portal: &Element,
        config: &LayerConfig<'_>,
    ) -> Result<OverlayNodes<Element>, HostError> {
        let document = self.document.as_ref().ok_or(HostError::UnknownElement)?;
        let layer = document
            .create_element("div")
            .map_err(create_err("overlay layer"))?;
        layer.set_class_name(LAYER_CLASS);
        let container = document
            .create_element("div")
            .map_err(create_err("overlay container"))?;

        if let Some(style) = style_of(&layer) {
            let z_index = config.z_index.to_string();
            set_props(
                &style,
                &[
                    ("display", Some("flex")),
                    ("flex-direction", Some("column")),
                    ("position", Some("fixed")),
                    ("inset", Some("0")),
                    ("z-index", Some(z_index.as_str())),
                    ("opacity", Some("1")),
                    ("background-color", config.background),
                ],
            );
        }

        layer
            .append_child(&container)
            .map_err(create_err("overlay container"))?;
        portal
            .append_child(&layer)
            .map_err(create_err("overlay layer"))?;
        Ok(OverlayNodes { layer, container })
    }

    fn remove_node(&self, node: &Element) {
        node.remove();
    }

    fn measure(&self, node: &Element) -> Option<Rect> {
        if !node.is_connected() {
            return None;
        }
        let rect = node.get_bounding_client_rect();
        Some(Rect::new(rect.x(), rect.y(), rect.width(), rect.height()))
    }

    fn apply_style(&self, nodes: &OverlayNodes<Element>, style: &OverlayPositionStyle) {
        if let Some(layer) = style_of(&nodes.layer) {
            let (align, justify) = match style.rule {
                PositionRule::Aligned { alignment, .. } => (
                    Some(alignment.align.as_css()),
                    alignment.justify.map(|j| j.as_css()),
                ),
                PositionRule::Absolute { .. } => (None, None),
            };
            set_props(
                &layer,
                &[("align-items", align), ("justify-content", justify)],
            );
        }
        let _ = nodes
            .container
            .set_attribute("style", &style.container_css());
    }

    fn add_listener(
        &self,
        signal: GeometrySignal,
        callback: Rc<dyn Fn()>,
    ) -> Result<ListenerId, HostError> {
        let window = self.window.as_ref().ok_or_else(|| HostError::Listener {
            event: signal.event_name(),
            reason: "no window".to_string(),
        })?;
        let closure =
            Closure::wrap(Box::new(move |_: Event| callback()) as Box<dyn FnMut(Event)>);

        self.register(Registration {
            target: window.clone().into(),
            event: signal.event_name(),
            capture: signal.uses_capture(),
            closure,
        })
    }

    fn add_click_listener(
        &self,
        layer: &Element,
        callback: Rc<dyn Fn(ClickTarget) -> ClickOutcome>,
    ) -> Result<ListenerId, HostError> {
        let closure = Closure::wrap(Box::new(move |event: Event| {
            let on_layer = event
                .target()
                .and_then(|t| t.dyn_into::<Element>().ok())
                .is_some_and(|t| t.class_list().contains(LAYER_CLASS));
            let target = if on_layer {
                ClickTarget::Layer
            } else {
                ClickTarget::Content
            };
            if callback(target).propagation_stopped {
                event.stop_propagation();
            }
        }) as Box<dyn FnMut(Event)>);

        self.register(Registration {
            target: layer.clone().into(),
            event: "click",
            capture: false,
            closure,
        })
    }

    fn remove_listener(&self, id: ListenerId) {
        let Some(registration) = self.listeners.borrow_mut().remove(&id) else {
            return;
        };
        let _ = registration.target.remove_event_listener_with_callback_and_bool(
            registration.event,
            registration.closure.as_ref().unchecked_ref(),
            registration.capture,
        );
        self.retired.borrow_mut().push(registration);
    }
}

fn js_io(err: JsValue) -> io::Error {
    io::Error::other(format!("{:?}", err))
}

/// How long an object URL outlives the click that started its download.
pub const REVOKE_DELAY_MS: i32 = 40_000;

/// Hands the processed file to the browser through a temporary `download` link.
///
/// The object URL is revoked [`REVOKE_DELAY_MS`] after the click, not right away: browsers may
/// start reading it only after the click handler returns.
#[derive(Clone, Debug, Default)]
pub struct BlobDownload {
    pending: Rc<RefCell<Vec<String>>>,
}

impl BlobDownload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Object URLs handed out and not yet revoked.
    pub fn pending_urls(&self) -> Vec<String> {
        self.pending.borrow().clone()
    }

    fn revoke_later(&self, window: &Window, url: String) {
        self.pending.borrow_mut().push(url.clone());
        let pending = Rc::clone(&self.pending);
        let revoke = Closure::once_into_js(move || {
            let _ = Url::revoke_object_url(&url);
            pending.borrow_mut().retain(|u| *u != url);
        });

        if let Err(err) = window.set_timeout_with_callback_and_timeout_and_arguments_0(
            revoke.unchecked_ref(),
            REVOKE_DELAY_MS,
        ) {
            log::warn!("Could not schedule object URL revocation: {:?}", err);
        }
    }
}

impl SaveSink for BlobDownload {
    fn save(&mut self, suggested_name: &str, contents: &[u8]) -> io::Result<SavedArtifact> {
        let window = web_sys::window().ok_or_else(|| io::Error::other("no window"))?;
        let document = window
            .document()
            .ok_or_else(|| io::Error::other("no document"))?;
        let body = document
            .body()
            .ok_or_else(|| io::Error::other("document has no body"))?;

        let parts = js_sys::Array::new();
        parts.push(&js_sys::Uint8Array::from(contents));
        let options = BlobPropertyBag::new();
        options.set_type(XLSX_MIME);
        let blob = Blob::new_with_u8_array_sequence_and_options(&parts, &options).map_err(js_io)?;
        let url = Url::create_object_url_with_blob(&blob).map_err(js_io)?;

        let link: HtmlAnchorElement = document
            .create_element("a")
            .map_err(js_io)?
            .dyn_into()
            .map_err(|_| io::Error::other("anchor is not an HtmlAnchorElement"))?;
        link.set_href(&url);
        link.set_download(suggested_name);
        body.append_child(&link).map_err(js_io)?;
        link.click();
        link.remove();
        self.revoke_later(&window, url);

        log::info!("Download of {} started", suggested_name);
        Ok(SavedArtifact {
            file_name: suggested_name.to_string(),
            location: None,
            size: contents.len(),
        })
    }
}
