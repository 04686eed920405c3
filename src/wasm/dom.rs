use std::cell::{OnceCell, RefCell};
use std::rc::{Rc, Weak};

use tracing::{error, warn};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{
    AbortController, AddEventListenerOptions, Document, Event, HtmlCanvasElement, HtmlElement,
    HtmlImageElement, MouseEvent, ResizeObserver, TouchEvent, Window,
};

use super::webgl::WebGlGpu;
use crate::engine::Ripples;
use crate::error::RipplesError;
use crate::host::{
    ClientRect, ComputedBackground, ElementBox, Host, ImageTicket, PointerPosition, SurfaceLayout,
    Viewport,
};
use crate::perturb::Gesture;

/// Late-bound back reference from DOM callbacks to their instance.
pub type InstanceSlot = Rc<OnceCell<Weak<RefCell<Ripples<DomHost>>>>>;

/// Runs `f` on the instance if it is still alive and not already borrowed.
pub fn with_instance(slot: &InstanceSlot, f: impl FnOnce(&mut Ripples<DomHost>)) {
    let Some(instance) = slot.get().and_then(Weak::upgrade) else {
        return;
    };
    let Ok(mut ripples) = instance.try_borrow_mut() else {
        return;
    };
    f(&mut *ripples);
}

pub(crate) fn js_error(err: JsValue) -> RipplesError {
    RipplesError::Host(format!("{err:?}"))
}

type EventClosure = Closure<dyn FnMut(Event)>;

/// [`Host`] over a DOM element and a canvas appended to it.
pub struct DomHost {
    window: Window,
    element: HtmlElement,
    canvas: HtmlCanvasElement,
    abort: AbortController,
    observer: Option<ResizeObserver>,
    instance: InstanceSlot,
    listeners: Vec<EventClosure>,
    resize_callback: Option<Closure<dyn FnMut()>>,
    image: Option<HtmlImageElement>,
    image_callbacks: Vec<Closure<dyn FnMut()>>,
    saved_background_image: Option<String>,
    released: bool,
}

impl DomHost {
    pub fn new(element: HtmlElement) -> Result<Self, RipplesError> {
        let window = web_sys::window().ok_or_else(|| RipplesError::Host("no window".into()))?;
        let document: Document = window
            .document()
            .ok_or_else(|| RipplesError::Host("no document".into()))?;
        let canvas = document
            .create_element("canvas")
            .map_err(js_error)?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| RipplesError::Host("canvas is not an HtmlCanvasElement".into()))?;

        let computed = window.get_computed_style(&element).ok().flatten();
        let computed_value = |name: &str| {
            computed
                .as_ref()
                .and_then(|style| style.get_property_value(name).ok())
                .unwrap_or_default()
        };
        let element_style = element.style();
        if computed_value("position") == "static" {
            element_style.set_property("position", "relative").map_err(js_error)?;
        }
        if computed_value("z-index") == "auto" {
            element_style.set_property("z-index", "0").map_err(js_error)?;
        }

        let style = canvas.style();
        style.set_property("position", "absolute").map_err(js_error)?;
        style.set_property("z-index", "-1").map_err(js_error)?;
        style.set_property("pointer-events", "none").map_err(js_error)?;
        element.append_child(&canvas).map_err(js_error)?;

        Ok(Self {
            window,
            element,
            canvas,
            abort: AbortController::new().map_err(js_error)?,
            observer: None,
            instance: Rc::new(OnceCell::new()),
            listeners: Vec::new(),
            resize_callback: None,
            image: None,
            image_callbacks: Vec::new(),
            saved_background_image: None,
            released: false,
        })
    }

    pub fn instance_slot(&self) -> InstanceSlot {
        self.instance.clone()
    }

    fn listen(
        &mut self,
        target: &web_sys::EventTarget,
        kind: &str,
        handler: impl FnMut(Event) + 'static,
    ) -> Result<(), RipplesError> {
        let closure: EventClosure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
        let options = AddEventListenerOptions::new();
        options.set_signal(&self.abort.signal());
        target
            .add_event_listener_with_callback_and_add_event_listener_options(
                kind,
                closure.as_ref().unchecked_ref(),
                &options,
            )
            .map_err(js_error)?;
        self.listeners.push(closure);
        Ok(())
    }

    fn pointer_listener(&mut self, kind: &str, gesture: Gesture) -> Result<(), RipplesError> {
        let slot = self.instance.clone();
        let element = self.element.clone();
        self.listen(&element, kind, move |event: Event| {
            let positions = pointer_positions(&event);
            with_instance(&slot, |ripples| {
                for position in positions {
                    if let Err(err) = ripples.pointer(gesture, position) {
                        error!(error = %err, "pointer drop failed");
                    }
                }
            });
        })
    }

    fn clear_image_handlers(&mut self) {
        if let Some(image) = self.image.take() {
            image.set_onload(None);
            image.set_onerror(None);
        }
        self.image_callbacks.clear();
    }

    fn style_property(&self, name: &str, value: &str) {
        if let Err(err) = self.canvas.style().set_property(name, value) {
            warn!(property = name, error = ?err, "failed to style canvas");
        }
    }
}

/// Every contact point an event carries.
fn pointer_positions(event: &Event) -> Vec<PointerPosition> {
    if let Some(touch) = event.dyn_ref::<TouchEvent>() {
        let touches = touch.changed_touches();
        return (0..touches.length())
            .filter_map(|i| touches.get(i))
            .map(|t| PointerPosition::Client {
                x: t.client_x() as f64,
                y: t.client_y() as f64,
            })
            .collect();
    }
    if let Some(mouse) = event.dyn_ref::<MouseEvent>() {
        return vec![PointerPosition::Client {
            x: mouse.client_x() as f64,
            y: mouse.client_y() as f64,
        }];
    }
    Vec::new()
}

impl Host for DomHost {
    type Gpu = WebGlGpu;

    fn element_box(&self) -> ElementBox {
        let rect = self.element.get_bounding_client_rect();
        let viewport = self.viewport();
        ElementBox {
            page_left: rect.left() + viewport.scroll_x,
            page_top: rect.top() + viewport.scroll_y,
            client_width: self.element.client_width() as f64,
            client_height: self.element.client_height() as f64,
        }
    }

    fn viewport(&self) -> Viewport {
        let number = |v: Result<JsValue, JsValue>| v.ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
        Viewport {
            scroll_x: self.window.scroll_x().unwrap_or(0.0),
            scroll_y: self.window.scroll_y().unwrap_or(0.0),
            width: number(self.window.inner_width()),
            height: number(self.window.inner_height()),
        }
    }

    fn computed_background(&self) -> ComputedBackground {
        let Some(style) = self.window.get_computed_style(&self.element).ok().flatten() else {
            return ComputedBackground::default();
        };
        let value = |name: &str| style.get_property_value(name).unwrap_or_default();
        ComputedBackground {
            image: value("background-image"),
            size: value("background-size"),
            position: value("background-position"),
            attachment: value("background-attachment"),
        }
    }

    fn surface_rect(&self) -> ClientRect {
        let rect = self.canvas.get_bounding_client_rect();
        ClientRect {
            left: rect.left(),
            top: rect.top(),
            width: rect.width(),
            height: rect.height(),
        }
    }

    fn create_context(&mut self) -> Result<WebGlGpu, RipplesError> {
        WebGlGpu::from_canvas(&self.canvas)
            .map_err(js_error)?
            .ok_or_else(|| RipplesError::UnsupportedPlatform("no WebGL context".into()))
    }

    fn layout_surface(&mut self, layout: SurfaceLayout) {
        self.canvas.set_width(layout.pixel_width);
        self.canvas.set_height(layout.pixel_height);
        let (left, top, width, height) = match layout.placement {
            None => (0.0, 0.0, 100.0, 100.0),
            Some(b) => (b.x, b.y, b.width, b.height),
        };
        self.style_property("left", &format!("{left}%"));
        self.style_property("top", &format!("{top}%"));
        self.style_property("width", &format!("{width}%"));
        self.style_property("height", &format!("{height}%"));
    }

    fn set_surface_visible(&mut self, visible: bool) {
        self.style_property("display", if visible { "" } else { "none" });
    }

    fn hide_css_background(&mut self) {
        let style = self.element.style();
        if self.saved_background_image.is_none() {
            self.saved_background_image =
                Some(style.get_property_value("background-image").unwrap_or_default());
        }
        if let Err(err) = style.set_property("background-image", "none") {
            warn!(error = ?err, "failed to hide css background");
        }
    }

    fn restore_css_background(&mut self) {
        let Some(saved) = self.saved_background_image.take() else {
            return;
        };
        let style = self.element.style();
        let result = if saved.is_empty() {
            style.remove_property("background-image").map(|_| ())
        } else {
            style.set_property("background-image", &saved)
        };
        if let Err(err) = result {
            warn!(error = ?err, "failed to restore css background");
        }
    }

    fn load_image(&mut self, ticket: ImageTicket, url: &str, cross_origin: Option<&str>) {
        self.clear_image_handlers();
        let image = match HtmlImageElement::new() {
            Ok(image) => image,
            Err(err) => {
                error!(error = ?err, "failed to create image element");
                return;
            }
        };
        image.set_cross_origin(cross_origin);

        let onload = {
            let slot = self.instance.clone();
            let image = image.clone();
            Closure::wrap(Box::new(move || {
                with_instance(&slot, |ripples| {
                    if let Err(err) = ripples.image_loaded(ticket, &image) {
                        error!(error = %err, "failed to upload background image");
                    }
                });
            }) as Box<dyn FnMut()>)
        };
        let onerror = {
            let slot = self.instance.clone();
            Closure::wrap(Box::new(move || {
                with_instance(&slot, |ripples| {
                    if let Err(err) = ripples.image_failed(ticket) {
                        error!(error = %err, "failed to reset background");
                    }
                });
            }) as Box<dyn FnMut()>)
        };
        image.set_onload(Some(onload.as_ref().unchecked_ref()));
        image.set_onerror(Some(onerror.as_ref().unchecked_ref()));
        image.set_src(url);

        self.image_callbacks.push(onload);
        self.image_callbacks.push(onerror);
        self.image = Some(image);
    }

    fn attach_listeners(&mut self) -> Result<(), RipplesError> {
        self.pointer_listener("mousemove", Gesture::Move)?;
        self.pointer_listener("touchmove", Gesture::Move)?;
        self.pointer_listener("mousedown", Gesture::Press)?;
        self.pointer_listener("touchstart", Gesture::Press)?;

        let slot = self.instance.clone();
        let window = self.window.clone();
        self.listen(&window, "resize", move |_| {
            with_instance(&slot, |ripples| {
                if let Err(err) = ripples.update_size() {
                    error!(error = %err, "resize failed");
                }
            });
        })
    }

    fn observe_size(&mut self) -> Result<(), RipplesError> {
        let slot = self.instance.clone();
        let callback = Closure::wrap(Box::new(move || {
            with_instance(&slot, |ripples| {
                if let Err(err) = ripples.update_size() {
                    error!(error = %err, "deferred initialization failed");
                }
            });
        }) as Box<dyn FnMut()>);
        let observer = ResizeObserver::new(callback.as_ref().unchecked_ref()).map_err(js_error)?;
        observer.observe(&self.element);
        self.observer = Some(observer);
        self.resize_callback = Some(callback);
        Ok(())
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.abort.abort();
        if let Some(observer) = self.observer.take() {
            observer.disconnect();
        }
        self.clear_image_handlers();
        self.canvas.remove();
        self.listeners.clear();
        self.resize_callback = None;
    }
}

impl Drop for DomHost {
    fn drop(&mut self) {
        self.release();
    }
}
