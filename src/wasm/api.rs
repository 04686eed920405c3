//! JavaScript-facing API.

use std::cell::{OnceCell, RefCell};
use std::rc::Rc;

use tracing::{debug, error, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{HtmlCanvasElement, HtmlElement};

use super::dom::DomHost;
use super::webgl::WebGlGpu;
use super::render::{self, FrameLoop};
use super::logging;
use crate::capability::{self, Capabilities};
use crate::config::RipplesConfig;
use crate::engine::Ripples;
use crate::error::RipplesError;

thread_local! {
    static CAPABILITIES: OnceCell<Option<Capabilities>> = const { OnceCell::new() };
}

/// Probes once per page with a throwaway canvas.
fn capabilities() -> Option<Capabilities> {
    CAPABILITIES.with(|cell| cell.get_or_init(probe_page).clone())
}

fn probe_page() -> Option<Capabilities> {
    let document = web_sys::window()?.document()?;
    let canvas = document
        .create_element("canvas")
        .ok()?
        .dyn_into::<HtmlCanvasElement>()
        .ok()?;
    let mut gpu = WebGlGpu::from_canvas(&canvas).ok().flatten()?;
    capability::probe(&mut gpu)
}

fn to_js(err: RipplesError) -> JsValue {
    js_sys::Error::new(&err.to_string()).into()
}

/// Serializes any JS value through `JSON.stringify`.
fn to_json(value: &JsValue) -> Result<serde_json::Value, RipplesError> {
    if value.is_undefined() || value.is_null() {
        return Ok(serde_json::Value::Null);
    }
    let json: String = js_sys::JSON::stringify(value)
        .map_err(|_| RipplesError::InvalidConfig("value is not serializable".into()))?
        .into();
    serde_json::from_str(&json).map_err(|e| RipplesError::InvalidConfig(e.to_string()))
}

fn parse_options(options: &JsValue) -> Result<RipplesConfig, RipplesError> {
    if options.is_undefined() || options.is_null() {
        return Ok(RipplesConfig::default());
    }
    let json = js_sys::JSON::stringify(options)
        .map_err(|_| RipplesError::InvalidConfig("options are not serializable".into()))?;
    RipplesConfig::from_json(&String::from(json))
}

fn resolve_element(target: &JsValue) -> Result<HtmlElement, RipplesError> {
    if let Some(element) = target.dyn_ref::<HtmlElement>() {
        return Ok(element.clone());
    }
    let selector = target
        .as_string()
        .ok_or_else(|| RipplesError::ElementNotFound("expected a selector or an HTMLElement".into()))?;
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| RipplesError::Host("no document".into()))?;
    document
        .query_selector(&selector)
        .map_err(|_| RipplesError::ElementNotFound(format!("invalid selector `{selector}`")))?
        .and_then(|el| el.dyn_into::<HtmlElement>().ok())
        .ok_or(RipplesError::ElementNotFound(selector))
}

/// Whether this page can run the effect.
#[wasm_bindgen(js_name = isWebGLSupported)]
pub fn is_webgl_supported() -> bool {
    capabilities().is_some()
}

/// Ripple effect bound to one element.
///
/// On an unsupported platform, or when the element cannot be found, the
/// handle is inert and every method does nothing.
#[wasm_bindgen(js_name = Ripples)]
pub struct RipplesHandle {
    inner: Option<Rc<RefCell<Ripples<DomHost>>>>,
    frames: Option<FrameLoop>,
}

#[wasm_bindgen(js_class = Ripples)]
impl RipplesHandle {
    #[wasm_bindgen(constructor)]
    pub fn new(target: JsValue, options: JsValue) -> Result<RipplesHandle, JsValue> {
        logging::init();
        let inert = RipplesHandle {
            inner: None,
            frames: None,
        };

        let config = parse_options(&options).map_err(to_js)?;
        let Some(caps) = capabilities() else {
            error!("{}", RipplesError::UnsupportedPlatform("no renderable float texture format".into()));
            return Ok(inert);
        };
        let element = match resolve_element(&target) {
            Ok(element) => element,
            Err(err) => {
                error!("{err}");
                return Ok(inert);
            }
        };

        let host = DomHost::new(element).map_err(to_js)?;
        let slot = host.instance_slot();
        let ripples = Ripples::new(host, config, caps).map_err(to_js)?;
        let instance = Rc::new(RefCell::new(ripples));
        let _ = slot.set(Rc::downgrade(&instance));
        let frames = render::start(Rc::downgrade(&instance))?;

        Ok(RipplesHandle {
            inner: Some(instance),
            frames: Some(frames),
        })
    }

    /// Drops at `(x, y)` in element pixels.
    #[wasm_bindgen(js_name = drop)]
    pub fn drop_at(&self, x: f64, y: f64, radius: f64, strength: f64) -> Result<(), JsValue> {
        self.with(|r| r.drop(x, y, radius, strength).map_err(to_js))
            .unwrap_or(Ok(()))
    }

    pub fn pause(&self) {
        self.with(Ripples::pause);
    }

    pub fn play(&self) {
        self.with(Ripples::play);
    }

    pub fn show(&self) {
        self.with(Ripples::show);
    }

    pub fn hide(&self) {
        self.with(Ripples::hide);
    }

    /// Changes one option. Unknown and construction-only options are
    /// ignored with a warning.
    pub fn set(&self, property: &str, value: JsValue) {
        let value = match to_json(&value) {
            Ok(value) => value,
            Err(err) => {
                warn!(property, "{err}");
                return;
            }
        };
        // Rejected changes were already logged at WARN; `set` never throws.
        if let Some(Err(err)) = self.with(|r| r.set_property(property, &value)) {
            debug!(property, %err, "setting ignored");
        }
    }

    #[wasm_bindgen(js_name = updateSize)]
    pub fn update_size(&self) -> Result<(), JsValue> {
        self.with(|r| r.update_size().map_err(to_js))
            .unwrap_or(Ok(()))
    }

    pub fn destroy(&mut self) {
        self.with(Ripples::destroy);
        self.inner = None;
    }
}

impl RipplesHandle {
    /// Whether the animation loop is still scheduled or not yet freed.
    pub fn is_animating(&self) -> bool {
        self.frames.as_ref().is_some_and(FrameLoop::is_alive)
    }

    /// Runs `f` on the live instance. `None` for an inert or busy handle.
    fn with<T>(&self, f: impl FnOnce(&mut Ripples<DomHost>) -> T) -> Option<T> {
        let instance = self.inner.as_ref()?;
        match instance.try_borrow_mut() {
            Ok(mut ripples) => Some(f(&mut *ripples)),
            Err(_) => {
                warn!("ripples instance is busy");
                None
            }
        }
    }
}
