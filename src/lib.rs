//! Water ripples over an element's CSS background.
//!
//! The engine is written against two traits: [`gpu::Gpu`], an explicit
//! rendering context, and [`host::Host`], the element and its page. The
//! browser build implements both over WebGL 1 and the DOM and exports a
//! `Ripples` class to JavaScript; [`gpu::HeadlessGpu`] runs the simulation in
//! software elsewhere.

pub mod background;
pub mod boundary;
pub mod capability;
pub mod compositor;
pub mod config;
pub mod css;
pub mod engine;
pub mod error;
pub mod gpu;
pub mod height_field;
pub mod host;
pub mod perturb;
pub mod program;
pub mod shaders;

pub use capability::{probe, Capabilities, NumericFormat};
pub use config::{ContentBounds, RipplesConfig, Setting, SettingError, Settings};
pub use engine::{Ripples, State};
pub use error::RipplesError;
pub use perturb::Gesture;

// Only compile wasm-specific code when targeting wasm32.

#[cfg(target_arch = "wasm32")]
mod wasm {
    use wasm_bindgen::prelude::*;

    mod api;
    mod dom;
    mod logging;
    mod render;
    mod webgl;

    pub use api::{is_webgl_supported, RipplesHandle};

    #[wasm_bindgen(start)]
    pub fn main() -> Result<(), JsValue> {
        logging::init();
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
pub use wasm::{is_webgl_supported, RipplesHandle};
