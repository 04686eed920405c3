//! The collaborators an instance needs from its environment.
//!
//! The browser build implements [`Host`] over the DOM; tests use an
//! in-memory fake. All geometry is in CSS pixels.

use crate::config::ContentBounds;
use crate::error::RipplesError;
use crate::gpu::Gpu;

/// Element client size and its top-left corner in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ElementBox {
    pub page_left: f64,
    pub page_top: f64,
    pub client_width: f64,
    pub client_height: f64,
}

impl ElementBox {
    pub fn has_area(&self) -> bool {
        self.client_width > 0.0 && self.client_height > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub scroll_x: f64,
    pub scroll_y: f64,
    pub width: f64,
    pub height: f64,
}

/// Raw computed `background-*` values of the element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ComputedBackground {
    pub image: String,
    pub size: String,
    pub position: String,
    pub attachment: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClientRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerPosition {
    Client { x: f64, y: f64 },
    /// Fallback when the event only carries page coordinates.
    Page { x: f64, y: f64 },
}

/// Identifies one image request; only the latest ticket is honoured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageTicket(pub u64);

/// Where the drawing surface sits inside the element and how big it is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceLayout {
    pub pixel_width: u32,
    pub pixel_height: u32,
    /// `None` fills the element.
    pub placement: Option<ContentBounds>,
}

pub trait Host {
    type Gpu: Gpu;

    fn element_box(&self) -> ElementBox;
    fn viewport(&self) -> Viewport;
    fn computed_background(&self) -> ComputedBackground;
    /// Client rect of the drawing surface.
    fn surface_rect(&self) -> ClientRect;

    /// Creates the rendering context for the drawing surface.
    fn create_context(&mut self) -> Result<Self::Gpu, RipplesError>;
    fn layout_surface(&mut self, layout: SurfaceLayout);
    fn set_surface_visible(&mut self, visible: bool);

    /// Replaces the element's inline `background-image` with `none`.
    fn hide_css_background(&mut self);
    /// Puts back whatever inline `background-image` was there before.
    fn restore_css_background(&mut self);

    /// Starts loading `url`. The result arrives later through
    /// `Ripples::image_loaded` or `Ripples::image_failed` with `ticket`.
    fn load_image(&mut self, ticket: ImageTicket, url: &str, cross_origin: Option<&str>);

    fn attach_listeners(&mut self) -> Result<(), RipplesError>;
    fn observe_size(&mut self) -> Result<(), RipplesError>;
    /// Cancels listeners and observers and removes the surface.
    fn release(&mut self);
}
