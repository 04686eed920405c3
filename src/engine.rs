//! The ripples instance: lifecycle, frame order and public operations.

use std::mem;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::background::BackgroundSurface;
use crate::boundary::{self, BoundaryInputs, BoundaryRect};
use crate::capability::Capabilities;
use crate::compositor::{self, CompositeParams};
use crate::config::{RipplesConfig, Setting, SettingError, Settings};
use crate::css::{self, BackgroundRules};
use crate::error::RipplesError;
use crate::gpu::{FullscreenQuad, Gpu};
use crate::height_field::HeightField;
use crate::host::{Host, ImageTicket, PointerPosition, SurfaceLayout};
use crate::perturb::{self, Gesture, Impulse};
use crate::program::Programs;

/// Observable lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Waiting for the element to get a non-zero size.
    Pending,
    Initializing,
    Running,
    Destroyed,
}

/// GPU resources owned by a running instance.
struct Scene<G: Gpu> {
    gpu: G,
    quad: FullscreenQuad<G>,
    field: HeightField<G>,
    programs: Programs<G>,
    background: BackgroundSurface<G>,
}

impl<G: Gpu> Scene<G> {
    fn build(mut gpu: G, caps: &Capabilities, resolution: u32) -> Result<Self, RipplesError> {
        for ext in &caps.extensions {
            if !gpu.enable_extension(*ext) {
                warn!(extension = ext.name(), "extension unavailable on rendering context");
            }
        }
        let quad = FullscreenQuad::new(&mut gpu)?;
        let field = match HeightField::new(&mut gpu, caps, resolution) {
            Ok(field) => field,
            Err(err) => {
                quad.release(&mut gpu);
                return Err(err.into());
            }
        };
        let programs = match Programs::compile_all(&mut gpu, resolution) {
            Ok(programs) => programs,
            Err(err) => {
                field.release(&mut gpu);
                quad.release(&mut gpu);
                return Err(err);
            }
        };
        let background = match BackgroundSurface::new(&mut gpu) {
            Ok(background) => background,
            Err(err) => {
                programs.release(&mut gpu);
                field.release(&mut gpu);
                quad.release(&mut gpu);
                return Err(err.into());
            }
        };
        Ok(Self {
            gpu,
            quad,
            field,
            programs,
            background,
        })
    }

    fn release(self) -> G {
        let Scene {
            mut gpu,
            quad,
            field,
            programs,
            background,
        } = self;
        background.release(&mut gpu);
        programs.release(&mut gpu);
        field.release(&mut gpu);
        quad.release(&mut gpu);
        gpu
    }
}

enum Lifecycle<G: Gpu> {
    Pending,
    Initializing,
    Running(Box<Scene<G>>),
    Destroyed,
}

pub struct Ripples<H: Host> {
    host: H,
    capabilities: Capabilities,
    resolution: u32,
    settings: Settings,
    lifecycle: Lifecycle<H::Gpu>,
    layout: SurfaceLayout,
    visible: bool,
    running: bool,
    /// Set by `pause`, cleared by `play`. Survives deferred initialization.
    paused: bool,
    listeners_attached: bool,
    /// `url()` of the element's own background, captured at initialization.
    original_css_image: Option<String>,
    image_source: Option<String>,
    pending_image: Option<ImageTicket>,
    next_ticket: u64,
    css_hidden: bool,
    released_gpu: Option<H::Gpu>,
}

impl<H: Host> Ripples<H> {
    /// Creates an instance. Initialization is deferred while the element has
    /// no area and completes on the first `update_size` that finds one.
    pub fn new(host: H, config: RipplesConfig, capabilities: Capabilities) -> Result<Self, RipplesError> {
        config.validate()?;
        let (resolution, settings) = config.into_parts();
        let mut ripples = Self {
            host,
            capabilities,
            resolution,
            settings,
            lifecycle: Lifecycle::Pending,
            layout: SurfaceLayout {
                pixel_width: 0,
                pixel_height: 0,
                placement: None,
            },
            visible: true,
            running: false,
            paused: false,
            listeners_attached: false,
            original_css_image: None,
            image_source: None,
            pending_image: None,
            next_ticket: 0,
            css_hidden: false,
            released_gpu: None,
        };
        ripples.host.observe_size()?;
        if ripples.host.element_box().has_area() {
            ripples.complete_init()?;
        } else {
            debug!("element has no size yet, deferring initialization");
        }
        Ok(ripples)
    }

    /// Builds GPU state for a pending instance. Does nothing in any other state.
    pub fn complete_init(&mut self) -> Result<(), RipplesError> {
        if !matches!(self.lifecycle, Lifecycle::Pending) {
            return Ok(());
        }
        self.lifecycle = Lifecycle::Initializing;

        self.original_css_image = css::extract_url(&self.host.computed_background().image);
        self.layout = boundary::surface_layout(&self.host.element_box(), self.settings.content_bounds);
        self.host.layout_surface(self.layout);

        let scene = self
            .host
            .create_context()
            .and_then(|gpu| Scene::build(gpu, &self.capabilities, self.resolution));
        let scene = match scene {
            Ok(scene) => scene,
            Err(err) => {
                self.lifecycle = Lifecycle::Pending;
                return Err(err);
            }
        };
        self.lifecycle = Lifecycle::Running(Box::new(scene));
        self.running = !self.paused;

        if !self.listeners_attached {
            self.host.attach_listeners()?;
            self.listeners_attached = true;
        }
        self.host.set_surface_visible(self.visible);
        self.load_image();

        info!(
            resolution = self.resolution,
            format = ?self.capabilities.format,
            width = self.layout.pixel_width,
            height = self.layout.pixel_height,
            "ripples initialized"
        );
        Ok(())
    }

    /// One animation frame: boundaries, simulation step, composite.
    pub fn frame(&mut self) -> Result<(), RipplesError> {
        if !self.visible {
            return Ok(());
        }
        let Some(boundary) = self.compute_boundaries() else {
            return Ok(());
        };
        let running = self.running;
        let params = CompositeParams {
            boundary,
            perturbance: self.settings.perturbance as f32,
            surface_size: (self.layout.pixel_width, self.layout.pixel_height),
        };
        let Lifecycle::Running(scene) = &mut self.lifecycle else {
            return Ok(());
        };
        let Scene {
            gpu,
            quad,
            field,
            programs,
            background,
        } = &mut **scene;
        if running {
            field.step(gpu, &programs.diffuse, quad);
        }
        compositor::render(
            gpu,
            &programs.composite,
            quad,
            background.texture(),
            field.readable(),
            &params,
        )
    }

    /// Where the surface sits in background texture space, if running.
    pub fn compute_boundaries(&self) -> Option<BoundaryRect> {
        let Lifecycle::Running(scene) = &self.lifecycle else {
            return None;
        };
        let background = self.host.computed_background();
        let (iw, ih) = scene.background.size();
        let inputs = BoundaryInputs {
            element: self.host.element_box(),
            viewport: self.host.viewport(),
            rules: BackgroundRules::parse(&background.size, &background.position, &background.attachment),
            image_size: (iw as f64, ih as f64),
            content_bounds: self.settings.content_bounds,
            surface_size: (self.layout.pixel_width, self.layout.pixel_height),
        };
        Some(boundary::compute_boundaries(&inputs))
    }

    /// Drops at `(x, y)` in element-local pixels.
    pub fn drop(&mut self, x: f64, y: f64, radius: f64, strength: f64) -> Result<(), RipplesError> {
        let element = self.host.element_box();
        let (width, height) = match self.settings.content_bounds {
            None => (element.client_width, element.client_height),
            Some(b) => (
                element.client_width * b.width / 100.0,
                element.client_height * b.height / 100.0,
            ),
        };
        let Lifecycle::Running(scene) = &mut self.lifecycle else {
            return Ok(());
        };
        let Some(impulse) = Impulse::from_pixels(x, y, radius, strength, width, height) else {
            return Ok(());
        };
        let Scene {
            gpu,
            quad,
            field,
            programs,
            ..
        } = &mut **scene;
        field.drop(gpu, &programs.perturb, quad, impulse)
    }

    /// Handles a pointer event with the preset for `gesture`.
    pub fn pointer(&mut self, gesture: Gesture, position: PointerPosition) -> Result<(), RipplesError> {
        if !(self.visible && self.running && self.settings.interactive) {
            return Ok(());
        }
        if !matches!(self.lifecycle, Lifecycle::Running(_)) {
            return Ok(());
        }
        let point = perturb::surface_point(
            position,
            self.host.surface_rect(),
            &self.host.viewport(),
            (self.layout.pixel_width, self.layout.pixel_height),
        );
        let Some((x, y)) = point else {
            return Ok(());
        };
        self.drop(
            x,
            y,
            self.settings.drop_radius * gesture.radius_scale(),
            gesture.strength(),
        )
    }

    pub fn pause(&mut self) {
        if !self.is_destroyed() {
            self.paused = true;
            self.running = false;
        }
    }

    /// Resumes stepping. A pending instance starts running once initialized.
    pub fn play(&mut self) {
        if !self.is_destroyed() {
            self.paused = false;
            self.running = matches!(self.lifecycle, Lifecycle::Running(_));
        }
    }

    pub fn show(&mut self) {
        if self.is_destroyed() {
            return;
        }
        self.visible = true;
        self.host.set_surface_visible(true);
        if self.background_has_image() && !self.css_hidden {
            self.host.hide_css_background();
            self.css_hidden = true;
        }
    }

    pub fn hide(&mut self) {
        if self.is_destroyed() {
            return;
        }
        self.visible = false;
        self.host.set_surface_visible(false);
        self.restore_css();
    }

    pub fn set(&mut self, setting: Setting) {
        if self.is_destroyed() {
            return;
        }
        let property = setting.property();
        self.settings.apply(setting);
        debug!(property, "setting changed");
        match property {
            "imageUrl" => self.load_image(),
            "contentBounds" => {
                if let Err(err) = self.update_size() {
                    warn!(error = %err, "resize after contentBounds change failed");
                }
            }
            _ => {}
        }
    }

    /// Dynamic form of [`Ripples::set`]. Rejected changes are logged and
    /// returned, never applied.
    pub fn set_property(&mut self, property: &str, value: &Value) -> Result<(), SettingError> {
        match Setting::parse(property, value) {
            Ok(setting) => {
                self.set(setting);
                Ok(())
            }
            Err(err) => {
                warn!(property, "{err}");
                Err(err)
            }
        }
    }

    /// Re-reads the element size. Completes a deferred initialization.
    pub fn update_size(&mut self) -> Result<(), RipplesError> {
        match self.lifecycle {
            Lifecycle::Destroyed | Lifecycle::Initializing => Ok(()),
            Lifecycle::Pending => {
                if self.host.element_box().has_area() {
                    debug!("element gained a size, completing initialization");
                    self.complete_init()
                } else {
                    Ok(())
                }
            }
            Lifecycle::Running(_) => {
                let layout =
                    boundary::surface_layout(&self.host.element_box(), self.settings.content_bounds);
                if layout != self.layout {
                    debug!(
                        width = layout.pixel_width,
                        height = layout.pixel_height,
                        "surface resized"
                    );
                    self.layout = layout;
                    self.host.layout_surface(layout);
                }
                Ok(())
            }
        }
    }

    /// Tears everything down. Safe to call more than once.
    pub fn destroy(&mut self) {
        let previous = mem::replace(&mut self.lifecycle, Lifecycle::Destroyed);
        if matches!(previous, Lifecycle::Destroyed) {
            return;
        }
        self.host.release();
        if let Lifecycle::Running(scene) = previous {
            self.released_gpu = Some(scene.release());
        }
        self.restore_css();
        self.pending_image = None;
        self.running = false;
        info!("ripples destroyed");
    }

    /// Installs a loaded background. Stale tickets are ignored.
    pub fn image_loaded(
        &mut self,
        ticket: ImageTicket,
        image: &<H::Gpu as Gpu>::Image,
    ) -> Result<(), RipplesError> {
        if self.pending_image != Some(ticket) {
            debug!(ticket = ticket.0, "ignoring stale image");
            return Ok(());
        }
        self.pending_image = None;
        let Lifecycle::Running(scene) = &mut self.lifecycle else {
            return Ok(());
        };
        let Scene { gpu, background, .. } = &mut **scene;
        background.upload(gpu, image)?;
        if self.visible && !self.css_hidden {
            self.host.hide_css_background();
            self.css_hidden = true;
        }
        Ok(())
    }

    /// Falls back to a transparent background.
    pub fn image_failed(&mut self, ticket: ImageTicket) -> Result<(), RipplesError> {
        if self.pending_image != Some(ticket) {
            debug!(ticket = ticket.0, "ignoring stale image failure");
            return Ok(());
        }
        self.pending_image = None;
        warn!(
            url = self.image_source.as_deref().unwrap_or_default(),
            "background image failed to load"
        );
        self.install_placeholder()
    }

    pub fn state(&self) -> State {
        match self.lifecycle {
            Lifecycle::Pending => State::Pending,
            Lifecycle::Initializing => State::Initializing,
            Lifecycle::Running(_) => State::Running,
            Lifecycle::Destroyed => State::Destroyed,
        }
    }

    pub fn is_destroyed(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Destroyed)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn layout(&self) -> SurfaceLayout {
        self.layout
    }

    pub fn image_source(&self) -> Option<&str> {
        self.image_source.as_deref()
    }

    pub fn pending_image(&self) -> Option<ImageTicket> {
        self.pending_image
    }

    pub fn height_field(&self) -> Option<&HeightField<H::Gpu>> {
        match &self.lifecycle {
            Lifecycle::Running(scene) => Some(&scene.field),
            _ => None,
        }
    }

    pub fn background(&self) -> Option<&BackgroundSurface<H::Gpu>> {
        match &self.lifecycle {
            Lifecycle::Running(scene) => Some(&scene.background),
            _ => None,
        }
    }

    /// The rendering context, live or already released by `destroy`.
    pub fn gpu(&self) -> Option<&H::Gpu> {
        match &self.lifecycle {
            Lifecycle::Running(scene) => Some(&scene.gpu),
            _ => self.released_gpu.as_ref(),
        }
    }

    pub fn gpu_mut(&mut self) -> Option<&mut H::Gpu> {
        match &mut self.lifecycle {
            Lifecycle::Running(scene) => Some(&mut scene.gpu),
            _ => self.released_gpu.as_mut(),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    fn background_has_image(&self) -> bool {
        self.background().is_some_and(BackgroundSurface::has_image)
    }

    fn restore_css(&mut self) {
        if self.css_hidden {
            self.host.restore_css_background();
            self.css_hidden = false;
        }
    }

    fn load_image(&mut self) {
        if !matches!(self.lifecycle, Lifecycle::Running(_)) {
            return;
        }
        let source = self
            .settings
            .image_url
            .clone()
            .or_else(|| self.original_css_image.clone())
            .or_else(|| css::extract_url(&self.host.computed_background().image));
        if source == self.image_source {
            return;
        }
        self.image_source = source;

        let Some(url) = self.image_source.clone() else {
            self.pending_image = None;
            if let Err(err) = self.install_placeholder() {
                warn!(error = %err, "failed to reset background");
            }
            return;
        };
        self.next_ticket += 1;
        let ticket = ImageTicket(self.next_ticket);
        self.pending_image = Some(ticket);
        let cross_origin = if css::is_data_uri(&url) {
            None
        } else {
            Some(self.settings.cross_origin.as_str())
        };
        debug!(url = %url, ticket = ticket.0, "loading background image");
        self.host.load_image(ticket, &url, cross_origin);
    }

    fn install_placeholder(&mut self) -> Result<(), RipplesError> {
        self.restore_css();
        let Lifecycle::Running(scene) = &mut self.lifecycle else {
            return Ok(());
        };
        let Scene { gpu, background, .. } = &mut **scene;
        background.clear(gpu)?;
        Ok(())
    }
}
