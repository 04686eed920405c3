#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use ripples_wasm::gpu::{HeadlessGpu, HeadlessProfile};
use ripples_wasm::host::{
    ClientRect, ComputedBackground, ElementBox, Host, ImageTicket, SurfaceLayout, Viewport,
};
use ripples_wasm::{probe, Capabilities, RipplesConfig, RipplesError, Ripples};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub ticket: ImageTicket,
    pub url: String,
    pub cross_origin: Option<String>,
}

/// In-memory element with a headless rendering context.
#[derive(Debug)]
pub struct FakeHost {
    pub element: ElementBox,
    pub viewport: Viewport,
    pub background: ComputedBackground,
    pub surface: ClientRect,
    pub profile: HeadlessProfile,

    pub layouts: Vec<SurfaceLayout>,
    pub visibility: Vec<bool>,
    pub contexts_created: usize,
    pub listener_attachments: usize,
    pub observers: usize,
    pub releases: usize,
    pub image_requests: Vec<ImageRequest>,
    pub css_hidden: usize,
    pub css_restored: usize,
}

impl FakeHost {
    pub fn sized(width: f64, height: f64) -> Self {
        Self {
            element: ElementBox {
                page_left: 0.0,
                page_top: 0.0,
                client_width: width,
                client_height: height,
            },
            viewport: Viewport {
                scroll_x: 0.0,
                scroll_y: 0.0,
                width: 1024.0,
                height: 768.0,
            },
            background: ComputedBackground {
                image: "none".into(),
                size: "auto".into(),
                position: "0% 0%".into(),
                attachment: "scroll".into(),
            },
            surface: ClientRect {
                left: 0.0,
                top: 0.0,
                width,
                height,
            },
            profile: HeadlessProfile::full(),
            layouts: Vec::new(),
            visibility: Vec::new(),
            contexts_created: 0,
            listener_attachments: 0,
            observers: 0,
            releases: 0,
            image_requests: Vec::new(),
            css_hidden: 0,
            css_restored: 0,
        }
    }

    pub fn with_css_image(mut self, url: &str) -> Self {
        self.background.image = format!("url(\"{url}\")");
        self
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.element.client_width = width;
        self.element.client_height = height;
        self.surface.width = width;
        self.surface.height = height;
    }

    pub fn last_request(&self) -> Option<&ImageRequest> {
        self.image_requests.last()
    }
}

impl Host for FakeHost {
    type Gpu = HeadlessGpu;

    fn element_box(&self) -> ElementBox {
        self.element
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn computed_background(&self) -> ComputedBackground {
        self.background.clone()
    }

    fn surface_rect(&self) -> ClientRect {
        self.surface
    }

    fn create_context(&mut self) -> Result<HeadlessGpu, RipplesError> {
        self.contexts_created += 1;
        Ok(HeadlessGpu::new(self.profile.clone()))
    }

    fn layout_surface(&mut self, layout: SurfaceLayout) {
        self.layouts.push(layout);
    }

    fn set_surface_visible(&mut self, visible: bool) {
        self.visibility.push(visible);
    }

    fn hide_css_background(&mut self) {
        self.css_hidden += 1;
    }

    fn restore_css_background(&mut self) {
        self.css_restored += 1;
    }

    fn load_image(&mut self, ticket: ImageTicket, url: &str, cross_origin: Option<&str>) {
        self.image_requests.push(ImageRequest {
            ticket,
            url: url.to_string(),
            cross_origin: cross_origin.map(str::to_string),
        });
    }

    fn attach_listeners(&mut self) -> Result<(), RipplesError> {
        self.listener_attachments += 1;
        Ok(())
    }

    fn observe_size(&mut self) -> Result<(), RipplesError> {
        self.observers += 1;
        Ok(())
    }

    fn release(&mut self) {
        self.releases += 1;
    }
}

pub fn capabilities() -> Capabilities {
    probe(&mut HeadlessGpu::default()).expect("full profile supports float textures")
}

/// A running instance at a small resolution.
pub fn running(host: FakeHost) -> Ripples<FakeHost> {
    let config = RipplesConfig {
        resolution: 32,
        ..RipplesConfig::default()
    };
    Ripples::new(host, config, capabilities()).expect("instance starts")
}

// ============================================================================
// Log capture
// ============================================================================

#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub message: String,
}

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

/// Layer that records every event it sees.
pub struct EventCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl EventCapture {
    pub fn new() -> (Self, Arc<Mutex<Vec<CapturedEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                events: events.clone(),
            },
            events,
        )
    }
}

impl<S: Subscriber> tracing_subscriber::Layer<S> for EventCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            message: visitor.0,
        });
    }
}
