//! `tracing` output to the browser console.

use std::fmt::{self, Write as _};
use std::sync::Once;

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::prelude::*;
use wasm_bindgen::JsValue;
use web_sys::console;

#[derive(Default)]
struct EventVisitor {
    message: Option<String>,
    fields: Vec<(&'static str, String)>,
}

impl Visit for EventVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let rendered = format!("{value:?}");
        if field.name() == "message" {
            self.message = Some(rendered);
        } else {
            self.fields.push((field.name(), rendered));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields.push((field.name(), value.to_string()));
        }
    }
}

/// Forwards events at or above `max_level` verbosity to `console.*`.
pub struct ConsoleLayer {
    max_level: Level,
}

impl ConsoleLayer {
    pub fn new(max_level: Level) -> Self {
        Self { max_level }
    }
}

impl<S> Layer<S> for ConsoleLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let level = *metadata.level();
        if level > self.max_level {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let mut line = format!(
            "[{}] {}",
            metadata.target(),
            visitor.message.unwrap_or_default()
        );
        for (key, value) in &visitor.fields {
            let _ = write!(line, " {key}={value}");
        }
        let line = JsValue::from_str(&line);

        if level == Level::ERROR {
            console::error_1(&line);
        } else if level == Level::WARN {
            console::warn_1(&line);
        } else if level == Level::INFO {
            console::info_1(&line);
        } else {
            console::debug_1(&line);
        }
    }
}

static INIT: Once = Once::new();

/// Installs the panic hook and the console subscriber once per page.
pub fn init() {
    INIT.call_once(|| {
        #[cfg(feature = "console_error_panic_hook")]
        console_error_panic_hook::set_once();

        let subscriber = tracing_subscriber::registry().with(ConsoleLayer::new(Level::INFO));
        if tracing::subscriber::set_global_default(subscriber).is_err() {
            console::warn_1(&JsValue::from_str("ripples: a tracing subscriber is already set"));
        }
    });
}
