//! Forwards `tracing` events from the core to the browser console.

use std::fmt::Write as _;

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use wasm_bindgen::JsValue;

#[derive(Default)]
struct LineVisitor {
    message: String,
    fields: String,
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

/// One console line per event: `LEVEL target: message key=value ...`.
pub fn format_event(level: &Level, target: &str, message: &str, fields: &str) -> String {
    format!("{level} {target}: {message}{fields}")
}

pub struct ConsoleLayer;

impl<S: Subscriber> Layer<S> for ConsoleLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = LineVisitor::default();
        event.record(&mut visitor);
        let meta = event.metadata();
        let line = JsValue::from_str(&format_event(
            meta.level(),
            meta.target(),
            &visitor.message,
            &visitor.fields,
        ));
        match *meta.level() {
            Level::ERROR => web_sys::console::error_1(&line),
            Level::WARN => web_sys::console::warn_1(&line),
            Level::INFO => web_sys::console::info_1(&line),
            _ => web_sys::console::debug_1(&line),
        }
    }
}

/// Installs the console layer as the global subscriber. Safe to call twice.
pub fn init(max_level: LevelFilter) {
    let subscriber = tracing_subscriber::registry()
        .with(max_level)
        .with(ConsoleLayer);
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn line_format() {
        assert_eq!(
            format_event(
                &Level::WARN,
                "parking_core::controller",
                "backend not available, working offline",
                " endpoint=/health"
            ),
            "WARN parking_core::controller: backend not available, working offline endpoint=/health"
        );
    }
}
