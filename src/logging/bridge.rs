//! Forward `tracing` events into the logger
//!
//! Install [`DaylogLayer`] on a tracing subscriber and every event from the
//! application and its libraries becomes a daylog record: the module path
//! stands in for the function name, and `ERROR` maps to Critical.

use std::fmt::Write as FmtWrite;
use std::sync::Arc;

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

use super::level::LogLevel;
use super::logger::Logger;
use super::record::function_path;

enum Target {
    Global,
    Instance(Arc<Logger>),
}

/// A tracing Layer that hands events to a [`Logger`]
pub struct DaylogLayer {
    target: Target,
}

impl DaylogLayer {
    /// Forward to the process-wide logger, starting it on the first event
    pub fn global() -> Self {
        Self {
            target: Target::Global,
        }
    }

    pub fn for_logger(logger: Arc<Logger>) -> Self {
        Self {
            target: Target::Instance(logger),
        }
    }

    fn logger(&self) -> &Logger {
        match &self.target {
            Target::Global => Logger::instance(),
            Target::Instance(logger) => logger.as_ref(),
        }
    }
}

impl<S> Layer<S> for DaylogLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let site = function_path(metadata.module_path().unwrap_or(metadata.target()));
        self.logger().emit(
            LogLevel::from(*metadata.level()),
            site,
            metadata.line().unwrap_or(0),
            visitor.finish(),
        );
    }
}

/// Collects the `message` field followed by the other fields as `key=value`
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn push_field(&mut self, name: &str, value: std::fmt::Arguments<'_>) {
        if !self.fields.is_empty() {
            self.fields.push(' ');
        }
        let _ = write!(&mut self.fields, "{}={}", name, value);
    }

    fn finish(self) -> String {
        match (self.message.is_empty(), self.fields.is_empty()) {
            (_, true) => self.message,
            (true, false) => self.fields,
            (false, false) => format!("{} {}", self.message, self.fields),
        }
    }
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(&mut self.message, "{:?}", value);
        } else {
            self.push_field(field.name(), format_args!("{:?}", value));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            self.push_field(field.name(), format_args!("{}", value));
        }
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.push_field(field.name(), format_args!("{}", value));
    }
}
