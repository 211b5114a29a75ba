//! CI-aware log output
//!
//! Installs a `tracing` subscriber whose line format depends on where the
//! binary runs:
//! - Azure Pipelines (`CI=azure_pipelines`): logging commands such as
//!   `##[warning]` so the pipeline UI highlights the line
//! - other CI systems: plain `[LEVEL]` prefixes
//! - interactive terminals: coloured level badges
//!
//! Structured fields on an event are rendered after the message.

use crate::{AdoError, Result};
use colored::{ColoredString, Colorize};
use std::fmt;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Where log lines end up, which decides how they are decorated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggerMode {
    /// Running inside an Azure Pipelines job
    AzurePipelines,

    /// Running inside some other CI system
    Unknown,

    /// Running in a developer terminal
    Interactive,
}

impl LoggerMode {
    /// Detect the mode from the `CI` environment variable
    pub fn from_env() -> Self {
        Self::from_ci_value(std::env::var("CI").ok().as_deref())
    }

    /// Detect the mode from a raw `CI` value
    pub fn from_ci_value(ci: Option<&str>) -> Self {
        match ci {
            Some("azure_pipelines") => LoggerMode::AzurePipelines,
            Some(_) => LoggerMode::Unknown,
            None => LoggerMode::Interactive,
        }
    }

    /// Line prefix for a level, without colour for the non-interactive modes
    pub fn prefix(&self, level: Level) -> String {
        match self {
            LoggerMode::AzurePipelines => match level {
                Level::DEBUG => "##[debug]".to_string(),
                Level::WARN => "##[warning]".to_string(),
                Level::ERROR => "##[error]".to_string(),
                _ => String::new(),
            },
            LoggerMode::Unknown => format!("[{}] ", level),
            LoggerMode::Interactive => interactive_badge(level).to_string(),
        }
    }

    fn message_spacer(&self) -> &'static str {
        match self {
            LoggerMode::AzurePipelines => "",
            _ => "\t",
        }
    }

    fn fields_spacer(&self) -> &'static str {
        match self {
            LoggerMode::Interactive => "\n\t",
            _ => "\t",
        }
    }

    fn message(&self, level: Level, message: &str) -> String {
        if *self != LoggerMode::Interactive {
            return message.to_string();
        }
        let coloured = match level {
            Level::DEBUG => message.truecolor(0xAA, 0xAA, 0xAA).italic(),
            Level::WARN => message.truecolor(0xF9, 0xE0, 0x76),
            Level::ERROR => message.truecolor(0xD2, 0x14, 0x04),
            Level::INFO => message.truecolor(0x55, 0xFF, 0xFF),
            _ => message.normal(),
        };
        format!("{} ", coloured)
    }
}

fn interactive_badge(level: Level) -> ColoredString {
    let text = format!(" {} ", level);
    let text = text.as_str();
    match level {
        Level::DEBUG => text
            .truecolor(0, 0, 0)
            .on_truecolor(0xAA, 0xAA, 0xAA)
            .italic(),
        Level::WARN => text
            .truecolor(0, 0, 0)
            .on_truecolor(0xF9, 0xE0, 0x76)
            .bold(),
        Level::ERROR => text
            .truecolor(0xFA, 0xFA, 0xFA)
            .on_truecolor(0xD2, 0x14, 0x04)
            .bold(),
        Level::INFO => text
            .truecolor(0, 0, 0)
            .on_truecolor(0x55, 0xFF, 0xFF)
            .bold(),
        _ => text.normal(),
    }
}

/// Collects the message and structured fields of one event
#[derive(Debug, Default)]
struct FieldCollector {
    message: String,
    fields: Vec<(String, String)>,
}

impl FieldCollector {
    fn render_fields(&self) -> Option<String> {
        if self.fields.is_empty() {
            return None;
        }
        let rendered: Vec<String> = self
            .fields
            .iter()
            .map(|(name, value)| format!("\"{}\":{}", name, value))
            .collect();
        Some(format!("{{{}}}", rendered.join(",")))
    }
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            let quoted =
                serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value));
            self.fields.push((field.name().to_string(), quoted));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            // `%` fields arrive here unquoted
            let rendered = format!("{:?}", value);
            let rendered = match serde_json::from_str::<serde_json::Value>(&rendered) {
                Ok(_) => rendered,
                Err(_) => serde_json::to_string(&rendered).unwrap_or(rendered),
            };
            self.fields.push((field.name().to_string(), rendered));
        }
    }
}

/// Event formatter that decorates lines according to a [`LoggerMode`]
#[derive(Debug, Clone, Copy)]
pub struct CiFormatter {
    mode: LoggerMode,
}

impl CiFormatter {
    pub fn new(mode: LoggerMode) -> Self {
        Self { mode }
    }

    /// Render a single line from its parts
    pub fn format_line(&self, level: Level, message: &str, fields: Option<&str>) -> String {
        let mut line = format!(
            "{}{}{}",
            self.mode.prefix(level),
            self.mode.message_spacer(),
            self.mode.message(level, message)
        );
        if let Some(fields) = fields {
            line.push_str(self.mode.fields_spacer());
            line.push_str(fields);
        }
        line
    }
}

impl<S, N> FormatEvent<S, N> for CiFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut collector = FieldCollector::default();
        event.record(&mut collector);

        let fields = collector.render_fields();
        let line = self.format_line(
            *event.metadata().level(),
            &collector.message,
            fields.as_deref(),
        );
        writeln!(writer, "{}", line)
    }
}

/// Install the global subscriber
///
/// `RUST_LOG` wins over the `verbose` switch when it is set.
pub fn init_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let layer = tracing_subscriber::fmt::layer()
        .event_format(CiFormatter::new(LoggerMode::from_env()))
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|e| AdoError::Logging(e.to_string()))
}
