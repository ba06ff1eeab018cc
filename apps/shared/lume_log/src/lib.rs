//! Centralized logging for Lume applications
//!
//! Provides a custom formatter for tracing that:
//! - Formats thread IDs as #N instead of ThreadId(N)
//! - Renders script console output (events carrying `runtime_type` and `script`
//!   fields) as `js::scripts/button.js: message`
//! - Strips the application prefix from targets for cleaner output
//! - Filters external dependency logs based on `LUME_LOGDEPS`
//!
//! # Environment Variables
//!
//! - `LUME_LOGDEPS`: Set to `1` to enable logging from external dependencies.
//!   Default is `0` which only shows logs from Lume crates and scripts.
//! - `RUST_LOG`: Overrides the default filter directives entirely.
//!
//! # Usage
//!
//! ```rust,ignore
//! use lume_log::{init_logging, LogConfig};
//! use tracing::Level;
//!
//! let config: LogConfig = LogConfig::new("lume_viewer::").with_level(Level::INFO);
//! init_logging(config)?;
//! ```

use std::fmt as std_fmt;
use std::io::{self, Write};
use std::sync::Mutex;

use tracing::Level;
use tracing::field::Field;
use tracing_subscriber::field::Visit;
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::fmt::{self, FmtContext, FormatEvent, FormatFields, format::Writer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Crates whose logs are shown when dependency logging is off
const WORKSPACE_TARGETS: [&str; 5] = ["lume_viewer", "lume_script", "lume_schema", "lume_log", "js"];

/// Field extractor for script console events
///
/// Console output from scripts carries `runtime_type` and `script` fields;
/// everything else is formatted with the default field formatter.
#[derive(Default)]
pub struct FieldExtractor {
    pub runtime_type: Option<String>,
    pub script: Option<String>,
    pub message: Option<String>,
}

impl FieldExtractor {
    fn store(&mut self, field: &Field, value: String) {
        match field.name() {
            "runtime_type" => self.runtime_type = Some(value),
            "script" => self.script = Some(value),
            "message" => self.message = Some(value),
            _ => {}
        }
    }

    /// `runtime::script` label when the event came from a script console
    pub fn script_label(&self) -> Option<String> {
        match (&self.runtime_type, &self.script) {
            (Some(rt), Some(script)) => Some(format!("{}::{}", rt, script)),
            _ => None,
        }
    }
}

impl Visit for FieldExtractor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.store(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std_fmt::Debug) {
        self.store(field, format!("{:?}", value).trim_matches('"').to_string());
    }
}

/// Target shown in front of a log line, or `None` to hide it
///
/// Targets inside the application lose the `strip_prefix`; the bare application
/// name is hidden; external targets are shown in full.
pub fn display_target<'a>(target: &'a str, strip_prefix: Option<&str>) -> Option<&'a str> {
    let shown = match strip_prefix {
        Some(prefix) if target.starts_with(prefix.trim_end_matches("::")) => {
            if target == prefix.trim_end_matches("::") {
                return None;
            }
            target.strip_prefix(prefix).unwrap_or(target)
        }
        _ => target,
    };
    (!shown.is_empty()).then_some(shown)
}

/// Custom event formatter for Lume applications
pub struct CustomFormatter<T> {
    timer: T,
    ansi: bool,
    /// Prefix to strip from log targets (e.g., "lume_viewer::")
    strip_prefix: Option<String>,
}

impl<T> CustomFormatter<T> {
    pub fn new(timer: T, ansi: bool) -> Self {
        Self {
            timer,
            ansi,
            strip_prefix: None,
        }
    }

    pub fn with_strip_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.strip_prefix = Some(prefix.into());
        self
    }

    fn paint(&self, code: &'static str) -> &'static str {
        if self.ansi { code } else { "" }
    }
}

impl<T: Clone> Clone for CustomFormatter<T> {
    fn clone(&self) -> Self {
        Self {
            timer: self.timer.clone(),
            ansi: self.ansi,
            strip_prefix: self.strip_prefix.clone(),
        }
    }
}

impl<S, N, T> FormatEvent<S, N> for CustomFormatter<T>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
    T: fmt::time::FormatTime,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std_fmt::Result {
        let metadata = event.metadata();
        let (dim_start, reset) = (self.paint("\x1b[2m"), self.paint("\x1b[0m"));
        let (level_color, level_str) = match *metadata.level() {
            Level::ERROR => (self.paint("\x1b[31m"), "ERROR"),
            Level::WARN => (self.paint("\x1b[33m"), " WARN"),
            Level::INFO => (self.paint("\x1b[32m"), " INFO"),
            Level::DEBUG => (self.paint("\x1b[34m"), "DEBUG"),
            Level::TRACE => (self.paint("\x1b[35m"), "TRACE"),
        };

        write!(writer, "{}", dim_start)?;
        self.timer.format_time(&mut writer)?;
        write!(writer, "{} {}{}{} ", reset, level_color, level_str, reset)?;

        if let Some(num) = thread_number() {
            write!(writer, "#{:03} ", num)?;
        }

        let mut extractor = FieldExtractor::default();
        event.record(&mut extractor);

        if let Some(label) = extractor.script_label() {
            write!(writer, "{}{}{}: ", dim_start, label, reset)?;
            if let Some(msg) = &extractor.message {
                write!(writer, "{}", msg)?;
            }
        } else {
            if let Some(target) = display_target(metadata.target(), self.strip_prefix.as_deref()) {
                write!(writer, "{}{}{}: ", dim_start, target, reset)?;
            }
            ctx.field_format().format_fields(writer.by_ref(), event)?;
        }

        writeln!(writer)
    }
}

fn thread_number() -> Option<u64> {
    let thread_id = format!("{:?}", std::thread::current().id());
    thread_id
        .strip_prefix("ThreadId(")
        .and_then(|s| s.strip_suffix(')'))
        .and_then(|s| s.parse().ok())
}

/// Timer printing `[year]/[month]/[day] [hour]:[minute]:[second].[subsecond digits:4]`
///
/// Uses the local UTC offset, falling back to UTC.
pub fn create_custom_timer()
-> OffsetTime<&'static [time::format_description::BorrowedFormatItem<'static>]> {
    use time::macros::format_description;

    let format =
        format_description!("[year]/[month]/[day] [hour]:[minute]:[second].[subsecond digits:4]");
    let offset = time::UtcOffset::current_local_offset().unwrap_or(time::UtcOffset::UTC);
    OffsetTime::new(offset, format)
}

/// Returns `true` if `LUME_LOGDEPS=1`
pub fn is_dependency_logging_enabled() -> bool {
    std::env::var("LUME_LOGDEPS")
        .map(|v| v == "1")
        .unwrap_or(false)
}

fn level_name(level: Level) -> &'static str {
    match level {
        Level::TRACE => "trace",
        Level::DEBUG => "debug",
        Level::INFO => "info",
        Level::WARN => "warn",
        Level::ERROR => "error",
    }
}

/// Parse a level name as accepted on the command line
pub fn parse_level(name: &str) -> Option<Level> {
    match name.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Build the `EnvFilter` directives
///
/// Without `log_deps`, everything is off except the workspace crates and
/// script console output.
pub fn build_filter_directives(level: Level, log_deps: bool) -> String {
    let level = level_name(level);
    if log_deps {
        return level.to_string();
    }

    let mut directives = vec!["off".to_string()];
    directives.extend(WORKSPACE_TARGETS.iter().map(|target| format!("{}={}", target, level)));
    directives.join(",")
}

/// Disables ANSI colors when stdout is not a TTY, `NO_COLOR` is set or `TERM=dumb`
pub fn should_use_ansi() -> bool {
    atty::is(atty::Stream::Stdout)
        && std::env::var("NO_COLOR").is_err()
        && std::env::var("TERM").map(|t| t != "dumb").unwrap_or(true)
}

/// Logging configuration
pub struct LogConfig<W: Write + Send + 'static = std::fs::File> {
    /// Prefix to strip from log targets (e.g., "lume_viewer::")
    pub strip_prefix: String,
    /// Whether to use ANSI color codes (auto-detected if None)
    pub use_ansi: Option<bool>,
    /// Minimum log level
    pub level: Level,
    /// Optional sink receiving an uncolored copy of every line
    pub log_file: Option<W>,
}

impl<W: Write + Send + 'static> LogConfig<W> {
    pub fn new(strip_prefix: impl Into<String>) -> Self {
        Self {
            strip_prefix: strip_prefix.into(),
            use_ansi: None,
            level: Level::INFO,
            log_file: None,
        }
    }

    pub fn with_ansi(mut self, use_ansi: bool) -> Self {
        self.use_ansi = Some(use_ansi);
        self
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_log_file(mut self, file: W) -> Self {
        self.log_file = Some(file);
        self
    }
}

/// Install the global subscriber
///
/// Fails if a global subscriber is already set.
pub fn init_logging<W: Write + Send + 'static>(
    config: LogConfig<W>,
) -> Result<(), Box<dyn std::error::Error>> {
    let timer = create_custom_timer();
    let use_ansi = config.use_ansi.unwrap_or_else(should_use_ansi);
    let filter_directives = build_filter_directives(config.level, is_dependency_logging_enabled());

    // RUST_LOG wins over our defaults
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&filter_directives));

    let stdout_layer = tracing_subscriber::fmt::layer()
        .event_format(CustomFormatter::new(timer.clone(), use_ansi).with_strip_prefix(&config.strip_prefix))
        .with_ansi(use_ansi)
        .with_writer(io::stdout);

    let file_layer = config.log_file.map(|file| {
        tracing_subscriber::fmt::layer()
            .event_format(CustomFormatter::new(timer, false).with_strip_prefix(&config.strip_prefix))
            .with_ansi(false)
            .with_writer(Mutex::new(file))
    });

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layer)
        .with(env_filter)
        .try_init()?;

    Ok(())
}

/// Initialize logging to stdout only
pub fn init_logging_simple(
    strip_prefix: impl Into<String>,
    level: Level,
) -> Result<(), Box<dyn std::error::Error>> {
    let config: LogConfig<std::fs::File> = LogConfig::new(strip_prefix).with_level(level);
    init_logging(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directives_workspace_only() {
        let directives = build_filter_directives(Level::DEBUG, false);
        assert!(directives.starts_with("off,"));
        assert!(directives.contains("lume_script=debug"));
        assert!(directives.contains("js=debug"));
        assert!(!directives.contains("rquickjs"));
    }

    #[test]
    fn test_filter_directives_with_deps() {
        assert_eq!(build_filter_directives(Level::WARN, true), "warn");
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("INFO"), Some(Level::INFO));
        assert_eq!(parse_level("warning"), Some(Level::WARN));
        assert_eq!(parse_level("verbose"), None);
    }

    #[test]
    fn test_display_target() {
        let prefix = Some("lume_viewer::");
        assert_eq!(display_target("lume_viewer::host", prefix), Some("host"));
        assert_eq!(display_target("lume_viewer", prefix), None);
        assert_eq!(
            display_target("lume_script::adapters::js::engine", prefix),
            Some("lume_script::adapters::js::engine")
        );
        assert_eq!(display_target("anything", None), Some("anything"));
    }

    #[test]
    fn test_script_label() {
        let mut extractor = FieldExtractor::default();
        assert_eq!(extractor.script_label(), None);

        extractor.runtime_type = Some("js".into());
        extractor.script = Some("scripts/button.js".into());
        assert_eq!(extractor.script_label().as_deref(), Some("js::scripts/button.js"));
    }
}
