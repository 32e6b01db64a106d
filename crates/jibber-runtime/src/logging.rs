//! Logging setup for the bot process.
//!
//! The `[logging]` table of [`JibberConfig`](crate::JibberConfig) picks the
//! base level, per-target filters, the line format and where records go.
//! `RUST_LOG` replaces the configured base level when it is set; the
//! per-target filters still apply on top of it.
//!
//! ```rust,ignore
//! use jibber_runtime::config::LogLevel;
//! use jibber_runtime::logging::LoggingBuilder;
//!
//! LoggingBuilder::new()
//!     .level(LogLevel::Debug)
//!     .directive("jibber_framework::dispatcher=trace")
//!     .init();
//! ```

use std::path::{Path, PathBuf};

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::config::{LogFormat, LogLevel, LogOutput, LoggingConfig, SpanEventConfig};

const DEFAULT_LOG_FILE: &str = "jibber.log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Installs the global subscriber described by `config`.
///
/// A subscriber that is already installed (a test harness, an embedding
/// application) is left alone.
pub fn init_from_config(config: &LoggingConfig) {
    LoggingBuilder::from_config(config).init();
}

/// Builds the global `tracing` subscriber.
///
/// Starts from a [`LoggingConfig`] and lets callers add filter directives
/// the config file cannot express.
#[derive(Debug, Clone, Default)]
pub struct LoggingBuilder {
    config: LoggingConfig,
    extra_directives: Vec<String>,
}

impl LoggingBuilder {
    /// Info level, compact lines, stdout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from the `[logging]` section of a loaded config.
    pub fn from_config(config: &LoggingConfig) -> Self {
        Self {
            config: config.clone(),
            extra_directives: Vec::new(),
        }
    }

    /// Sets the base level `RUST_LOG` can replace.
    pub fn level(mut self, level: LogLevel) -> Self {
        self.config.level = level;
        self
    }

    /// Adds a raw `EnvFilter` directive such as `jibber_framework=trace`.
    pub fn directive(mut self, directive: impl Into<String>) -> Self {
        self.extra_directives.push(directive.into());
        self
    }

    /// Sets the line format.
    pub fn format(mut self, format: LogFormat) -> Self {
        self.config.format = format;
        self
    }

    /// Sets where records are written.
    pub fn output(mut self, output: LogOutput) -> Self {
        self.config.output = output;
        self
    }

    /// Sends records to `path`, appending to it.
    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output = LogOutput::File;
        self.config.file_path = Some(path.into());
        self
    }

    /// Sets which span lifecycle events are logged.
    pub fn span_events(mut self, events: SpanEventConfig) -> Self {
        self.config.span_events = events;
        self
    }

    /// Installs the subscriber, ignoring an already installed one.
    pub fn init(self) {
        if let Err(e) = self.try_init() {
            tracing::debug!(error = %e, "Keeping the existing log subscriber");
        }
    }

    /// Installs the subscriber, failing if one is already installed.
    pub fn try_init(self) -> Result<(), TryInitError> {
        let filter = self.filter();
        tracing_subscriber::registry()
            .with(self.layer())
            .with(filter)
            .try_init()
    }

    /// Per-target filters from the config, then the extra directives.
    fn directives(&self) -> Vec<String> {
        self.config
            .filters
            .iter()
            .map(|(target, level)| format!("{target}={level}"))
            .chain(self.extra_directives.iter().cloned())
            .collect()
    }

    fn filter(&self) -> EnvFilter {
        let base = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.config.level.as_str()));
        self.directives()
            .into_iter()
            .fold(base, |filter, directive| match directive.parse() {
                Ok(parsed) => filter.add_directive(parsed),
                Err(e) => {
                    // no subscriber yet, so this cannot go through tracing
                    eprintln!("jibber: ignoring log directive {directive:?}: {e}");
                    filter
                }
            })
    }

    fn writer(&self) -> BoxMakeWriter {
        match (self.config.output, &self.config.file_path) {
            (LogOutput::Stdout, _) => BoxMakeWriter::new(std::io::stdout),
            (LogOutput::Stderr, _) => BoxMakeWriter::new(std::io::stderr),
            (LogOutput::File, Some(path)) => {
                let dir = path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .unwrap_or_else(|| Path::new("."));
                let name = path
                    .file_name()
                    .map_or_else(|| DEFAULT_LOG_FILE.into(), |n| n.to_os_string());
                BoxMakeWriter::new(tracing_appender::rolling::never(dir, name))
            }
            (LogOutput::File, None) => {
                eprintln!("jibber: file logging needs `logging.file_path`, using stdout");
                BoxMakeWriter::new(std::io::stdout)
            }
        }
    }

    fn layer(&self) -> BoxedLayer {
        let writer = self.writer();
        let spans = fmt_span(&self.config.span_events);
        let located = self.config.file_location;
        let base = fmt::layer()
            .with_writer(writer)
            .with_span_events(spans)
            .with_thread_ids(self.config.thread_ids)
            .with_file(located)
            .with_line_number(located);

        match self.config.format {
            LogFormat::Compact => base.compact().boxed(),
            LogFormat::Full => base.boxed(),
            LogFormat::Pretty => base.pretty().boxed(),
            #[cfg(feature = "json-log")]
            LogFormat::Json => base.json().boxed(),
        }
    }
}

fn fmt_span(events: &SpanEventConfig) -> FmtSpan {
    [
        (events.new, FmtSpan::NEW),
        (events.enter, FmtSpan::ENTER),
        (events.exit, FmtSpan::EXIT),
        (events.close, FmtSpan::CLOSE),
    ]
    .into_iter()
    .filter(|(enabled, _)| *enabled)
    .fold(FmtSpan::NONE, |acc, (_, span)| acc | span)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_config_filters_come_before_extra_directives() {
        let config = LoggingConfig {
            level: LogLevel::Debug,
            filters: BTreeMap::from([
                ("jibber_framework".to_string(), LogLevel::Trace),
                ("jibber_core".to_string(), LogLevel::Warn),
            ]),
            ..Default::default()
        };
        let builder = LoggingBuilder::from_config(&config).directive("jibber_runtime=error");

        assert_eq!(
            builder.directives(),
            vec![
                "jibber_core=warn".to_string(),
                "jibber_framework=trace".to_string(),
                "jibber_runtime=error".to_string(),
            ]
        );
    }

    #[test]
    fn test_log_file_switches_output() {
        let builder = LoggingBuilder::new().log_file("/tmp/bot.log");
        assert_eq!(builder.config.output, LogOutput::File);
        assert_eq!(builder.config.file_path, Some(PathBuf::from("/tmp/bot.log")));
    }

    #[test]
    fn test_span_events() {
        assert_eq!(fmt_span(&SpanEventConfig::default()), FmtSpan::NONE);

        let lifecycle = SpanEventConfig {
            new: true,
            close: true,
            ..Default::default()
        };
        assert_eq!(fmt_span(&lifecycle), FmtSpan::NEW | FmtSpan::CLOSE);
    }
}
