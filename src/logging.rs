//! Diagnostics for pminmax.
//!
//! The report is the only thing written to stdout, so `--format json` output
//! can be piped straight into another tool. Every tracing event goes to
//! stderr. The default level is WARN, which keeps a normal run silent on
//! stderr; `-v` adds per-worker exits and the run summary, `-vv` adds forks
//! and channel setup.
//!
//! Command-line flags win over the environment:
//!
//! - `PMM_LOG`, then `RUST_LOG`: full filter directive
//! - `PMM_LOG_LEVEL`: bare level, used when no filter is given
//! - `PMM_LOG_FORMAT`: `pretty`, `compact` or `json`
//!
//! ```no_run
//! use pminmax::logging::{LogConfig, init};
//!
//! init(LogConfig::default().with_env_overrides());
//! ```

use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Shape of each stderr log line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-field lines for a terminal
    #[default]
    Pretty,
    /// One short line per event
    Compact,
    /// One JSON object per event
    Json,
}

impl LogFormat {
    const NAMES: &'static str = "pretty, compact, json";

    fn name(self) -> &'static str {
        match self {
            Self::Pretty => "pretty",
            Self::Compact => "compact",
            Self::Json => "json",
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "full" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            _ => Err(format!(
                "unknown log format '{}' (expected one of: {})",
                s,
                Self::NAMES
            )),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// How the stderr subscriber is built.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Level used when no filter directive is set.
    pub level: Level,
    pub format: LogFormat,
    /// Emit an event when each span closes, with its duration.
    pub span_events: bool,
    /// `EnvFilter` directive; takes precedence over `level`.
    pub filter: Option<String>,
    pub show_target: bool,
    /// The deadline timer runs on its own thread; ids tell it apart.
    pub show_thread_ids: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            format: LogFormat::Pretty,
            span_events: false,
            filter: None,
            show_target: true,
            show_thread_ids: false,
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    pub fn with_filter(mut self, filter: String) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Fill in whatever the command line left unset from `PMM_*` / `RUST_LOG`.
    pub fn with_env_overrides(self) -> Self {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    fn with_env_from(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if self.filter.is_none() {
            self.filter = var("PMM_LOG").or_else(|| var("RUST_LOG"));
        }

        if self.filter.is_none()
            && let Some(level) = var("PMM_LOG_LEVEL").as_deref().and_then(parse_level)
        {
            self.level = level;
        }

        if let Some(format) = var("PMM_LOG_FORMAT").and_then(|f| f.parse().ok()) {
            self.format = format;
        }

        self
    }

    /// A bad directive falls back to `level` rather than disabling logs.
    fn build_filter(&self) -> EnvFilter {
        let by_level = || EnvFilter::new(self.level.as_str().to_ascii_lowercase());
        match self.filter.as_deref() {
            Some(directive) => EnvFilter::try_new(directive).unwrap_or_else(|e| {
                eprintln!("warning: ignoring log filter '{}': {}", directive, e);
                by_level()
            }),
            None => by_level(),
        }
    }
}

fn parse_level(s: &str) -> Option<Level> {
    match s.to_ascii_lowercase().as_str() {
        "warning" => Some(Level::WARN),
        other => other.parse().ok(),
    }
}

/// Install the stderr subscriber. Later calls are no-ops.
pub fn init(config: LogConfig) {
    let span_events = if config.span_events {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let base = fmt::layer()
        .with_writer(std::io::stderr)
        .with_span_events(span_events)
        .with_target(config.show_target)
        .with_thread_ids(config.show_thread_ids);

    let layer = match config.format {
        LogFormat::Json => base.json().boxed(),
        LogFormat::Compact => base.compact().boxed(),
        LogFormat::Pretty => base.boxed(),
    };

    // Err only when a subscriber is already installed.
    let _ = tracing_subscriber::registry()
        .with(config.build_filter())
        .with(layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert_eq!("full".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert_eq!("compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("invalid".parse::<LogFormat>().is_err());
        assert_eq!(LogFormat::Compact.to_string(), "compact");
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("error"), Some(Level::ERROR));
        assert_eq!(parse_level("warning"), Some(Level::WARN));
        assert_eq!(parse_level("INFO"), Some(Level::INFO));
        assert_eq!(parse_level("trace"), Some(Level::TRACE));
        assert_eq!(parse_level("invalid"), None);
    }

    #[test]
    fn test_bad_filter_falls_back_to_level() {
        let config = LogConfig::new().with_filter("pminmax=[".to_string());
        // Must not panic; the level-based filter is used instead.
        let _ = config.build_filter();
    }

    #[test]
    fn test_log_config_defaults() {
        let config = LogConfig::default();
        assert_eq!(config.level, Level::WARN);
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.filter.is_none());
        assert!(!config.span_events);
        assert!(config.show_target);
    }

    #[test]
    fn test_env_filter_precedence() {
        let config = LogConfig::new().with_env_from(env(&[
            ("PMM_LOG", "pminmax=debug"),
            ("RUST_LOG", "trace"),
            ("PMM_LOG_LEVEL", "error"),
        ]));
        assert_eq!(config.filter.as_deref(), Some("pminmax=debug"));
        assert_eq!(config.level, Level::WARN);

        let config = LogConfig::new().with_env_from(env(&[("RUST_LOG", "trace")]));
        assert_eq!(config.filter.as_deref(), Some("trace"));
    }

    #[test]
    fn test_cli_filter_wins_over_env() {
        let config = LogConfig::new()
            .with_filter("info".to_string())
            .with_env_from(env(&[("PMM_LOG", "trace"), ("PMM_LOG_LEVEL", "error")]));
        assert_eq!(config.filter.as_deref(), Some("info"));
    }

    #[test]
    fn test_env_level_and_format() {
        let config = LogConfig::new().with_env_from(env(&[
            ("PMM_LOG_LEVEL", "debug"),
            ("PMM_LOG_FORMAT", "json"),
        ]));
        assert_eq!(config.level, Level::DEBUG);
        assert_eq!(config.format, LogFormat::Json);

        let config = LogConfig::new().with_env_from(env(&[("PMM_LOG_FORMAT", "bogus")]));
        assert_eq!(config.format, LogFormat::Pretty);
    }

    #[test]
    fn test_log_config_builder() {
        let config = LogConfig::new()
            .with_level(Level::DEBUG)
            .with_format(LogFormat::Json)
            .with_span_events(true);

        assert_eq!(config.level, Level::DEBUG);
        assert_eq!(config.format, LogFormat::Json);
        assert!(config.span_events);
    }

    #[test]
    fn test_init_is_idempotent() {
        init(LogConfig::default());
        init(LogConfig::default().with_format(LogFormat::Compact));
        init(LogConfig::default().with_format(LogFormat::Json));
    }
}
