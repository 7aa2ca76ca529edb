//! Logging for the conversation engine.
//!
//! Built on the tracing ecosystem, with structured events, optional file
//! output and privacy controls for message content.
//!
//! # Environment Variables
//!
//! - `PARLEY_LOG`: Filter directive (like `RUST_LOG`), e.g., `parley=debug`
//! - `PARLEY_LOG_FORMAT`: Output format for stderr: `pretty`, `json`, `compact`
//! - `PARLEY_LOG_DIR`: Directory for file logs (default `~/.parley/logs`)
//!
//! # Example
//!
//! ```no_run
//! use parley_core::logging;
//!
//! let _guard = logging::init_logging(None)?;
//! # Ok::<(), parley_core::Error>(())
//! ```

use crate::Error;
use crate::config::LoggingConfig as ConfigLoggingConfig;
use std::env;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Log output format for stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Pretty, human-readable output with colors (default for TTY)
    #[default]
    Pretty,
    /// JSON output (one line per event)
    Json,
    /// Compact, single-line output
    Compact,
}

impl LogFormat {
    pub const VALUES: &[LogFormat] = &[LogFormat::Pretty, LogFormat::Json, LogFormat::Compact];

    pub fn parse_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pretty" => Some(LogFormat::Pretty),
            "json" => Some(LogFormat::Json),
            "compact" => Some(LogFormat::Compact),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
            LogFormat::Compact => "compact",
        }
    }
}

/// How much message content may appear in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentLogging {
    /// Never log content.
    None,
    /// Log up to `truncate_length` chars.
    #[default]
    Truncate,
    /// Log full content.
    Full,
}

impl ContentLogging {
    pub fn parse_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" => Some(ContentLogging::None),
            "truncate" => Some(ContentLogging::Truncate),
            "full" => Some(ContentLogging::Full),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentLogging::None => "none",
            ContentLogging::Truncate => "truncate",
            ContentLogging::Full => "full",
        }
    }
}

impl FromStr for ContentLogging {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentLogging::parse_str(s).ok_or_else(|| format!("invalid content logging: {}", s))
    }
}

/// Privacy configuration for message content in logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivacyConfig {
    pub log_content: ContentLogging,
    /// Maximum length for truncated content.
    pub truncate_length: usize,
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        Self { log_content: ContentLogging::default(), truncate_length: 200 }
    }
}

/// Runtime logging settings, bridged from the `[logging]` config table.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default log level for stderr output.
    pub level: String,
    /// Output format for stderr.
    pub format: LogFormat,
    /// Level for the rolling file log; `None` disables it.
    pub file_level: Option<String>,
    pub privacy: PrivacyConfig,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "warn".to_string(), format: LogFormat::default(), file_level: None, privacy: PrivacyConfig::default() }
    }
}

impl From<ConfigLoggingConfig> for LoggingConfig {
    fn from(config: ConfigLoggingConfig) -> Self {
        let format = LogFormat::parse_str(&config.format).unwrap_or_default();
        let log_content = ContentLogging::parse_str(&config.privacy.log_content).unwrap_or_default();

        Self {
            level: config.level,
            format,
            file_level: if config.file.enabled { Some(config.file.level) } else { None },
            privacy: PrivacyConfig { log_content, truncate_length: config.privacy.truncate_length },
        }
    }
}

impl LoggingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_file_logging(mut self, level: impl Into<String>) -> Self {
        self.file_level = Some(level.into());
        self
    }

    pub fn with_privacy(mut self, privacy: PrivacyConfig) -> Self {
        self.privacy = privacy;
        self
    }

    /// Build an EnvFilter from this config and environment variables.
    fn build_env_filter(&self) -> EnvFilter {
        let filter = env::var("PARLEY_LOG")
            .ok()
            .or_else(|| env::var("RUST_LOG").ok())
            .unwrap_or_else(|| self.level.clone());

        EnvFilter::new(filter)
    }

    fn is_tty() -> bool {
        atty::is(atty::Stream::Stderr)
    }

    /// Determine the appropriate format for stderr output.
    fn detect_format(&self) -> LogFormat {
        if let Ok(fmt_str) = env::var("PARLEY_LOG_FORMAT")
            && let Some(fmt) = LogFormat::parse_str(&fmt_str)
        {
            return fmt;
        }

        if self.format == LogFormat::Pretty && !Self::is_tty() { LogFormat::Compact } else { self.format }
    }

    fn get_log_dir() -> Result<PathBuf, Error> {
        if let Ok(custom_dir) = env::var("PARLEY_LOG_DIR") {
            return Ok(PathBuf::from(custom_dir));
        }

        let home = env::var("HOME")
            .or_else(|_| env::var("USERPROFILE"))
            .map_err(|_| Error::Config("Could not determine home directory".to_string()))?;

        Ok(PathBuf::from(home).join(".parley").join("logs"))
    }
}

/// Initialize the global tracing subscriber.
///
/// Installs an environment-based filter (`PARLEY_LOG` or `RUST_LOG`),
/// formatted stderr output and, when enabled, a daily rolling JSON file log.
/// Keep the returned guard alive for the life of the process so buffered
/// file output is flushed on exit.
pub fn init_logging(config: Option<LoggingConfig>) -> Result<Option<WorkerGuard>, Error> {
    let config = config.unwrap_or_default();
    let format = config.detect_format();

    let stderr_layer = match format {
        LogFormat::Pretty => fmt::layer().pretty().with_writer(io::stderr).with_ansi(true).boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(io::stderr).boxed(),
        LogFormat::Compact => fmt::layer().compact().with_writer(io::stderr).boxed(),
    }
    .with_filter(config.build_env_filter());

    let (file_layer, guard) = match &config.file_level {
        Some(level) => {
            let log_dir = LoggingConfig::get_log_dir()?;
            std::fs::create_dir_all(&log_dir)
                .map_err(|e| Error::Config(format!("Failed to create log directory: {}", e)))?;

            let file_appender = tracing_appender::rolling::daily(log_dir, "parley.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer().json().with_writer(non_blocking).with_filter(EnvFilter::new(level));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    Registry::default()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to install logger: {}", e)))?;

    Ok(guard)
}

/// Redact message content according to privacy settings.
pub fn redact_content(content: &str, privacy: &PrivacyConfig) -> String {
    match privacy.log_content {
        ContentLogging::None => "[REDACTED]".to_string(),
        ContentLogging::Full => content.to_string(),
        ContentLogging::Truncate => {
            let total = content.chars().count();
            if total <= privacy.truncate_length {
                return content.to_string();
            }
            let mut truncated = content.chars().take(privacy.truncate_length).collect::<String>();
            truncated.push_str("...");
            truncated.push_str(&format!(" ({} total chars)", total));
            truncated
        }
    }
}
