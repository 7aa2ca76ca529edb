use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::request::Surface;

/// Server endpoint configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Origin targeted when the page is served from a loopback host
    #[serde(default = "default_dev_origin")]
    pub dev_origin: String,

    /// The page's own origin (same-origin deployment)
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Explicit base URL; overrides both origins when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

fn default_dev_origin() -> String {
    "http://localhost:8000".to_string()
}

fn default_origin() -> String {
    "http://127.0.0.1:8000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { dev_origin: default_dev_origin(), origin: default_origin(), base_url: None }
    }
}

/// Chat request defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChatConfig {
    /// Agent identifier sent with every chat request
    #[serde(default = "default_agent")]
    pub agent: String,

    /// Source tag identifying the calling surface
    #[serde(default = "default_surface")]
    pub surface: Surface,
}

fn default_agent() -> String {
    crate::host::DEFAULT_AGENT.to_string()
}

fn default_surface() -> Surface {
    Surface::Cli
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self { agent: default_agent(), surface: default_surface() }
    }
}

/// Rendering configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenderConfig {
    /// Syntax highlighting theme name
    #[serde(default = "default_theme")]
    pub theme: String,

    /// Fixed language of upload analysis code blocks
    #[serde(default = "default_upload_language")]
    pub upload_language: String,
}

fn default_theme() -> String {
    "base16-ocean.dark".to_string()
}

fn default_upload_language() -> String {
    "python".to_string()
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { theme: default_theme(), upload_language: default_upload_language() }
    }
}

/// Speech capture configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoiceConfig {
    /// External recognizer command (program followed by arguments).
    /// Voice capture is unavailable when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
}

impl VoiceConfig {
    pub fn is_available(&self) -> bool {
        self.command.as_ref().is_some_and(|c| !c.is_empty())
    }
}

/// Logging configuration (`[logging]` table)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,

    #[serde(default)]
    pub file: FileLoggingConfig,

    #[serde(default)]
    pub privacy: PrivacyLoggingConfig,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: FileLoggingConfig::default(),
            privacy: PrivacyLoggingConfig::default(),
        }
    }
}

/// File logging configuration (`[logging.file]` table)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileLoggingConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_file_log_level")]
    pub level: String,
}

fn default_file_log_level() -> String {
    "debug".to_string()
}

impl Default for FileLoggingConfig {
    fn default() -> Self {
        Self { enabled: false, level: default_file_log_level() }
    }
}

/// Privacy controls for message content in logs (`[logging.privacy]` table)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrivacyLoggingConfig {
    /// `none`, `truncate` or `full`
    #[serde(default = "default_log_content")]
    pub log_content: String,

    #[serde(default = "default_truncate_length")]
    pub truncate_length: usize,
}

fn default_log_content() -> String {
    "truncate".to_string()
}

fn default_truncate_length() -> usize {
    200
}

impl Default for PrivacyLoggingConfig {
    fn default() -> Self {
        Self { log_content: default_log_content(), truncate_length: default_truncate_length() }
    }
}

/// Root configuration structure for parley.toml
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub chat: ChatConfig,

    #[serde(default)]
    pub render: RenderConfig,

    #[serde(default)]
    pub voice: VoiceConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML string
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(toml_str).map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        check_origin("server.dev_origin", &self.server.dev_origin)?;
        check_origin("server.origin", &self.server.origin)?;
        if let Some(base_url) = &self.server.base_url {
            check_origin("server.base_url", base_url)?;
        }

        if self.chat.agent.trim().is_empty() {
            return Err(ConfigError::Empty("chat.agent").into());
        }

        if self.render.theme.trim().is_empty() {
            return Err(ConfigError::Empty("render.theme").into());
        }

        if let Some(command) = &self.voice.command
            && command.first().is_none_or(|program| program.trim().is_empty())
        {
            return Err(ConfigError::Empty("voice.command").into());
        }

        Ok(())
    }

    /// Get example configuration (as a string)
    pub fn example() -> &'static str {
        r#"# parley configuration
# Every table is optional; the values below are the defaults.

[server]
# Origin used when the page host is a loopback address
dev_origin = "http://localhost:8000"
# The page's own origin
origin = "http://127.0.0.1:8000"
# Explicit base URL, overriding both origins (optional)
# base_url = "https://fred.example.com"

[chat]
# Agent identifier sent with each chat request
agent = "chat"
# Source tag: "web", "vscode" or "cli"
surface = "cli"

[render]
# Syntax highlighting theme
theme = "base16-ocean.dark"
# Language used for upload analysis blocks
upload_language = "python"

[voice]
# External speech recognizer; prints one transcript line on stdout (optional)
# command = ["whisper-listen", "--once"]

[logging]
level = "warn"
format = "pretty"

[logging.file]
enabled = false
level = "debug"

[logging.privacy]
# "none", "truncate" or "full"
log_content = "truncate"
truncate_length = 200
"#
    }
}

fn check_origin(field: &'static str, value: &str) -> Result<()> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidOrigin { field, value: value.to_string() }.into())
    }
}

/// Configuration-specific errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Origin is not an http(s) URL
    #[error("{field} must be an http(s) URL, got '{value}'")]
    InvalidOrigin { field: &'static str, value: String },

    /// Required value is empty
    #[error("{0} must not be empty")]
    Empty(&'static str),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    TomlParse(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::TomlParse(err.to_string())
    }
}

impl From<ConfigError> for crate::Error {
    fn from(err: ConfigError) -> Self {
        crate::Error::Config(err.to_string())
    }
}
