//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `lorescript.toml` in the working directory unless a path is
//! given on the command line. Every field has a sensible default so the
//! file is optional. Environment variables take precedence over file values.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use lorescript_adapter_script_lua_mlua::LuaRunnerConfig;
use lorescript_adapter_script_lua_mlua::config::DEFAULT_MEMORY_LIMIT_BYTES;
use lorescript_domain::lorebook::{AttachmentPolicy, ParsePolicyError};

const DEFAULT_PATH: &str = "lorescript.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where lorebooks and session state live.
    pub storage: StorageConfig,
    /// Script attachment and interpreter settings.
    pub script: ScriptConfig,
    /// Event bus settings.
    pub events: EventsConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Filesystem host configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding one `<name>.json` file per lorebook.
    pub lorebook_dir: PathBuf,
    /// JSON file mirroring the host session.
    pub session_file: PathBuf,
}

/// Script configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    /// Which attachment wins when the two storage locations disagree.
    pub attachment_policy: AttachmentPolicy,
    /// Interpreter heap ceiling in bytes; `0` disables the limit.
    pub memory_limit_bytes: usize,
}

/// Event bus configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Queue capacity for host events and batches. A full queue makes the
    /// sender wait.
    pub capacity: usize,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `path`, or from `lorescript.toml` when no
    /// path is given, then apply environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly given file is missing, if the TOML
    /// is malformed, or if the resulting configuration is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path, true)?,
            None => Self::from_file(Path::new(DEFAULT_PATH), false)?,
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path, required: bool) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound && !required => {
                Ok(Self::default())
            }
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(val) = lookup("LORESCRIPT_LOREBOOK_DIR") {
            self.storage.lorebook_dir = PathBuf::from(val);
        }
        if let Some(val) = lookup("LORESCRIPT_SESSION_FILE") {
            self.storage.session_file = PathBuf::from(val);
        }
        if let Some(val) = lookup("LORESCRIPT_ATTACHMENT_POLICY") {
            self.script.attachment_policy = val.parse()?;
        }
        if let Some(val) = lookup("LORESCRIPT_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = lookup("RUST_LOG") {
            self.logging.filter = val;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.lorebook_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "lorebook_dir must not be empty".to_string(),
            ));
        }
        if self.events.capacity == 0 {
            return Err(ConfigError::Validation(
                "event capacity must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Interpreter limits derived from the script section.
    #[must_use]
    pub fn runner_config(&self) -> LuaRunnerConfig {
        LuaRunnerConfig::from_limit_bytes(self.script.memory_limit_bytes)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            lorebook_dir: PathBuf::from("worlds"),
            session_file: PathBuf::from("session.json"),
        }
    }
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            attachment_policy: AttachmentPolicy::default(),
            memory_limit_bytes: DEFAULT_MEMORY_LIMIT_BYTES,
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self { capacity: 64 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "lorescriptd=info,lorescript=info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Unknown policy name in the environment.
    #[error("invalid LORESCRIPT_ATTACHMENT_POLICY")]
    Policy(#[from] ParsePolicyError),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
