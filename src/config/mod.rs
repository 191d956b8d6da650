use crate::channel::protocol::DEFAULT_EVENT;
use crate::channel::server::DEFAULT_LISTEN_ADDR;
use crate::error::{DevLogsError, Result};
use crate::logs::{StoreOptions, DEFAULT_KEEP_LINES, DEFAULT_MAX_LOG_SIZE};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Default name of the config file looked up in the project root
pub const CONFIG_FILE_NAME: &str = "devlogs.toml";

/// Capture configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DevLogsConfig {
    /// Directory holding `browser.log` and `server.log`
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// File size in bytes that triggers rotation
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Lines kept when a file is rotated
    #[serde(default = "default_keep_lines")]
    pub keep_lines: usize,

    /// Capture browser console output and errors
    #[serde(default = "default_enabled")]
    pub browser: bool,

    /// Capture dev server console output and errors
    #[serde(default = "default_enabled")]
    pub server: bool,

    /// Explicit browser entry files; conventions are used when empty
    #[serde(default)]
    pub entries: Vec<String>,

    /// Channel event carrying browser diagnostics
    #[serde(default = "default_event")]
    pub event: String,

    /// Address of the channel relay
    #[serde(default = "default_listen")]
    pub listen: String,
}

// Default value functions for serde
fn default_log_dir() -> PathBuf {
    PathBuf::from(".devlogs")
}

fn default_max_file_size() -> u64 {
    DEFAULT_MAX_LOG_SIZE
}

fn default_keep_lines() -> usize {
    DEFAULT_KEEP_LINES
}

fn default_enabled() -> bool {
    true
}

fn default_event() -> String {
    DEFAULT_EVENT.to_string()
}

fn default_listen() -> String {
    DEFAULT_LISTEN_ADDR.to_string()
}

impl Default for DevLogsConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            max_file_size: default_max_file_size(),
            keep_lines: default_keep_lines(),
            browser: default_enabled(),
            server: default_enabled(),
            entries: Vec::new(),
            event: default_event(),
            listen: default_listen(),
        }
    }
}

impl DevLogsConfig {
    /// Load configuration from a file (supports TOML and JSON)
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| DevLogsError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");

        let mut config = match extension {
            "toml" => Self::parse_toml(&contents)?,
            "json" => Self::parse_json(&contents)?,
            _ => {
                return Err(DevLogsError::InvalidConfig(format!(
                    "Unsupported file format: {}. Use .toml or .json",
                    extension
                )))
            }
        };

        config.expand_env_vars();
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    fn parse_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| DevLogsError::InvalidConfig(format!("Failed to parse TOML: {}", e)))
    }

    fn parse_json(contents: &str) -> Result<Self> {
        serde_json::from_str(contents)
            .map_err(|e| DevLogsError::InvalidConfig(format!("Failed to parse JSON: {}", e)))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.log_dir.as_os_str().is_empty() {
            return Err(DevLogsError::ConfigValidationError(
                "log_dir must not be empty".to_string(),
            ));
        }

        if self.max_file_size == 0 {
            return Err(DevLogsError::ConfigValidationError(
                "max_file_size must be greater than 0".to_string(),
            ));
        }

        if self.keep_lines == 0 {
            return Err(DevLogsError::ConfigValidationError(
                "keep_lines must be at least 1".to_string(),
            ));
        }

        if self.event.trim().is_empty() {
            return Err(DevLogsError::ConfigValidationError(
                "event must not be empty".to_string(),
            ));
        }

        if self.listen.parse::<SocketAddr>().is_err() {
            return Err(DevLogsError::ConfigValidationError(format!(
                "Invalid listen address: {}",
                self.listen
            )));
        }

        Ok(())
    }

    /// Rotation settings for the store
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            max_file_size: self.max_file_size,
            keep_lines: self.keep_lines,
        }
    }

    /// Storage directory, resolved against `root` when relative
    pub fn resolved_log_dir(&self, root: &Path) -> PathBuf {
        if self.log_dir.is_absolute() {
            self.log_dir.clone()
        } else {
            root.join(&self.log_dir)
        }
    }

    fn expand_env_vars(&mut self) {
        self.log_dir = PathBuf::from(expand_env_in_string(&self.log_dir.to_string_lossy()));
    }
}

/// Expand `$VAR` and `${VAR}` references; unknown variables are left as written
pub fn expand_env_in_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }

        let braced = chars.peek() == Some(&'{');
        if braced {
            chars.next();
        }

        let mut name = String::new();
        while let Some(&c) = chars.peek() {
            if braced && c == '}' {
                break;
            }
            if !braced && !(c.is_ascii_alphanumeric() || c == '_') {
                break;
            }
            name.push(c);
            chars.next();
        }
        let closed = braced && chars.peek() == Some(&'}');
        if closed {
            chars.next();
        }

        match std::env::var(&name) {
            Ok(value) if !name.is_empty() && (closed || !braced) => result.push_str(&value),
            _ => {
                result.push('$');
                if braced {
                    result.push('{');
                }
                result.push_str(&name);
                if closed {
                    result.push('}');
                }
            }
        }
    }

    result
}
