use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use dirs::home_dir;
use serde::Deserialize;
use studio_channel::BackoffPolicy;
use studio_protocol::terminal::TerminalSize;

use crate::error::Result;
use crate::error::StudioErr;

/// Environment variable that overrides `api_base` from the config file.
pub const API_BASE_ENV_VAR: &str = "STUDIO_API_BASE";

const DEFAULT_API_BASE: &str = "http://localhost:5050";

/// What re-opening an already-open document does to its buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReopenPolicy {
    /// Only activate the tab; unsaved edits survive.
    #[default]
    Preserve,
    /// Replace buffer and saved baseline with freshly fetched content.
    Reseed,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    pub short_delay_ms: u64,
    pub long_delay_ms: u64,
    /// Consecutive failures tolerated before switching to the long delay.
    pub failure_threshold: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        let policy = BackoffPolicy::default();
        Self {
            short_delay_ms: policy.short_delay.as_millis() as u64,
            long_delay_ms: policy.long_delay.as_millis() as u64,
            failure_threshold: policy.failure_threshold,
        }
    }
}

impl ReconnectConfig {
    pub fn policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            short_delay: Duration::from_millis(self.short_delay_ms),
            long_delay: Duration::from_millis(self.long_delay_ms),
            failure_threshold: self.failure_threshold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    pub cols: u16,
    pub rows: u16,
    /// Send a newline on every (re)connect to coax a prompt out of the shell.
    pub wake_on_connect: bool,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            cols: 80,
            rows: 24,
            wake_on_connect: true,
        }
    }
}

impl TerminalConfig {
    pub fn size(&self) -> TerminalSize {
        TerminalSize {
            cols: self.cols,
            rows: self.rows,
        }
    }
}

/// Application configuration loaded from disk and merged with overrides.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base: String,
    pub session_id: String,
    pub quick_open_limit: usize,
    pub reopen_policy: ReopenPolicy,
    pub health_poll_interval_ms: u64,
    pub format_line_length: u32,
    pub reconnect: ReconnectConfig,
    pub terminal: TerminalConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            session_id: "local".to_string(),
            quick_open_limit: 50,
            reopen_policy: ReopenPolicy::default(),
            health_poll_interval_ms: 5000,
            format_line_length: 88,
            reconnect: ReconnectConfig::default(),
            terminal: TerminalConfig::default(),
        }
    }
}

/// Optional overrides for user configuration (e.g., from CLI flags).
#[derive(Default, Debug, Clone)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub api_base: Option<String>,
    pub session_id: Option<String>,
    pub reopen_policy: Option<ReopenPolicy>,
}

impl Config {
    /// Load configuration, applying overrides. Merges `~/.studio/config.toml`
    /// (or `overrides.config_path`), the `STUDIO_API_BASE` environment
    /// variable and any values in `overrides` (highest precedence).
    pub fn load_with_overrides(overrides: ConfigOverrides) -> Result<Self> {
        let path = match &overrides.config_path {
            Some(path) => path.clone(),
            None => studio_dir()?.join("config.toml"),
        };
        let file = Self::load_from_path(&path)?;
        let env_api_base = std::env::var(API_BASE_ENV_VAR).ok();
        Ok(file.merge(env_api_base, overrides))
    }

    /// A missing file yields the defaults; an unreadable or malformed one is
    /// an error.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(StudioErr::ConfigRead {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        toml::from_str(&contents).map_err(|source| StudioErr::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn merge(mut self, env_api_base: Option<String>, overrides: ConfigOverrides) -> Self {
        if let Some(api_base) = env_api_base.filter(|v| !v.trim().is_empty()) {
            self.api_base = api_base;
        }
        if let Some(api_base) = overrides.api_base {
            self.api_base = api_base;
        }
        if let Some(session_id) = overrides.session_id {
            self.session_id = session_id;
        }
        if let Some(policy) = overrides.reopen_policy {
            self.reopen_policy = policy;
        }
        self
    }

    pub fn chat_url(&self) -> String {
        studio_channel::websocket_url(&self.api_base, &format!("/ws/session/{}", self.session_id))
    }

    pub fn terminal_url(&self) -> String {
        studio_channel::websocket_url(&self.api_base, "/ws/terminal")
    }

    pub fn health_url(&self) -> String {
        studio_channel::health_url(&self.api_base)
    }

    pub fn backoff_policy(&self) -> BackoffPolicy {
        self.reconnect.policy()
    }

    pub fn health_poll_interval(&self) -> Duration {
        Duration::from_millis(self.health_poll_interval_ms)
    }
}

/// Returns the path to the studio configuration directory, `~/.studio`.
/// Does not verify that the directory exists.
pub fn studio_dir() -> Result<PathBuf> {
    let mut p = home_dir().ok_or(StudioErr::NoHomeDir)?;
    p.push(".studio");
    Ok(p)
}
