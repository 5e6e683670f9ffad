//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.calbot/config.json`) and environment.
//! Only the backend connection is configurable; conversation state lives in memory
//! for the life of a session.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Hosted backend used when nothing else is configured.
const DEFAULT_BACKEND_URL: &str = "https://ai-calendar-assistant-grdx.onrender.com";

/// Session id used when none is configured. One id per client instance; the
/// backend keys its conversation memory on it.
pub const DEFAULT_SESSION_ID: &str = "calbot-session";

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Backend connection settings.
    #[serde(default)]
    pub backend: BackendConfig,
}

/// Backend base URL, session id, and request timeouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfig {
    /// Chat backend base URL. Overridden by CALBOT_BACKEND_URL env when set.
    #[serde(default = "default_backend_url")]
    pub base_url: String,

    /// Session id sent as the `session_id` query parameter on every chat turn.
    pub session_id: Option<String>,

    /// Timeout for POST /chat in seconds. The hosted backend can take 50-60s
    /// to boot after idling, so this stays above a quick-request timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Timeout for GET /health in seconds.
    #[serde(default = "default_health_timeout_secs")]
    pub health_timeout_secs: u64,
}

fn default_backend_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    35
}

fn default_health_timeout_secs() -> u64 {
    10
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            session_id: None,
            request_timeout_secs: default_request_timeout_secs(),
            health_timeout_secs: default_health_timeout_secs(),
        }
    }
}

/// Resolve the backend base URL: env CALBOT_BACKEND_URL overrides config.
/// Trailing slashes are trimmed so endpoint paths can be appended directly.
pub fn resolve_backend_url(config: &Config) -> String {
    std::env::var("CALBOT_BACKEND_URL")
        .ok()
        .and_then(|s| {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        })
        .unwrap_or_else(|| config.backend.base_url.clone())
        .trim_end_matches('/')
        .to_string()
}

/// Resolve the session id: configured value or the fixed default.
pub fn resolve_session_id(config: &Config) -> String {
    config
        .backend
        .session_id
        .as_ref()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_SESSION_ID.to_string())
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("CALBOT_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".calbot").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the default path (or CALBOT_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
