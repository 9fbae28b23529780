use std::str::FromStr;

use serde::Deserialize;

use crate::types::Role;

/// Which durable key-value backend holds per-user read markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadStateBackendKind {
    File,
    Redis,
    Memory,
}

impl FromStr for ReadStateBackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            other => Err(anyhow::anyhow!(
                "READ_STATE_BACKEND must be one of file, redis, memory (got '{}')",
                other
            )),
        }
    }
}

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Base URL of the HR REST backend (e.g. `https://hr.example.com/api`)
    pub hr_api_base_url: String,

    /// HR backend token of the user watched by the poller daemon. The API
    /// server ignores it and forwards each caller's own token.
    pub hr_api_token: Option<String>,

    /// Per-request timeout for collaborator calls in milliseconds (default: 10000)
    pub hr_api_timeout_ms: u64,

    /// Feed re-aggregation interval in seconds (default: 60)
    pub feed_poll_interval_secs: u64,

    /// API sessions without a request for this long are ended (default: 900)
    pub feed_session_idle_secs: u64,

    /// Read-state backend (default: file)
    pub read_state_backend: ReadStateBackendKind,

    /// Directory used by the file read-state backend
    pub read_state_dir: String,

    /// Redis connection string (redis read-state backend)
    pub redis_url: String,

    /// JWT secret for API authentication
    pub jwt_secret: String,

    /// JWT token expiry in hours
    pub jwt_expiry_hours: u64,

    /// Listen address of the API server
    pub api_bind_addr: String,

    /// Identity watched by the standalone poller daemon
    pub feed_user_id: Option<String>,
    pub feed_role: Option<Role>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            hr_api_base_url: std::env::var("HR_API_BASE_URL")
                .map_err(|_| anyhow::anyhow!("HR_API_BASE_URL environment variable is required"))?,
            hr_api_token: std::env::var("HR_API_TOKEN").ok(),
            hr_api_timeout_ms: std::env::var("HR_API_TIMEOUT_MS")
                .unwrap_or_else(|_| "10000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("HR_API_TIMEOUT_MS must be a valid u64"))?,
            feed_poll_interval_secs: std::env::var("FEED_POLL_INTERVAL_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| anyhow::anyhow!("FEED_POLL_INTERVAL_SECS must be a positive u64"))?,
            feed_session_idle_secs: std::env::var("FEED_SESSION_IDLE_SECS")
                .unwrap_or_else(|_| "900".to_string())
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| anyhow::anyhow!("FEED_SESSION_IDLE_SECS must be a positive u64"))?,
            read_state_backend: std::env::var("READ_STATE_BACKEND")
                .unwrap_or_else(|_| "file".to_string())
                .parse()?,
            read_state_dir: std::env::var("READ_STATE_DIR")
                .unwrap_or_else(|_| ".hrdesk/read-state".to_string()),
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            jwt_secret: std::env::var("JWT_SECRET").unwrap_or_default(),
            jwt_expiry_hours: std::env::var("JWT_EXPIRY_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("JWT_EXPIRY_HOURS must be a valid u64"))?,
            api_bind_addr: std::env::var("API_BIND_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            feed_user_id: std::env::var("FEED_USER_ID")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            feed_role: std::env::var("FEED_ROLE")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(|s| s.parse::<Role>())
                .transpose()
                .map_err(|e| anyhow::anyhow!("FEED_ROLE is invalid: {}", e))?,
        })
    }

    /// Require a non-empty JWT secret (only the API server needs one).
    pub fn require_jwt_secret(&self) -> anyhow::Result<&str> {
        if self.jwt_secret.is_empty() {
            return Err(anyhow::anyhow!(
                "JWT_SECRET environment variable is required"
            ));
        }
        Ok(&self.jwt_secret)
    }
}
