//! Environment-derived configuration.
//!
//! Everything the server needs at startup comes from environment variables
//! with sensible defaults, except the vision provider API key which has no
//! safe default and must be set explicitly.

use std::net::SocketAddr;
use std::path::PathBuf;

pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default `RUST_LOG`-style filter when the env var is unset.
pub fn default_log_filter() -> String {
    "receipted=info,tower_http=info".to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("environment variable {0} is required but not set")]
    MissingVar(&'static str),
    #[error("invalid value for {var}: {reason}")]
    InvalidVar { var: &'static str, reason: String },
}

/// Vision extraction provider settings (OpenAI-compatible chat completions).
#[derive(Debug, Clone)]
pub struct VisionConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// Root directory for the database and the stored-image object root.
    pub data_dir: PathBuf,
    /// Externally reachable base URL of this server, used to build the
    /// public image URLs handed to the extraction provider.
    pub public_base_url: String,
    pub vision: VisionConfig,
}

impl Config {
    /// Load configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr: SocketAddr = env_or("RECEIPTED_ADDR", "0.0.0.0:3000")
            .parse()
            .map_err(|e| ConfigError::InvalidVar {
                var: "RECEIPTED_ADDR",
                reason: format!("{e}"),
            })?;

        let data_dir = match std::env::var_os("RECEIPTED_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => default_data_dir(),
        };

        let public_base_url = env_or("RECEIPTED_PUBLIC_URL", &format!("http://{bind_addr}"))
            .trim_end_matches('/')
            .to_string();

        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ConfigError::MissingVar("OPENAI_API_KEY"))?;

        let timeout_secs: u64 = env_or("RECEIPTED_VISION_TIMEOUT_SECS", "120")
            .parse()
            .map_err(|e| ConfigError::InvalidVar {
                var: "RECEIPTED_VISION_TIMEOUT_SECS",
                reason: format!("{e}"),
            })?;

        Ok(Self {
            bind_addr,
            data_dir,
            public_base_url,
            vision: VisionConfig {
                base_url: env_or("OPENAI_BASE_URL", "https://api.openai.com/v1"),
                api_key,
                model: env_or("RECEIPTED_VISION_MODEL", "gpt-4o"),
                timeout_secs,
            },
        })
    }

    /// SQLite database path under the data directory.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("receipted.db")
    }

    /// Root of the stored-image object namespace.
    pub fn object_root(&self) -> PathBuf {
        self.data_dir.join("objects")
    }
}

fn env_or(var: &str, default: &str) -> String {
    std::env::var(var).unwrap_or_else(|_| default.to_string())
}

/// `~/.receipted` unless overridden.
fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".receipted")
}
