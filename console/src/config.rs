//! Configuration management for the console.
//!
//! Loads configuration from environment variables with sensible defaults.
//! A `.env` file in the working directory is honoured by the binary before
//! anything here runs.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use ticket_verifier_api::ApiConfig;

/// Default polling interval for the current wave
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default log filter when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "ticket_verifier=info";

/// Console configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend connection settings
    pub api: ApiConfig,
    /// Local storage file for drafts and the selected dashboard tab
    pub storage_path: PathBuf,
    /// How often the order form re-fetches the current wave
    pub poll_interval: Duration,
    /// `tracing` filter directive
    pub log_filter: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// - `TICKET_VERIFIER_API_URL`, `TICKET_VERIFIER_TIMEOUT_SECS` (see [`ApiConfig::from_env`])
    /// - `TICKET_VERIFIER_STORAGE` (default `.ticket-verifier.json`)
    /// - `TICKET_VERIFIER_POLL_SECS` (default 5)
    /// - `RUST_LOG` (default [`DEFAULT_LOG_FILTER`])
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            storage_path: env::var("TICKET_VERIFIER_STORAGE")
                .map_or_else(|_| default_storage_path(), PathBuf::from),
            poll_interval: env::var("TICKET_VERIFIER_POLL_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map_or(DEFAULT_POLL_INTERVAL, Duration::from_secs),
            log_filter: env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            storage_path: default_storage_path(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

fn default_storage_path() -> PathBuf {
    PathBuf::from(".ticket-verifier.json")
}
