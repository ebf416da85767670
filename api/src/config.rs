//! Client configuration.
//!
//! Loads the backend base URL and request timeout from environment variables
//! with defaults matching a local backend.

use std::env;
use std::time::Duration;

/// Default backend base URL (local development server)
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";

/// Default overall request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for the backend API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL every endpoint path is appended to (no trailing slash)
    pub base_url: String,
    /// Overall timeout applied to every request
    pub timeout: Duration,
}

impl ApiConfig {
    /// Create a configuration for the given base URL with the default timeout
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(base_url.into()),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the request timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load configuration from the environment.
    ///
    /// - `TICKET_VERIFIER_API_URL` (default [`DEFAULT_BASE_URL`])
    /// - `TICKET_VERIFIER_TIMEOUT_SECS` (default 10)
    #[must_use]
    pub fn from_env() -> Self {
        let base_url =
            env::var("TICKET_VERIFIER_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let timeout = env::var("TICKET_VERIFIER_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map_or(DEFAULT_TIMEOUT, Duration::from_secs);

        Self::new(base_url).with_timeout(timeout)
    }

    /// Absolute URL for an endpoint path such as `/orders`
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

fn normalize_base_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
