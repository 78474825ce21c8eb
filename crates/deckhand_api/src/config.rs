//! Gateway configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default provider base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.render.com/v1";

/// Configuration for the HTTP gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL every request path is appended to
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// User-Agent header sent upstream
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            user_agent: format!("deckhand/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Join the base URL and a relative path without doubling slashes.
    pub fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_join() {
        let config = ApiConfig::new("https://api.example.com/v1/");
        assert_eq!(
            config.url_for("/services/srv-1"),
            "https://api.example.com/v1/services/srv-1"
        );
        assert_eq!(
            ApiConfig::default().url_for("users"),
            "https://api.render.com/v1/users"
        );
    }

    #[test]
    fn test_builder() {
        let config = ApiConfig::default().timeout_secs(5).user_agent("test");
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.user_agent, "test");
    }
}
