//! Client configuration.
//!
//! The service base URL is injected configuration: it comes from the
//! environment (`PIPETTE_SERVICE_URL`) or from the caller, never hard-coded
//! at call sites. The local-development fallback is always overridable.

/// Environment variable holding the analysis service base URL.
pub const SERVICE_URL_ENV: &str = "PIPETTE_SERVICE_URL";

/// Fallback base URL for local development.
const DEV_BASE_URL: &str = "http://localhost:8000";

/// Configuration for the analysis-service client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the analysis service (e.g., <https://analysis.example.com>)
    pub base_url: String,

    /// How long to wait between status polls
    pub poll_interval_ms: u64,

    /// Timeout for each individual request in milliseconds. The service
    /// contract defines no timeout; a hung request is treated as a transport
    /// failure after this bound.
    pub request_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEV_BASE_URL.to_string(),
            poll_interval_ms: 5000,      // Poll every 5 seconds by default
            request_timeout_ms: 30_000,  // 30 seconds
        }
    }
}

impl ClientConfig {
    /// Build a configuration from the process environment.
    ///
    /// Falls back to the local-development base URL when `PIPETTE_SERVICE_URL`
    /// is unset; the fallback is logged so a misconfigured deployment is
    /// visible.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = match lookup(SERVICE_URL_ENV) {
            Some(url) if !url.is_empty() => url,
            _ => {
                tracing::warn!(
                    fallback = DEV_BASE_URL,
                    env = SERVICE_URL_ENV,
                    "Service base URL not configured, using development fallback"
                );
                DEV_BASE_URL.to_string()
            }
        };

        Self {
            base_url,
            ..Self::default()
        }
    }

    /// Override the service base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the poll interval.
    pub fn with_poll_interval_ms(mut self, interval_ms: u64) -> Self {
        self.poll_interval_ms = interval_ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_uses_dev_fallback_and_five_second_polls() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.poll_interval_ms, 5000);
    }

    #[test]
    fn test_with_base_url_overrides_fallback() {
        let config = ClientConfig::default().with_base_url("https://analysis.example.com");
        assert_eq!(config.base_url, "https://analysis.example.com");
    }

    #[test]
    fn test_lookup_overrides_base_url() {
        let config = ClientConfig::from_lookup(|key| {
            (key == SERVICE_URL_ENV).then(|| "https://analysis.example.com".to_string())
        });
        assert_eq!(config.base_url, "https://analysis.example.com");
    }

    #[test]
    fn test_empty_env_value_falls_back() {
        let config = ClientConfig::from_lookup(|_| Some(String::new()));
        assert_eq!(config.base_url, "http://localhost:8000");
    }
}
