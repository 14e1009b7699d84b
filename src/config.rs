use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://pangbank-api.genoscope.cns.fr";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        match std::env::var("PANGBANK_API_URL") {
            Ok(url) if !url.trim().is_empty() => Self::default().with_base_url(&url),
            _ => Self::default(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let config = ApiConfig::default().with_base_url("https://example.org/api///");
        assert_eq!(config.base_url, "https://example.org/api");
        assert_eq!(
            config.endpoint("/collections/"),
            "https://example.org/api/collections/"
        );
    }

    #[test]
    fn default_timeout() {
        let config = ApiConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.base_url, DEFAULT_API_URL);
    }
}
