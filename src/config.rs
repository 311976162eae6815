#![allow(missing_docs)]

use url::Url;

use crate::error::{OrshotError, Result};
use crate::types::Credentials;
use crate::{DEFAULT_DOMAIN, DEFAULT_SOURCE};

#[derive(Debug, Clone)]
pub struct OrshotConfig {
    pub token: String,
    pub domain: String,
    /// Integration tag sent as `source` in render requests.
    pub source: String,
    pub timeout_secs: u64,
}

impl Default for OrshotConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            domain: DEFAULT_DOMAIN.to_string(),
            source: DEFAULT_SOURCE.to_string(),
            timeout_secs: 120,
        }
    }
}

impl OrshotConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..Default::default()
        }
    }

    /// Read configuration from `ORSHOT_*` environment variables.
    ///
    /// `ORSHOT_API_TOKEN` is required; `ORSHOT_DOMAIN`, `ORSHOT_SOURCE` and
    /// `ORSHOT_TIMEOUT_SECS` fall back to defaults.
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("ORSHOT_API_TOKEN")
            .map_err(|_| OrshotError::config("ORSHOT_API_TOKEN is not configured"))?;

        let mut config = Self::new(token);

        if let Ok(domain) = std::env::var("ORSHOT_DOMAIN") {
            config = config.with_domain(domain);
        }
        if let Ok(source) = std::env::var("ORSHOT_SOURCE") {
            config = config.with_source(source);
        }
        if let Ok(raw) = std::env::var("ORSHOT_TIMEOUT_SECS") {
            let secs = raw.parse().map_err(|_| {
                OrshotError::config(format!("ORSHOT_TIMEOUT_SECS is not a number: {}", raw))
            })?;
            config = config.with_timeout_secs(secs);
        }

        Ok(config)
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.token, &self.domain)
    }

    pub fn validate(&self) -> Result<()> {
        if self.token.is_empty() {
            return Err(OrshotError::config("API token is required"));
        }

        let url = Url::parse(&self.domain)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(OrshotError::config(format!(
                "domain must be an http(s) URL, got {}",
                self.domain
            )));
        }

        if self.timeout_secs == 0 {
            return Err(OrshotError::config("timeout must be greater than zero"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_new() {
        let config = OrshotConfig::new("test-token");
        assert_eq!(config.token, "test-token");
        assert_eq!(config.domain, "https://api.orshot.com");
        assert_eq!(config.source, "n8n-integration");
        assert_eq!(config.timeout_secs, 120);
    }

    #[test]
    fn test_config_builders() {
        let config = OrshotConfig::new("t")
            .with_domain("http://localhost:8080")
            .with_source("elizaos")
            .with_timeout_secs(5);
        assert_eq!(config.domain, "http://localhost:8080");
        assert_eq!(config.source, "elizaos");
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.credentials().domain, "http://localhost:8080");
    }

    #[test]
    fn test_config_validate_empty_token() {
        assert!(OrshotConfig::default().validate().is_err());
    }

    #[test]
    fn test_config_validate_bad_domain() {
        assert!(OrshotConfig::new("t").with_domain("not a url").validate().is_err());
        assert!(OrshotConfig::new("t")
            .with_domain("ftp://api.orshot.com")
            .validate()
            .is_err());
    }

    #[test]
    fn test_config_validate_zero_timeout() {
        assert!(OrshotConfig::new("t").with_timeout_secs(0).validate().is_err());
    }

    #[test]
    fn test_config_validate_valid() {
        assert!(OrshotConfig::new("t").validate().is_ok());
    }
}
