use std::env;
use std::time::Duration;

use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";
/// Generation runs an AI model server-side and routinely takes tens of seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Where and how to reach the backend API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiConfig {
    base_url: Url,
    timeout: Duration,
}

impl ApiConfig {
    /// Build a config for `base_url`.
    ///
    /// The url is normalized to end with `/` so endpoint paths join under it
    /// instead of replacing its last segment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the url does not parse or is not http(s).
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let trimmed = base_url.trim();
        let normalized = if trimmed.ends_with('/') {
            trimmed.to_owned()
        } else {
            format!("{trimmed}/")
        };
        let base_url = Url::parse(&normalized).map_err(|source| ConfigError::InvalidBaseUrl {
            raw: base_url.to_owned(),
            source,
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme(base_url.scheme().to_owned()));
        }
        Ok(Self {
            base_url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Read `LEARNIFY_API_URL` and `LEARNIFY_API_TIMEOUT_SECS`, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a variable is set but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = env::var("LEARNIFY_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        let mut config = Self::new(&base_url)?;
        if let Ok(raw) = env::var("LEARNIFY_API_TIMEOUT_SECS") {
            let secs = parse_timeout(&raw)?;
            config = config.with_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolve an endpoint path relative to the base url.
    ///
    /// # Errors
    ///
    /// Returns `url::ParseError` if the joined url is invalid.
    pub fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base_url.join(path.trim_start_matches('/'))
    }
}

fn parse_timeout(raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(ConfigError::InvalidNumber {
            name: "LEARNIFY_API_TIMEOUT_SECS",
            raw: raw.to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_without_slash_keeps_api_segment() {
        let config = ApiConfig::new("http://localhost:8000/api").unwrap();
        let url = config.endpoint("documents/tests/generate/").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/documents/tests/generate/");
    }

    #[test]
    fn leading_slash_in_path_is_ignored() {
        let config = ApiConfig::new("https://learnify.example/api/").unwrap();
        let url = config.endpoint("/users/login/").unwrap();
        assert_eq!(url.as_str(), "https://learnify.example/api/users/login/");
    }

    #[test]
    fn rejects_non_http_scheme() {
        assert!(matches!(
            ApiConfig::new("ftp://example.com/api"),
            Err(ConfigError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn rejects_garbage_url() {
        assert!(matches!(
            ApiConfig::new("not a url"),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn timeout_must_be_positive() {
        assert_eq!(parse_timeout(" 90 ").unwrap(), 90);
        assert!(parse_timeout("0").is_err());
        assert!(parse_timeout("soon").is_err());
    }
}
