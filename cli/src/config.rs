//! Connection settings for the bookmarking service.

use std::fmt;
use std::time::Duration;

use linkwarden_core::DEFAULT_TIMEOUT;
use thiserror::Error;

pub const BASE_URL_VAR: &str = "API_BASE_URL";
pub const TOKEN_VAR: &str = "LINKWARDEN_ACCESS_TOKEN";
pub const TIMEOUT_VAR: &str = "LINKWARDEN_TIMEOUT_SECS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("{var} must be a positive number of seconds, got {value:?}")]
    InvalidTimeout { var: &'static str, value: String },
}

#[derive(Clone)]
pub struct Config {
    pub base_url: String,
    pub access_token: String,
    pub timeout: Duration,
}

impl Config {
    /// Resolve settings through `lookup`, which maps a variable name to its
    /// value. Blank values count as missing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |var: &'static str| {
            lookup(var)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(var))
        };

        let base_url = required(BASE_URL_VAR)?;
        let access_token = required(TOKEN_VAR)?;
        let timeout = match lookup(TIMEOUT_VAR) {
            None => DEFAULT_TIMEOUT,
            Some(value) => match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidTimeout {
                        var: TIMEOUT_VAR,
                        value,
                    })
                }
            },
        };

        Ok(Self {
            base_url,
            access_token,
            timeout,
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("access_token", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn reads_required_settings_with_default_timeout() {
        let config = Config::from_lookup(lookup(&[
            (BASE_URL_VAR, "https://links.example.com"),
            (TOKEN_VAR, "abc"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "https://links.example.com");
        assert_eq!(config.access_token, "abc");
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn missing_or_blank_token_is_reported() {
        let err = Config::from_lookup(lookup(&[(BASE_URL_VAR, "https://h")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(TOKEN_VAR)));

        let err = Config::from_lookup(lookup(&[(BASE_URL_VAR, "https://h"), (TOKEN_VAR, "  ")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing(TOKEN_VAR)));
    }

    #[test]
    fn timeout_must_be_positive_integer() {
        for bad in ["0", "-1", "soon"] {
            let err = Config::from_lookup(lookup(&[
                (BASE_URL_VAR, "https://h"),
                (TOKEN_VAR, "t"),
                (TIMEOUT_VAR, bad),
            ]))
            .unwrap_err();
            assert!(matches!(err, ConfigError::InvalidTimeout { .. }), "{bad}");
        }

        let config = Config::from_lookup(lookup(&[
            (BASE_URL_VAR, "https://h"),
            (TOKEN_VAR, "t"),
            (TIMEOUT_VAR, "5"),
        ]))
        .unwrap();
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn debug_hides_token() {
        let config = Config::from_lookup(lookup(&[(BASE_URL_VAR, "https://h"), (TOKEN_VAR, "hunter2")]))
            .unwrap();
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
