use std::time::Duration;

use thiserror::Error;

use crate::errors::AppError;
use crate::models::ResponseMode;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 25;
const DEFAULT_RATE_LIMIT_MAX_REQUESTS: u32 = 20;
const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Invalid (as opposed to missing) configuration values found at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} has an invalid value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Whether error details may be echoed back to the browser.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Production,
    Development,
}

impl Environment {
    pub fn exposes_error_details(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

/// Upstream connection settings. Each field may be absent at startup; the
/// absence only fails the requests that need it.
#[derive(Debug, Clone, Default)]
pub struct UpstreamSettings {
    pub url: Option<String>,
    pub bearer_token: Option<String>,
    pub user: Option<String>,
}

/// Borrowed view of fully present upstream settings.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedUpstream<'a> {
    pub url: &'a str,
    pub bearer_token: &'a str,
    pub user: &'a str,
}

impl UpstreamSettings {
    pub fn resolve(&self) -> Result<ResolvedUpstream<'_>, AppError> {
        match (&self.url, &self.bearer_token, &self.user) {
            (Some(url), Some(bearer_token), Some(user)) => Ok(ResolvedUpstream {
                url,
                bearer_token,
                user,
            }),
            _ => Err(AppError::Configuration {
                missing: self.missing(),
            }),
        }
    }

    /// Names (never values) of the variables that are not set.
    pub fn missing(&self) -> Vec<&'static str> {
        [
            ("API_URL", self.url.is_none()),
            ("API_BEARER_TOKEN", self.bearer_token.is_none()),
            ("API_USER_EMAIL", self.user.is_none()),
        ]
        .into_iter()
        .filter_map(|(key, absent)| absent.then_some(key))
        .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_RATE_LIMIT_MAX_REQUESTS,
            window: Duration::from_secs(DEFAULT_RATE_LIMIT_WINDOW_SECS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub upstream: UpstreamSettings,
    pub response_mode: ResponseMode,
    pub upstream_timeout: Duration,
    pub rate_limit: RateLimitPolicy,
    pub environment: Environment,
    pub cors_allow_origin: Option<String>,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            upstream: UpstreamSettings::default(),
            response_mode: ResponseMode::default(),
            upstream_timeout: Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS),
            rate_limit: RateLimitPolicy::default(),
            environment: Environment::default(),
            cors_allow_origin: None,
            port: DEFAULT_PORT,
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let upstream = UpstreamSettings {
            url: get("API_URL"),
            bearer_token: get("API_BEARER_TOKEN"),
            user: get("API_USER_EMAIL"),
        };

        let response_mode = match get("CHAT_RESPONSE_MODE") {
            Some(raw) => raw.parse::<ResponseMode>().map_err(|reason| ConfigError::Invalid {
                key: "CHAT_RESPONSE_MODE",
                value: raw,
                reason,
            })?,
            None => ResponseMode::default(),
        };

        let timeout_secs = parse_or(
            "UPSTREAM_TIMEOUT_SECS",
            get("UPSTREAM_TIMEOUT_SECS"),
            DEFAULT_UPSTREAM_TIMEOUT_SECS,
        )?;
        let max_requests = parse_or(
            "RATE_LIMIT_MAX_REQUESTS",
            get("RATE_LIMIT_MAX_REQUESTS"),
            DEFAULT_RATE_LIMIT_MAX_REQUESTS,
        )?;
        let window_secs = parse_or(
            "RATE_LIMIT_WINDOW_SECS",
            get("RATE_LIMIT_WINDOW_SECS"),
            DEFAULT_RATE_LIMIT_WINDOW_SECS,
        )?;
        let port = parse_or("PORT", get("PORT"), DEFAULT_PORT)?;

        let environment = match get("APP_ENV").as_deref().map(str::to_lowercase).as_deref() {
            Some("development") | Some("dev") => Environment::Development,
            _ => Environment::Production,
        };

        Ok(Self {
            upstream,
            response_mode,
            upstream_timeout: Duration::from_secs(timeout_secs),
            rate_limit: RateLimitPolicy {
                max_requests,
                window: Duration::from_secs(window_secs),
            },
            environment,
            cors_allow_origin: get("CORS_ALLOW_ORIGIN"),
            port,
        })
    }
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<GatewayConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        GatewayConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.response_mode, ResponseMode::Streaming);
        assert_eq!(config.upstream_timeout, Duration::from_secs(25));
        assert_eq!(config.rate_limit.max_requests, 20);
        assert_eq!(config.rate_limit.window, Duration::from_secs(60));
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn missing_upstream_settings_fail_only_at_resolve() {
        let config = config_from(&[("API_URL", "https://ai.example.com/v1/chat")]).unwrap();
        match config.upstream.resolve() {
            Err(AppError::Configuration { missing }) => {
                assert_eq!(missing, vec!["API_BEARER_TOKEN", "API_USER_EMAIL"]);
            }
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn blank_values_count_as_missing() {
        let config = config_from(&[
            ("API_URL", "https://ai.example.com"),
            ("API_BEARER_TOKEN", "   "),
            ("API_USER_EMAIL", "bot@example.com"),
        ])
        .unwrap();
        assert_eq!(config.upstream.missing(), vec!["API_BEARER_TOKEN"]);
    }

    #[test]
    fn full_upstream_settings_resolve() {
        let config = config_from(&[
            ("API_URL", "https://ai.example.com"),
            ("API_BEARER_TOKEN", "tok"),
            ("API_USER_EMAIL", "bot@example.com"),
        ])
        .unwrap();
        let resolved = config.upstream.resolve().unwrap();
        assert_eq!(resolved.url, "https://ai.example.com");
        assert_eq!(resolved.bearer_token, "tok");
        assert_eq!(resolved.user, "bot@example.com");
    }

    #[test]
    fn invalid_numbers_are_startup_errors() {
        let err = config_from(&[("RATE_LIMIT_MAX_REQUESTS", "lots")]).unwrap_err();
        assert!(err.to_string().contains("RATE_LIMIT_MAX_REQUESTS"));
    }

    #[test]
    fn overrides_are_honoured() {
        let config = config_from(&[
            ("CHAT_RESPONSE_MODE", "blocking"),
            ("UPSTREAM_TIMEOUT_SECS", "5"),
            ("RATE_LIMIT_MAX_REQUESTS", "3"),
            ("RATE_LIMIT_WINDOW_SECS", "10"),
            ("APP_ENV", "Development"),
            ("PORT", "3000"),
        ])
        .unwrap();
        assert_eq!(config.response_mode, ResponseMode::Blocking);
        assert_eq!(config.upstream_timeout, Duration::from_secs(5));
        assert_eq!(config.rate_limit, RateLimitPolicy { max_requests: 3, window: Duration::from_secs(10) });
        assert!(config.environment.exposes_error_details());
        assert_eq!(config.port, 3000);
    }
}
