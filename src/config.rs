// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment at startup. The identity
//! provider settings are the only ones the auth layer reads; the rest
//! configure the HTTP host.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `KEYCLOAK_URL` | Identity provider base URL | Required |
//! | `KEYCLOAK_REALM` | Realm issuing the tokens | Required |
//! | `KEYCLOAK_CLIENT_ID` | Client id expected in `aud` or `azp` | Required |
//! | `JWKS_TIMEOUT_SECS` | HTTP timeout for the JWKS fetch | `10` |
//! | `JWT_CLOCK_SKEW_SECS` | Leeway for `exp` / `iat` checks | `60` |
//! | `ALLOW_EMPTY_AUDIENCE` | Accept tokens whose `aud` is empty | `true` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use thiserror::Error;
use url::Url;

pub const KEYCLOAK_URL_ENV: &str = "KEYCLOAK_URL";
pub const KEYCLOAK_REALM_ENV: &str = "KEYCLOAK_REALM";
pub const KEYCLOAK_CLIENT_ID_ENV: &str = "KEYCLOAK_CLIENT_ID";
pub const JWKS_TIMEOUT_ENV: &str = "JWKS_TIMEOUT_SECS";
pub const CLOCK_SKEW_ENV: &str = "JWT_CLOCK_SKEW_SECS";
pub const ALLOW_EMPTY_AUDIENCE_ENV: &str = "ALLOW_EMPTY_AUDIENCE";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Default JWKS request timeout. No retry is attempted after it elapses.
pub const DEFAULT_JWKS_TIMEOUT: Duration = Duration::from_secs(10);

/// Default clock skew tolerance for `exp` and `iat`.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(60);

/// Upper bound accepted for `JWT_CLOCK_SKEW_SECS`.
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid value for {var}: {reason}")]
    InvalidValue { var: &'static str, reason: String },
}

/// Identity provider settings consumed by the key store and the validator.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Base URL of the identity provider, without a trailing slash.
    pub base_url: String,
    pub realm: String,
    pub client_id: String,
    pub jwks_timeout: Duration,
    pub clock_skew: Duration,
    /// Treat an empty `aud` claim as valid.
    pub allow_empty_audience: bool,
}

impl ProviderConfig {
    pub fn new(
        base_url: impl Into<String>,
        realm: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            realm: realm.into(),
            client_id: client_id.into(),
            jwks_timeout: DEFAULT_JWKS_TIMEOUT,
            clock_skew: DEFAULT_CLOCK_SKEW,
            allow_empty_audience: true,
        }
    }

    pub fn with_jwks_timeout(mut self, timeout: Duration) -> Self {
        self.jwks_timeout = timeout;
        self
    }

    pub fn with_clock_skew(mut self, skew: Duration) -> Self {
        self.clock_skew = skew;
        self
    }

    pub fn with_allow_empty_audience(mut self, allow: bool) -> Self {
        self.allow_empty_audience = allow;
        self
    }

    /// Expected `iss` claim: `{base_url}/realms/{realm}`.
    pub fn issuer(&self) -> String {
        format!("{}/realms/{}", self.base_url, self.realm)
    }

    /// Realm certificate endpoint.
    pub fn jwks_url(&self) -> String {
        format!("{}/protocol/openid-connect/certs", self.issuer())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Full service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub provider: ProviderConfig,
    pub host: String,
    pub port: u16,
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a map (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let base_url = required(vars, KEYCLOAK_URL_ENV)?;
        Url::parse(&base_url).map_err(|e| ConfigError::InvalidValue {
            var: KEYCLOAK_URL_ENV,
            reason: e.to_string(),
        })?;
        let realm = required(vars, KEYCLOAK_REALM_ENV)?;
        let client_id = required(vars, KEYCLOAK_CLIENT_ID_ENV)?;

        let jwks_timeout = match vars.get(JWKS_TIMEOUT_ENV) {
            Some(raw) => {
                let secs = parse_u64(JWKS_TIMEOUT_ENV, raw)?;
                if secs == 0 {
                    return Err(ConfigError::InvalidValue {
                        var: JWKS_TIMEOUT_ENV,
                        reason: "must be greater than 0".to_string(),
                    });
                }
                Duration::from_secs(secs)
            }
            None => DEFAULT_JWKS_TIMEOUT,
        };

        let clock_skew = match vars.get(CLOCK_SKEW_ENV) {
            Some(raw) => {
                let secs = parse_u64(CLOCK_SKEW_ENV, raw)?;
                if secs > MAX_CLOCK_SKEW.as_secs() {
                    return Err(ConfigError::InvalidValue {
                        var: CLOCK_SKEW_ENV,
                        reason: format!(
                            "must not exceed {} seconds, got {secs}",
                            MAX_CLOCK_SKEW.as_secs()
                        ),
                    });
                }
                Duration::from_secs(secs)
            }
            None => DEFAULT_CLOCK_SKEW,
        };

        let allow_empty_audience = match vars.get(ALLOW_EMPTY_AUDIENCE_ENV) {
            Some(raw) => parse_bool(ALLOW_EMPTY_AUDIENCE_ENV, raw)?,
            None => true,
        };

        let host = vars
            .get(HOST_ENV)
            .cloned()
            .unwrap_or_else(|| "0.0.0.0".to_string());

        let port = match vars.get(PORT_ENV) {
            Some(raw) => raw.parse().map_err(|e| ConfigError::InvalidValue {
                var: PORT_ENV,
                reason: format!("must be a valid port, got '{raw}': {e}"),
            })?,
            None => 8080,
        };

        let log_format = match vars.get(LOG_FORMAT_ENV).map(|s| s.to_lowercase()) {
            None => LogFormat::Pretty,
            Some(f) if f == "pretty" => LogFormat::Pretty,
            Some(f) if f == "json" => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    var: LOG_FORMAT_ENV,
                    reason: format!("expected 'json' or 'pretty', got '{other}'"),
                })
            }
        };

        let provider = ProviderConfig::new(base_url, realm, client_id)
            .with_jwks_timeout(jwks_timeout)
            .with_clock_skew(clock_skew)
            .with_allow_empty_audience(allow_empty_audience);

        Ok(Self {
            provider,
            host,
            port,
            log_format,
        })
    }
}

fn required(vars: &HashMap<String, String>, var: &'static str) -> Result<String, ConfigError> {
    vars.get(var)
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .ok_or(ConfigError::MissingEnvVar(var))
}

fn parse_u64(var: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.parse().map_err(|e| ConfigError::InvalidValue {
        var,
        reason: format!("must be a non-negative integer, got '{raw}': {e}"),
    })
}

fn parse_bool(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var,
            reason: format!("expected a boolean, got '{raw}'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([
            (KEYCLOAK_URL_ENV.to_string(), "https://idp.example/".to_string()),
            (KEYCLOAK_REALM_ENV.to_string(), "demo".to_string()),
            (KEYCLOAK_CLIENT_ID_ENV.to_string(), "feedbacklab-api".to_string()),
        ])
    }

    #[test]
    fn loads_defaults() {
        let config = Config::from_vars(&base_vars()).unwrap();
        assert_eq!(config.provider.base_url, "https://idp.example");
        assert_eq!(config.provider.jwks_timeout, DEFAULT_JWKS_TIMEOUT);
        assert_eq!(config.provider.clock_skew, DEFAULT_CLOCK_SKEW);
        assert!(config.provider.allow_empty_audience);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn provider_urls_follow_realm_layout() {
        let provider = ProviderConfig::new("https://idp.example", "demo", "app");
        assert_eq!(provider.issuer(), "https://idp.example/realms/demo");
        assert_eq!(
            provider.jwks_url(),
            "https://idp.example/realms/demo/protocol/openid-connect/certs"
        );
    }

    #[test]
    fn missing_realm_is_rejected() {
        let mut vars = base_vars();
        vars.remove(KEYCLOAK_REALM_ENV);
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::MissingEnvVar(KEYCLOAK_REALM_ENV))
        ));
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let mut vars = base_vars();
        vars.insert(KEYCLOAK_URL_ENV.to_string(), "not a url".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidValue { var: KEYCLOAK_URL_ENV, .. })
        ));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut vars = base_vars();
        vars.insert(JWKS_TIMEOUT_ENV.to_string(), "0".to_string());
        assert!(Config::from_vars(&vars).is_err());
    }

    #[test]
    fn excessive_clock_skew_is_rejected() {
        let mut vars = base_vars();
        vars.insert(CLOCK_SKEW_ENV.to_string(), "3600".to_string());
        assert!(Config::from_vars(&vars).is_err());
    }

    #[test]
    fn empty_audience_fallback_can_be_disabled() {
        let mut vars = base_vars();
        vars.insert(ALLOW_EMPTY_AUDIENCE_ENV.to_string(), "false".to_string());
        let config = Config::from_vars(&vars).unwrap();
        assert!(!config.provider.allow_empty_audience);
    }

    #[test]
    fn json_log_format() {
        let mut vars = base_vars();
        vars.insert(LOG_FORMAT_ENV.to_string(), "JSON".to_string());
        let config = Config::from_vars(&vars).unwrap();
        assert_eq!(config.log_format, LogFormat::Json);
    }
}
