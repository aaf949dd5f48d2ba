//! Provider configuration from environment variables.

use thiserror::Error;

/// Base URL of the hosted provider, e.g. `https://xyz.example.co`.
pub const URL_VAR: &str = "AUTH_PROVIDER_URL";
/// Public (anonymous) API key sent with every request.
pub const ANON_KEY_VAR: &str = "AUTH_PROVIDER_ANON_KEY";
/// Optional; `false`/`0`/`no`/`off` disables token refresh.
pub const AUTO_REFRESH_VAR: &str = "AUTH_PROVIDER_AUTO_REFRESH";

/// Startup configuration is missing or unusable. Fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    Missing(&'static str),
    #[error("{var} is not a valid http(s) URL: {value}")]
    InvalidUrl { var: &'static str, value: String },
}

/// Connection settings for the hosted provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Base URL without trailing slash.
    pub url: String,
    pub anon_key: String,
    pub auto_refresh_token: bool,
}

impl ProviderConfig {
    /// Build a config directly. The URL is not validated.
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            auto_refresh_token: true,
        }
    }

    /// Builder method to toggle token refresh.
    pub fn with_auto_refresh(mut self, enabled: bool) -> Self {
        self.auto_refresh_token = enabled;
        self
    }

    /// Read and validate settings through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = required(&lookup, URL_VAR)?;
        let anon_key = required(&lookup, ANON_KEY_VAR)?;

        let valid = reqwest::Url::parse(&url)
            .map(|parsed| matches!(parsed.scheme(), "http" | "https"))
            .unwrap_or(false);
        if !valid {
            return Err(ConfigError::InvalidUrl {
                var: URL_VAR,
                value: url,
            });
        }

        let auto_refresh_token = lookup(AUTO_REFRESH_VAR)
            .map(|v| {
                !matches!(
                    v.trim().to_ascii_lowercase().as_str(),
                    "false" | "0" | "no" | "off"
                )
            })
            .unwrap_or(true);

        Ok(Self::new(url, anon_key).with_auto_refresh(auto_refresh_token))
    }

    /// Read settings from the process environment, loading `.env` first.
    pub fn from_env() -> Result<Self, ConfigError> {
        #[cfg(not(target_arch = "wasm32"))]
        dotenvy::dotenv().ok();

        Self::from_lookup(runtime_var)
    }

    /// Process environment first, then values baked in at compile time.
    /// On `wasm32` only the compile-time values exist.
    pub fn load() -> Result<Self, ConfigError> {
        #[cfg(not(target_arch = "wasm32"))]
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| runtime_var(key).or_else(|| build_var(key)))
    }

    /// Absolute URL of an auth endpoint, e.g. `token` → `{url}/auth/v1/token`.
    pub fn auth_endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.url, path.trim_start_matches('/'))
    }
}

fn required<F>(lookup: &F, var: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(var))
}

#[cfg(not(target_arch = "wasm32"))]
fn runtime_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

#[cfg(target_arch = "wasm32")]
fn runtime_var(_key: &str) -> Option<String> {
    None
}

fn build_var(key: &str) -> Option<String> {
    let value = match key {
        URL_VAR => option_env!("AUTH_PROVIDER_URL"),
        ANON_KEY_VAR => option_env!("AUTH_PROVIDER_ANON_KEY"),
        AUTO_REFRESH_VAR => option_env!("AUTH_PROVIDER_AUTO_REFRESH"),
        _ => None,
    };
    value.map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_valid_config() {
        let config = ProviderConfig::from_lookup(lookup(&[
            (URL_VAR, "https://project.example.co/"),
            (ANON_KEY_VAR, "anon-key"),
        ]))
        .unwrap();

        assert_eq!(config.url, "https://project.example.co");
        assert_eq!(config.anon_key, "anon-key");
        assert!(config.auto_refresh_token);
        assert_eq!(
            config.auth_endpoint("token"),
            "https://project.example.co/auth/v1/token"
        );
    }

    #[test]
    fn test_missing_url() {
        let err = ProviderConfig::from_lookup(lookup(&[(ANON_KEY_VAR, "anon-key")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing(URL_VAR));
        assert_eq!(
            err.to_string(),
            "missing environment variable: AUTH_PROVIDER_URL"
        );
    }

    #[test]
    fn test_missing_key() {
        let err = ProviderConfig::from_lookup(lookup(&[(URL_VAR, "https://project.example.co")]))
            .unwrap_err();
        assert_eq!(err, ConfigError::Missing(ANON_KEY_VAR));
    }

    #[test]
    fn test_blank_values_count_as_missing() {
        let err = ProviderConfig::from_lookup(lookup(&[(URL_VAR, "  "), (ANON_KEY_VAR, "k")]))
            .unwrap_err();
        assert_eq!(err, ConfigError::Missing(URL_VAR));
    }

    #[test]
    fn test_invalid_url() {
        for bad in ["not a url", "ftp://project.example.co"] {
            let err = ProviderConfig::from_lookup(lookup(&[(URL_VAR, bad), (ANON_KEY_VAR, "k")]))
                .unwrap_err();
            assert!(matches!(err, ConfigError::InvalidUrl { var: URL_VAR, .. }));
        }
    }

    #[test]
    fn test_auto_refresh_toggle() {
        let config = ProviderConfig::from_lookup(lookup(&[
            (URL_VAR, "http://localhost:54321"),
            (ANON_KEY_VAR, "k"),
            (AUTO_REFRESH_VAR, "False"),
        ]))
        .unwrap();
        assert!(!config.auto_refresh_token);
    }
}
