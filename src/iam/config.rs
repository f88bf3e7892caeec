//! Identity provider settings.

use std::time::Duration;

pub const DEFAULT_TOKEN_URL: &str = "https://iam.bluemix.net/identity/token";
pub const DEFAULT_BASIC_AUTH_USER: &str = "bx";
pub const DEFAULT_BASIC_AUTH_PASSWORD: &str = "bx";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Fraction of the access token's validity window during which it is used as-is.
pub const DEFAULT_REFRESH_BUFFER: f64 = 0.8;
/// Refresh tokens are assumed valid for this long past the access token's expiration.
pub const DEFAULT_REFRESH_TOKEN_LIFETIME: Duration = Duration::from_secs(7 * 24 * 3600);

pub const ENV_TOKEN_URL: &str = "IAM_TOKEN_URL";
pub const ENV_BASIC_AUTH_USER: &str = "IAM_BASIC_AUTH_USER";
pub const ENV_BASIC_AUTH_PASSWORD: &str = "IAM_BASIC_AUTH_PASSWORD";
pub const ENV_TIMEOUT_SECS: &str = "IAM_TOKEN_TIMEOUT_SECS";
pub const ENV_REFRESH_BUFFER: &str = "IAM_REFRESH_BUFFER";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key}: invalid value {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Clone)]
pub struct Config {
    pub token_url: String,
    pub basic_auth_user: String,
    pub basic_auth_password: String,
    /// Request timeout for the endpoint's own HTTP client.
    pub timeout: Duration,
    pub refresh_buffer: f64,
    pub refresh_token_lifetime: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token_url: DEFAULT_TOKEN_URL.to_owned(),
            basic_auth_user: DEFAULT_BASIC_AUTH_USER.to_owned(),
            basic_auth_password: DEFAULT_BASIC_AUTH_PASSWORD.to_owned(),
            timeout: DEFAULT_TIMEOUT,
            refresh_buffer: DEFAULT_REFRESH_BUFFER,
            refresh_token_lifetime: DEFAULT_REFRESH_TOKEN_LIFETIME,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("token_url", &self.token_url)
            .field("basic_auth_user", &self.basic_auth_user)
            .field("basic_auth_password", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("refresh_buffer", &self.refresh_buffer)
            .field("refresh_token_lifetime", &self.refresh_token_lifetime)
            .finish()
    }
}

impl Config {
    /// Defaults overridden by whichever `IAM_*` environment variables are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_TOKEN_URL) {
            config.token_url = url;
        }
        if let Some(user) = lookup(ENV_BASIC_AUTH_USER) {
            config.basic_auth_user = user;
        }
        if let Some(password) = lookup(ENV_BASIC_AUTH_PASSWORD) {
            config.basic_auth_password = password;
        }
        if let Some(value) = lookup(ENV_TIMEOUT_SECS) {
            let secs = value.parse::<u64>().map_err(|_| ConfigError::Invalid {
                key: ENV_TIMEOUT_SECS,
                value: value.clone(),
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(value) = lookup(ENV_REFRESH_BUFFER) {
            config.refresh_buffer = match value.parse::<f64>() {
                Ok(buffer) if buffer > 0.0 && buffer <= 1.0 => buffer,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: ENV_REFRESH_BUFFER,
                        value,
                    })
                }
            };
        }

        Ok(config)
    }
}
