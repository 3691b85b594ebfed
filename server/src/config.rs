//! Environment-backed runtime configuration of the rooms backend.

use std::env;

use thiserror::Error;

const DEFAULT_FEED_PORT: u16 = 8080;
const DEFAULT_HTTP_PORT: u16 = 3000;
const DEFAULT_BIND_HOST: &str = "0.0.0.0";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_host: String,
    /// Port of the realtime feed
    pub feed_port: u16,
    /// Port of the HTTP routes
    pub http_port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid {key}='{value}': {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(mut lookup: F) -> Result<Self, ConfigError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let bind_host = optional_trimmed_env("CHAT_ROOMS_BIND_HOST", &mut lookup)
            .unwrap_or_else(|| DEFAULT_BIND_HOST.to_owned());
        let feed_port = parse_port("CHAT_ROOMS_FEED_PORT", DEFAULT_FEED_PORT, &mut lookup)?;
        let http_port = parse_port("CHAT_ROOMS_HTTP_PORT", DEFAULT_HTTP_PORT, &mut lookup)?;

        if feed_port == http_port {
            return Err(ConfigError::InvalidValue {
                key: "CHAT_ROOMS_HTTP_PORT",
                value: http_port.to_string(),
                reason: "must differ from CHAT_ROOMS_FEED_PORT".to_owned(),
            });
        }

        Ok(Self {
            bind_host,
            feed_port,
            http_port,
        })
    }

    pub fn feed_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.feed_port)
    }

    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.http_port)
    }
}

fn parse_port<F>(key: &'static str, default: u16, lookup: &mut F) -> Result<u16, ConfigError>
where
    F: FnMut(&str) -> Option<String>,
{
    let Some(raw) = optional_trimmed_env(key, lookup) else {
        return Ok(default);
    };

    match raw.parse::<u16>() {
        Ok(0) => Err(ConfigError::InvalidValue {
            key,
            value: raw,
            reason: "must be greater than zero".to_owned(),
        }),
        Ok(port) => Ok(port),
        Err(err) => Err(ConfigError::InvalidValue {
            key,
            value: raw,
            reason: err.to_string(),
        }),
    }
}

fn optional_trimmed_env<F>(key: &'static str, lookup: &mut F) -> Option<String>
where
    F: FnMut(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}
