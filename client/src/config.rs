//! Environment-backed runtime configuration of the terminal client.

use std::{env, path::PathBuf};

use thiserror::Error;
use url::Url;

const DEFAULT_API_URL: &str = "http://localhost:3000/api";
const DEFAULT_FEED_ADDR: &str = "localhost:8080";
const DEFAULT_DATA_DIR: &str = "./.chat-rooms";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base url the rooms routes are mounted under
    pub api_url: Url,
    /// `host:port` of the realtime feed server
    pub feed_addr: String,
    /// Where the persisted state and the log file live
    pub data_dir: PathBuf,
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

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(mut lookup: F) -> Result<Self, ConfigError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let raw_api_url = optional_trimmed_env("CHAT_ROOMS_API_URL", &mut lookup)
            .unwrap_or_else(|| DEFAULT_API_URL.to_owned());
        let api_url = Url::parse(&raw_api_url).map_err(|err| ConfigError::InvalidValue {
            key: "CHAT_ROOMS_API_URL",
            value: raw_api_url.clone(),
            reason: err.to_string(),
        })?;
        if api_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidValue {
                key: "CHAT_ROOMS_API_URL",
                value: raw_api_url,
                reason: "must be a hierarchical url".to_owned(),
            });
        }

        let feed_addr = optional_trimmed_env("CHAT_ROOMS_FEED_ADDR", &mut lookup)
            .unwrap_or_else(|| DEFAULT_FEED_ADDR.to_owned());
        if !feed_addr.contains(':') {
            return Err(ConfigError::InvalidValue {
                key: "CHAT_ROOMS_FEED_ADDR",
                value: feed_addr,
                reason: "expected host:port".to_owned(),
            });
        }

        let data_dir = optional_trimmed_env("CHAT_ROOMS_DATA_DIR", &mut lookup)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        Ok(Self {
            api_url,
            feed_addr,
            data_dir,
        })
    }

    pub fn log_file(&self) -> PathBuf {
        self.data_dir.join("client.log")
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

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ClientConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();

        ClientConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.api_url.as_str(), "http://localhost:3000/api");
        assert_eq!(config.feed_addr, "localhost:8080");
        assert_eq!(config.data_dir, PathBuf::from("./.chat-rooms"));
        assert_eq!(config.log_file(), PathBuf::from("./.chat-rooms/client.log"));
    }

    #[test]
    fn test_overrides_are_trimmed() {
        let config = config_from(&[
            ("CHAT_ROOMS_API_URL", " https://chat.example.com/api "),
            ("CHAT_ROOMS_FEED_ADDR", "chat.example.com:9000"),
            ("CHAT_ROOMS_DATA_DIR", "/tmp/chat"),
        ])
        .unwrap();

        assert_eq!(config.api_url.as_str(), "https://chat.example.com/api");
        assert_eq!(config.feed_addr, "chat.example.com:9000");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/chat"));
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = config_from(&[("CHAT_ROOMS_FEED_ADDR", "   ")]).unwrap();

        assert_eq!(config.feed_addr, "localhost:8080");
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            config_from(&[("CHAT_ROOMS_API_URL", "not a url")]),
            Err(ConfigError::InvalidValue {
                key: "CHAT_ROOMS_API_URL",
                ..
            })
        ));
        assert!(matches!(
            config_from(&[("CHAT_ROOMS_API_URL", "mailto:someone@example.com")]),
            Err(ConfigError::InvalidValue {
                key: "CHAT_ROOMS_API_URL",
                ..
            })
        ));
        assert!(matches!(
            config_from(&[("CHAT_ROOMS_FEED_ADDR", "localhost")]),
            Err(ConfigError::InvalidValue {
                key: "CHAT_ROOMS_FEED_ADDR",
                ..
            })
        ));
    }
}
