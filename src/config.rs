use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub listen: String,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_history_size")]
    pub history_size: usize,
    #[serde(default = "default_cpu_sample_ms")]
    pub cpu_sample_ms: u64,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: i64,
    pub users: Vec<UserConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserConfig {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse YAML in {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("config validation error: {0}")]
    Validation(String),
}

impl Config {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let path_display = path_ref.display().to_string();
        let text = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_display.clone(),
            source,
        })?;

        let cfg: Config = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path_display,
            source,
        })?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listen.trim().is_empty() {
            return Err(ConfigError::Validation(
                "the listen field is required".to_string(),
            ));
        }
        if SocketAddr::from_str(&self.listen).is_err() {
            return Err(ConfigError::Validation(
                "listen must be a valid host:port address".to_string(),
            ));
        }
        if self.interval_secs < 1 {
            return Err(ConfigError::Validation(
                "interval_secs must be >= 1".to_string(),
            ));
        }
        if self.history_size < 1 {
            return Err(ConfigError::Validation(
                "history_size must be >= 1".to_string(),
            ));
        }
        if self.cpu_sample_ms < 1 {
            return Err(ConfigError::Validation(
                "cpu_sample_ms must be >= 1".to_string(),
            ));
        }

        validate_auth(&self.auth)?;

        Ok(())
    }

    pub fn example_yaml() -> &'static str {
        include_str!("../config.yaml.example")
    }
}

fn validate_auth(auth: &AuthConfig) -> Result<(), ConfigError> {
    if auth.token_ttl_secs < 1 {
        return Err(ConfigError::Validation(
            "auth.token_ttl_secs must be >= 1".to_string(),
        ));
    }
    if auth.users.is_empty() {
        return Err(ConfigError::Validation(
            "auth.users must list at least one user".to_string(),
        ));
    }
    let mut usernames = HashSet::new();
    for user in &auth.users {
        if user.username.trim().is_empty() {
            return Err(ConfigError::Validation(
                "auth.users[*].username must not be empty".to_string(),
            ));
        }
        if !usernames.insert(user.username.clone()) {
            return Err(ConfigError::Validation(format!(
                "username '{}' must be unique",
                user.username
            )));
        }
        if user.password.is_empty() {
            return Err(ConfigError::Validation(format!(
                "auth.users '{}' password must not be empty",
                user.username
            )));
        }
    }
    Ok(())
}

const fn default_interval_secs() -> u64 {
    5
}

const fn default_history_size() -> usize {
    100
}

const fn default_cpu_sample_ms() -> u64 {
    1000
}

const fn default_token_ttl_secs() -> i64 {
    86400
}
