use std::{env, fmt::Display, fs::read_to_string, net::Ipv4Addr, path::PathBuf, str::FromStr};

use log::{info, warn};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(String),

    #[error("Invalid {key} value: {info}")]
    Invalid { key: String, info: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: [u8; 4],
    pub port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    pub redis_url: String,
    pub secret_key: String,
    pub media_root: PathBuf,
    pub public_url: String,
    pub session_lifetime_hours: i64,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            host: parse_host(&try_load::<String>("HOST", "0.0.0.0")?)?,
            port: try_load("PORT", "8000")?,
            database_url: require("DATABASE_URL")?,
            database_max_connections: try_load("DATABASE_MAX_CONNECTIONS", "10")?,
            redis_url: try_load("REDIS_URL", "redis://127.0.0.1:6379")?,
            secret_key: read_secret("SECRET_KEY")?,
            media_root: try_load("MEDIA_ROOT", "media")?,
            public_url: try_load::<String>("PUBLIC_URL", "http://localhost:8000")?
                .trim_end_matches('/')
                .to_string(),
            session_lifetime_hours: try_load("SESSION_LIFETIME_HOURS", "24")?,
        })
    }

    /// Database url only, for commands that never open the HTTP listener.
    pub fn database_url() -> Result<String, ConfigError> {
        require("DATABASE_URL")
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    env::var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| ConfigError::Invalid {
            key: key.to_string(),
            info: e.to_string(),
        })
}

fn require(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key.to_string()))
}

/// Environment first, then a docker secret mounted at `/run/secrets/<name>`.
fn read_secret(secret_name: &str) -> Result<String, ConfigError> {
    if let Ok(value) = env::var(secret_name) {
        return Ok(value);
    }

    let path = format!("/run/secrets/{secret_name}");
    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            warn!("Failed to read {secret_name} from file: {e}");
            ConfigError::Missing(secret_name.to_string())
        })
}

fn parse_host(host: &str) -> Result<[u8; 4], ConfigError> {
    Ipv4Addr::from_str(host)
        .map(|address| address.octets())
        .map_err(|e| ConfigError::Invalid {
            key: String::from("HOST"),
            info: format!("{host} is not an IPv4 address ({e})"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ipv4_hosts() {
        assert_eq!(parse_host("127.0.0.1").unwrap(), [127, 0, 0, 1]);
        assert!(parse_host("localhost").is_err());
        assert!(parse_host("1.2.3").is_err());
        assert!(parse_host("1.2.3.256").is_err());
    }
}
