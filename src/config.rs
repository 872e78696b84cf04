//! Configuration management for Docsync Server

use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Default request body limit: 256 MiB
///
/// The limit applies to the JSON text, where each document byte takes up to
/// four characters, so this admits documents of roughly 64 MB.
pub const DEFAULT_MAX_BODY_BYTES: usize = 256 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on `/sync` request bodies
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    /// Bound on any single read or rewrite of the items table
    pub timeout_secs: u64,
}

impl DatabaseConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            },
            database: DatabaseConfig {
                url: "sqlite:./items.db".to_string(),
                max_connections: 5,
                timeout_secs: 10,
            },
        }
    }
}

impl Config {
    /// Read configuration from the environment, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_var("SERVER_PORT", defaults.server.port),
                max_body_bytes: parse_var("MAX_BODY_BYTES", defaults.server.max_body_bytes),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or(defaults.database.url),
                max_connections: parse_var("DB_MAX_CONNECTIONS", defaults.database.max_connections),
                timeout_secs: parse_var("STORAGE_TIMEOUT_SECS", defaults.database.timeout_secs),
            },
        }
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid {}={:?}, using default", name, raw);
            default
        }),
        Err(_) => default,
    }
}
