// src/config.rs

use std::env;
use std::net::SocketAddr;

use dotenvy::dotenv;

use crate::error::AppError;

/// Default lifetime of a session token: one day.
pub const DEFAULT_JWT_EXPIRATION: u64 = 86_400;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Credentials for the backing store.
///
/// The access key is applied as the connection password, so `STORE_URL`
/// may carry only host, port, user and database.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub url: String,
    pub access_key: String,
}

impl StoreConfig {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();

        let url = require("STORE_URL")?;
        let access_key = require("STORE_ACCESS_KEY")?;

        Ok(Self { url, access_key })
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreConfig,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub bind_addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();

        let store = StoreConfig::from_env()?;

        let jwt_secret = require("JWT_SECRET")?;

        let jwt_expiration = match env::var("JWT_EXPIRATION") {
            Ok(raw) => raw
                .parse::<u64>()
                .map_err(|e| AppError::Config(format!("JWT_EXPIRATION: {}", e)))?,
            Err(_) => DEFAULT_JWT_EXPIRATION,
        };

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| AppError::Config(format!("BIND_ADDR: {}", e)))?;

        Ok(Self {
            store,
            jwt_secret,
            jwt_expiration,
            rust_log: rust_log(),
            bind_addr,
        })
    }
}

/// `RUST_LOG`, falling back to `info`.
pub fn rust_log() -> String {
    env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string())
}

fn require(key: &str) -> Result<String, AppError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(AppError::Config(format!("{} must be set", key))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_rejects_missing_key() {
        let err = require("ASSESSMENT_TEST_SURELY_UNSET_VARIABLE").unwrap_err();
        assert!(matches!(err, AppError::Config(msg) if msg.contains("must be set")));
    }

    #[test]
    fn default_bind_addr_parses() {
        assert!(DEFAULT_BIND_ADDR.parse::<SocketAddr>().is_ok());
    }
}
