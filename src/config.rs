//! Environment configuration.

use std::env;
use thiserror::Error;

use crate::bundle::composer::DEFAULT_SIGNATURE;
use crate::drafting::providers::{Provider, ProviderCredentials, UnknownProvider};
use crate::storage::GcsConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} is invalid: {message}")]
    Invalid { name: &'static str, message: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_address: String,
    pub http_timeout_secs: u64,
    pub signature: String,
    pub default_provider: Provider,
    pub typst_binary: String,
    pub storage: GcsConfig,
    pub credentials: ProviderCredentials,
}

impl AppConfig {
    /// Read configuration from the process environment (after `.env` is loaded).
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let http_timeout_secs = match env::var("HTTP_TIMEOUT_SECS") {
            Ok(value) => value.parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
                name: "HTTP_TIMEOUT_SECS",
                message: e.to_string(),
            })?,
            Err(_) => 60,
        };

        let default_provider = match env::var("DEFAULT_PROVIDER") {
            Ok(value) => value.parse().map_err(|e: UnknownProvider| ConfigError::Invalid {
                name: "DEFAULT_PROVIDER",
                message: e.to_string(),
            })?,
            Err(_) => Provider::Gemini,
        };

        let mut storage = GcsConfig::from_env();
        storage.timeout_secs = http_timeout_secs;

        Ok(Self {
            database_url,
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            http_timeout_secs,
            signature: env::var("SIGNATURE_BLOCK").unwrap_or_else(|_| DEFAULT_SIGNATURE.to_string()),
            default_provider,
            typst_binary: env::var("TYPST_BINARY").unwrap_or_else(|_| "typst".to_string()),
            storage,
            credentials: ProviderCredentials::from_env(),
        })
    }
}
