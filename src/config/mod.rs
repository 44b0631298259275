//! Typed configuration from environment variables.
//!
//! Loads once at startup and fails fast on invalid values. The database URL
//! is wrapped in `secrecy::SecretString` so it never reaches the logs.

pub mod secrets;

use std::path::PathBuf;

use crate::error::{Error, Result};
use secrecy::SecretString;

pub const DEFAULT_STORAGE_PATH: &str = "tabdeck.json";

#[derive(Debug)]
pub struct Config {
    pub storage: StorageConfig,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

/// Which storage engine to open, selected by `STORAGE_BACKEND`.
#[derive(Debug)]
pub enum StorageConfig {
    Memory,
    File(PathBuf),
    Postgres(SecretString),
    /// `none`: run without persistence.
    Unavailable,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup` instead of the process environment.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let backend = lookup("STORAGE_BACKEND").unwrap_or_else(|| "file".to_string());
        let storage = match backend.trim().to_ascii_lowercase().as_str() {
            "memory" => StorageConfig::Memory,
            "file" => StorageConfig::File(PathBuf::from(
                lookup("STORAGE_PATH").unwrap_or_else(|| DEFAULT_STORAGE_PATH.to_string()),
            )),
            "postgres" => {
                let url = lookup("DATABASE_URL").ok_or_else(|| {
                    Error::Config(
                        "required environment variable DATABASE_URL is not set".to_string(),
                    )
                })?;
                StorageConfig::Postgres(SecretString::from(url))
            }
            "none" => StorageConfig::Unavailable,
            other => {
                return Err(Error::Config(format!(
                    "unknown STORAGE_BACKEND {other:?} (expected memory, file, postgres or none)"
                )));
            }
        };

        Ok(Self {
            storage,
            otel_endpoint: lookup("OTEL_ENDPOINT"),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }
}
