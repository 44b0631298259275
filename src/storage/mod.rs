//! Key-value storage engines.
//!
//! Everything the workspace index persists goes through [`Storage`]: string
//! keys mapped to JSON values. A key that is absent is simply missing from
//! the result of [`Storage::get`], never an error.

pub mod file;
pub mod memory;
pub mod postgres;

use std::collections::HashMap;
use std::future::Future;

use serde_json::Value;
use tracing::debug;

use crate::config::StorageConfig;
use crate::error::{Error, Result};
use crate::telemetry::metrics;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use postgres::PgStorage;

pub trait Storage: Send + Sync {
    /// Whether a backend exists in this execution context. When false,
    /// every operation fails with [`Error::StorageUnavailable`].
    fn is_available(&self) -> bool {
        true
    }

    /// Values for the requested keys that exist.
    fn get(&self, keys: &[String]) -> impl Future<Output = Result<HashMap<String, Value>>> + Send;

    /// Insert or overwrite every entry of `items`.
    fn set(&self, items: HashMap<String, Value>) -> impl Future<Output = Result<()>> + Send;

    /// Remove `keys`; missing keys are ignored.
    fn remove(&self, keys: &[String]) -> impl Future<Output = Result<()>> + Send;

    /// Remove everything.
    fn clear(&self) -> impl Future<Output = Result<()>> + Send;
}

/// The storage engine chosen by configuration.
pub enum Backend {
    Memory(MemoryStorage),
    File(FileStorage),
    Postgres(PgStorage),
    /// No storage in this context; reads recover, writes fail.
    Unavailable,
}

impl Backend {
    /// Open the configured engine. Postgres connects and runs migrations.
    pub async fn open(config: &StorageConfig) -> Result<Self> {
        use crate::config::secrets::ExposeSecret;

        let backend = match config {
            StorageConfig::Memory => Self::Memory(MemoryStorage::new()),
            StorageConfig::File(path) => Self::File(FileStorage::new(path)),
            StorageConfig::Postgres(url) => {
                let storage = PgStorage::connect(url.expose_secret()).await?;
                storage.migrate().await?;
                Self::Postgres(storage)
            }
            StorageConfig::Unavailable => Self::Unavailable,
        };
        debug!(backend = backend.name(), "storage opened");
        Ok(backend)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::File(_) => "file",
            Self::Postgres(_) => "postgres",
            Self::Unavailable => "unavailable",
        }
    }

    fn observe<T>(&self, operation: &'static str, result: Result<T>) -> Result<T> {
        metrics::record_storage_operation(self.name(), operation, result.is_ok());
        result
    }
}

impl Storage for Backend {
    fn is_available(&self) -> bool {
        !matches!(self, Self::Unavailable)
    }

    async fn get(&self, keys: &[String]) -> Result<HashMap<String, Value>> {
        let result = match self {
            Self::Memory(s) => s.get(keys).await,
            Self::File(s) => s.get(keys).await,
            Self::Postgres(s) => s.get(keys).await,
            Self::Unavailable => Err(Error::StorageUnavailable),
        };
        self.observe("get", result)
    }

    async fn set(&self, items: HashMap<String, Value>) -> Result<()> {
        let result = match self {
            Self::Memory(s) => s.set(items).await,
            Self::File(s) => s.set(items).await,
            Self::Postgres(s) => s.set(items).await,
            Self::Unavailable => Err(Error::StorageUnavailable),
        };
        self.observe("set", result)
    }

    async fn remove(&self, keys: &[String]) -> Result<()> {
        let result = match self {
            Self::Memory(s) => s.remove(keys).await,
            Self::File(s) => s.remove(keys).await,
            Self::Postgres(s) => s.remove(keys).await,
            Self::Unavailable => Err(Error::StorageUnavailable),
        };
        self.observe("remove", result)
    }

    async fn clear(&self) -> Result<()> {
        let result = match self {
            Self::Memory(s) => s.clear().await,
            Self::File(s) => s.clear().await,
            Self::Postgres(s) => s.clear().await,
            Self::Unavailable => Err(Error::StorageUnavailable),
        };
        self.observe("clear", result)
    }
}
