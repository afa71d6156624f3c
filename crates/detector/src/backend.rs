use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::ReportStoreError;

mod directory;
pub use directory::DirectoryBackend;

/// Append-only key-value storage for encoded reports.
pub trait ReportBackend: Send + Sync {
    /// Stores `value` under a key that has never been used before.
    fn put(&self, key: &str, value: &[u8]) -> Result<(), ReportStoreError>;
    /// Calls `visitor` with every stored key and value.
    fn scan(
        &self,
        visitor: &mut dyn FnMut(&str, &[u8]) -> Result<(), ReportStoreError>,
    ) -> Result<(), ReportStoreError>;
    /// Flush buffered writes.
    fn flush(&self) -> Result<(), ReportStoreError> {
        Ok(())
    }
    fn name(&self) -> &'static str;
}

/// Selects and builds a report backend.
///
/// # Example
/// ```
/// use detector::ReportBackendConfig;
///
/// let config = ReportBackendConfig::in_memory();
/// let config = ReportBackendConfig::directory("/data/reports");
/// let config = ReportBackendConfig::redb("/data/reports.redb");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum ReportBackendConfig {
    /// Process-local map; reports vanish on restart.
    #[default]
    InMemory,
    /// One pretty-printed JSON file per report.
    Directory { path: PathBuf },
    /// Single redb database file.
    Redb { path: PathBuf },
}

impl ReportBackendConfig {
    pub fn in_memory() -> Self {
        ReportBackendConfig::InMemory
    }

    pub fn directory<P: Into<PathBuf>>(path: P) -> Self {
        ReportBackendConfig::Directory { path: path.into() }
    }

    pub fn redb<P: Into<PathBuf>>(path: P) -> Self {
        ReportBackendConfig::Redb { path: path.into() }
    }

    pub fn build(&self) -> Result<Box<dyn ReportBackend>, ReportStoreError> {
        match self {
            ReportBackendConfig::InMemory => Ok(Box::new(InMemoryBackend::new())),
            ReportBackendConfig::Directory { path } => Ok(Box::new(DirectoryBackend::open(path)?)),
            ReportBackendConfig::Redb { path } => {
                #[cfg(feature = "backend-redb")]
                {
                    Ok(Box::new(RedbBackend::open(path)?))
                }
                #[cfg(not(feature = "backend-redb"))]
                {
                    let _ = path;
                    Err(ReportStoreError::backend(
                        "redb backend disabled at compile time",
                    ))
                }
            }
        }
    }
}

/// Report backend using a `RwLock` around a `HashMap`.
#[derive(Default)]
pub struct InMemoryBackend {
    records: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReportBackend for InMemoryBackend {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), ReportStoreError> {
        let mut guard = self
            .records
            .write()
            .map_err(|_| ReportStoreError::backend("poisoned lock"))?;
        if guard.contains_key(key) {
            return Err(ReportStoreError::backend(format!("duplicate report key {key}")));
        }
        guard.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn scan(
        &self,
        visitor: &mut dyn FnMut(&str, &[u8]) -> Result<(), ReportStoreError>,
    ) -> Result<(), ReportStoreError> {
        let guard = self
            .records
            .read()
            .map_err(|_| ReportStoreError::backend("poisoned lock"))?;
        for (key, value) in guard.iter() {
            visitor(key, value)?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "in_memory"
    }
}

#[cfg(feature = "backend-redb")]
mod redb;

#[cfg(feature = "backend-redb")]
pub use self::redb::RedbBackend;
