pub mod keys;
pub mod migrate;
pub mod operations;
pub mod trees;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::Db;
use thiserror::Error;

#[derive(Debug)]
pub struct Store {
    db: Db,
    pub read_counters: sled::Tree,
    // Secondary index: day-major copy of the counts for range-wide aggregation
    pub read_counters_by_day: sled::Tree,
    pub contents: sled::Tree,
    pub legacy_read_totals: sled::Tree,
    pub meta: sled::Tree,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("not found: entity={entity}, key={key}")]
    NotFound { entity: String, key: String },
    #[error("conflict: entity={entity}, key={key}")]
    Conflict { entity: String, key: String },
    #[error("corrupt entry in {tree}: {key}")]
    Corrupt { tree: &'static str, key: String },
    #[error("validation error: {0}")]
    Validation(String),
    #[error("migration error at version {version}: {message}")]
    Migration { version: u32, message: String },
    #[error("store call '{operation}' timed out after {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },
    #[error("store write '{operation}' timed out after {timeout_ms}ms and may still commit")]
    WriteTimeout {
        operation: &'static str,
        timeout_ms: u64,
    },
    #[error("store task failed: {0}")]
    Task(String),
}

impl Store {
    pub fn open(sled_path: &str) -> Result<Self, StoreError> {
        let db = sled::open(sled_path)?;
        let read_counters = db.open_tree(trees::READ_COUNTERS)?;
        let read_counters_by_day = db.open_tree(trees::READ_COUNTERS_BY_DAY)?;
        let contents = db.open_tree(trees::CONTENTS)?;
        let legacy_read_totals = db.open_tree(trees::LEGACY_READ_TOTALS)?;
        let meta = db.open_tree(trees::META)?;

        Ok(Self {
            db,
            read_counters,
            read_counters_by_day,
            contents,
            legacy_read_totals,
            meta,
        })
    }

    pub fn run_migrations(&self) -> Result<(), StoreError> {
        migrate::run(self)
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    /// Cheap round trip used by health probes.
    pub fn probe(&self) -> Result<(), StoreError> {
        self.meta.get(b"_probe")?;
        Ok(())
    }

    pub(crate) fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
        Ok(serde_json::to_vec(value)?)
    }

    pub(crate) fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Aborts a sled transaction with a serialization failure.
pub(crate) fn abort_serde(error: serde_json::Error) -> ConflictableTransactionError<StoreError> {
    ConflictableTransactionError::Abort(StoreError::Serialization(error))
}

pub(crate) fn flatten_transaction_error(error: TransactionError<StoreError>) -> StoreError {
    match error {
        TransactionError::Abort(store_error) => store_error,
        TransactionError::Storage(storage_error) => StoreError::Sled(storage_error),
    }
}
