//! Shared state store for breather
//!
//! The store is the only channel between the controller, the background
//! monitor and the shield provider. Provides:
//! - A fixed key set with single-key get/set
//! - Grouped writes in one transaction
//! - Restart signal records consumed exactly once
//! - A typed read layer that treats absent keys as zero/default

mod sqlite;
mod traits;
mod typed;

pub use sqlite::*;
pub use traits::*;
pub use typed::*;

use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
