//! Storage Layer
//!
//! Persistence for devices, policies, and alerts behind the [`Repository`]
//! trait, with SQLite and in-memory implementations.

mod memory;
mod records;
mod repository;
mod sqlite;


pub use memory::MemoryRepository;
pub use records::{now, Alert, Decision, Device, NewAlert, NewDevice};
pub use repository::Repository;
pub use sqlite::SqliteRepository;

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

/// URL scheme selecting the in-memory repository
pub const MEMORY_URL: &str = "memory://";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Open the repository named by `url`.
///
/// `memory://` selects [`MemoryRepository`]; anything else is handed to
/// [`SqliteRepository::connect`].
pub async fn open(url: &str, max_connections: u32) -> Result<Arc<dyn Repository>, StorageError> {
    if url == MEMORY_URL {
        info!("Using in-memory repository");
        return Ok(Arc::new(MemoryRepository::new()));
    }

    let repo = SqliteRepository::connect(url, max_connections).await?;
    Ok(Arc::new(repo))
}
