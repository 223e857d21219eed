//! Storage trait definitions

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::query::{PayloadError, Row, Statement};

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Constraint '{constraint}' violated: {detail}")]
    ConstraintViolation { constraint: String, detail: String },

    #[error("Write statement '{0}' issued on a read session")]
    ReadOnly(&'static str),

    #[error("Read statement '{0}' issued as a write")]
    NotAWrite(&'static str),

    #[error("Malformed parameters for '{operation}': {source}")]
    Payload {
        operation: &'static str,
        #[source]
        source: PayloadError,
    },

    #[error("Corrupt stored graph: {0}")]
    Corrupt(String),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(&'static str),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Write abandoned before commit")]
    Abandoned,

    #[error("Blocking store task failed: {0}")]
    Blocking(#[from] tokio::task::JoinError),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Counters reported by a write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub nodes_created: usize,
    pub edges_created: usize,
    pub nodes_deleted: usize,
    pub edges_deleted: usize,
    pub schema_changes: usize,
}

impl WriteSummary {
    /// Sum of two summaries
    pub fn merge(self, other: Self) -> Self {
        Self {
            nodes_created: self.nodes_created + other.nodes_created,
            edges_created: self.edges_created + other.edges_created,
            nodes_deleted: self.nodes_deleted + other.nodes_deleted,
            edges_deleted: self.edges_deleted + other.edges_deleted,
            schema_changes: self.schema_changes + other.schema_changes,
        }
    }
}

/// Contract the resolver requires from a graph store.
///
/// Implementations must be thread-safe (Send + Sync): one store is shared
/// by every concurrent lookup worker. A write either applies completely or
/// not at all.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &str;

    /// Run a read-only statement and return its rows
    async fn execute_read(&self, statement: &Statement) -> StorageResult<Vec<Row>>;

    /// Run a write statement atomically
    async fn execute_write(&self, statement: &Statement) -> StorageResult<WriteSummary>;
}

/// Extension trait for opening stores from paths
pub trait OpenStore: GraphStore + Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StorageResult<Self>;

    /// Create an in-memory store (useful for testing)
    fn open_in_memory() -> StorageResult<Self>;
}
