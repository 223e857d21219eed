//! Read and write sessions over a shared store

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use super::traits::{GraphStore, StorageError, StorageResult, WriteSummary};
use crate::query::{Row, Statement};

/// A read-only handle.
///
/// Cheap to clone; concurrent lookup workers share one. Write statements
/// are refused before they reach the store.
#[derive(Clone)]
pub struct ReadSession {
    store: Arc<dyn GraphStore>,
    database: String,
}

impl ReadSession {
    pub fn new(store: Arc<dyn GraphStore>, database: impl Into<String>) -> Self {
        Self {
            store,
            database: database.into(),
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub async fn run(&self, statement: &Statement) -> StorageResult<Vec<Row>> {
        if statement.is_write() {
            return Err(StorageError::ReadOnly(statement.operation.name()));
        }
        trace!(statement = %statement.render_debug(), "read");
        let started = Instant::now();
        let rows = self.store.execute_read(statement).await?;
        debug!(
            store = self.store.name(),
            database = %self.database,
            operation = statement.operation.name(),
            rows = rows.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "read complete"
        );
        Ok(rows)
    }
}

impl std::fmt::Debug for ReadSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadSession")
            .field("store", &self.store.name())
            .field("database", &self.database)
            .finish()
    }
}

/// An exclusive write handle with a per-statement deadline.
///
/// `run` takes `&mut self`, so one session never issues concurrent writes.
pub struct WriteSession {
    store: Arc<dyn GraphStore>,
    database: String,
    timeout: Duration,
}

impl WriteSession {
    pub fn new(store: Arc<dyn GraphStore>, database: impl Into<String>, timeout: Duration) -> Self {
        Self {
            store,
            database: database.into(),
            timeout,
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub async fn run(&mut self, statement: &Statement) -> StorageResult<WriteSummary> {
        if !statement.is_write() {
            return Err(StorageError::NotAWrite(statement.operation.name()));
        }
        trace!(statement = %statement.render_debug(), "write");
        let started = Instant::now();
        let summary = tokio::time::timeout(self.timeout, self.store.execute_write(statement))
            .await
            .map_err(|_| StorageError::Timeout(self.timeout))??;
        debug!(
            store = self.store.name(),
            database = %self.database,
            operation = statement.operation.name(),
            nodes_created = summary.nodes_created,
            edges_created = summary.edges_created,
            nodes_deleted = summary.nodes_deleted,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "write complete"
        );
        Ok(summary)
    }
}
