//! In-memory graph store

use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use super::blocking::run_blocking;
use super::executor::{apply, plan_write, run_read};
use super::traits::{GraphStore, StorageError, StorageResult, WriteSummary};
use crate::graph::PropertyGraph;
use crate::query::{Row, Statement};

/// A store that lives for the life of the process.
///
/// Reads share the lock; a write holds it exclusively while it is planned
/// and applied. Both run on the blocking pool.
#[derive(Debug, Default)]
pub struct MemoryStore {
    graph: Arc<RwLock<PropertyGraph>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store seeded with an existing graph
    pub fn with_graph(graph: PropertyGraph) -> Self {
        Self {
            graph: Arc::new(RwLock::new(graph)),
        }
    }

    /// Copy of the current graph
    pub fn snapshot(&self) -> StorageResult<PropertyGraph> {
        self.graph
            .read()
            .map(|graph| graph.clone())
            .map_err(|_| StorageError::LockPoisoned("memory graph"))
    }
}

#[async_trait]
impl GraphStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn execute_read(&self, statement: &Statement) -> StorageResult<Vec<Row>> {
        let graph = Arc::clone(&self.graph);
        let statement = statement.clone();
        run_blocking(move |_| {
            let graph = graph
                .read()
                .map_err(|_| StorageError::LockPoisoned("memory graph"))?;
            run_read(&graph, &statement)
        })
        .await
    }

    async fn execute_write(&self, statement: &Statement) -> StorageResult<WriteSummary> {
        let graph = Arc::clone(&self.graph);
        let statement = statement.clone();
        run_blocking(move |token| {
            let mut graph = graph
                .write()
                .map_err(|_| StorageError::LockPoisoned("memory graph"))?;
            let mutation = plan_write(&graph, &statement)?;
            token.check()?;
            Ok(apply(&mut graph, mutation))
        })
        .await
    }
}
