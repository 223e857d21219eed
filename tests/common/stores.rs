//! Store wrappers for failure and latency injection

use async_trait::async_trait;
use idgraph::{GraphStore, MemoryStore, Row, Statement, StorageError, StorageResult, WriteSummary};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Fails the `fail_on`-th read (1-based); every other call passes through
pub struct FailingStore {
    pub inner: MemoryStore,
    fail_on: usize,
    reads: AtomicUsize,
}

impl FailingStore {
    pub fn new(inner: MemoryStore, fail_on: usize) -> Self {
        Self {
            inner,
            fail_on,
            reads: AtomicUsize::new(0),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GraphStore for FailingStore {
    fn name(&self) -> &str {
        "failing"
    }

    async fn execute_read(&self, statement: &Statement) -> StorageResult<Vec<Row>> {
        let call = self.reads.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_on {
            return Err(StorageError::Corrupt(format!("injected failure on read {call}")));
        }
        self.inner.execute_read(statement).await
    }

    async fn execute_write(&self, statement: &Statement) -> StorageResult<WriteSummary> {
        self.inner.execute_write(statement).await
    }
}

/// Sleeps before every call
pub struct SlowStore {
    pub inner: MemoryStore,
    pub delay: Duration,
}

#[async_trait]
impl GraphStore for SlowStore {
    fn name(&self) -> &str {
        "slow"
    }

    async fn execute_read(&self, statement: &Statement) -> StorageResult<Vec<Row>> {
        tokio::time::sleep(self.delay).await;
        self.inner.execute_read(statement).await
    }

    async fn execute_write(&self, statement: &Statement) -> StorageResult<WriteSummary> {
        tokio::time::sleep(self.delay).await;
        self.inner.execute_write(statement).await
    }
}
