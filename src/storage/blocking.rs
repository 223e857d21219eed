//! Store work on the blocking pool
//!
//! Graph planning and SQLite I/O are synchronous. Running them through
//! `spawn_blocking` keeps runtime workers free and lets a caller's deadline
//! expire while the work is still in progress. When the caller stops
//! waiting, the work's token is cancelled; writes check it before they
//! commit, so an abandoned write leaves nothing behind.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::traits::{StorageError, StorageResult};

/// A cooperative cancellation token.
///
/// Cancelled when the awaiting caller goes away. Cancellation during a
/// commit has no effect; the commit stands.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// `Err(Abandoned)` once cancelled
    pub fn check(&self) -> StorageResult<()> {
        if self.is_cancelled() {
            return Err(StorageError::Abandoned);
        }
        Ok(())
    }
}

struct CancelOnDrop(CancellationToken);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// Run `work` on the blocking pool and wait for it.
///
/// Dropping the returned future cancels the token handed to `work`.
pub async fn run_blocking<T, F>(work: F) -> StorageResult<T>
where
    T: Send + 'static,
    F: FnOnce(&CancellationToken) -> StorageResult<T> + Send + 'static,
{
    let token = CancellationToken::new();
    let _guard = CancelOnDrop(token.clone());
    tokio::task::spawn_blocking(move || work(&token)).await?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn cloned_token_shares_state() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(clone.check().is_ok());
        token.cancel();
        assert!(matches!(clone.check(), Err(StorageError::Abandoned)));
    }

    #[tokio::test]
    async fn completed_work_returns_its_value() {
        let value = run_blocking(|token| {
            token.check()?;
            Ok(7)
        })
        .await
        .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn deadline_expires_while_work_runs() {
        let (seen_tx, seen_rx) = mpsc::channel();
        let call = run_blocking(move |token| {
            std::thread::sleep(Duration::from_millis(100));
            let _ = seen_tx.send(token.is_cancelled());
            token.check()
        });

        let outcome = tokio::time::timeout(Duration::from_millis(1), call).await;
        assert!(outcome.is_err());

        let cancelled = tokio::task::spawn_blocking(move || seen_rx.recv().unwrap())
            .await
            .unwrap();
        assert!(cancelled);
    }

    #[tokio::test]
    async fn panicking_work_surfaces_as_error() {
        let err = run_blocking::<(), _>(|_| panic!("boom")).await.unwrap_err();
        assert!(matches!(err, StorageError::Blocking(_)));
    }
}
