//! Lookup strategies over a shared read session
//!
//! - `lookup_entities`: one batched statement for the whole call. Follows
//!   identifiers held by securities. Row order and count follow the store,
//!   so lookups sharing an identifier may yield more or fewer results than
//!   inputs.
//! - `lookup_direct_entities`: one statement per lookup, entity-held
//!   identifiers only. Results correspond 1:1 with the input, in order.
//! - `lookup_entities_concurrent`: the batched strategy over `W` contiguous
//!   chunks on separate tasks. Merged order is completion order. Any worker
//!   failure fails the whole call.
//!
//! Undated lookups resolve at a single `Utc::now()` captured per call, so
//! every worker and every row of one call agree on "now".

use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::mapper::{map_row, map_rows};
use super::statements::{batch_statement, direct_statement};
use crate::error::{ResolveError, ResolveResult, Stage, ValidationError};
use crate::resolve::{Lookup, LookupResult};
use crate::storage::ReadSession;

/// Resolves identifiers to entities through a read-only session
#[derive(Debug, Clone)]
pub struct LookupResolver {
    session: ReadSession,
    timeout: Option<Duration>,
}

impl LookupResolver {
    pub fn new(session: ReadSession) -> Self {
        Self { session, timeout: None }
    }

    /// Bound every lookup call by `timeout`; `None` leaves calls unbounded.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn session(&self) -> &ReadSession {
        &self.session
    }

    /// Batched resolution in a single statement.
    pub async fn lookup_entities(&self, lookups: &[Lookup]) -> ResolveResult<Vec<LookupResult>> {
        let started = Instant::now();
        let results = self
            .bounded(resolve_batch(&self.session, lookups, Utc::now()))
            .await?;
        info!(
            lookups = lookups.len(),
            results = results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batched lookup complete"
        );
        Ok(results)
    }

    /// Sequential resolution, one statement per lookup.
    pub async fn lookup_direct_entities(&self, lookups: &[Lookup]) -> ResolveResult<Vec<LookupResult>> {
        let started = Instant::now();
        let now = Utc::now();
        let results = self
            .bounded(async {
                let mut results = Vec::with_capacity(lookups.len());
                for (index, lookup) in lookups.iter().enumerate() {
                    results.push(resolve_direct(&self.session, index, lookup, now).await?);
                }
                Ok(results)
            })
            .await?;
        info!(
            lookups = lookups.len(),
            found = results.iter().filter(|r| r.success).count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "direct lookup complete"
        );
        Ok(results)
    }

    /// Batched resolution partitioned across `workers` concurrent tasks.
    ///
    /// The input is split into contiguous chunks of `ceil(n / workers)`
    /// lookups; fewer tasks run when there are fewer lookups than workers.
    /// Every task's outcome is observed before returning. On the first
    /// failure the remaining tasks are aborted and that failure is returned.
    pub async fn lookup_entities_concurrent(
        &self,
        lookups: &[Lookup],
        workers: usize,
    ) -> ResolveResult<Vec<LookupResult>> {
        if workers == 0 {
            return Err(ValidationError::ZeroWorkers.into());
        }
        if lookups.is_empty() {
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let now = Utc::now();
        let chunk_size = lookups.len().div_ceil(workers);

        let mut tasks = JoinSet::new();
        let mut worker_ids = HashMap::new();
        for (worker, chunk) in lookups.chunks(chunk_size).enumerate() {
            let session = self.session.clone();
            let chunk = chunk.to_vec();
            let handle = tasks.spawn(async move {
                let result = resolve_batch(&session, &chunk, now).await;
                debug!(worker, lookups = chunk.len(), ok = result.is_ok(), "lookup worker finished");
                result
            });
            worker_ids.insert(handle.id(), worker);
        }
        let spawned = worker_ids.len();

        let results = self
            .bounded(async {
                let mut merged = Vec::with_capacity(lookups.len());
                let mut failure: Option<ResolveError> = None;
                while let Some(joined) = tasks.join_next_with_id().await {
                    let outcome = match joined {
                        Ok((_, outcome)) => outcome,
                        Err(err) if err.is_cancelled() && failure.is_some() => continue,
                        Err(err) => Err(ResolveError::Worker {
                            worker: worker_ids.get(&err.id()).copied().unwrap_or_default(),
                            source: err,
                        }),
                    };
                    match outcome {
                        Ok(rows) if failure.is_none() => merged.extend(rows),
                        Ok(_) => {}
                        Err(err) => {
                            if failure.is_none() {
                                warn!(error = %err, "lookup worker failed, aborting remaining workers");
                                tasks.abort_all();
                                failure = Some(err);
                            }
                        }
                    }
                }
                match failure {
                    Some(err) => Err(err),
                    None => Ok(merged),
                }
            })
            .await?;

        info!(
            lookups = lookups.len(),
            workers = spawned,
            results = results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "concurrent lookup complete"
        );
        Ok(results)
    }

    async fn bounded<T>(&self, call: impl Future<Output = ResolveResult<T>>) -> ResolveResult<T> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| ResolveError::Timeout {
                    stage: Stage::Read,
                    limit,
                })?,
            None => call.await,
        }
    }
}

async fn resolve_batch(
    session: &ReadSession,
    lookups: &[Lookup],
    now: DateTime<Utc>,
) -> ResolveResult<Vec<LookupResult>> {
    if lookups.is_empty() {
        return Ok(Vec::new());
    }
    let statement = batch_statement(lookups, now)?;
    let rows = session
        .run(&statement)
        .await
        .map_err(|err| ResolveError::at(Stage::Read, err))?;
    Ok(map_rows(&rows)?)
}

async fn resolve_direct(
    session: &ReadSession,
    index: usize,
    lookup: &Lookup,
    now: DateTime<Utc>,
) -> ResolveResult<LookupResult> {
    let statement = direct_statement(index, lookup, now)?;
    let rows = session
        .run(&statement)
        .await
        .map_err(|err| ResolveError::at(Stage::Read, err))?;
    match rows.first() {
        Some(row) => Ok(map_row(row)?),
        None => Ok(LookupResult::not_found(Lookup::new(
            lookup.identifier.clone(),
            lookup.as_of(now),
        ))),
    }
}
