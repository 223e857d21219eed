//! Transport-independent API layer.
//!
//! `ResolveApi` is the single entry point for consumers: schema management,
//! versioned ingest, the three lookup strategies, and cleanup. The CLI and
//! embedding callers go through it rather than building statements
//! themselves.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument};

use crate::config::ResolverConfig;
use crate::error::{ResolveError, ResolveResult, Stage};
use crate::ingest::IngestEncoder;
use crate::lookup::LookupResolver;
use crate::query::schema::{delete_all_statement, SCHEMA};
use crate::resolve::{Entity, Lookup, LookupResult};
use crate::storage::{GraphStore, ReadSession, WriteSession, WriteSummary};

/// Single entry point for all consumer-facing operations.
#[derive(Clone)]
pub struct ResolveApi {
    store: Arc<dyn GraphStore>,
    config: ResolverConfig,
}

impl ResolveApi {
    pub fn new(store: Arc<dyn GraphStore>, config: ResolverConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// A read-only session on the configured database
    pub fn read_session(&self) -> ReadSession {
        ReadSession::new(self.store.clone(), self.config.database.as_str())
    }

    fn write_session(&self, timeout: Duration) -> WriteSession {
        WriteSession::new(self.store.clone(), self.config.database.as_str(), timeout)
    }

    pub fn resolver(&self) -> LookupResolver {
        LookupResolver::new(self.read_session()).with_timeout(self.config.read_timeout)
    }

    // --- Schema ---

    /// Create the entity-ID constraint and lookup indexes if missing.
    ///
    /// Returns how many schema objects were newly created.
    #[instrument(skip(self), fields(store = self.store.name()))]
    pub async fn ensure_schema(&self) -> ResolveResult<usize> {
        let mut session = self.write_session(self.config.write_timeout);
        let mut created = 0;
        for object in &SCHEMA {
            let summary = session
                .run(&object.create_statement())
                .await
                .map_err(|err| ResolveError::at(Stage::Schema, err))?;
            created += summary.schema_changes;
        }
        if created > 0 {
            info!(created, "schema objects created");
        }
        Ok(created)
    }

    // --- Write ---

    /// Ingest entities with their full attribute history in one write.
    ///
    /// Input is validated before the store is touched. The schema is
    /// ensured first, so a duplicate entity ID aborts the whole batch.
    #[instrument(skip(self, entities), fields(entities = entities.len()))]
    pub async fn create_entities(&self, entities: &[Entity]) -> ResolveResult<WriteSummary> {
        let batch = IngestEncoder::new()
            .with_timeline_validation(self.config.validate_timelines)
            .encode(entities)?;
        let statement = batch.to_statement()?;

        self.ensure_schema().await?;

        let summary = self
            .write_session(self.config.write_timeout)
            .run(&statement)
            .await
            .map_err(|err| ResolveError::at(Stage::Write, err))?;
        info!(
            nodes = summary.nodes_created,
            edges = summary.edges_created,
            "entities created"
        );
        Ok(summary)
    }

    // --- Read ---

    /// Batched lookup; follows security-held identifiers.
    pub async fn lookup_entities(&self, lookups: &[Lookup]) -> ResolveResult<Vec<LookupResult>> {
        self.resolver().lookup_entities(lookups).await
    }

    /// One lookup at a time over entity-held identifiers; 1:1 with the input.
    pub async fn lookup_direct_entities(&self, lookups: &[Lookup]) -> ResolveResult<Vec<LookupResult>> {
        self.resolver().lookup_direct_entities(lookups).await
    }

    /// Batched lookup split across `workers` concurrent tasks.
    pub async fn lookup_entities_concurrent(
        &self,
        lookups: &[Lookup],
        workers: usize,
    ) -> ResolveResult<Vec<LookupResult>> {
        self.resolver().lookup_entities_concurrent(lookups, workers).await
    }

    // --- Reset ---

    /// Drop the schema objects, then delete every node and link.
    ///
    /// Returns the number of nodes deleted.
    #[instrument(skip(self), fields(store = self.store.name()))]
    pub async fn cleanup(&self) -> ResolveResult<usize> {
        let mut session = self.write_session(self.config.cleanup_timeout);
        for object in &SCHEMA {
            session
                .run(&object.drop_statement())
                .await
                .map_err(|err| ResolveError::at(Stage::Cleanup, err))?;
        }
        let summary = session
            .run(&delete_all_statement(self.config.cleanup_batch_size))
            .await
            .map_err(|err| ResolveError::at(Stage::Cleanup, err))?;
        info!(nodes = summary.nodes_deleted, edges = summary.edges_deleted, "store cleaned");
        Ok(summary.nodes_deleted)
    }
}
