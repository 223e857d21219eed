//! Error taxonomy for resolution and ingest.
//!
//! Not-found lookups are not errors: they come back as `LookupResult` with
//! `success == false`. Everything here aborts the call it was raised in.

use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

use crate::query::{PayloadError, QueryError};
use crate::resolve::{EntityId, Interval};
use crate::storage::StorageError;

/// Rejected input, detected before anything reaches the store.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("entity ID must be assigned by the caller before ingest")]
    NilEntityId,

    #[error("invalid interval: start ({start}) must be before end ({end})")]
    InvalidInterval {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("overlapping {attribute} intervals starting at {} and {}", first.start, second.start)]
    OverlappingIntervals {
        attribute: &'static str,
        first: Interval,
        second: Interval,
    },

    #[error("worker count must be at least 1")]
    ZeroWorkers,
}

/// A result row that does not have the expected shape.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("missing column '{0}'")]
    MissingColumn(&'static str),

    #[error("column '{column}': expected {expected}, found {found}")]
    UnexpectedType {
        column: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("column '{column}': {source}")]
    Malformed {
        column: &'static str,
        #[source]
        source: PayloadError,
    },

    #[error("invalid entity id '{value}': {source}")]
    InvalidEntityId {
        value: String,
        #[source]
        source: uuid::Error,
    },
}

/// The store interaction that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Schema,
    Write,
    Read,
    Cleanup,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stage = match self {
            Stage::Schema => "create schema",
            Stage::Write => "create entities",
            Stage::Read => "lookup entities",
            Stage::Cleanup => "cleanup",
        };
        f.write_str(stage)
    }
}

/// Top-level error returned by the resolver API.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("create schema: {0}")]
    Schema(#[source] StorageError),

    #[error("create entities: {0}")]
    Write(#[source] StorageError),

    #[error("lookup entities: {0}")]
    Read(#[source] StorageError),

    #[error("cleanup: {0}")]
    Cleanup(#[source] StorageError),

    #[error("map result row: {0}")]
    Mapping(#[from] MappingError),

    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("invalid entity {id}: {source}")]
    InvalidEntity {
        id: EntityId,
        #[source]
        source: ValidationError,
    },

    #[error("build statement: {0}")]
    Statement(#[from] QueryError),

    #[error("{stage} timed out after {limit:?}")]
    Timeout { stage: Stage, limit: Duration },

    #[error("lookup worker {worker} did not complete: {source}")]
    Worker {
        worker: usize,
        #[source]
        source: tokio::task::JoinError,
    },
}

impl ResolveError {
    /// Attribute a store failure to `stage`. A session deadline surfaces as
    /// `Timeout` rather than as a storage error.
    pub fn at(stage: Stage, error: StorageError) -> Self {
        match (stage, error) {
            (stage, StorageError::Timeout(limit)) => Self::Timeout { stage, limit },
            (Stage::Schema, error) => Self::Schema(error),
            (Stage::Write, error) => Self::Write(error),
            (Stage::Read, error) => Self::Read(error),
            (Stage::Cleanup, error) => Self::Cleanup(error),
        }
    }

    /// The store stage this error came from, if it came from the store.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Schema(_) => Some(Stage::Schema),
            Self::Write(_) => Some(Stage::Write),
            Self::Read(_) | Self::Worker { .. } => Some(Stage::Read),
            Self::Cleanup(_) => Some(Stage::Cleanup),
            Self::Timeout { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Result type for resolver operations
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Errors loading a configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
