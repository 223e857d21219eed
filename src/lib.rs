//! idgraph: bitemporal identifier-to-entity resolution
//!
//! Entities carry time-bounded attributes (name, country, identifier sets,
//! securities) stored as links valid over half-open intervals. A lookup asks
//! which entity held an identifier at a given instant and returns that
//! entity with only the attributes active at that instant.
//!
//! # Core Concepts
//!
//! - **Timeline**: the history of one attribute, a list of values each valid
//!   over `[start, end)`
//! - **Statement**: a parameterized read or write against the graph store
//! - **Lookup strategies**: batched, direct (sequential), and concurrent
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use idgraph::{MemoryStore, ResolveApi, ResolverConfig};
//!
//! let api = ResolveApi::new(Arc::new(MemoryStore::new()), ResolverConfig::default());
//! assert_eq!(api.config().default_workers, 4);
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod graph;
pub mod ingest;
pub mod lookup;
pub mod query;
pub mod resolve;
pub mod storage;

pub use api::ResolveApi;
pub use config::ResolverConfig;
pub use error::{ConfigError, MappingError, ResolveError, ResolveResult, Stage, ValidationError};
pub use ingest::{IngestBatch, IngestEncoder};
pub use lookup::LookupResolver;
pub use query::{Operation, QueryBuilder, Row, Statement, Value};
pub use resolve::{
    DetailDuration, Entity, EntityCountry, EntityId, EntityName, Identifier, IdentifierType, Interval, Lookup,
    LookupResult, Security, Timeline,
};
pub use storage::{
    GraphStore, MemoryStore, OpenStore, ReadSession, SqliteStore, StorageError, StorageResult, WriteSession,
    WriteSummary,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
