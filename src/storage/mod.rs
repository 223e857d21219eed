//! Storage backends
//!
//! Every backend implements `GraphStore`. `MemoryStore` is process-local;
//! `SqliteStore` persists to a file. Callers talk to a store through a
//! `ReadSession` or a `WriteSession`.

mod blocking;
mod executor;
mod memory;
mod session;
mod sqlite;
mod traits;

pub use memory::MemoryStore;
pub use session::{ReadSession, WriteSession};
pub use sqlite::SqliteStore;
pub use traits::{GraphStore, OpenStore, StorageError, StorageResult, WriteSummary};
