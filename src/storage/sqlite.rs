//! SQLite storage backend
//!
//! The database file is the durable copy; a `PropertyGraph` mirror loaded at
//! open time serves every read. Each write runs in one SQLite transaction
//! and reaches the mirror only after that transaction commits.

use async_trait::async_trait;
use rusqlite::{params, Connection, Transaction};
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info};

use super::blocking::{run_blocking, CancellationToken};
use super::executor::{apply, delete_batch, plan_write, run_read, Mutation};
use super::traits::{GraphStore, OpenStore, StorageError, StorageResult, WriteSummary};
use crate::graph::{Edge, Label, Node, PropertyGraph, Relationship, SchemaKind};
use crate::query::{Row, Statement};

/// SQLite-backed graph store
///
/// Thread-safe via an internal mutex on the connection and a read-write lock
/// on the mirror. Lock order is mirror first, then connection. Statements
/// run on the blocking pool.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    graph: Arc<RwLock<PropertyGraph>>,
}

impl SqliteStore {
    /// Initialize the database schema
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS nodes (
                id TEXT PRIMARY KEY,
                label TEXT NOT NULL,
                properties_json TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_nodes_label ON nodes(label);

            CREATE TABLE IF NOT EXISTS edges (
                id TEXT PRIMARY KEY,
                source_id TEXT NOT NULL,
                target_id TEXT NOT NULL,
                relationship TEXT NOT NULL,
                properties_json TEXT NOT NULL,
                FOREIGN KEY (source_id) REFERENCES nodes(id) ON DELETE CASCADE,
                FOREIGN KEY (target_id) REFERENCES nodes(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(source_id);
            CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target_id);

            -- Named constraints and indexes of the logical graph
            CREATE TABLE IF NOT EXISTS schema_objects (
                name TEXT PRIMARY KEY,
                kind TEXT NOT NULL
            );

            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            "#,
        )?;
        Ok(())
    }

    fn from_connection(conn: Connection) -> StorageResult<Self> {
        Self::init_schema(&conn)?;
        let graph = Self::load_graph(&conn)?;
        info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "loaded sqlite graph"
        );
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            graph: Arc::new(RwLock::new(graph)),
        })
    }

    /// Rebuild the mirror from the tables
    fn load_graph(conn: &Connection) -> StorageResult<PropertyGraph> {
        let mut graph = PropertyGraph::new();

        let mut stmt = conn.prepare("SELECT id, label, properties_json FROM nodes")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
        })?;
        for row in rows {
            let (id, label, properties) = row?;
            graph.insert_node(Self::row_to_node(id, label, properties)?);
        }

        let mut stmt = conn.prepare("SELECT id, source_id, target_id, relationship, properties_json FROM edges")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;
        for row in rows {
            let (id, source, target, relationship, properties) = row?;
            graph.insert_edge(Self::row_to_edge(id, source, target, relationship, properties)?);
        }

        let mut stmt = conn.prepare("SELECT name, kind FROM schema_objects")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
        for row in rows {
            let (name, kind) = row?;
            let kind = match kind.as_str() {
                "constraint" => SchemaKind::Constraint,
                "index" => SchemaKind::Index,
                other => return Err(StorageError::Corrupt(format!("unknown schema kind '{other}'"))),
            };
            graph.create_schema(&name, kind);
        }

        Ok(graph)
    }

    fn row_to_node(id: String, label: String, properties_json: String) -> StorageResult<Node> {
        Ok(Node {
            id: id.parse().map_err(|e| StorageError::Corrupt(format!("node id '{id}': {e}")))?,
            label: label.parse::<Label>().map_err(StorageError::Corrupt)?,
            properties: serde_json::from_str(&properties_json)?,
        })
    }

    fn row_to_edge(
        id: String,
        source_id: String,
        target_id: String,
        relationship: String,
        properties_json: String,
    ) -> StorageResult<Edge> {
        let corrupt = |what: &str, value: &str| StorageError::Corrupt(format!("{what} '{value}'"));
        Ok(Edge {
            id: id.parse().map_err(|_| corrupt("edge id", &id))?,
            source: source_id.parse().map_err(|_| corrupt("edge source", &source_id))?,
            target: target_id.parse().map_err(|_| corrupt("edge target", &target_id))?,
            relationship: relationship.parse::<Relationship>().map_err(StorageError::Corrupt)?,
            properties: serde_json::from_str(&properties_json)?,
        })
    }

    /// Write a planned mutation inside an open transaction
    fn persist(tx: &Transaction<'_>, mutation: &Mutation) -> StorageResult<()> {
        match mutation {
            Mutation::Create(delta) => {
                for node in &delta.nodes {
                    tx.execute(
                        "INSERT INTO nodes (id, label, properties_json) VALUES (?1, ?2, ?3)",
                        params![node.id.to_string(), node.label.as_str(), serde_json::to_string(&node.properties)?],
                    )?;
                }
                for edge in &delta.edges {
                    tx.execute(
                        r#"
                        INSERT INTO edges (id, source_id, target_id, relationship, properties_json)
                        VALUES (?1, ?2, ?3, ?4, ?5)
                        "#,
                        params![
                            edge.id.to_string(),
                            edge.source.to_string(),
                            edge.target.to_string(),
                            edge.relationship.as_str(),
                            serde_json::to_string(&edge.properties)?
                        ],
                    )?;
                }
            }
            Mutation::CreateSchema { name, kind } => {
                tx.execute(
                    "INSERT OR IGNORE INTO schema_objects (name, kind) VALUES (?1, ?2)",
                    params![name, kind.as_str()],
                )?;
            }
            Mutation::DropSchema { name } => {
                tx.execute("DELETE FROM schema_objects WHERE name = ?1", params![name])?;
            }
            Mutation::DeleteAll { .. } => {}
        }
        Ok(())
    }

    /// Delete every node, one committed transaction per batch.
    ///
    /// Batches already committed stay deleted if a later one fails or the
    /// caller gives up.
    fn delete_all(
        conn: &mut Connection,
        graph: &mut PropertyGraph,
        batch_size: usize,
        token: &CancellationToken,
    ) -> StorageResult<WriteSummary> {
        let mut summary = WriteSummary::default();
        loop {
            let ids = graph.node_ids(batch_size);
            if ids.is_empty() {
                return Ok(summary);
            }
            token.check()?;
            let tx = conn.transaction()?;
            for id in &ids {
                // Edges go with the node (ON DELETE CASCADE)
                tx.execute("DELETE FROM nodes WHERE id = ?1", params![id.to_string()])?;
            }
            tx.commit()?;
            summary = summary.merge(delete_batch(graph, &ids));
            debug!(deleted = summary.nodes_deleted, "delete batch committed");
        }
    }
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::from_connection(Connection::open(path)?)
    }

    fn open_in_memory() -> StorageResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }
}

#[async_trait]
impl GraphStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn execute_read(&self, statement: &Statement) -> StorageResult<Vec<Row>> {
        let graph = Arc::clone(&self.graph);
        let statement = statement.clone();
        run_blocking(move |_| {
            let graph = graph
                .read()
                .map_err(|_| StorageError::LockPoisoned("sqlite graph"))?;
            run_read(&graph, &statement)
        })
        .await
    }

    async fn execute_write(&self, statement: &Statement) -> StorageResult<WriteSummary> {
        let graph = Arc::clone(&self.graph);
        let conn = Arc::clone(&self.conn);
        let statement = statement.clone();
        run_blocking(move |token| {
            let mut graph = graph
                .write()
                .map_err(|_| StorageError::LockPoisoned("sqlite graph"))?;
            let mutation = plan_write(&graph, &statement)?;
            let mut conn = conn
                .lock()
                .map_err(|_| StorageError::LockPoisoned("sqlite connection"))?;

            if let Mutation::DeleteAll { batch_size } = mutation {
                return Self::delete_all(&mut conn, &mut graph, batch_size, token);
            }

            // Dropping the transaction rolls it back
            let tx = conn.transaction()?;
            Self::persist(&tx, &mutation)?;
            token.check()?;
            tx.commit()?;
            Ok(apply(&mut graph, mutation))
        })
        .await
    }
}
