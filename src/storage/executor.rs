//! Statement execution over an in-process `PropertyGraph`
//!
//! Embedded stores dispatch on `Statement::operation` and decode the same
//! named parameters a query-language store would bind. Writes are planned
//! against a read-only view first and applied only once the plan is
//! complete, so a failing write leaves the graph untouched.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::debug;

use super::traits::{StorageError, StorageResult, WriteSummary};
use crate::graph::{Edge, GraphDelta, Label, Node, NodeId, PropertyGraph, Relationship, SchemaKind};
use crate::ingest::{EntityPayload, IdentifierPayload, IngestBatch};
use crate::lookup::LookupParam;
use crate::query::decode::PayloadError;
use crate::query::schema::ENTITY_ID;
use crate::query::{Operation, Row, Statement, Value};

/// A write, fully planned against the current graph
#[derive(Debug)]
pub(crate) enum Mutation {
    Create(GraphDelta),
    CreateSchema { name: String, kind: SchemaKind },
    DropSchema { name: String },
    DeleteAll { batch_size: usize },
}

fn payload_error(operation: &Operation) -> impl Fn(PayloadError) -> StorageError {
    let operation = operation.name();
    move |source| StorageError::Payload { operation, source }
}

// === Reads ===

pub(crate) fn run_read(graph: &PropertyGraph, statement: &Statement) -> StorageResult<Vec<Row>> {
    match &statement.operation {
        Operation::LookupBatch => {
            let params = LookupParam::from_batch(statement).map_err(payload_error(&statement.operation))?;
            let mut rows = Vec::with_capacity(params.len());
            for param in &params {
                let candidates = batch_candidates(graph, param);
                if candidates.is_empty() {
                    rows.push(null_row(param));
                }
                rows.extend(candidates.into_iter().map(|entity| entity_row(graph, entity, param)));
            }
            Ok(rows)
        }
        Operation::LookupDirect { index } => {
            let param = LookupParam::from_direct(statement, *index).map_err(payload_error(&statement.operation))?;
            let row = match direct_candidates(graph, &param).first() {
                Some(entity) => entity_row(graph, entity, &param),
                None => null_row(&param),
            };
            Ok(vec![row])
        }
        other => Err(StorageError::ReadOnly(other.name())),
    }
}

/// Entities reachable from the identifier at the lookup date, directly or
/// through one of their securities. De-duplicated, in discovery order.
fn batch_candidates<'g>(graph: &'g PropertyGraph, param: &LookupParam) -> Vec<&'g Node> {
    let mut seen = HashSet::new();
    let mut found = Vec::new();
    for identifier in graph.find_identifiers(&param.kind, &param.value) {
        for (link, owner) in graph.incoming(&identifier.id, Relationship::HasIdentifier) {
            if !link.is_active_at(param.date) {
                continue;
            }
            match owner.label {
                Label::Entity => {
                    if seen.insert(owner.id) {
                        found.push(owner);
                    }
                }
                Label::Security => {
                    for (hop, entity) in graph.incoming(&owner.id, Relationship::HasSecurity) {
                        if hop.is_active_at(param.date) && entity.label == Label::Entity && seen.insert(entity.id) {
                            found.push(entity);
                        }
                    }
                }
                _ => {}
            }
        }
    }
    found
}

/// Entities holding the identifier directly at the lookup date
fn direct_candidates<'g>(graph: &'g PropertyGraph, param: &LookupParam) -> Vec<&'g Node> {
    let mut seen = HashSet::new();
    graph
        .find_identifiers(&param.kind, &param.value)
        .into_iter()
        .flat_map(|identifier| graph.incoming(&identifier.id, Relationship::HasIdentifier))
        .filter(|(link, owner)| owner.label == Label::Entity && link.is_active_at(param.date))
        .map(|(_, owner)| owner)
        .filter(|owner| seen.insert(owner.id))
        .collect()
}

fn null_row(param: &LookupParam) -> Row {
    Row::new()
        .with("lookup", param.to_value())
        .with("entity", Value::Null)
        .with("name", Value::Null)
        .with("country", Value::Null)
        .with("identifiers", Value::List(Vec::new()))
        .with("securities", Value::List(Vec::new()))
}

fn link_value(edge: &Edge, key: &str) -> Value {
    edge.properties.get(key).cloned().map(Value::from).unwrap_or(Value::Null)
}

fn identifier_value(node: &Node) -> Value {
    Value::map([
        ("type", node.property("type").cloned().map(Value::from).unwrap_or(Value::Null)),
        ("value", node.property("value").cloned().map(Value::from).unwrap_or(Value::Null)),
    ])
}

/// The single value linked by `relationship` at the lookup date; the latest
/// start wins if several links are active.
fn active_attribute(graph: &PropertyGraph, entity: &Node, relationship: Relationship, at: DateTime<Utc>) -> Value {
    graph
        .outgoing(&entity.id, relationship)
        .into_iter()
        .filter(|(link, _)| link.is_active_at(at))
        .max_by_key(|(link, _)| link.interval().map(|interval| interval.start))
        .map(|(link, node)| {
            Value::map([
                ("value", node.property("value").cloned().map(Value::from).unwrap_or(Value::Null)),
                ("from", link_value(link, "from")),
                ("until", link_value(link, "until")),
            ])
        })
        .unwrap_or(Value::Null)
}

fn entity_row(graph: &PropertyGraph, entity: &Node, param: &LookupParam) -> Row {
    let at = param.date;

    let identifiers: Vec<Value> = graph
        .outgoing(&entity.id, Relationship::HasIdentifier)
        .into_iter()
        .filter(|(link, _)| link.is_active_at(at))
        .map(|(link, node)| {
            let mut value = identifier_value(node);
            if let Value::Map(entries) = &mut value {
                entries.insert("from".to_string(), link_value(link, "from"));
                entries.insert("until".to_string(), link_value(link, "until"));
            }
            value
        })
        .collect();

    let securities: Vec<Value> = graph
        .outgoing(&entity.id, Relationship::HasSecurity)
        .into_iter()
        .filter(|(link, _)| link.is_active_at(at))
        .map(|(link, security)| {
            let security_identifiers: Vec<Value> = graph
                .outgoing(&security.id, Relationship::HasIdentifier)
                .into_iter()
                .map(|(_, node)| identifier_value(node))
                .collect();
            Value::map([
                ("node", Value::from(security.id.to_string())),
                ("name", security.property("name").cloned().map(Value::from).unwrap_or(Value::Null)),
                ("primary", Value::from(security.property("primary").and_then(|p| p.as_bool()).unwrap_or(false))),
                ("from", link_value(link, "from")),
                ("until", link_value(link, "until")),
                ("identifiers", Value::List(security_identifiers)),
            ])
        })
        .collect();

    Row::new()
        .with("lookup", param.to_value())
        .with("entity", entity.clone())
        .with("name", active_attribute(graph, entity, Relationship::HasName, at))
        .with("country", active_attribute(graph, entity, Relationship::HasCountry, at))
        .with("identifiers", Value::List(identifiers))
        .with("securities", Value::List(securities))
}

// === Writes ===

pub(crate) fn plan_write(graph: &PropertyGraph, statement: &Statement) -> StorageResult<Mutation> {
    match &statement.operation {
        Operation::CreateConstraint { name } => Ok(Mutation::CreateSchema {
            name: name.clone(),
            kind: SchemaKind::Constraint,
        }),
        Operation::CreateIndex { name } => Ok(Mutation::CreateSchema {
            name: name.clone(),
            kind: SchemaKind::Index,
        }),
        Operation::DropConstraint { name } | Operation::DropIndex { name } => {
            Ok(Mutation::DropSchema { name: name.clone() })
        }
        Operation::DeleteAll { batch_size } => Ok(Mutation::DeleteAll {
            batch_size: (*batch_size).max(1),
        }),
        Operation::CreateEntities => {
            let batch = IngestBatch::from_statement(statement).map_err(payload_error(&statement.operation))?;
            let mut staging = Staging::new(graph);
            for entity in &batch.entities {
                staging.create_entity(entity)?;
            }
            Ok(Mutation::Create(staging.delta))
        }
        other => Err(StorageError::NotAWrite(other.name())),
    }
}

/// Apply a planned mutation to the graph
pub(crate) fn apply(graph: &mut PropertyGraph, mutation: Mutation) -> WriteSummary {
    match mutation {
        Mutation::Create(delta) => {
            let summary = WriteSummary {
                nodes_created: delta.nodes.len(),
                edges_created: delta.edges.len(),
                ..WriteSummary::default()
            };
            graph.apply(delta);
            summary
        }
        Mutation::CreateSchema { name, kind } => WriteSummary {
            schema_changes: usize::from(graph.create_schema(&name, kind)),
            ..WriteSummary::default()
        },
        Mutation::DropSchema { name } => WriteSummary {
            schema_changes: usize::from(graph.drop_schema(&name)),
            ..WriteSummary::default()
        },
        Mutation::DeleteAll { batch_size } => {
            let mut summary = WriteSummary::default();
            loop {
                let ids = graph.node_ids(batch_size);
                if ids.is_empty() {
                    break;
                }
                summary = summary.merge(delete_batch(graph, &ids));
                debug!(deleted = summary.nodes_deleted, "delete batch committed");
            }
            summary
        }
    }
}

/// Detach-delete one batch of nodes
pub(crate) fn delete_batch(graph: &mut PropertyGraph, ids: &[NodeId]) -> WriteSummary {
    let mut summary = WriteSummary::default();
    for id in ids {
        if let Some(edges) = graph.detach_delete(id) {
            summary.nodes_deleted += 1;
            summary.edges_deleted += edges.len();
        }
    }
    summary
}

/// Stages the nodes and links of one ingest batch.
///
/// Identifier nodes are merged on `(type, value)` against both the graph
/// and what this batch already staged, so a shared identifier gets one node.
struct Staging<'g> {
    graph: &'g PropertyGraph,
    delta: GraphDelta,
    identifiers: HashMap<(String, String), NodeId>,
    entity_ids: HashSet<String>,
    unique_entities: bool,
}

impl<'g> Staging<'g> {
    fn new(graph: &'g PropertyGraph) -> Self {
        Self {
            graph,
            delta: GraphDelta::default(),
            identifiers: HashMap::new(),
            entity_ids: HashSet::new(),
            unique_entities: graph.has_schema(ENTITY_ID.name),
        }
    }

    fn stage(&mut self, node: Node) -> NodeId {
        let id = node.id;
        self.delta.nodes.push(node);
        id
    }

    fn merge_identifier(&mut self, identifier: &IdentifierPayload) -> NodeId {
        if let Some(existing) = self.graph.find_identifiers(&identifier.kind, &identifier.value).first() {
            return existing.id;
        }
        let key = (identifier.kind.clone(), identifier.value.clone());
        if let Some(staged) = self.identifiers.get(&key) {
            return *staged;
        }
        let id = self.stage(
            Node::new(Label::Identifier)
                .with_property("type", identifier.kind.as_str())
                .with_property("value", identifier.value.as_str()),
        );
        self.identifiers.insert(key, id);
        id
    }

    fn link(&mut self, edge: Edge) {
        self.delta.edges.push(edge);
    }

    fn create_entity(&mut self, entity: &EntityPayload) -> StorageResult<()> {
        let fresh = self.entity_ids.insert(entity.id.clone());
        if self.unique_entities && (!fresh || !self.graph.find_entities(&entity.id).is_empty()) {
            return Err(StorageError::ConstraintViolation {
                constraint: ENTITY_ID.name.to_string(),
                detail: format!("an Entity with id '{}' already exists", entity.id),
            });
        }

        let entity_node = self.stage(Node::new(Label::Entity).with_property("id", entity.id.as_str()));

        for name in &entity.names {
            let node = self.stage(Node::new(Label::Name).with_property("value", name.value.as_str()));
            self.link(Edge::new(entity_node, node, Relationship::HasName).during(name.from, name.until));
        }
        for country in &entity.countries {
            let node = self.stage(Node::new(Label::Country).with_property("value", country.value.as_str()));
            self.link(Edge::new(entity_node, node, Relationship::HasCountry).during(country.from, country.until));
        }
        for set in &entity.identifier_sets {
            for identifier in &set.identifiers {
                let node = self.merge_identifier(identifier);
                self.link(Edge::new(entity_node, node, Relationship::HasIdentifier).during(set.from, set.until));
            }
        }
        for security in &entity.securities {
            let security_node = self.stage(
                Node::new(Label::Security)
                    .with_property("name", security.name.as_str())
                    .with_property("primary", security.primary),
            );
            self.link(
                Edge::new(entity_node, security_node, Relationship::HasSecurity).during(security.from, security.until),
            );
            for identifier in &security.identifiers {
                let node = self.merge_identifier(identifier);
                self.link(Edge::new(security_node, node, Relationship::HasIdentifier));
            }
        }
        Ok(())
    }
}
