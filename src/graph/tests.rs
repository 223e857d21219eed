//! Property graph and serialization tests

use super::*;
use chrono::{TimeZone, Utc};

fn identifier(kind: &str, value: &str) -> Node {
    Node::new(Label::Identifier)
        .with_property("type", kind)
        .with_property("value", value)
}

#[test]
fn identifier_index_finds_nodes_by_type_and_value() {
    let mut graph = PropertyGraph::new();
    let isin = identifier("isin", "US0000000");
    let isin_id = isin.id;
    graph.insert_node(isin);
    graph.insert_node(identifier("cusip", "US0000000"));

    let found = graph.find_identifiers("isin", "US0000000");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, isin_id);
    assert!(graph.find_identifiers("isin", "missing").is_empty());
}

#[test]
fn adjacency_is_filtered_by_relationship() {
    let mut graph = PropertyGraph::new();
    let entity = Node::new(Label::Entity).with_property("id", "e-1");
    let name = Node::new(Label::Name).with_property("value", "Acme");
    let idn = identifier("lei", "L1");
    let (e, n, i) = (entity.id, name.id, idn.id);

    graph.apply(GraphDelta {
        nodes: vec![entity, name, idn],
        edges: vec![
            Edge::new(e, n, Relationship::HasName),
            Edge::new(e, i, Relationship::HasIdentifier),
        ],
    });

    assert_eq!(graph.outgoing(&e, Relationship::HasName).len(), 1);
    assert_eq!(graph.outgoing(&e, Relationship::HasIdentifier).len(), 1);
    assert!(graph.outgoing(&e, Relationship::HasSecurity).is_empty());
    let owners = graph.incoming(&i, Relationship::HasIdentifier);
    assert_eq!(owners[0].1.str_property("id"), Some("e-1"));
    assert_eq!(graph.find_entities("e-1").len(), 1);
}

#[test]
fn detach_delete_removes_touching_edges_and_index_entries() {
    let mut graph = PropertyGraph::new();
    let entity = Node::new(Label::Entity).with_property("id", "e-1");
    let idn = identifier("lei", "L1");
    let (e, i) = (entity.id, idn.id);
    graph.apply(GraphDelta {
        nodes: vec![entity, idn],
        edges: vec![Edge::new(e, i, Relationship::HasIdentifier)],
    });

    let removed = graph.detach_delete(&i).unwrap();
    assert_eq!(removed.len(), 1);
    assert_eq!(graph.edge_count(), 0);
    assert!(graph.find_identifiers("lei", "L1").is_empty());
    assert!(graph.outgoing(&e, Relationship::HasIdentifier).is_empty());
    assert!(graph.detach_delete(&i).is_none());
}

#[test]
fn edge_interval_comes_from_link_properties() {
    let from = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    let until = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
    let edge = Edge::new(NodeId::new(), NodeId::new(), Relationship::HasIdentifier).during(from, Some(until));

    assert!(edge.is_active_at(from));
    assert!(!edge.is_active_at(until));

    let unconditional = Edge::new(NodeId::new(), NodeId::new(), Relationship::HasIdentifier);
    assert!(unconditional.interval().is_none());
    assert!(unconditional.is_active_at(until));
}

#[test]
fn schema_objects_are_created_once() {
    let mut graph = PropertyGraph::new();
    assert!(graph.create_schema("entity_id", SchemaKind::Constraint));
    assert!(!graph.create_schema("entity_id", SchemaKind::Constraint));
    assert!(graph.has_schema("entity_id"));
    assert!(graph.drop_schema("entity_id"));
    assert!(!graph.drop_schema("entity_id"));
}

#[test]
fn property_values_keep_timestamps_apart_from_strings() {
    let mut props = Properties::new();
    props.insert("from".into(), PropertyValue::DateTime("2020-01-01T00:00:00Z".parse().unwrap()));
    props.insert("value".into(), PropertyValue::String("2020-01-01T00:00:00Z".into()));
    props.insert("primary".into(), PropertyValue::Bool(true));

    let json = serde_json::to_value(&props).unwrap();
    assert_eq!(json["value"], serde_json::json!({"kind": "string", "value": "2020-01-01T00:00:00Z"}));

    let back: Properties = serde_json::from_value(json).unwrap();
    assert_eq!(back, props);
    assert!(matches!(back["from"], PropertyValue::DateTime(_)));
    assert_eq!(back["value"].as_str(), Some("2020-01-01T00:00:00Z"));
}

#[test]
fn relationship_serializes_in_upper_snake_case() {
    let json = serde_json::to_string(&Relationship::HasIdentifier).unwrap();
    assert_eq!(json, "\"HAS_IDENTIFIER\"");
}
