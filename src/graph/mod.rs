//! Core graph data structures

mod edge;
mod node;
mod property_graph;

#[cfg(test)]
mod tests;

pub use edge::{Edge, EdgeId, Relationship};
pub use node::{Label, Node, NodeId, Properties, PropertyValue};
pub use property_graph::{GraphDelta, PropertyGraph, SchemaKind};
