//! Directed, typed links between nodes

use super::node::{NodeId, Properties, PropertyValue};
use crate::resolve::Interval;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId(Uuid);

impl EdgeId {
    /// Create a new random EdgeId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EdgeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EdgeId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Relationship types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Relationship {
    HasName,
    HasCountry,
    HasIdentifier,
    HasSecurity,
}

impl Relationship {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relationship::HasName => "HAS_NAME",
            Relationship::HasCountry => "HAS_COUNTRY",
            Relationship::HasIdentifier => "HAS_IDENTIFIER",
            Relationship::HasSecurity => "HAS_SECURITY",
        }
    }
}

impl std::fmt::Display for Relationship {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Relationship {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HAS_NAME" => Ok(Relationship::HasName),
            "HAS_COUNTRY" => Ok(Relationship::HasCountry),
            "HAS_IDENTIFIER" => Ok(Relationship::HasIdentifier),
            "HAS_SECURITY" => Ok(Relationship::HasSecurity),
            other => Err(format!("unknown relationship '{other}'")),
        }
    }
}

/// A directed edge. Time-bound links carry `from` and optionally `until`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Unique identifier
    pub id: EdgeId,
    /// Source node
    pub source: NodeId,
    /// Target node
    pub target: NodeId,
    pub relationship: Relationship,
    /// Additional properties
    pub properties: Properties,
}

impl Edge {
    /// Create a new edge
    pub fn new(source: NodeId, target: NodeId, relationship: Relationship) -> Self {
        Self {
            id: EdgeId::new(),
            source,
            target,
            relationship,
            properties: Properties::new(),
        }
    }

    /// Tag the edge with the interval it is valid over
    pub fn during(mut self, from: DateTime<Utc>, until: Option<DateTime<Utc>>) -> Self {
        self.properties
            .insert("from".to_string(), PropertyValue::DateTime(from));
        if let Some(until) = until {
            self.properties
                .insert("until".to_string(), PropertyValue::DateTime(until));
        }
        self
    }

    /// The validity interval, or `None` for an unconditional link.
    pub fn interval(&self) -> Option<Interval> {
        let start = self.properties.get("from").and_then(PropertyValue::as_datetime)?;
        let end = self.properties.get("until").and_then(PropertyValue::as_datetime);
        Some(Interval { start, end })
    }

    /// Unconditional links are active at every instant.
    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        self.interval().map_or(true, |interval| interval.contains(at))
    }
}
