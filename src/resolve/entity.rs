//! Entities, identifiers and securities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::interval::{active_at, validate_timeline, DetailDuration, Interval, Timeline};
use crate::error::ValidationError;

/// Globally unique identifier of an entity, assigned by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Create a new random EntityId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Kind of an external code, e.g. `isin`, `cusip`, `lei`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentifierType(String);

impl IdentifierType {
    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IdentifierType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IdentifierType {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for IdentifierType {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A typed external code.
///
/// Not unique on its own: the same `(type, value)` may belong to different
/// entities at different times, or to a security instead of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identifier {
    #[serde(rename = "type")]
    pub kind: IdentifierType,
    pub value: String,
}

impl Identifier {
    pub fn new(kind: impl Into<IdentifierType>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityName {
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityCountry {
    pub value: String,
}

/// A financial instrument issued by an entity, carrying its own identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Security {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifiers: Vec<Identifier>,
    /// At most one primary per active set by convention; not enforced.
    #[serde(default)]
    pub is_primary: bool,
}

impl Security {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identifiers: Vec::new(),
            is_primary: false,
        }
    }

    pub fn with_identifier(mut self, identifier: Identifier) -> Self {
        self.identifiers.push(identifier);
        self
    }

    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }
}

/// The canonical object that identifiers resolve to.
///
/// Each attribute is an independent timeline. Identifiers and securities are
/// versioned as whole sets: a timeline entry holds the complete set that was
/// valid over its interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    #[serde(default)]
    pub name: Timeline<EntityName>,
    #[serde(default)]
    pub country: Timeline<EntityCountry>,
    #[serde(default)]
    pub identifiers: Timeline<Vec<Identifier>>,
    #[serde(default)]
    pub securities: Timeline<Vec<Security>>,
}

impl Entity {
    /// Create an entity with empty timelines
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            name: Vec::new(),
            country: Vec::new(),
            identifiers: Vec::new(),
            securities: Vec::new(),
        }
    }

    pub fn with_name(mut self, value: impl Into<String>, interval: Interval) -> Self {
        self.name.push(DetailDuration::new(
            EntityName {
                value: value.into(),
            },
            interval,
        ));
        self
    }

    pub fn with_country(mut self, value: impl Into<String>, interval: Interval) -> Self {
        self.country.push(DetailDuration::new(
            EntityCountry {
                value: value.into(),
            },
            interval,
        ));
        self
    }

    pub fn with_identifiers(mut self, identifiers: Vec<Identifier>, interval: Interval) -> Self {
        self.identifiers.push(DetailDuration::new(identifiers, interval));
        self
    }

    pub fn with_securities(mut self, securities: Vec<Security>, interval: Interval) -> Self {
        self.securities.push(DetailDuration::new(securities, interval));
        self
    }

    pub fn name_at(&self, at: DateTime<Utc>) -> Option<&str> {
        active_at(&self.name, at).map(|entry| entry.value.value.as_str())
    }

    pub fn country_at(&self, at: DateTime<Utc>) -> Option<&str> {
        active_at(&self.country, at).map(|entry| entry.value.value.as_str())
    }

    pub fn identifiers_at(&self, at: DateTime<Utc>) -> &[Identifier] {
        active_at(&self.identifiers, at).map_or(&[], |entry| entry.value.as_slice())
    }

    pub fn securities_at(&self, at: DateTime<Utc>) -> &[Security] {
        active_at(&self.securities, at).map_or(&[], |entry| entry.value.as_slice())
    }

    /// Check the ingest preconditions: a caller-assigned ID and four
    /// well-formed, non-overlapping timelines.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_nil() {
            return Err(ValidationError::NilEntityId);
        }
        validate_timeline(&self.name, "name")?;
        validate_timeline(&self.country, "country")?;
        validate_timeline(&self.identifiers, "identifiers")?;
        validate_timeline(&self.securities, "securities")?;
        Ok(())
    }
}
