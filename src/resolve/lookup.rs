//! Lookup requests and results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity::{Entity, EntityId, Identifier};

/// Resolve `identifier` as of `date`. No date means "now".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Lookup {
    pub identifier: Identifier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
}

impl Lookup {
    pub fn new(identifier: Identifier, date: DateTime<Utc>) -> Self {
        Self {
            identifier,
            date: Some(date),
        }
    }

    /// A lookup against the current state.
    pub fn current(identifier: Identifier) -> Self {
        Self {
            identifier,
            date: None,
        }
    }

    /// The instant this lookup resolves at, given the call's notion of now.
    pub fn as_of(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.date.unwrap_or(now)
    }
}

/// Outcome of one lookup.
///
/// `entity` holds only the attribute values active at the lookup date, not
/// the full history. `lookup.date` is the effective as-of instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupResult {
    pub lookup: Lookup,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<Entity>,
}

impl LookupResult {
    pub fn found(lookup: Lookup, entity: Entity) -> Self {
        Self {
            lookup,
            success: true,
            entity: Some(entity),
        }
    }

    pub fn not_found(lookup: Lookup) -> Self {
        Self {
            lookup,
            success: false,
            entity: None,
        }
    }

    pub fn entity_id(&self) -> Option<EntityId> {
        self.entity.as_ref().map(|entity| entity.id)
    }
}
