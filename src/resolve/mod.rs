//! Domain model: entities whose attributes change over time

mod entity;
mod interval;
mod lookup;

pub use entity::{Entity, EntityCountry, EntityId, EntityName, Identifier, IdentifierType, Security};
pub use interval::{active_at, validate_timeline, DetailDuration, Interval, Timeline};
pub use lookup::{Lookup, LookupResult};
