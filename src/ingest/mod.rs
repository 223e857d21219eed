//! Versioned ingest: entities with their full attribute history

mod encoder;
mod payload;

pub use encoder::{IngestBatch, IngestEncoder, ENTITIES_PARAM};
pub use payload::{AttributePayload, EntityPayload, IdentifierPayload, IdentifierSetPayload, SecurityPayload};
