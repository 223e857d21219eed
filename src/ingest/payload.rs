//! Strongly-typed ingest payload and its parameter encoding
//!
//! The payload mirrors the graph that ingest creates. Only `to_value` and
//! `from_value` deal in untyped parameter maps.

use chrono::{DateTime, Utc};

use crate::query::decode::{self, PayloadError};
use crate::query::Value;
use crate::resolve::{DetailDuration, Entity, Identifier, Interval, Security};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierPayload {
    pub kind: String,
    pub value: String,
}

/// One `Name` or `Country` link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributePayload {
    pub value: String,
    pub from: DateTime<Utc>,
    pub until: Option<DateTime<Utc>>,
}

/// One identifier-set timeline entry; every identifier in it shares the link interval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierSetPayload {
    pub identifiers: Vec<IdentifierPayload>,
    pub from: DateTime<Utc>,
    pub until: Option<DateTime<Utc>>,
}

/// One security of a securities timeline entry, tagged with that entry's interval.
///
/// The security's own identifiers are linked without an interval; the
/// security link's interval governs them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityPayload {
    pub name: String,
    pub primary: bool,
    pub from: DateTime<Utc>,
    pub until: Option<DateTime<Utc>>,
    pub identifiers: Vec<IdentifierPayload>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityPayload {
    pub id: String,
    pub names: Vec<AttributePayload>,
    pub countries: Vec<AttributePayload>,
    pub identifier_sets: Vec<IdentifierSetPayload>,
    pub securities: Vec<SecurityPayload>,
}

impl From<&Identifier> for IdentifierPayload {
    fn from(identifier: &Identifier) -> Self {
        Self {
            kind: identifier.kind.as_str().to_string(),
            value: identifier.value.clone(),
        }
    }
}

impl From<&Entity> for EntityPayload {
    fn from(entity: &Entity) -> Self {
        fn attribute<T>(entry: &DetailDuration<T>, value: &str) -> AttributePayload {
            AttributePayload {
                value: value.to_string(),
                from: entry.interval.start,
                until: entry.interval.end,
            }
        }

        fn security(sec: &Security, interval: &Interval) -> SecurityPayload {
            SecurityPayload {
                name: sec.name.clone(),
                primary: sec.is_primary,
                from: interval.start,
                until: interval.end,
                identifiers: sec.identifiers.iter().map(IdentifierPayload::from).collect(),
            }
        }

        Self {
            id: entity.id.to_string(),
            names: entity
                .name
                .iter()
                .map(|entry| attribute(entry, &entry.value.value))
                .collect(),
            countries: entity
                .country
                .iter()
                .map(|entry| attribute(entry, &entry.value.value))
                .collect(),
            identifier_sets: entity
                .identifiers
                .iter()
                .map(|entry| IdentifierSetPayload {
                    identifiers: entry.value.iter().map(IdentifierPayload::from).collect(),
                    from: entry.interval.start,
                    until: entry.interval.end,
                })
                .collect(),
            securities: entity
                .securities
                .iter()
                .flat_map(|entry| entry.value.iter().map(|sec| security(sec, &entry.interval)))
                .collect(),
        }
    }
}

impl IdentifierPayload {
    pub fn to_value(&self) -> Value {
        Value::map([
            ("type", Value::from(self.kind.as_str())),
            ("value", Value::from(self.value.as_str())),
        ])
    }

    pub fn from_value(value: &Value) -> Result<Self, PayloadError> {
        let entries = decode::map(value, "identifier")?;
        Ok(Self {
            kind: decode::str_field(entries, "type")?.to_string(),
            value: decode::str_field(entries, "value")?.to_string(),
        })
    }
}

impl AttributePayload {
    pub fn to_value(&self) -> Value {
        Value::map([
            ("value", Value::from(self.value.as_str())),
            ("from", Value::from(self.from)),
            ("until", Value::from(self.until)),
        ])
    }

    pub fn from_value(value: &Value) -> Result<Self, PayloadError> {
        let entries = decode::map(value, "attribute")?;
        Ok(Self {
            value: decode::str_field(entries, "value")?.to_string(),
            from: decode::datetime_field(entries, "from")?,
            until: decode::opt_datetime_field(entries, "until")?,
        })
    }
}

impl IdentifierSetPayload {
    pub fn to_value(&self) -> Value {
        Value::map([
            (
                "identifiers",
                Value::List(self.identifiers.iter().map(IdentifierPayload::to_value).collect()),
            ),
            ("from", Value::from(self.from)),
            ("until", Value::from(self.until)),
        ])
    }

    pub fn from_value(value: &Value) -> Result<Self, PayloadError> {
        let entries = decode::map(value, "identifier set")?;
        Ok(Self {
            identifiers: decode::list_field(entries, "identifiers")?
                .iter()
                .map(IdentifierPayload::from_value)
                .collect::<Result<_, _>>()?,
            from: decode::datetime_field(entries, "from")?,
            until: decode::opt_datetime_field(entries, "until")?,
        })
    }
}

impl SecurityPayload {
    pub fn to_value(&self) -> Value {
        Value::map([
            ("name", Value::from(self.name.as_str())),
            ("primary", Value::from(self.primary)),
            ("from", Value::from(self.from)),
            ("until", Value::from(self.until)),
            (
                "identifiers",
                Value::List(self.identifiers.iter().map(IdentifierPayload::to_value).collect()),
            ),
        ])
    }

    pub fn from_value(value: &Value) -> Result<Self, PayloadError> {
        let entries = decode::map(value, "security")?;
        Ok(Self {
            name: decode::str_field(entries, "name")?.to_string(),
            primary: decode::bool_field(entries, "primary")?,
            from: decode::datetime_field(entries, "from")?,
            until: decode::opt_datetime_field(entries, "until")?,
            identifiers: decode::list_field(entries, "identifiers")?
                .iter()
                .map(IdentifierPayload::from_value)
                .collect::<Result<_, _>>()?,
        })
    }
}

impl EntityPayload {
    pub fn to_value(&self) -> Value {
        Value::map([
            ("id", Value::from(self.id.as_str())),
            (
                "names",
                Value::List(self.names.iter().map(AttributePayload::to_value).collect()),
            ),
            (
                "countries",
                Value::List(self.countries.iter().map(AttributePayload::to_value).collect()),
            ),
            (
                "identifiers",
                Value::List(self.identifier_sets.iter().map(IdentifierSetPayload::to_value).collect()),
            ),
            (
                "securities",
                Value::List(self.securities.iter().map(SecurityPayload::to_value).collect()),
            ),
        ])
    }

    pub fn from_value(value: &Value) -> Result<Self, PayloadError> {
        let entries = decode::map(value, "entity")?;
        Ok(Self {
            id: decode::str_field(entries, "id")?.to_string(),
            names: decode::list_field(entries, "names")?
                .iter()
                .map(AttributePayload::from_value)
                .collect::<Result<_, _>>()?,
            countries: decode::list_field(entries, "countries")?
                .iter()
                .map(AttributePayload::from_value)
                .collect::<Result<_, _>>()?,
            identifier_sets: decode::list_field(entries, "identifiers")?
                .iter()
                .map(IdentifierSetPayload::from_value)
                .collect::<Result<_, _>>()?,
            securities: decode::list_field(entries, "securities")?
                .iter()
                .map(SecurityPayload::from_value)
                .collect::<Result<_, _>>()?,
        })
    }
}
