//! Result mapper: raw result rows → `LookupResult`
//!
//! A row is "found" only when it carries an entity node with an `id`
//! property. Rows for unmatched lookups exist but carry a null entity.
//! Collections may repeat nodes because of traversal fan-out, so they are
//! de-duplicated here. Securities are matched by node, so two distinct
//! securities with equal contents both survive.

use std::collections::{BTreeMap, HashSet};

use super::statements::LookupParam;
use crate::error::MappingError;
use crate::graph::PropertyValue;
use crate::query::decode;
use crate::query::{Row, Value};
use crate::resolve::{
    DetailDuration, Entity, EntityCountry, EntityId, EntityName, Identifier, Interval, LookupResult, Security,
    Timeline,
};

fn column<'a>(row: &'a Row, name: &'static str) -> Result<&'a Value, MappingError> {
    row.get(name).ok_or(MappingError::MissingColumn(name))
}

fn malformed(column: &'static str) -> impl Fn(decode::PayloadError) -> MappingError {
    move |source| MappingError::Malformed { column, source }
}

fn unexpected(column: &'static str, expected: &'static str, found: &Value) -> MappingError {
    MappingError::UnexpectedType {
        column,
        expected,
        found: found.type_name(),
    }
}

/// Map every row, failing on the first malformed one.
///
/// Dropping a bad row would silently change the result count, so a
/// data-shape error fails the whole read.
pub fn map_rows(rows: &[Row]) -> Result<Vec<LookupResult>, MappingError> {
    rows.iter().map(map_row).collect()
}

pub fn map_row(row: &Row) -> Result<LookupResult, MappingError> {
    let lookup = LookupParam::from_value(column(row, "lookup")?)
        .map_err(malformed("lookup"))?
        .to_lookup();

    let node = match column(row, "entity")? {
        Value::Null => return Ok(LookupResult::not_found(lookup)),
        Value::Node(node) => node,
        other => return Err(unexpected("entity", "node", other)),
    };

    let id = match node.property("id") {
        None => return Ok(LookupResult::not_found(lookup)),
        Some(PropertyValue::String(id)) => id,
        Some(other) => {
            return Err(MappingError::UnexpectedType {
                column: "entity",
                expected: "string id",
                found: Value::from(other.clone()).type_name(),
            })
        }
    };
    let id: EntityId = id.parse().map_err(|source| MappingError::InvalidEntityId {
        value: id.clone(),
        source,
    })?;

    let mut entity = Entity::new(id);
    if let Some((value, interval)) = attribute(row, "name")? {
        entity.name.push(DetailDuration::new(EntityName { value }, interval));
    }
    if let Some((value, interval)) = attribute(row, "country")? {
        entity.country.push(DetailDuration::new(EntityCountry { value }, interval));
    }
    entity.identifiers = identifiers(row)?;
    entity.securities = securities(row)?;

    Ok(LookupResult::found(lookup, entity))
}

/// The single active name/country value with its link interval
fn attribute(row: &Row, name: &'static str) -> Result<Option<(String, Interval)>, MappingError> {
    let value = match row.get(name) {
        None | Some(Value::Null) => return Ok(None),
        Some(value) => value,
    };
    let entries = decode::map(value, name).map_err(malformed(name))?;
    let Some(text) = entries.get("value").and_then(Value::as_str) else {
        return Ok(None);
    };
    Ok(Some((text.to_string(), link_interval(entries, name)?)))
}

fn link_interval(entries: &BTreeMap<String, Value>, column: &'static str) -> Result<Interval, MappingError> {
    Ok(Interval {
        start: decode::datetime_field(entries, "from").map_err(malformed(column))?,
        end: decode::opt_datetime_field(entries, "until").map_err(malformed(column))?,
    })
}

/// `None` for the all-null placeholder an empty optional match collects
fn identifier(value: &Value, column: &'static str) -> Result<Option<Identifier>, MappingError> {
    let entries = decode::map(value, column).map_err(malformed(column))?;
    match (entries.get("type"), entries.get("value")) {
        (None | Some(Value::Null), _) | (_, None | Some(Value::Null)) => Ok(None),
        (Some(kind), Some(val)) => {
            let kind = kind.as_str().ok_or_else(|| unexpected(column, "string type", kind))?;
            let val = val.as_str().ok_or_else(|| unexpected(column, "string value", val))?;
            Ok(Some(Identifier::new(kind, val)))
        }
    }
}

fn list_column<'a>(row: &'a Row, name: &'static str) -> Result<&'a [Value], MappingError> {
    match row.get(name) {
        None | Some(Value::Null) => Ok(&[]),
        Some(value) => value.as_list().ok_or_else(|| unexpected(name, "list", value)),
    }
}

/// Insert `value` into the timeline entry for `interval`, skipping duplicates
fn push_grouped<T: PartialEq>(timeline: &mut Timeline<Vec<T>>, interval: Interval, value: T) {
    match timeline.iter_mut().find(|entry| entry.interval == interval) {
        Some(entry) => {
            if !entry.value.contains(&value) {
                entry.value.push(value);
            }
        }
        None => timeline.push(DetailDuration::new(vec![value], interval)),
    }
}

fn identifiers(row: &Row) -> Result<Timeline<Vec<Identifier>>, MappingError> {
    let mut timeline = Timeline::new();
    for item in list_column(row, "identifiers")? {
        let Some(identifier) = identifier(item, "identifiers")? else {
            continue;
        };
        let entries = decode::map(item, "identifiers").map_err(malformed("identifiers"))?;
        let interval = link_interval(entries, "identifiers")?;
        push_grouped(&mut timeline, interval, identifier);
    }
    Ok(timeline)
}

fn securities(row: &Row) -> Result<Timeline<Vec<Security>>, MappingError> {
    let mut timeline: Timeline<Vec<Security>> = Timeline::new();
    let mut seen = HashSet::new();
    for item in list_column(row, "securities")? {
        let entries = decode::map(item, "securities").map_err(malformed("securities"))?;
        let name = match entries.get("name") {
            None | Some(Value::Null) => continue,
            Some(name) => name
                .as_str()
                .ok_or_else(|| unexpected("securities", "string name", name))?,
        };
        let node = decode::str_field(entries, "node").map_err(malformed("securities"))?;
        let interval = link_interval(entries, "securities")?;
        if !seen.insert((node.to_string(), interval)) {
            continue;
        }

        let mut security = Security::new(name);
        security.is_primary = decode::bool_field(entries, "primary").map_err(malformed("securities"))?;
        let security_identifiers = match entries.get("identifiers") {
            None | Some(Value::Null) => &[][..],
            Some(list) => list
                .as_list()
                .ok_or_else(|| unexpected("securities", "identifier list", list))?,
        };
        for raw in security_identifiers {
            if let Some(identifier) = identifier(raw, "securities")? {
                if !security.identifiers.contains(&identifier) {
                    security.identifiers.push(identifier);
                }
            }
        }

        match timeline.iter_mut().find(|entry| entry.interval == interval) {
            Some(entry) => entry.value.push(security),
            None => timeline.push(DetailDuration::new(vec![security], interval)),
        }
    }
    Ok(timeline)
}
