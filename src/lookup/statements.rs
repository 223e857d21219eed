//! Lookup statements: batched (security-aware) and direct (entity identifiers only)

use chrono::{DateTime, Utc};

use crate::query::decode::{self, PayloadError};
use crate::query::{Operation, ParamKey, QueryBuilder, QueryError, Statement, Value};
use crate::resolve::{Identifier, Lookup};

/// Parameter carrying a batched lookup list
pub const LOOKUPS_PARAM: &str = "lookups";

/// Name, country, identifiers and securities of `entity` as of `lookup.date`.
///
/// Shared tail of both lookup statements; produces the result columns
/// `lookup, entity, name, country, identifiers, securities`.
const ATTRIBUTES_AS_OF: &str = r#"
	CALL {
		WITH entity, lookup
		OPTIONAL MATCH (entity)-[hn:HAS_NAME]->(n:Name)
			WHERE hn.from <= lookup.date AND (hn.until IS NULL OR lookup.date < hn.until)
		WITH n, hn ORDER BY hn.from DESC LIMIT 1
		RETURN CASE WHEN n IS NULL THEN NULL ELSE {value: n.value, from: hn.from, until: hn.until} END AS name
	}
	CALL {
		WITH entity, lookup
		OPTIONAL MATCH (entity)-[hc:HAS_COUNTRY]->(c:Country)
			WHERE hc.from <= lookup.date AND (hc.until IS NULL OR lookup.date < hc.until)
		WITH c, hc ORDER BY hc.from DESC LIMIT 1
		RETURN CASE WHEN c IS NULL THEN NULL ELSE {value: c.value, from: hc.from, until: hc.until} END AS country
	}
	CALL {
		WITH entity, lookup
		OPTIONAL MATCH (entity)-[hi:HAS_IDENTIFIER]->(i:Identifier)
			WHERE hi.from <= lookup.date AND (hi.until IS NULL OR lookup.date < hi.until)
		RETURN collect(DISTINCT {type: i.type, value: i.value, from: hi.from, until: hi.until}) AS identifiers
	}
	CALL {
		WITH entity, lookup
		OPTIONAL MATCH (entity)-[hs:HAS_SECURITY]->(s:Security)
			WHERE hs.from <= lookup.date AND (hs.until IS NULL OR lookup.date < hs.until)
		OPTIONAL MATCH (s)-[:HAS_IDENTIFIER]->(si:Identifier)
		WITH s, hs, collect(DISTINCT {type: si.type, value: si.value}) AS sids
		RETURN collect(DISTINCT {node: elementId(s), name: s.name, primary: s.primary, from: hs.from, until: hs.until, identifiers: sids}) AS securities
	}
	RETURN lookup, entity, name, country, identifiers, securities
"#;

const LOOKUP_BATCH: &str = r#"
	WITH $lookups AS lookups
	UNWIND lookups AS lookup
	OPTIONAL MATCH (idn:Identifier {type: lookup.type, value: lookup.value})<-[link:HAS_IDENTIFIER]-(owner)
		WHERE (owner:Entity OR owner:Security)
		AND (link.from IS NULL OR (link.from <= lookup.date AND (link.until IS NULL OR lookup.date < link.until)))
	OPTIONAL MATCH (owner)<-[hops:HAS_SECURITY*0..1]-(entity:Entity)
		WHERE all(h IN hops WHERE h.from <= lookup.date AND (h.until IS NULL OR lookup.date < h.until))
	WITH DISTINCT lookup, entity
	WITH lookup, collect(entity) AS entities
	UNWIND CASE WHEN size(entities) = 0 THEN [null] ELSE entities END AS entity
"#;

/// One lookup as a structured parameter, with its as-of date resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupParam {
    pub kind: String,
    pub value: String,
    pub date: DateTime<Utc>,
}

impl LookupParam {
    pub fn new(lookup: &Lookup, now: DateTime<Utc>) -> Self {
        Self {
            kind: lookup.identifier.kind.as_str().to_string(),
            value: lookup.identifier.value.clone(),
            date: lookup.as_of(now),
        }
    }

    pub fn to_value(&self) -> Value {
        Value::map([
            ("type", Value::from(self.kind.as_str())),
            ("value", Value::from(self.value.as_str())),
            ("date", Value::from(self.date)),
        ])
    }

    pub fn from_value(value: &Value) -> Result<Self, PayloadError> {
        let entries = decode::map(value, "lookup")?;
        Ok(Self {
            kind: decode::str_field(entries, "type")?.to_string(),
            value: decode::str_field(entries, "value")?.to_string(),
            date: decode::datetime_field(entries, "date")?,
        })
    }

    /// The lookup this parameter was built from, with the effective date
    pub fn to_lookup(&self) -> Lookup {
        Lookup::new(Identifier::new(self.kind.as_str(), self.value.as_str()), self.date)
    }

    /// Decode the batched lookup list of a statement
    pub fn from_batch(statement: &Statement) -> Result<Vec<Self>, PayloadError> {
        let lookups = statement
            .param(LOOKUPS_PARAM)
            .ok_or_else(|| PayloadError::MissingField(LOOKUPS_PARAM.to_string()))?;
        decode::list(lookups, LOOKUPS_PARAM)?
            .iter()
            .map(Self::from_value)
            .collect()
    }

    /// Decode the `lookup_<index>_*` parameters of a direct statement
    pub fn from_direct(statement: &Statement, index: usize) -> Result<Self, PayloadError> {
        let key = ParamKey::new("lookup", index);
        let field = |name: &str| {
            let param = key.field(name);
            statement
                .param(&param)
                .ok_or(PayloadError::MissingField(param))
        };
        let entries = [
            ("type".to_string(), field("type")?.clone()),
            ("value".to_string(), field("value")?.clone()),
            ("date".to_string(), field("date")?.clone()),
        ];
        Self::from_value(&Value::Map(entries.into_iter().collect()))
    }
}

/// One statement resolving every lookup of the batch.
///
/// An identifier may be attached to an entity directly or to one of its
/// securities; both are followed. Every lookup yields at least one row.
pub fn batch_statement(lookups: &[Lookup], now: DateTime<Utc>) -> Result<Statement, QueryError> {
    let mut qb = QueryBuilder::new();
    qb.bind(
        LOOKUPS_PARAM,
        Value::List(
            lookups
                .iter()
                .map(|lookup| LookupParam::new(lookup, now).to_value())
                .collect(),
        ),
    )?;
    qb.push(LOOKUP_BATCH).push(ATTRIBUTES_AS_OF);
    Ok(qb.build(Operation::LookupBatch))
}

/// A statement resolving a single lookup through entity-owned identifiers only.
///
/// `index` is the lookup's position in the caller's list; it names the
/// parameters so logged statements can be traced back to their input.
pub fn direct_statement(index: usize, lookup: &Lookup, now: DateTime<Utc>) -> Result<Statement, QueryError> {
    let param = LookupParam::new(lookup, now);
    let key = ParamKey::new("lookup", index);

    let mut qb = QueryBuilder::new();
    let kind = qb.bind(key.field("type"), param.kind)?;
    let value = qb.bind(key.field("value"), param.value)?;
    let date = qb.bind(key.field("date"), param.date)?;

    qb.push(&format!(
        r#"
	OPTIONAL MATCH (:Identifier {{type: {kind}, value: {value}}})<-[link:HAS_IDENTIFIER]-(entity:Entity)
		WHERE link.from <= {date} AND (link.until IS NULL OR {date} < link.until)
	WITH entity, {{type: {kind}, value: {value}, date: {date}}} AS lookup
	LIMIT 1
"#
    ))
    .push(ATTRIBUTES_AS_OF);
    Ok(qb.build(Operation::LookupDirect { index }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn undated_lookups_resolve_at_the_call_instant() {
        let now = date(2024, 5, 1);
        let lookups = vec![
            Lookup::current(Identifier::new("isin", "US1")),
            Lookup::new(Identifier::new("isin", "US2"), date(2020, 1, 1)),
        ];
        let statement = batch_statement(&lookups, now).unwrap();
        let params = LookupParam::from_batch(&statement).unwrap();

        assert_eq!(params[0].date, now);
        assert_eq!(params[1].date, date(2020, 1, 1));
        assert_eq!(params[1].to_lookup(), lookups[1]);
    }

    #[test]
    fn direct_statement_names_params_after_the_input_position() {
        let lookup = Lookup::new(Identifier::new("lei", "L1"), date(2020, 1, 1));
        let statement = direct_statement(7, &lookup, date(2024, 1, 1)).unwrap();

        assert_eq!(statement.operation, Operation::LookupDirect { index: 7 });
        assert!(statement.param("lookup_7_type").is_some());
        assert!(statement.text.contains("$lookup_7_value"));
        assert!(!statement.text.contains("L1"));

        let decoded = LookupParam::from_direct(&statement, 7).unwrap();
        assert_eq!(decoded.to_lookup(), lookup);
    }

    #[test]
    fn lookup_statements_are_reads() {
        let lookup = Lookup::current(Identifier::new("lei", "L1"));
        assert!(!batch_statement(&[lookup.clone()], Utc::now()).unwrap().is_write());
        assert!(!direct_statement(0, &lookup, Utc::now()).unwrap().is_write());
    }
}
