//! Ingest encoder: a batch of entities with full history → one bulk-create statement

use tracing::debug;

use super::payload::EntityPayload;
use crate::error::{ResolveError, ResolveResult, ValidationError};
use crate::query::decode::{self, PayloadError};
use crate::query::{Operation, QueryBuilder, QueryError, Statement, Value};
use crate::resolve::Entity;

/// Parameter carrying the whole batch
pub const ENTITIES_PARAM: &str = "entities";

const CREATE_ENTITIES: &str = r#"
	WITH $entities AS entities
	UNWIND entities AS e
	CREATE (ent:Entity {id: e.id})
	FOREACH (nd IN e.names | CREATE (ent)-[:HAS_NAME {from: nd.from, until: nd.until}]->(:Name {value: nd.value}))
	FOREACH (cd IN e.countries | CREATE (ent)-[:HAS_COUNTRY {from: cd.from, until: cd.until}]->(:Country {value: cd.value}))
	FOREACH (idnd IN e.identifiers |
		FOREACH (idn IN idnd.identifiers |
			MERGE (im:Identifier {type: idn.type, value: idn.value})
			CREATE (ent)-[:HAS_IDENTIFIER {from: idnd.from, until: idnd.until}]->(im)
		)
	)
	FOREACH (sd IN e.securities |
		CREATE (ent)-[:HAS_SECURITY {from: sd.from, until: sd.until}]->(sec:Security {name: sd.name, primary: sd.primary})
		FOREACH (idn IN sd.identifiers |
			MERGE (im:Identifier {type: idn.type, value: idn.value})
			CREATE (sec)-[:HAS_IDENTIFIER]->(im)
		)
	)
"#;

/// A validated, encoded batch ready to become one statement
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestBatch {
    pub entities: Vec<EntityPayload>,
}

impl IngestBatch {
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Translate into the bulk-create statement. The batch travels as a
    /// single structured parameter; nothing is written into the template.
    pub fn to_statement(&self) -> Result<Statement, QueryError> {
        let mut qb = QueryBuilder::new();
        qb.bind(
            ENTITIES_PARAM,
            Value::List(self.entities.iter().map(EntityPayload::to_value).collect()),
        )?;
        qb.push(CREATE_ENTITIES);
        Ok(qb.build(Operation::CreateEntities))
    }

    /// Read a bulk-create statement's parameters back into a batch
    pub fn from_statement(statement: &Statement) -> Result<Self, PayloadError> {
        let entities = statement
            .param(ENTITIES_PARAM)
            .ok_or_else(|| PayloadError::MissingField(ENTITIES_PARAM.to_string()))?;
        Ok(Self {
            entities: decode::list(entities, ENTITIES_PARAM)?
                .iter()
                .map(EntityPayload::from_value)
                .collect::<Result<_, _>>()?,
        })
    }
}

/// Encodes entities for ingest.
///
/// The encoder places no limit on batch size; sizing is the caller's concern.
#[derive(Debug, Clone)]
pub struct IngestEncoder {
    validate_timelines: bool,
}

impl IngestEncoder {
    pub fn new() -> Self {
        Self {
            validate_timelines: true,
        }
    }

    /// Skip interval and overlap checks, trusting the caller's timelines.
    /// Entity IDs are still required.
    pub fn with_timeline_validation(mut self, enabled: bool) -> Self {
        self.validate_timelines = enabled;
        self
    }

    /// Validate and encode a batch. Any invalid entity rejects the whole batch.
    pub fn encode(&self, entities: &[Entity]) -> ResolveResult<IngestBatch> {
        for entity in entities {
            let checked = if self.validate_timelines {
                entity.validate()
            } else if entity.id.is_nil() {
                Err(ValidationError::NilEntityId)
            } else {
                Ok(())
            };
            checked.map_err(|source| ResolveError::InvalidEntity {
                id: entity.id,
                source,
            })?;
        }

        let batch = IngestBatch {
            entities: entities.iter().map(EntityPayload::from).collect(),
        };
        debug!(entities = batch.len(), "encoded ingest batch");
        Ok(batch)
    }
}

impl Default for IngestEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::{EntityId, Identifier, Interval, Security};
    use chrono::{DateTime, TimeZone, Utc};
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn sample_entity() -> Entity {
        Entity::new(EntityId::new())
            .with_name("Acme", Interval::new(date(2020, 1, 1), date(2021, 1, 1)).unwrap())
            .with_name("Acme Holdings", Interval::starting_at(date(2021, 1, 1)))
            .with_country("US", Interval::starting_at(date(2020, 1, 1)))
            .with_identifiers(
                vec![Identifier::new("lei", "L1"), Identifier::new("sray_entity_id", "1")],
                Interval::starting_at(date(2020, 1, 1)),
            )
            .with_securities(
                vec![
                    Security::new("Acme common").with_identifier(Identifier::new("isin", "US1")).primary(),
                    Security::new("Acme preferred"),
                ],
                Interval::starting_at(date(2020, 1, 1)),
            )
    }

    #[test]
    fn batch_travels_as_one_structured_parameter() {
        let entity = sample_entity();
        let batch = IngestEncoder::new().encode(std::slice::from_ref(&entity)).unwrap();
        let statement = batch.to_statement().unwrap();

        assert_eq!(statement.operation, Operation::CreateEntities);
        assert_eq!(statement.params.len(), 1);
        assert!(statement.text.contains("$entities"));
        assert!(!statement.text.contains("Acme"));

        let entities = statement.param(ENTITIES_PARAM).unwrap().as_list().unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].get("id").and_then(Value::as_str), Some(entity.id.to_string().as_str()));
        assert_eq!(entities[0].get("names").and_then(Value::as_list).map(<[Value]>::len), Some(2));
    }

    #[test]
    fn securities_are_flattened_with_their_entry_interval() {
        let batch = IngestEncoder::new().encode(&[sample_entity()]).unwrap();
        let securities = &batch.entities[0].securities;

        assert_eq!(securities.len(), 2);
        assert!(securities[0].primary);
        assert!(!securities[1].primary);
        assert!(securities.iter().all(|s| s.from == date(2020, 1, 1) && s.until.is_none()));
        assert_eq!(securities[0].identifiers[0].kind, "isin");
    }

    #[test]
    fn statement_parameters_decode_back_into_the_batch() {
        let batch = IngestEncoder::new().encode(&[sample_entity(), sample_entity()]).unwrap();
        let decoded = IngestBatch::from_statement(&batch.to_statement().unwrap()).unwrap();
        assert_eq!(decoded, batch);
    }

    #[test]
    fn one_invalid_entity_rejects_the_batch() {
        let bad = Entity::new(EntityId::new())
            .with_name("A", Interval::starting_at(date(2020, 1, 1)))
            .with_name("B", Interval::starting_at(date(2020, 6, 1)));
        let bad_id = bad.id;

        let err = IngestEncoder::new().encode(&[sample_entity(), bad]).unwrap_err();
        match err {
            ResolveError::InvalidEntity { id, source } => {
                assert_eq!(id, bad_id);
                assert!(matches!(source, ValidationError::OverlappingIntervals { attribute: "name", .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn disabled_validation_still_requires_an_id() {
        let overlapping = Entity::new(EntityId::new())
            .with_name("A", Interval::starting_at(date(2020, 1, 1)))
            .with_name("B", Interval::starting_at(date(2020, 6, 1)));
        let encoder = IngestEncoder::new().with_timeline_validation(false);
        assert!(encoder.encode(&[overlapping]).is_ok());

        let nil = Entity::new(EntityId::from_uuid(Uuid::nil()));
        assert!(matches!(
            encoder.encode(&[nil]),
            Err(ResolveError::InvalidEntity { source: ValidationError::NilEntityId, .. })
        ));
    }
}
