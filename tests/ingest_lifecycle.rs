//! Ingest, schema and cleanup through `ResolveApi`

mod common;

use common::{date, memory_api};
use idgraph::{
    Entity, EntityId, Identifier, Interval, Lookup, MemoryStore, OpenStore, ResolveApi, ResolveError, ResolverConfig,
    Security, SqliteStore, StorageError, ValidationError,
};
use std::sync::Arc;

fn acme() -> Entity {
    Entity::new(EntityId::new())
        .with_name("Acme Widgets", Interval::new(date(2000, 1, 1), date(2010, 1, 1)).unwrap())
        .with_name("Acme Holdings", Interval::starting_at(date(2010, 1, 1)))
        .with_country("US", Interval::starting_at(date(2000, 1, 1)))
        .with_identifiers(
            vec![Identifier::new("lei", "ACME-LEI"), Identifier::new("ticker", "ACW")],
            Interval::new(date(2000, 1, 1), date(2012, 6, 1)).unwrap(),
        )
        .with_identifiers(
            vec![Identifier::new("lei", "ACME-LEI"), Identifier::new("ticker", "ACH")],
            Interval::starting_at(date(2012, 6, 1)),
        )
        .with_securities(
            vec![
                Security::new("Ordinary")
                    .primary()
                    .with_identifier(Identifier::new("isin", "US0000000001")),
                Security::new("Preferred").with_identifier(Identifier::new("isin", "US0000000002")),
            ],
            Interval::starting_at(date(2005, 1, 1)),
        )
}

#[tokio::test]
async fn test_round_trip_returns_active_attributes() {
    let api = memory_api();
    let entity = acme();
    api.create_entities(&[entity.clone()]).await.unwrap();

    let at = date(2008, 3, 1);
    let results = api
        .lookup_entities(&[Lookup::new(Identifier::new("lei", "ACME-LEI"), at)])
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    let result = &results[0];
    assert!(result.success);
    assert_eq!(result.lookup.date, Some(at));

    let found = result.entity.as_ref().unwrap();
    assert_eq!(found.id, entity.id);
    assert_eq!(found.name_at(at), Some("Acme Widgets"));
    assert_eq!(found.country_at(at), Some("US"));
    assert_eq!(found.name[0].interval, entity.name[0].interval);

    let mut identifiers = found.identifiers_at(at).to_vec();
    identifiers.sort();
    assert_eq!(
        identifiers,
        vec![Identifier::new("lei", "ACME-LEI"), Identifier::new("ticker", "ACW")]
    );

    let securities = found.securities_at(at);
    assert_eq!(securities.len(), 2);
    let ordinary = securities.iter().find(|s| s.name == "Ordinary").unwrap();
    assert!(ordinary.is_primary);
    assert_eq!(ordinary.identifiers, vec![Identifier::new("isin", "US0000000001")]);
    assert!(!securities.iter().find(|s| s.name == "Preferred").unwrap().is_primary);
}

#[tokio::test]
async fn test_versioned_attributes_follow_the_lookup_date() {
    let api = memory_api();
    api.create_entities(&[acme()]).await.unwrap();

    let before = Lookup::new(Identifier::new("lei", "ACME-LEI"), date(2009, 12, 31));
    let after = Lookup::new(Identifier::new("lei", "ACME-LEI"), date(2010, 1, 1));
    let results = api.lookup_direct_entities(&[before, after]).await.unwrap();

    assert_eq!(results[0].entity.as_ref().unwrap().name_at(date(2009, 12, 31)), Some("Acme Widgets"));
    assert_eq!(results[1].entity.as_ref().unwrap().name_at(date(2010, 1, 1)), Some("Acme Holdings"));
    assert_eq!(results[1].entity.as_ref().unwrap().name.len(), 1);
}

#[tokio::test]
async fn test_retired_identifier_stops_resolving_at_its_end_date() {
    let api = memory_api();
    api.create_entities(&[acme()]).await.unwrap();

    let lookups = [
        Lookup::new(Identifier::new("ticker", "ACW"), date(2012, 5, 31)),
        Lookup::new(Identifier::new("ticker", "ACW"), date(2012, 6, 1)),
        Lookup::new(Identifier::new("ticker", "ACH"), date(2012, 6, 1)),
    ];
    let results = api.lookup_direct_entities(&lookups).await.unwrap();
    let found: Vec<bool> = results.iter().map(|r| r.success).collect();
    assert_eq!(found, vec![true, false, true]);
}

#[tokio::test]
async fn test_identifier_reassigned_between_entities() {
    let api = memory_api();
    let first = Entity::new(EntityId::new()).with_identifiers(
        vec![Identifier::new("ticker", "XYZ")],
        Interval::new(date(2000, 1, 1), date(2010, 1, 1)).unwrap(),
    );
    let second = Entity::new(EntityId::new())
        .with_identifiers(vec![Identifier::new("ticker", "XYZ")], Interval::starting_at(date(2010, 1, 1)));
    api.create_entities(&[first.clone(), second.clone()]).await.unwrap();

    let results = api
        .lookup_direct_entities(&[
            Lookup::new(Identifier::new("ticker", "XYZ"), date(2005, 1, 1)),
            Lookup::new(Identifier::new("ticker", "XYZ"), date(2015, 1, 1)),
        ])
        .await
        .unwrap();
    assert_eq!(results[0].entity_id(), Some(first.id));
    assert_eq!(results[1].entity_id(), Some(second.id));
}

#[tokio::test]
async fn test_duplicate_entity_id_aborts_the_whole_batch() {
    let api = memory_api();
    let existing = acme();
    api.create_entities(&[existing.clone()]).await.unwrap();

    let newcomer = Entity::new(EntityId::new())
        .with_identifiers(vec![Identifier::new("lei", "NEW-LEI")], Interval::starting_at(date(2000, 1, 1)));
    let clash = Entity::new(existing.id).with_name("Impostor", Interval::starting_at(date(2000, 1, 1)));

    let err = api.create_entities(&[newcomer, clash]).await.unwrap_err();
    assert!(matches!(err, ResolveError::Write(StorageError::ConstraintViolation { .. })));

    let results = api
        .lookup_entities(&[Lookup::new(Identifier::new("lei", "NEW-LEI"), date(2020, 1, 1))])
        .await
        .unwrap();
    assert!(!results[0].success);
}

#[tokio::test]
async fn test_overlapping_timeline_is_rejected_before_writing() {
    let store = Arc::new(MemoryStore::new());
    let api = ResolveApi::new(store.clone(), ResolverConfig::default());
    let id = EntityId::new();
    let overlapping = Entity::new(id)
        .with_name("One", Interval::new(date(2000, 1, 1), date(2011, 1, 1)).unwrap())
        .with_name("Two", Interval::starting_at(date(2010, 1, 1)));

    let err = api.create_entities(&[overlapping.clone()]).await.unwrap_err();
    match err {
        ResolveError::InvalidEntity {
            id: reported,
            source: ValidationError::OverlappingIntervals { attribute, .. },
        } => {
            assert_eq!(reported, id);
            assert_eq!(attribute, "name");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(store.snapshot().unwrap().node_count(), 0);

    let lenient = ResolveApi::new(
        store.clone(),
        ResolverConfig {
            validate_timelines: false,
            ..ResolverConfig::default()
        },
    );
    lenient.create_entities(&[overlapping]).await.unwrap();
    assert!(store.snapshot().unwrap().node_count() > 0);
}

#[tokio::test]
async fn test_nil_entity_id_is_always_rejected() {
    let api = ResolveApi::new(
        Arc::new(MemoryStore::new()),
        ResolverConfig {
            validate_timelines: false,
            ..ResolverConfig::default()
        },
    );
    let nil = Entity::new(EntityId::from_uuid(uuid::Uuid::nil()));
    let err = api.create_entities(&[nil]).await.unwrap_err();
    assert!(matches!(
        err,
        ResolveError::InvalidEntity {
            source: ValidationError::NilEntityId,
            ..
        }
    ));
}

#[tokio::test]
async fn test_ensure_schema_is_idempotent() {
    let api = memory_api();
    assert_eq!(api.ensure_schema().await.unwrap(), 3);
    assert_eq!(api.ensure_schema().await.unwrap(), 0);
}

#[tokio::test]
async fn test_cleanup_removes_everything_and_drops_schema() {
    let api = memory_api();
    let mut gen = common::DataGen::new(7);
    api.create_entities(&gen.entities(25)).await.unwrap();

    let deleted = api.cleanup().await.unwrap();
    assert!(deleted >= 25);

    let results = api
        .lookup_entities(&[Lookup::current(Identifier::new("sray_entity_id", "1"))])
        .await
        .unwrap();
    assert!(!results[0].success);
    assert_eq!(api.ensure_schema().await.unwrap(), 3);
    assert_eq!(api.cleanup().await.unwrap(), 0);
}

#[tokio::test]
async fn test_sqlite_store_resolves_after_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("idgraph.db");
    let entity = acme();

    {
        let store = SqliteStore::open(&db_path).unwrap();
        let api = ResolveApi::new(Arc::new(store), ResolverConfig::default());
        api.create_entities(&[entity.clone()]).await.unwrap();
    }

    let store = SqliteStore::open(&db_path).unwrap();
    let api = ResolveApi::new(Arc::new(store), ResolverConfig::default());
    let at = date(2015, 1, 1);
    let results = api
        .lookup_entities(&[Lookup::new(Identifier::new("isin", "US0000000002"), at)])
        .await
        .unwrap();
    assert_eq!(results[0].entity_id(), Some(entity.id));
    assert_eq!(results[0].entity.as_ref().unwrap().name_at(at), Some("Acme Holdings"));

    // The constraint survived the reopen
    let err = api.create_entities(&[Entity::new(entity.id)]).await.unwrap_err();
    assert!(matches!(err, ResolveError::Write(StorageError::ConstraintViolation { .. })));
}

#[tokio::test]
async fn test_later_batch_leaves_earlier_nodes_untouched() {
    let store = Arc::new(MemoryStore::new());
    let api = ResolveApi::new(store.clone(), ResolverConfig::default());
    api.create_entities(&[acme()]).await.unwrap();
    let before = store.snapshot().unwrap();

    let successor = Entity::new(EntityId::new())
        .with_name("Acme Successor", Interval::starting_at(date(2015, 1, 1)))
        .with_identifiers(
            vec![Identifier::new("lei", "ACME-LEI"), Identifier::new("ticker", "ACS")],
            Interval::starting_at(date(2015, 1, 1)),
        );
    api.create_entities(&[successor]).await.unwrap();
    let after = store.snapshot().unwrap();

    for node in before.nodes() {
        assert_eq!(after.node(&node.id), Some(node));
    }
    for edge in before.edges() {
        assert_eq!(after.edge(&edge.id), Some(edge));
    }

    // The shared identifier is merged, not recreated
    let shared = after.find_identifiers("lei", "ACME-LEI");
    assert_eq!(shared.len(), 1);
    assert_eq!(before.node(&shared[0].id), Some(shared[0]));

    let added: Vec<_> = after.edges().filter(|edge| before.edge(&edge.id).is_none()).collect();
    assert!(!added.is_empty());
    assert!(added.iter().all(|edge| before.node(&edge.source).is_none()));
    assert_eq!(after.edge_count(), before.edge_count() + added.len());
}
