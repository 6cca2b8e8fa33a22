use agrotrace::core::db;
use agrotrace::core::error::AgroError;
use agrotrace::core::identity::{CallContext, Identity};
use agrotrace::core::kinds::{AccessLevel, RecordKind};
use agrotrace::core::store::Store;
use agrotrace::plugins::access::{
    check_access, grant_access, grant_access_tagged, list_grants_for_record, revoke_access,
};
use agrotrace::plugins::farmers::register_farmer;
use agrotrace::plugins::fields::{FieldParams, register_field};
use agrotrace::plugins::harvests::{HarvestParams, record_harvest};
use agrotrace::plugins::plantings::{PlantingParams, record_planting};
use tempfile::{TempDir, tempdir};

fn fresh_store() -> (TempDir, Store) {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path());
    db::initialize_registry_db(&store).unwrap();
    (tmp, store)
}

fn id(raw: &str) -> Identity {
    Identity::new(raw).unwrap()
}

fn ctx(who: &str, at: u64) -> CallContext {
    CallContext::new(id(who), at)
}

/// One farmer with a field, a planting on it and a harvest from that planting.
fn seeded(store: &Store, who: &str) {
    register_farmer(store, &ctx(who, 1), who, "somewhere").unwrap();
    let field_id = register_field(
        store,
        &ctx(who, 2),
        FieldParams {
            location: "Sunflower Valley",
            size_hectares: 50,
            soil_type: "Rich Loam",
        },
    )
    .unwrap();
    let planting_id = record_planting(
        store,
        &ctx(who, 3),
        PlantingParams {
            field_id,
            crop_type: "Sunflower",
            planting_date: "2024-03-01",
            inputs_used: "seeds",
            notes: "-",
        },
    )
    .unwrap();
    record_harvest(
        store,
        &ctx(who, 4),
        HarvestParams {
            planting_id,
            yield_amount: 1000,
            quality_metrics: "Grade A",
            harvest_date: "2024-07-15",
            notes: "",
        },
    )
    .unwrap();
}

#[test]
fn test_unknown_kind_is_invalid_input() {
    let (_tmp, store) = fresh_store();
    seeded(&store, "emma");

    let err = grant_access_tagged(&store, &ctx("emma", 5), "seed", 1, &id("buyer"), "full")
        .unwrap_err();
    assert!(matches!(err, AgroError::InvalidInput(_)));
    assert_eq!(err.code(), 103);

    let err = grant_access_tagged(&store, &ctx("emma", 5), "field", 1, &id("buyer"), "everything")
        .unwrap_err();
    assert!(matches!(err, AgroError::InvalidInput(_)));

    assert!(grant_access_tagged(&store, &ctx("emma", 5), "field", 1, &id("buyer"), "metadata-only").unwrap());
    let grant = check_access(&store, RecordKind::Field, 1, &id("buyer")).unwrap().unwrap();
    assert_eq!(grant.access_level, AccessLevel::MetadataOnly);
}

#[test]
fn test_grant_requires_ownership_of_each_kind() {
    let (_tmp, store) = fresh_store();
    seeded(&store, "emma");
    seeded(&store, "bob");
    let buyer = id("buyer");

    // emma owns field 1, planting 1, harvest 1; bob owns the ids 2.
    for kind in RecordKind::ALL {
        assert!(grant_access(&store, &ctx("emma", 5), kind, 1, &buyer, AccessLevel::Full).unwrap());
        let err = grant_access(&store, &ctx("emma", 5), kind, 2, &buyer, AccessLevel::Full).unwrap_err();
        assert!(matches!(err, AgroError::NotAuthorized(_)), "{kind}: {err}");
    }
}

#[test]
fn test_missing_records_per_kind() {
    let (_tmp, store) = fresh_store();
    seeded(&store, "emma");
    let buyer = id("buyer");

    let err = grant_access(&store, &ctx("emma", 5), RecordKind::Field, 50, &buyer, AccessLevel::Full)
        .unwrap_err();
    assert!(matches!(err, AgroError::NotAuthorized(_)));

    for kind in [RecordKind::Planting, RecordKind::Harvest] {
        let err = grant_access(&store, &ctx("emma", 5), kind, 50, &buyer, AccessLevel::Full).unwrap_err();
        assert!(matches!(err, AgroError::NotFound(_)), "{kind}: {err}");
    }
}

#[test]
fn test_regrant_overwrites_and_round_trip() {
    let (_tmp, store) = fresh_store();
    seeded(&store, "emma");
    let buyer = id("buyer");

    grant_access(&store, &ctx("emma", 5), RecordKind::Harvest, 1, &buyer, AccessLevel::Full).unwrap();
    grant_access(&store, &ctx("emma", 9), RecordKind::Harvest, 1, &buyer, AccessLevel::Limited).unwrap();

    let grants = list_grants_for_record(&store, RecordKind::Harvest, 1).unwrap();
    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0].access_level, AccessLevel::Limited);
    assert_eq!(grants[0].granted_at, 9);
    assert_eq!(grants[0].granted_by, id("emma"));

    assert!(revoke_access(&store, &ctx("emma", 10), RecordKind::Harvest, 1, &buyer).unwrap());
    assert!(check_access(&store, RecordKind::Harvest, 1, &buyer).unwrap().is_none());

    grant_access(&store, &ctx("emma", 11), RecordKind::Harvest, 1, &buyer, AccessLevel::Full).unwrap();
    let grant = check_access(&store, RecordKind::Harvest, 1, &buyer).unwrap().unwrap();
    assert_eq!(grant.access_level, AccessLevel::Full);
    assert_eq!(grant.granted_at, 11);
}

#[test]
fn test_only_issuer_revokes() {
    let (_tmp, store) = fresh_store();
    seeded(&store, "emma");
    let buyer = id("buyer");
    grant_access(&store, &ctx("emma", 5), RecordKind::Field, 1, &buyer, AccessLevel::Full).unwrap();

    let err = revoke_access(&store, &ctx("bob", 6), RecordKind::Field, 1, &buyer).unwrap_err();
    assert!(matches!(err, AgroError::NotAuthorized(_)));
    assert!(check_access(&store, RecordKind::Field, 1, &buyer).unwrap().is_some());

    let err = revoke_access(&store, &ctx("emma", 6), RecordKind::Field, 1, &id("someone-else"))
        .unwrap_err();
    assert!(matches!(err, AgroError::NotFound(_)));

    // Same id, different kind is a different key.
    let err = revoke_access(&store, &ctx("emma", 6), RecordKind::Planting, 1, &buyer).unwrap_err();
    assert!(matches!(err, AgroError::NotFound(_)));
}

#[test]
fn test_list_grants_is_sorted_by_accessor() {
    let (_tmp, store) = fresh_store();
    seeded(&store, "emma");
    for who in ["zed", "anna", "mike"] {
        grant_access(&store, &ctx("emma", 5), RecordKind::Field, 1, &id(who), AccessLevel::Limited).unwrap();
    }
    let accessors: Vec<String> = list_grants_for_record(&store, RecordKind::Field, 1)
        .unwrap()
        .into_iter()
        .map(|g| g.accessor.to_string())
        .collect();
    assert_eq!(accessors, vec!["anna", "mike", "zed"]);
    assert!(list_grants_for_record(&store, RecordKind::Planting, 1).unwrap().is_empty());
}

#[test]
fn test_ids_beyond_storage_range() {
    let (_tmp, store) = fresh_store();
    seeded(&store, "emma");
    let buyer = id("buyer");
    let big = i64::MAX as u64 + 1;

    let err = grant_access(&store, &ctx("emma", 5), RecordKind::Field, big, &buyer, AccessLevel::Full)
        .unwrap_err();
    assert!(matches!(err, AgroError::NotAuthorized(_)));
    let err = grant_access(&store, &ctx("emma", 5), RecordKind::Harvest, big, &buyer, AccessLevel::Full)
        .unwrap_err();
    assert!(matches!(err, AgroError::NotFound(_)));
    let err = revoke_access(&store, &ctx("emma", 5), RecordKind::Field, big, &buyer).unwrap_err();
    assert!(matches!(err, AgroError::NotFound(_)));
    assert!(check_access(&store, RecordKind::Field, big, &buyer).unwrap().is_none());
    assert!(list_grants_for_record(&store, RecordKind::Field, big).unwrap().is_empty());

    let err = grant_access(&store, &ctx("emma", u64::MAX), RecordKind::Field, 1, &buyer, AccessLevel::Full)
        .unwrap_err();
    assert!(matches!(err, AgroError::InvalidInput(_)));
    assert!(check_access(&store, RecordKind::Field, 1, &buyer).unwrap().is_none());
}
