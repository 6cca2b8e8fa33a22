use agrotrace::core::db;
use agrotrace::core::error::AgroError;
use agrotrace::core::identity::{CallContext, Identity};
use agrotrace::core::store::Store;
use agrotrace::plugins::farmers::register_farmer;
use agrotrace::plugins::fields::{
    FieldParams, get_field, list_fields_by_owner, register_field, update_field,
};
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

fn valley() -> FieldParams<'static> {
    FieldParams {
        location: "Sunflower Valley",
        size_hectares: 50,
        soil_type: "Rich Loam",
    }
}

fn with_farmer(store: &Store, who: &str) {
    register_farmer(store, &ctx(who, 1), who, "somewhere").unwrap();
}

#[test]
fn test_register_field_requires_active_farmer() {
    let (_tmp, store) = fresh_store();

    let err = register_field(&store, &ctx("stranger", 1), valley()).unwrap_err();
    assert!(matches!(err, AgroError::NotAuthorized(_)));

    with_farmer(&store, "emma");
    assert_eq!(register_field(&store, &ctx("emma", 2), valley()).unwrap(), 1);
}

#[test]
fn test_field_ids_are_sequential_across_rejections() {
    let (_tmp, store) = fresh_store();
    with_farmer(&store, "emma");

    let mut ids = Vec::new();
    for i in 0..5 {
        ids.push(register_field(&store, &ctx("emma", 10 + i), valley()).unwrap());
        // A rejected call in between must not consume an id.
        assert!(register_field(&store, &ctx("stranger", 10 + i), valley()).is_err());
    }
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);

    let stored = get_field(&store, 3).unwrap().unwrap();
    assert_eq!(stored.owner, id("emma"));
    assert_eq!(stored.registered_at, 12);
    assert!(stored.active);
}

#[test]
fn test_only_owner_updates_and_registered_at_is_kept() {
    let (_tmp, store) = fresh_store();
    with_farmer(&store, "emma");
    with_farmer(&store, "bob");
    let field_id = register_field(&store, &ctx("emma", 5), valley()).unwrap();
    let before = get_field(&store, field_id).unwrap().unwrap();

    let err = update_field(
        &store,
        &ctx("bob", 6),
        field_id,
        FieldParams {
            location: "Hijacked",
            size_hectares: 1,
            soil_type: "Sand",
        },
        false,
    )
    .unwrap_err();
    assert!(matches!(err, AgroError::NotAuthorized(_)));
    assert_eq!(get_field(&store, field_id).unwrap().unwrap(), before);

    assert!(
        update_field(
            &store,
            &ctx("emma", 99),
            field_id,
            FieldParams {
                location: "Sunflower Valley East",
                size_hectares: 55,
                soil_type: "Silt Loam",
            },
            false,
        )
        .unwrap()
    );
    let after = get_field(&store, field_id).unwrap().unwrap();
    assert_eq!(after.location, "Sunflower Valley East");
    assert_eq!(after.size_hectares, 55);
    assert_eq!(after.soil_type, "Silt Loam");
    assert!(!after.active);
    assert_eq!(after.owner, id("emma"));
    assert_eq!(after.registered_at, 5);
}

#[test]
fn test_update_of_missing_field_is_not_authorized() {
    let (_tmp, store) = fresh_store();
    with_farmer(&store, "emma");

    let err = update_field(&store, &ctx("emma", 2), 42, valley(), true).unwrap_err();
    assert!(matches!(err, AgroError::NotAuthorized(_)));
}

#[test]
fn test_owner_update_does_not_require_active_farmer() {
    let (_tmp, store) = fresh_store();
    with_farmer(&store, "emma");
    let field_id = register_field(&store, &ctx("emma", 2), valley()).unwrap();

    let conn = rusqlite::Connection::open(store.db_path()).unwrap();
    conn.execute("UPDATE farmers SET active = 0 WHERE identity = 'emma'", [])
        .unwrap();
    drop(conn);

    assert!(update_field(&store, &ctx("emma", 3), field_id, valley(), true).unwrap());
}

#[test]
fn test_list_fields_by_owner_is_ordered() {
    let (_tmp, store) = fresh_store();
    with_farmer(&store, "emma");
    with_farmer(&store, "bob");
    register_field(&store, &ctx("emma", 2), valley()).unwrap();
    register_field(&store, &ctx("bob", 3), valley()).unwrap();
    register_field(&store, &ctx("emma", 4), valley()).unwrap();

    let ids: Vec<u64> = list_fields_by_owner(&store, &id("emma"))
        .unwrap()
        .iter()
        .map(|f| f.field_id)
        .collect();
    assert_eq!(ids, vec![1, 3]);
    assert!(list_fields_by_owner(&store, &id("nobody")).unwrap().is_empty());
}

#[test]
fn test_overlong_soil_type_is_invalid_input() {
    let (_tmp, store) = fresh_store();
    with_farmer(&store, "emma");
    let soil = "s".repeat(51);
    let err = register_field(
        &store,
        &ctx("emma", 2),
        FieldParams {
            location: "x",
            size_hectares: 1,
            soil_type: &soil,
        },
    )
    .unwrap_err();
    assert!(matches!(err, AgroError::InvalidInput(_)));
    assert_eq!(register_field(&store, &ctx("emma", 3), valley()).unwrap(), 1);
}

#[test]
fn test_ids_beyond_storage_range_are_missing_fields() {
    let (_tmp, store) = fresh_store();
    with_farmer(&store, "emma");
    let big = i64::MAX as u64 + 1;

    assert!(get_field(&store, big).unwrap().is_none());
    assert!(get_field(&store, u64::MAX).unwrap().is_none());

    let err = update_field(&store, &ctx("emma", 2), big, valley(), true).unwrap_err();
    assert!(matches!(err, AgroError::NotAuthorized(_)));
}

#[test]
fn test_unstorable_size_or_clock_is_invalid_input() {
    let (_tmp, store) = fresh_store();
    with_farmer(&store, "emma");

    let err = register_field(
        &store,
        &ctx("emma", 2),
        FieldParams {
            size_hectares: u64::MAX,
            ..valley()
        },
    )
    .unwrap_err();
    assert!(matches!(err, AgroError::InvalidInput(_)));

    let err = register_field(&store, &ctx("emma", u64::MAX), valley()).unwrap_err();
    assert!(matches!(err, AgroError::InvalidInput(_)));

    let field_id = register_field(&store, &ctx("emma", 3), valley()).unwrap();
    assert_eq!(field_id, 1);
    let err = update_field(
        &store,
        &ctx("emma", 4),
        field_id,
        FieldParams {
            size_hectares: i64::MAX as u64 + 1,
            ..valley()
        },
        true,
    )
    .unwrap_err();
    assert!(matches!(err, AgroError::InvalidInput(_)));
    assert_eq!(get_field(&store, field_id).unwrap().unwrap().size_hectares, 50);

    // The largest storable size round-trips.
    update_field(
        &store,
        &ctx("emma", 5),
        field_id,
        FieldParams {
            size_hectares: i64::MAX as u64,
            ..valley()
        },
        true,
    )
    .unwrap();
    assert_eq!(
        get_field(&store, field_id).unwrap().unwrap().size_hectares,
        i64::MAX as u64
    );
}
