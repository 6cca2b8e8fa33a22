use agrotrace::core::db;
use agrotrace::core::error::AgroError;
use agrotrace::core::identity::{CallContext, Identity};
use agrotrace::core::store::Store;
use agrotrace::plugins::farmers::{get_farmer, register_farmer};
use agrotrace::plugins::fields::{FieldParams, register_field};
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

#[test]
fn test_register_then_get_returns_active_record() {
    let (_tmp, store) = fresh_store();

    assert!(register_farmer(&store, &ctx("emma", 7), "Emma Green", "California, USA").unwrap());

    let farmer = get_farmer(&store, &id("emma")).unwrap().expect("farmer stored");
    assert_eq!(farmer.identity, id("emma"));
    assert_eq!(farmer.name, "Emma Green");
    assert_eq!(farmer.location, "California, USA");
    assert_eq!(farmer.registered_at, 7);
    assert!(farmer.active);
}

#[test]
fn test_second_registration_is_already_exists_and_keeps_original() {
    let (_tmp, store) = fresh_store();
    register_farmer(&store, &ctx("emma", 1), "Emma Green", "California, USA").unwrap();

    let err = register_farmer(&store, &ctx("emma", 2), "Emma G.", "Oregon").unwrap_err();
    assert!(matches!(err, AgroError::AlreadyExists(_)));
    assert_eq!(err.code(), 102);

    let farmer = get_farmer(&store, &id("emma")).unwrap().unwrap();
    assert_eq!(farmer.name, "Emma Green");
    assert_eq!(farmer.registered_at, 1);
}

#[test]
fn test_unknown_farmer_is_none() {
    let (_tmp, store) = fresh_store();
    assert!(get_farmer(&store, &id("nobody")).unwrap().is_none());
}

#[test]
fn test_inactive_farmer_cannot_register_fields() {
    let (_tmp, store) = fresh_store();
    register_farmer(&store, &ctx("emma", 1), "Emma Green", "California, USA").unwrap();
    let conn = rusqlite::Connection::open(store.db_path()).unwrap();
    conn.execute("UPDATE farmers SET active = 0 WHERE identity = 'emma'", [])
        .unwrap();
    drop(conn);

    let err = register_field(
        &store,
        &ctx("emma", 2),
        FieldParams {
            location: "North plot",
            size_hectares: 3,
            soil_type: "Clay",
        },
    )
    .unwrap_err();
    assert!(matches!(err, AgroError::NotAuthorized(_)));
}
