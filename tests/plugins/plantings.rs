use agrotrace::core::db;
use agrotrace::core::error::AgroError;
use agrotrace::core::identity::{CallContext, Identity};
use agrotrace::core::store::Store;
use agrotrace::plugins::farmers::register_farmer;
use agrotrace::plugins::fields::{FieldParams, register_field, update_field};
use agrotrace::plugins::plantings::{
    PlantingParams, get_planting, list_plantings_for_field, record_planting,
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

fn planting_on(field_id: u64) -> PlantingParams<'static> {
    PlantingParams {
        field_id,
        crop_type: "Sunflower",
        planting_date: "2024-03-01",
        inputs_used: "seeds",
        notes: "-",
    }
}

fn with_farmer(store: &Store, who: &str) {
    register_farmer(store, &ctx(who, 1), who, "somewhere").unwrap();
}

#[test]
fn test_planting_requires_field_ownership() {
    let (_tmp, store) = fresh_store();
    with_farmer(&store, "emma");
    with_farmer(&store, "bob");
    let field_id = register_field(&store, &ctx("emma", 2), valley()).unwrap();

    let err = record_planting(&store, &ctx("bob", 3), planting_on(field_id)).unwrap_err();
    assert!(matches!(err, AgroError::NotAuthorized(_)));

    // An unknown field is reported as NotAuthorized, not as a missing field.
    let err = record_planting(&store, &ctx("emma", 3), planting_on(77)).unwrap_err();
    assert!(matches!(err, AgroError::NotAuthorized(_)));

    let planting_id = record_planting(&store, &ctx("emma", 4), planting_on(field_id)).unwrap();
    assert_eq!(planting_id, 1);
    let planting = get_planting(&store, planting_id).unwrap().unwrap();
    assert_eq!(planting.field_id, field_id);
    assert_eq!(planting.owner, id("emma"));
    assert_eq!(planting.crop_type, "Sunflower");
    assert_eq!(planting.planting_date, "2024-03-01");
}

#[test]
fn test_planting_is_not_revalidated_after_field_deactivation() {
    let (_tmp, store) = fresh_store();
    with_farmer(&store, "emma");
    let field_id = register_field(&store, &ctx("emma", 2), valley()).unwrap();
    let planting_id = record_planting(&store, &ctx("emma", 3), planting_on(field_id)).unwrap();

    update_field(&store, &ctx("emma", 4), field_id, valley(), false).unwrap();

    assert_eq!(get_planting(&store, planting_id).unwrap().unwrap().field_id, field_id);
    // The owner can still record on an inactive field they own.
    assert_eq!(record_planting(&store, &ctx("emma", 5), planting_on(field_id)).unwrap(), 2);
    let listed: Vec<u64> = list_plantings_for_field(&store, field_id)
        .unwrap()
        .iter()
        .map(|p| p.planting_id)
        .collect();
    assert_eq!(listed, vec![1, 2]);
}

#[test]
fn test_rejected_planting_consumes_no_id() {
    let (_tmp, store) = fresh_store();
    with_farmer(&store, "emma");
    with_farmer(&store, "bob");
    let field_id = register_field(&store, &ctx("emma", 2), valley()).unwrap();

    assert!(record_planting(&store, &ctx("bob", 3), planting_on(field_id)).is_err());
    assert!(get_planting(&store, 1).unwrap().is_none());
    assert_eq!(record_planting(&store, &ctx("emma", 4), planting_on(field_id)).unwrap(), 1);
    assert!(list_plantings_for_field(&store, 99).unwrap().is_empty());
}
