use agrotrace::core::db;
use agrotrace::core::error::AgroError;
use agrotrace::core::identity::{CallContext, Identity};
use agrotrace::core::kinds::{RecordKind, VerificationStatus};
use agrotrace::core::store::Store;
use agrotrace::plugins::farmers::register_farmer;
use agrotrace::plugins::verifiers::{
    get_verification, get_verifier, list_verifications_for_target, register_verifier,
    submit_verification,
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

#[test]
fn test_register_verifier_once() {
    let (_tmp, store) = fresh_store();

    assert!(register_verifier(&store, &ctx("organic-org", 3), "Organic Certifier", "Organic").unwrap());
    let err = register_verifier(&store, &ctx("organic-org", 4), "Other", "Other").unwrap_err();
    assert!(matches!(err, AgroError::AlreadyExists(_)));

    let verifier = get_verifier(&store, &id("organic-org")).unwrap().unwrap();
    assert_eq!(verifier.name, "Organic Certifier");
    assert_eq!(verifier.verification_type, "Organic");
    assert_eq!(verifier.registered_at, 3);
    assert!(verifier.active);
    assert!(get_verifier(&store, &id("nobody")).unwrap().is_none());
}

#[test]
fn test_only_active_verifiers_submit() {
    let (_tmp, store) = fresh_store();
    register_farmer(&store, &ctx("emma", 1), "Emma Green", "California, USA").unwrap();

    for who in ["stranger", "emma"] {
        let err = submit_verification(
            &store,
            &ctx(who, 2),
            RecordKind::Field,
            1,
            VerificationStatus::Verified,
            "",
        )
        .unwrap_err();
        assert!(matches!(err, AgroError::NotVerifier(_)));
        assert_eq!(err.code(), 107);
    }

    register_verifier(&store, &ctx("organic-org", 3), "Organic Certifier", "Organic").unwrap();
    let conn = rusqlite::Connection::open(store.db_path()).unwrap();
    conn.execute("UPDATE verifiers SET active = 0", []).unwrap();
    drop(conn);
    let err = submit_verification(
        &store,
        &ctx("organic-org", 4),
        RecordKind::Field,
        1,
        VerificationStatus::Verified,
        "",
    )
    .unwrap_err();
    assert!(matches!(err, AgroError::NotVerifier(_)));
}

#[test]
fn test_attestation_may_target_missing_record() {
    let (_tmp, store) = fresh_store();
    register_verifier(&store, &ctx("organic-org", 3), "Organic Certifier", "Organic").unwrap();

    let vid = submit_verification(
        &store,
        &ctx("organic-org", 10),
        RecordKind::Harvest,
        404,
        VerificationStatus::Pending,
        "awaiting lab results",
    )
    .unwrap();
    assert_eq!(vid, 1);

    let v = get_verification(&store, vid).unwrap().unwrap();
    assert_eq!(v.verifier, id("organic-org"));
    assert_eq!(v.target_kind, RecordKind::Harvest);
    assert_eq!(v.target_id, 404);
    assert_eq!(v.verified_at, 10);
    assert_eq!(v.status, VerificationStatus::Pending);
    assert_eq!(v.comments, "awaiting lab results");
}

#[test]
fn test_list_verifications_for_target() {
    let (_tmp, store) = fresh_store();
    register_verifier(&store, &ctx("organic-org", 1), "Organic Certifier", "Organic").unwrap();
    register_verifier(&store, &ctx("soil-lab", 1), "Soil Lab", "Soil").unwrap();

    let submit = |who: &str, kind, target, status| {
        submit_verification(&store, &ctx(who, 5), kind, target, status, "").unwrap()
    };
    assert_eq!(submit("organic-org", RecordKind::Field, 1, VerificationStatus::Verified), 1);
    assert_eq!(submit("soil-lab", RecordKind::Planting, 1, VerificationStatus::Rejected), 2);
    assert_eq!(submit("soil-lab", RecordKind::Field, 1, VerificationStatus::Rejected), 3);

    let on_field: Vec<(u64, VerificationStatus)> =
        list_verifications_for_target(&store, RecordKind::Field, 1)
            .unwrap()
            .into_iter()
            .map(|v| (v.verification_id, v.status))
            .collect();
    assert_eq!(
        on_field,
        vec![(1, VerificationStatus::Verified), (3, VerificationStatus::Rejected)]
    );
    assert!(get_verification(&store, 4).unwrap().is_none());
}

#[test]
fn test_unstorable_target_id_is_invalid_input() {
    let (_tmp, store) = fresh_store();
    register_verifier(&store, &ctx("organic-org", 1), "Organic Certifier", "Organic").unwrap();

    let err = submit_verification(
        &store,
        &ctx("organic-org", 2),
        RecordKind::Field,
        u64::MAX,
        VerificationStatus::Verified,
        "",
    )
    .unwrap_err();
    assert!(matches!(err, AgroError::InvalidInput(_)));
    assert!(list_verifications_for_target(&store, RecordKind::Field, u64::MAX).unwrap().is_empty());
    assert!(get_verification(&store, u64::MAX).unwrap().is_none());

    let vid = submit_verification(
        &store,
        &ctx("organic-org", 3),
        RecordKind::Field,
        i64::MAX as u64,
        VerificationStatus::Verified,
        "",
    )
    .unwrap();
    assert_eq!(vid, 1);
    assert_eq!(get_verification(&store, vid).unwrap().unwrap().target_id, i64::MAX as u64);
}
