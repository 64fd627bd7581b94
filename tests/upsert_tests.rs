/// Upsert tests
///
/// Key group declaration, eligibility selection and the locate-then-save
/// flow against the in-memory store.
/// Run with: cargo test --test upsert_tests

mod common;

use std::sync::Arc;

use common::*;
use protorecord::{
    EntityType, ErrorClass, InMemoryStore, MappingError, ScopeOptions, Value,
};

/// `User` with `[external_id, tenant]` preferred over `[guid]`.
fn upsert_fixture() -> (Arc<InMemoryStore>, Arc<EntityType>) {
    let (store, user) = user_fixture();
    user.field_scope("external_id", ScopeOptions::new()).unwrap();
    user.field_scope("tenant", ScopeOptions::new()).unwrap();
    user.upsert_key(["external_id", "tenant"]).unwrap();
    user.upsert_key(["guid"]).unwrap();
    (store, user)
}

#[test]
fn test_key_fields_must_be_searchable() {
    let store = users_store();
    let user = EntityType::new("User", "users", store);

    let err = user.upsert_key(["guid"]).unwrap_err();
    assert!(err.is_configuration());
    assert!(matches!(
        err,
        MappingError::UpsertKeyUndeclared { ref field, .. } if field == "guid"
    ));

    user.define_in_scope("by_guid", "guid").unwrap();
    user.field_scope("guid", ScopeOptions::new()).unwrap();
    user.upsert_key(["guid"]).unwrap();
    assert_eq!(user.upsert_keys().unwrap(), vec![vec!["guid".to_string()]]);
}

#[test]
fn test_empty_key_group_is_rejected() {
    let (_, user) = user_fixture();
    let err = user.upsert_key(Vec::<String>::new()).unwrap_err();
    assert!(err.is_configuration());
    assert!(user.upsert_keys().unwrap().is_empty());
}

#[test]
fn test_key_groups_keep_declaration_order() {
    let (_, user) = upsert_fixture();
    assert_eq!(
        user.upsert_keys().unwrap(),
        vec![
            vec!["external_id".to_string(), "tenant".to_string()],
            vec!["guid".to_string()],
        ]
    );
}

#[test]
fn test_upsert_creates_then_updates() {
    let (store, user) = upsert_fixture();

    let first = message(
        &user_message(),
        vec![("guid", Value::from("U1")), ("email", Value::from("old@b.co"))],
    );
    let created = user.upsert(&first).unwrap();
    assert!(!created.is_new_record());
    assert_eq!(store.row_count("users").unwrap(), 1);

    let second = message(
        &user_message(),
        vec![("guid", Value::from("U1")), ("email", Value::from("new@b.co"))],
    );
    let updated = user.upsert(&second).unwrap();
    assert_eq!(updated.id(), created.id());
    assert_eq!(updated.read("email"), Value::from("new@b.co"));
    assert_eq!(store.row_count("users").unwrap(), 1);

    let reloaded = user.find(created.id().unwrap()).unwrap().unwrap();
    assert_eq!(reloaded.read("email"), Value::from("new@b.co"));
}

#[test]
fn test_first_eligible_group_wins() {
    let (store, user) = upsert_fixture();
    let original = message(
        &user_message(),
        vec![
            ("guid", Value::from("U1")),
            ("external_id", Value::from("E1")),
            ("tenant", Value::Integer(7)),
        ],
    );
    let created = user.upsert(&original).unwrap();

    // Same external id and tenant under a new guid: the first group matches.
    let renamed = message(
        &user_message(),
        vec![
            ("guid", Value::from("U2")),
            ("external_id", Value::from("E1")),
            ("tenant", Value::Integer(7)),
        ],
    );
    let located = user.locate(&renamed).unwrap();
    assert_eq!(located.id(), created.id());

    let updated = user.upsert(&renamed).unwrap();
    assert_eq!(updated.read("guid"), Value::from("U2"));
    assert_eq!(store.row_count("users").unwrap(), 1);
}

#[test]
fn test_incomplete_group_falls_through() {
    let (_, user) = upsert_fixture();
    let original = message(
        &user_message(),
        vec![
            ("guid", Value::from("U1")),
            ("external_id", Value::from("E1")),
            ("tenant", Value::Integer(7)),
        ],
    );
    let created = user.upsert(&original).unwrap();

    // No tenant: the guid group is used.
    let partial = message(
        &user_message(),
        vec![("guid", Value::from("U1")), ("external_id", Value::from("E9"))],
    );
    let located = user.locate(&partial).unwrap();
    assert_eq!(located.id(), created.id());
}

#[test]
fn test_new_record_is_seeded_from_key_values() {
    let (_, user) = upsert_fixture();
    let msg = message(
        &user_message(),
        vec![
            ("external_id", Value::from("E5")),
            ("tenant", Value::Integer(3)),
        ],
    );

    let located = user.locate(&msg).unwrap();
    assert!(located.is_new_record());
    assert_eq!(located.read("external_id"), Value::from("E5"));
    assert_eq!(located.read("tenant"), Value::Integer(3));
}

#[test]
fn test_no_eligible_group() {
    let (store, user) = upsert_fixture();
    let msg = message(&user_message(), vec![("email", Value::from("a@b.co"))]);

    let err = user.upsert(&msg).unwrap_err();
    assert_eq!(err.class(), ErrorClass::UpsertEligibility);
    assert_eq!(store.row_count("users").unwrap(), 0);
}

#[test]
fn test_blank_key_field_is_not_eligible() {
    let (_, user) = upsert_fixture();
    let msg = message(&user_message(), vec![("guid", Value::from(" "))]);

    assert!(matches!(
        user.locate(&msg).unwrap_err(),
        MappingError::UpsertNotFound(_)
    ));
}
