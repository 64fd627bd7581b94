/// Outbound serialization tests
///
/// Records to field values and messages: field ordering and filtering,
/// accessor precedence, temporal coercion, schema drift and associations.
/// Run with: cargo test --test outbound_tests

mod common;

use chrono::{DateTime, NaiveDate, Utc};
use common::*;
use protorecord::{
    BridgeConfig, Column, ColumnType, EntityType, ErrorClass, FieldDescriptor, FieldOptions,
    FieldType, InMemoryStore, MessageDescriptor, Record, Resolvable, Value,
};

#[test]
fn test_fields_follow_descriptor_order() {
    let (_, user) = user_fixture();
    let record = user_record("U1", "Ann", "Lee", "ann@b.co");

    let values = user.fields_from(&record, &FieldOptions::default()).unwrap();
    let keys: Vec<&str> = values.keys().collect();
    assert_eq!(
        keys,
        vec![
            "guid",
            "name",
            "email",
            "email_domain",
            "password",
            "born_on",
            "created_at",
            "tenant",
            "external_id",
            "nullify",
        ]
    );
}

#[test]
fn test_field_transformer_and_computed_accessor() {
    let (_, user) = user_fixture();
    let record = user_record("U1", "Ann", "Lee", "ann@b.co");

    let values = user.fields_from(&record, &FieldOptions::default()).unwrap();
    assert_eq!(values.get("name"), Some(&Value::from("Ann Lee")));
    assert_eq!(values.get("email_domain"), Some(&Value::from("b.co")));
    assert_eq!(values.get("guid"), Some(&Value::from("U1")));
}

#[test]
fn test_missing_attributes_read_null() {
    let (_, user) = user_fixture();
    let record = user_record("U1", "Ann", "Lee", "ann@b.co");

    let values = user.fields_from(&record, &FieldOptions::default()).unwrap();
    assert_eq!(values.get("password"), Some(&Value::Null));
    assert_eq!(values.get("nullify"), Some(&Value::Null));
}

#[test]
fn test_deprecated_fields_can_be_skipped() {
    let (_, user) = user_fixture();
    let record = user_record("U1", "Ann", "Lee", "ann@b.co");

    let included = user.fields_from(&record, &FieldOptions::default()).unwrap();
    assert!(included.contains_key("email_domain"));

    let skipped = user
        .fields_from(&record, &FieldOptions::new().deprecated(false))
        .unwrap();
    assert!(!skipped.contains_key("email_domain"));
}

#[test]
fn test_config_excludes_deprecated_by_default() {
    let store = users_store();
    let user = EntityType::with_config(
        "User",
        "users",
        store,
        BridgeConfig::new().include_deprecated(false),
    )
    .unwrap();
    user.declare_message(user_message(), FieldOptions::default())
        .unwrap();
    let record = user_record("U1", "Ann", "Lee", "ann@b.co");

    let values = user.fields_from(&record, &FieldOptions::default()).unwrap();
    assert!(!values.contains_key("email_domain"));

    let forced = user
        .fields_from(&record, &FieldOptions::new().deprecated(true))
        .unwrap();
    assert!(forced.contains_key("email_domain"));
}

#[test]
fn test_only_except_include() {
    let (_, user) = user_fixture();
    let record = user_record("U1", "Ann", "Lee", "ann@b.co");

    let only = user
        .fields_from(&record, &FieldOptions::new().only(["email", "guid"]))
        .unwrap();
    assert_eq!(only.keys().collect::<Vec<_>>(), vec!["guid", "email"]);

    let except = user
        .fields_from(&record, &FieldOptions::new().except(["password", "nullify"]))
        .unwrap();
    assert!(!except.contains_key("password"));
    assert!(!except.contains_key("nullify"));
    assert!(except.contains_key("guid"));

    let include = user
        .fields_from(
            &record,
            &FieldOptions::new().only(["guid"]).include(["nickname"]),
        )
        .unwrap();
    assert_eq!(include.keys().collect::<Vec<_>>(), vec!["guid", "nickname"]);
    assert_eq!(include.get("nickname"), Some(&Value::Null));
}

#[test]
fn test_empty_only_means_everything() {
    let (_, user) = user_fixture();
    let record = user_record("U1", "Ann", "Lee", "ann@b.co");

    let values = user
        .fields_from(&record, &FieldOptions::new().only(Vec::<String>::new()))
        .unwrap();
    assert_eq!(values.len(), user_message().fields().len());
}

#[test]
fn test_call_options_override_declared_defaults() {
    let store = users_store();
    let user = EntityType::new("User", "users", store);
    user.declare_message(user_message(), FieldOptions::new().except(["password"]))
        .unwrap();
    let record = user_record("U1", "Ann", "Lee", "ann@b.co");

    let defaults = user.fields_from(&record, &FieldOptions::default()).unwrap();
    assert!(!defaults.contains_key("password"));

    let overridden = user
        .fields_from(&record, &FieldOptions::new().only(["guid", "password"]))
        .unwrap();
    assert_eq!(
        overridden.keys().collect::<Vec<_>>(),
        vec!["guid", "password"]
    );
}

#[test]
fn test_temporal_columns_become_epoch_seconds() {
    let (_, user) = user_fixture();
    let noon: DateTime<Utc> = DateTime::from_timestamp(NOON_2020_01_02, 0).unwrap();
    let record = user_record("U1", "Ann", "Lee", "ann@b.co")
        .with("born_on", NaiveDate::from_ymd_opt(2020, 1, 2).unwrap())
        .with("created_at", noon);

    let values = user.fields_from(&record, &FieldOptions::default()).unwrap();
    assert_eq!(values.get("born_on"), Some(&Value::Integer(MIDNIGHT_2020_01_02)));
    assert_eq!(values.get("created_at"), Some(&Value::Integer(NOON_2020_01_02)));
}

#[test]
fn test_epoch_round_trip_for_every_temporal_type() {
    let store = InMemoryStore::shared();
    store
        .create_table(
            "clocks",
            vec![
                Column::new("id", ColumnType::Integer),
                Column::new("day", ColumnType::Date),
                Column::new("at", ColumnType::DateTime),
                Column::new("tick", ColumnType::Time),
                Column::new("stamp", ColumnType::Timestamp),
            ],
        )
        .unwrap();
    let clock = EntityType::new("Clock", "clocks", store);
    let descriptor = MessageDescriptor::new(
        "ClockMessage",
        vec![
            FieldDescriptor::optional("day", 1, FieldType::Int64),
            FieldDescriptor::optional("at", 2, FieldType::Int64),
            FieldDescriptor::optional("tick", 3, FieldType::Int64),
            FieldDescriptor::optional("stamp", 4, FieldType::Int64),
        ],
    )
    .into_shared();
    clock
        .declare_message(descriptor.clone(), FieldOptions::default())
        .unwrap();

    let stamp = NOON_2020_01_02 + 7;
    let msg = message(
        &descriptor,
        vec![
            ("day", Value::Integer(MIDNIGHT_2020_01_02)),
            ("at", Value::Integer(NOON_2020_01_02)),
            ("tick", Value::Integer(NOON_2020_01_02)),
            ("stamp", Value::Integer(stamp)),
        ],
    );
    let attributes = clock.attributes_from(&msg).unwrap();
    assert!(matches!(attributes.get("tick"), Some(Value::Timestamp(_))));
    assert!(matches!(attributes.get("stamp"), Some(Value::Timestamp(_))));

    let mut record = Record::new("Clock", "clocks");
    record.assign(&attributes);
    let values = clock.fields_from(&record, &FieldOptions::default()).unwrap();
    assert_eq!(values.get("day"), Some(&Value::Integer(MIDNIGHT_2020_01_02)));
    assert_eq!(values.get("at"), Some(&Value::Integer(NOON_2020_01_02)));
    assert_eq!(values.get("tick"), Some(&Value::Integer(NOON_2020_01_02)));
    assert_eq!(values.get("stamp"), Some(&Value::Integer(stamp)));
}

#[test]
fn test_outbound_converter_overrides_coercion() {
    let (_, user) = user_fixture();
    user.convert_column(
        "email",
        Resolvable::callable(|value| {
            Ok(Value::from(value.as_str().unwrap_or_default().to_uppercase()))
        }),
    )
    .unwrap();
    let record = user_record("U1", "Ann", "Lee", "ann@b.co");

    let values = user.fields_from(&record, &FieldOptions::default()).unwrap();
    assert_eq!(values.get("email"), Some(&Value::from("ANN@B.CO")));
}

#[test]
fn test_alias_reads_target_attribute() {
    let store = users_store();
    let user = EntityType::new("User", "users", store);
    let descriptor = MessageDescriptor::new(
        "AccountMessage",
        vec![FieldDescriptor::optional("login", 1, FieldType::String)],
    )
    .into_shared();
    user.declare_message(descriptor, FieldOptions::default())
        .unwrap();
    user.alias_field("login", "email").unwrap();

    let record = user_record("U1", "Ann", "Lee", "ann@b.co");
    let message = user.to_message(&record, &FieldOptions::default()).unwrap();
    assert_eq!(message.values().get("login"), Some(&Value::from("ann@b.co")));
}

#[test]
fn test_to_message_skips_nulls() {
    let (_, user) = user_fixture();
    let record = Record::new("User", "users").with("guid", "U1");

    let message = user.to_message(&record, &FieldOptions::default()).unwrap();
    assert_eq!(message.values().get("guid"), Some(&Value::from("U1")));
    assert!(!message.values().contains_key("email"));
    assert!(!message.values().contains_key("password"));
    assert!(!message.values().contains_key("email_domain"));
}

#[test]
fn test_to_message_fits_values_to_field_types() {
    let store = InMemoryStore::shared();
    store
        .create_table(
            "devices",
            vec![
                Column::new("id", ColumnType::Integer),
                Column::new("serial", ColumnType::Uuid),
                Column::new("weight", ColumnType::Integer),
            ],
        )
        .unwrap();
    let device = EntityType::new("Device", "devices", store);
    let descriptor = MessageDescriptor::new(
        "DeviceMessage",
        vec![
            FieldDescriptor::optional("serial", 1, FieldType::String),
            FieldDescriptor::optional("weight", 2, FieldType::Double),
        ],
    )
    .into_shared();
    device
        .declare_message(descriptor, FieldOptions::default())
        .unwrap();

    let serial = uuid::Uuid::parse_str("6f1c3a4e-2b7d-4a8e-9c1f-0d2e3f4a5b6c").unwrap();
    let record = Record::new("Device", "devices")
        .with("serial", serial)
        .with("weight", 12i64);

    let message = device.to_message(&record, &FieldOptions::default()).unwrap();
    assert_eq!(
        message.values().get("serial"),
        Some(&Value::from("6f1c3a4e-2b7d-4a8e-9c1f-0d2e3f4a5b6c"))
    );
    assert_eq!(message.values().get("weight"), Some(&Value::Float(12.0)));
}

#[test]
fn test_message_not_defined() {
    let store = users_store();
    let user = EntityType::new("User", "users", store);
    let record = user_record("U1", "Ann", "Lee", "ann@b.co");

    let err = user
        .fields_from(&record, &FieldOptions::default())
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::Message);
    assert!(user.to_message(&record, &FieldOptions::default()).is_err());
}

#[test]
fn test_schema_drift_reads_null() {
    let store = users_store();
    let user = EntityType::new("User", "users", store.clone());
    let descriptor = MessageDescriptor::new(
        "ProfileMessage",
        vec![
            FieldDescriptor::optional("guid", 1, FieldType::String),
            FieldDescriptor::optional("nickname", 2, FieldType::String),
        ],
    )
    .into_shared();
    user.declare_message(descriptor, FieldOptions::default())
        .unwrap();

    let record = Record::new("User", "users")
        .with("guid", "U1")
        .with("nickname", "annie");

    // Not a column yet: no accessor, reads null.
    let before = user.fields_from(&record, &FieldOptions::default()).unwrap();
    assert_eq!(before.get("nickname"), Some(&Value::Null));

    store
        .add_column("users", Column::new("nickname", ColumnType::Text))
        .unwrap();
    user.remap_columns().unwrap();

    let after = user.fields_from(&record, &FieldOptions::default()).unwrap();
    assert_eq!(after.get("nickname"), Some(&Value::from("annie")));

    // A record loaded before the column existed lacks the attribute.
    let stale = Record::new("User", "users").with("guid", "U2");
    let drift = user.fields_from(&stale, &FieldOptions::default()).unwrap();
    assert_eq!(drift.get("nickname"), Some(&Value::Null));
}

#[test]
fn test_declarations_after_first_read_are_seen() {
    let (_, user) = user_fixture();
    let record = user_record("U1", "Ann", "Lee", "ann@b.co");
    let first = user.fields_from(&record, &FieldOptions::default()).unwrap();
    assert_eq!(first.get("password"), Some(&Value::Null));

    user.define_accessor("password", |_| Ok(Value::from("[filtered]")))
        .unwrap();
    let second = user.fields_from(&record, &FieldOptions::default()).unwrap();
    assert_eq!(second.get("password"), Some(&Value::from("[filtered]")));
}

#[test]
fn test_named_record_transformer() {
    let (_, user) = user_fixture();
    assert!(user.field_from_record("email", "masked_email").is_err());

    user.define_record_method("masked_email", |record| {
        let email = record.read("email");
        let domain = email.as_str().and_then(|email| email.split('@').nth(1));
        Ok(Value::from(domain.map(|domain| format!("***@{}", domain))))
    })
    .unwrap();
    user.field_from_record("email", "masked_email").unwrap();
    assert!(user.has_field_transformer("email").unwrap());

    let record = user_record("U1", "Ann", "Lee", "ann@b.co");
    let values = user.fields_from(&record, &FieldOptions::default()).unwrap();
    assert_eq!(values.get("email"), Some(&Value::from("***@b.co")));
}
