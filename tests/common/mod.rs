#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use protorecord::{
    Column, ColumnType, DynamicMessage, EntityType, FieldDescriptor, FieldOptions, FieldType,
    InMemoryStore, Message, MessageDescriptor, Query, Record, RecordStore,
    RecordTransformerRef, Result, ScopeOptions, TransformerOptions, TransformerRef, Value,
};

/// 2020-01-02T12:00:00Z
pub const NOON_2020_01_02: i64 = 1_577_966_400;
/// 2020-01-02T00:00:00Z
pub const MIDNIGHT_2020_01_02: i64 = 1_577_923_200;

pub fn user_columns() -> Vec<Column> {
    vec![
        Column::new("id", ColumnType::Integer),
        Column::new("guid", ColumnType::Text),
        Column::new("first_name", ColumnType::Text),
        Column::new("last_name", ColumnType::Text),
        Column::new("email", ColumnType::Text),
        Column::new("password", ColumnType::Text),
        Column::new("born_on", ColumnType::Date),
        Column::new("created_at", ColumnType::DateTime),
        Column::new("tenant", ColumnType::Integer),
        Column::new("external_id", ColumnType::Text),
    ]
}

pub fn users_store() -> Arc<InMemoryStore> {
    let store = InMemoryStore::shared();
    store.create_table("users", user_columns()).unwrap();
    store
}

pub fn user_message() -> Arc<MessageDescriptor> {
    MessageDescriptor::new(
        "UserMessage",
        vec![
            FieldDescriptor::optional("guid", 1, FieldType::String),
            FieldDescriptor::optional("name", 2, FieldType::String),
            FieldDescriptor::optional("email", 3, FieldType::String),
            FieldDescriptor::optional("email_domain", 4, FieldType::String).deprecated(),
            FieldDescriptor::optional("password", 5, FieldType::String),
            FieldDescriptor::optional("born_on", 6, FieldType::Int64),
            FieldDescriptor::optional("created_at", 7, FieldType::Int64),
            FieldDescriptor::optional("tenant", 8, FieldType::Int64),
            FieldDescriptor::optional("external_id", 9, FieldType::String),
            FieldDescriptor::repeated("nullify", 10, FieldType::String),
        ],
    )
    .into_shared()
}

pub fn user_search_message() -> Arc<MessageDescriptor> {
    MessageDescriptor::new(
        "UserSearchMessage",
        vec![
            FieldDescriptor::repeated("guid", 1, FieldType::String),
            FieldDescriptor::repeated("email", 2, FieldType::String),
        ],
    )
    .into_shared()
}

fn name_part(message: &dyn Message, index: usize) -> Value {
    message
        .get("name")
        .and_then(Value::as_str)
        .and_then(|name| name.split_whitespace().nth(index))
        .map(Value::from)
        .unwrap_or(Value::Null)
}

/// `User` over the `users` table, mapped to `UserMessage`: first and last
/// name derive from `name`, `email_domain` is computed, and `guid` and
/// `email` are searchable.
pub fn user_type(store: Arc<InMemoryStore>) -> Arc<EntityType> {
    let user = EntityType::new("User", "users", store);
    user.declare_message(user_message(), FieldOptions::default())
        .unwrap();

    user.attribute_from_message(
        "first_name",
        TransformerRef::callable(|message| Ok(name_part(message, 0))),
        TransformerOptions::nullify_on("name"),
    )
    .unwrap();
    user.attribute_from_message(
        "last_name",
        TransformerRef::callable(|message| Ok(name_part(message, 1))),
        TransformerOptions::nullify_on("name"),
    )
    .unwrap();
    user.field_from_record(
        "name",
        RecordTransformerRef::callable(|record| {
            let parts: Vec<String> = ["first_name", "last_name"]
                .iter()
                .filter_map(|column| record.read(column).as_str().map(str::to_string))
                .collect();
            Ok(Value::from(parts.join(" ")))
        }),
    )
    .unwrap();
    user.define_accessor("email_domain", |record| {
        Ok(record
            .read("email")
            .as_str()
            .and_then(|email| email.split('@').nth(1))
            .map(Value::from)
            .unwrap_or(Value::Null))
    })
    .unwrap();

    for (scope, column) in [
        ("by_guid", "guid"),
        ("by_email", "email"),
        ("by_tenant", "tenant"),
        ("by_external_id", "external_id"),
    ] {
        user.define_in_scope(scope, column).unwrap();
    }
    user.field_scope("guid", ScopeOptions::new()).unwrap();
    user.field_scope("email", ScopeOptions::new().scope("by_email"))
        .unwrap();
    user
}

pub fn user_fixture() -> (Arc<InMemoryStore>, Arc<EntityType>) {
    let store = users_store();
    let user = user_type(store.clone());
    (store, user)
}

pub fn message(descriptor: &Arc<MessageDescriptor>, fields: Vec<(&str, Value)>) -> DynamicMessage {
    fields
        .into_iter()
        .fold(DynamicMessage::builder(descriptor), |builder, (key, value)| {
            builder.set(key, value)
        })
        .build()
        .unwrap()
}

pub fn user_record(guid: &str, first: &str, last: &str, email: &str) -> Record {
    Record::new("User", "users")
        .with("guid", guid)
        .with("first_name", first)
        .with("last_name", last)
        .with("email", email)
}

/// Store wrapper that counts and slows down column lookups.
pub struct CountingStore {
    inner: Arc<InMemoryStore>,
    column_calls: AtomicUsize,
    delay: Duration,
}

impl CountingStore {
    pub fn new(inner: Arc<InMemoryStore>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            inner,
            column_calls: AtomicUsize::new(0),
            delay,
        })
    }

    pub fn column_calls(&self) -> usize {
        self.column_calls.load(Ordering::SeqCst)
    }
}

impl RecordStore for CountingStore {
    fn columns(&self, table: &str) -> Result<Option<Vec<Column>>> {
        self.column_calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        self.inner.columns(table)
    }

    fn select(&self, query: &Query) -> Result<Vec<Record>> {
        self.inner.select(query)
    }

    fn insert(&self, record: &mut Record) -> Result<()> {
        self.inner.insert(record)
    }

    fn update(&self, record: &mut Record) -> Result<()> {
        self.inner.update(record)
    }

    fn delete(&self, record: &mut Record) -> Result<bool> {
        self.inner.delete(record)
    }
}
