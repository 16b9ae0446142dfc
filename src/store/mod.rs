use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use std::{cmp::Ordering, sync::Arc};
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;

mod memory;
mod postgres;

pub use memory::InMemoryRecordStore;
pub use postgres::PostgresRecordStore;

/// A stored record: a JSON object keyed by field name.
pub type Document = Map<String, Value>;

pub const ID_FIELD: &str = "_id";
pub const CREATED_AT_FIELD: &str = "createdAt";
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// Collection
///
/// The named document collections the storefront keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Accounts,
    Products,
    Carts,
    Orders,
}

impl Collection {
    pub fn name(self) -> &'static str {
        match self {
            Collection::Accounts => "accounts",
            Collection::Products => "products",
            Collection::Carts => "carts",
            Collection::Orders => "orders",
        }
    }

    /// Fields whose values must be unique across the collection.
    pub fn unique_fields(self) -> &'static [&'static str] {
        match self {
            Collection::Accounts => &["username", "email"],
            Collection::Products => &["title"],
            Collection::Carts | Collection::Orders => &[],
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique field already holds this value.
    #[error("duplicate value for unique field `{0}`")]
    Duplicate(String),
    #[error("malformed document: {0}")]
    Malformed(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// The field equals the value.
    Eq(String, Value),
    /// The field is an array holding the value.
    Contains(String, Value),
}

/// Filter
///
/// A conjunction of field conditions. The empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions
            .push(Condition::Eq(field.to_string(), value.into()));
        self
    }

    pub fn contains(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions
            .push(Condition::Contains(field.to_string(), value.into()));
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.conditions.iter().all(|condition| match condition {
            Condition::Eq(field, value) => doc.get(field) == Some(value),
            Condition::Contains(field, value) => doc
                .get(field)
                .and_then(Value::as_array)
                .is_some_and(|items| items.contains(value)),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub direction: Direction,
}

impl Sort {
    pub fn descending(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: Direction::Descending,
        }
    }

    pub fn ascending(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: Direction::Ascending,
        }
    }
}

/// FindQuery
///
/// Parameters of a multi-document lookup: which documents, in what order, how many.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindQuery {
    pub filter: Filter,
    pub sort: Option<Sort>,
    pub limit: Option<usize>,
}

impl FindQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn filtered(filter: Filter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    /// The `limit` most recently created documents, newest first.
    pub fn newest(limit: usize) -> Self {
        Self {
            filter: Filter::new(),
            sort: Some(Sort::descending(CREATED_AT_FIELD)),
            limit: Some(limit),
        }
    }
}

/// What a monthly aggregation accumulates per group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Measure {
    Count,
    /// Sum of a numeric field; documents lacking it contribute nothing.
    Sum(String),
}

/// MonthlyTotal
///
/// One group of a monthly aggregation. Serialized as `{ "_id": month, "total": n }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, TS)]
#[ts(export)]
pub struct MonthlyTotal {
    /// Calendar month, 1 through 12.
    #[serde(rename = "_id")]
    pub month: u32,
    pub total: f64,
}

/// RecordStore
///
/// The contract the service needs from its document database. Handlers never know
/// which backend sits behind it.
///
/// `create` assigns `_id`, `createdAt` and `updatedAt` and enforces the collection's
/// unique fields. `find_by_id_and_update` merges top-level fields (never `_id` or
/// `createdAt`), refreshes `updatedAt`, and returns the document after the update.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn create(&self, collection: Collection, doc: Document) -> Result<Document, StoreError>;

    async fn find_by_id(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<Document>, StoreError>;

    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError>;

    async fn find(
        &self,
        collection: Collection,
        query: &FindQuery,
    ) -> Result<Vec<Document>, StoreError>;

    async fn find_by_id_and_update(
        &self,
        collection: Collection,
        id: &str,
        patch: Document,
    ) -> Result<Option<Document>, StoreError>;

    async fn find_by_id_and_delete(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<Document>, StoreError>;

    /// Groups documents created at or after `since` by calendar month.
    /// Results are ordered by month.
    async fn monthly_totals(
        &self,
        collection: Collection,
        since: DateTime<Utc>,
        measure: Measure,
    ) -> Result<Vec<MonthlyTotal>, StoreError>;
}

/// RecordStoreState
///
/// The shared handle to the persistence layer held in `AppState`.
pub type RecordStoreState = Arc<dyn RecordStore>;

/// Serializes a typed value into a document.
pub fn to_document<T: Serialize>(value: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(StoreError::Malformed(format!(
            "expected an object, found {}",
            other
        ))),
        Err(e) => Err(StoreError::Malformed(e.to_string())),
    }
}

/// Deserializes a stored document into a typed record.
pub fn from_document<T: DeserializeOwned>(doc: Document) -> Result<T, StoreError> {
    serde_json::from_value(Value::Object(doc)).map_err(|e| StoreError::Malformed(e.to_string()))
}

pub fn from_documents<T: DeserializeOwned>(docs: Vec<Document>) -> Result<Vec<T>, StoreError> {
    docs.into_iter().map(from_document).collect()
}

/// The timestamp format written into `createdAt` / `updatedAt`. Fixed width in UTC,
/// so lexical order equals chronological order.
pub(crate) fn timestamp(at: DateTime<Utc>) -> Value {
    Value::String(at.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Drops the fields callers may never overwrite.
pub(crate) fn sanitize_patch(mut patch: Document) -> Document {
    patch.remove(ID_FIELD);
    patch.remove(CREATED_AT_FIELD);
    patch.remove(UPDATED_AT_FIELD);
    patch
}

/// Orders two JSON values for sorting: numbers numerically, strings lexically,
/// missing or mixed values last.
pub(crate) fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}
