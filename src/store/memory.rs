use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    CREATED_AT_FIELD, Collection, Direction, Document, Filter, FindQuery, ID_FIELD, Measure,
    MonthlyTotal, RecordStore, StoreError, UPDATED_AT_FIELD, compare_values, sanitize_patch,
    timestamp,
};

/// InMemoryRecordStore
///
/// A process-local `RecordStore`. Used by the test suites and for local development
/// when no `DATABASE_URL` is configured. Collections keep insertion order.
#[derive(Default)]
pub struct InMemoryRecordStore {
    collections: RwLock<HashMap<Collection, Vec<Document>>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn id_of(doc: &Document) -> Option<&str> {
    doc.get(ID_FIELD).and_then(Value::as_str)
}

/// Returns the first unique field of `candidate` already held by another document.
fn unique_violation(
    collection: Collection,
    docs: &[Document],
    candidate: &Document,
) -> Option<String> {
    let own_id = id_of(candidate);
    collection
        .unique_fields()
        .iter()
        .find(|field| {
            candidate.get(**field).is_some_and(|value| {
                docs.iter()
                    .filter(|doc| id_of(doc) != own_id)
                    .any(|doc| doc.get(**field) == Some(value))
            })
        })
        .map(|field| field.to_string())
}

fn created_at(doc: &Document) -> Option<DateTime<Utc>> {
    doc.get(CREATED_AT_FIELD)
        .and_then(Value::as_str)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|at| at.with_timezone(&Utc))
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn create(
        &self,
        collection: Collection,
        mut doc: Document,
    ) -> Result<Document, StoreError> {
        let now = timestamp(Utc::now());
        doc.insert(ID_FIELD.to_string(), Value::String(Uuid::new_v4().to_string()));
        doc.insert(CREATED_AT_FIELD.to_string(), now.clone());
        doc.insert(UPDATED_AT_FIELD.to_string(), now);

        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection).or_default();

        if let Some(field) = unique_violation(collection, docs, &doc) {
            return Err(StoreError::Duplicate(field));
        }

        docs.push(doc.clone());
        Ok(doc)
    }

    async fn find_by_id(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .and_then(|docs| docs.iter().find(|doc| id_of(doc) == Some(id)))
            .cloned())
    }

    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .and_then(|docs| docs.iter().find(|doc| filter.matches(doc)))
            .cloned())
    }

    async fn find(
        &self,
        collection: Collection,
        query: &FindQuery,
    ) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().await;
        let mut found: Vec<Document> = collections
            .get(&collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| query.filter.matches(doc))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(sort) = &query.sort {
            match sort.direction {
                Direction::Ascending => found
                    .sort_by(|a, b| compare_values(a.get(&sort.field), b.get(&sort.field))),
                Direction::Descending => {
                    // Reverse first so ties keep newest-inserted first.
                    found.reverse();
                    found.sort_by(|a, b| compare_values(b.get(&sort.field), a.get(&sort.field)));
                }
            }
        }

        if let Some(limit) = query.limit {
            found.truncate(limit);
        }

        Ok(found)
    }

    async fn find_by_id_and_update(
        &self,
        collection: Collection,
        id: &str,
        patch: Document,
    ) -> Result<Option<Document>, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(&collection) else {
            return Ok(None);
        };
        let Some(position) = docs.iter().position(|doc| id_of(doc) == Some(id)) else {
            return Ok(None);
        };

        let mut updated = docs[position].clone();
        for (field, value) in sanitize_patch(patch) {
            updated.insert(field, value);
        }
        updated.insert(UPDATED_AT_FIELD.to_string(), timestamp(Utc::now()));

        if let Some(field) = unique_violation(collection, docs, &updated) {
            return Err(StoreError::Duplicate(field));
        }

        docs[position] = updated.clone();
        Ok(Some(updated))
    }

    async fn find_by_id_and_delete(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<Document>, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(&collection) else {
            return Ok(None);
        };
        let position = docs.iter().position(|doc| id_of(doc) == Some(id));
        Ok(position.map(|position| docs.remove(position)))
    }

    async fn monthly_totals(
        &self,
        collection: Collection,
        since: DateTime<Utc>,
        measure: Measure,
    ) -> Result<Vec<MonthlyTotal>, StoreError> {
        let collections = self.collections.read().await;
        let mut groups: BTreeMap<u32, f64> = BTreeMap::new();

        for doc in collections.get(&collection).into_iter().flatten() {
            let Some(at) = created_at(doc).filter(|at| *at >= since) else {
                continue;
            };
            let amount = match &measure {
                Measure::Count => 1.0,
                Measure::Sum(field) => doc.get(field).and_then(Value::as_f64).unwrap_or(0.0),
            };
            *groups.entry(at.month()).or_insert(0.0) += amount;
        }

        Ok(groups
            .into_iter()
            .map(|(month, total)| MonthlyTotal { month, total })
            .collect())
    }
}
