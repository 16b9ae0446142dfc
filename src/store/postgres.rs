use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use sqlx::{PgPool, Postgres, query_builder::QueryBuilder, types::Json};
use uuid::Uuid;

use super::{
    CREATED_AT_FIELD, Collection, Condition, Direction, Document, Filter, FindQuery, ID_FIELD,
    Measure, MonthlyTotal, RecordStore, StoreError, UPDATED_AT_FIELD, sanitize_patch, timestamp,
};

/// Schema statements applied by `ensure_schema`. Every statement is idempotent.
const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS records (
        collection TEXT NOT NULL,
        id TEXT NOT NULL,
        body JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        PRIMARY KEY (collection, id)
    )"#,
    r#"CREATE UNIQUE INDEX IF NOT EXISTS records_accounts_username
        ON records ((body->>'username')) WHERE collection = 'accounts'"#,
    r#"CREATE UNIQUE INDEX IF NOT EXISTS records_accounts_email
        ON records ((body->>'email')) WHERE collection = 'accounts'"#,
    r#"CREATE UNIQUE INDEX IF NOT EXISTS records_products_title
        ON records ((body->>'title')) WHERE collection = 'products'"#,
    r#"CREATE INDEX IF NOT EXISTS records_created_at
        ON records (collection, created_at)"#,
];

/// PostgresRecordStore
///
/// `RecordStore` backed by PostgreSQL. All collections share one `records` table and
/// keep their documents as JSONB; uniqueness is enforced by partial unique indexes.
pub struct PostgresRecordStore {
    pool: PgPool,
}

impl PostgresRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// ensure_schema
    ///
    /// Creates the `records` table and its indexes when missing. Safe to call at startup.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

/// Maps a unique-index violation onto `StoreError::Duplicate`.
fn map_write_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            let field = db_err
                .constraint()
                .and_then(|name| name.rsplit('_').next())
                .unwrap_or("unknown")
                .to_string();
            return StoreError::Duplicate(field);
        }
    }
    err.into()
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &Filter) {
    for condition in filter.conditions() {
        match condition {
            Condition::Eq(field, value) => {
                builder.push(" AND body -> ");
                builder.push_bind(field.clone());
                builder.push(" = ");
                builder.push_bind(Json(value.clone()));
            }
            Condition::Contains(field, value) => {
                builder.push(" AND body -> ");
                builder.push_bind(field.clone());
                builder.push(" @> ");
                builder.push_bind(Json(json!([value])));
            }
        }
    }
}

#[async_trait]
impl RecordStore for PostgresRecordStore {
    async fn create(
        &self,
        collection: Collection,
        mut doc: Document,
    ) -> Result<Document, StoreError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        doc.insert(ID_FIELD.to_string(), Value::String(id.clone()));
        doc.insert(CREATED_AT_FIELD.to_string(), timestamp(now));
        doc.insert(UPDATED_AT_FIELD.to_string(), timestamp(now));

        sqlx::query("INSERT INTO records (collection, id, body, created_at) VALUES ($1, $2, $3, $4)")
            .bind(collection.name())
            .bind(&id)
            .bind(Json(&doc))
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(map_write_error)?;

        Ok(doc)
    }

    async fn find_by_id(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query_scalar::<_, Json<Document>>(
            "SELECT body FROM records WHERE collection = $1 AND id = $2",
        )
        .bind(collection.name())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|Json(doc)| doc))
    }

    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError> {
        let query = FindQuery {
            filter: filter.clone(),
            sort: None,
            limit: Some(1),
        };
        Ok(self.find(collection, &query).await?.into_iter().next())
    }

    /// find
    ///
    /// Builds the lookup with `QueryBuilder` so every field name and value is bound,
    /// never interpolated.
    async fn find(
        &self,
        collection: Collection,
        query: &FindQuery,
    ) -> Result<Vec<Document>, StoreError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT body FROM records WHERE collection = ");
        builder.push_bind(collection.name());
        push_filter(&mut builder, &query.filter);

        match &query.sort {
            Some(sort) => {
                builder.push(" ORDER BY body -> ");
                builder.push_bind(sort.field.clone());
                builder.push(match sort.direction {
                    Direction::Ascending => " ASC",
                    Direction::Descending => " DESC",
                });
            }
            None => {
                builder.push(" ORDER BY created_at ASC");
            }
        }

        if let Some(limit) = query.limit {
            builder.push(" LIMIT ");
            builder.push_bind(limit as i64);
        }

        let rows = builder
            .build_query_scalar::<Json<Document>>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|Json(doc)| doc).collect())
    }

    async fn find_by_id_and_update(
        &self,
        collection: Collection,
        id: &str,
        patch: Document,
    ) -> Result<Option<Document>, StoreError> {
        let mut patch = sanitize_patch(patch);
        patch.insert(UPDATED_AT_FIELD.to_string(), timestamp(Utc::now()));

        let row = sqlx::query_scalar::<_, Json<Document>>(
            "UPDATE records SET body = body || $3 WHERE collection = $1 AND id = $2 RETURNING body",
        )
        .bind(collection.name())
        .bind(id)
        .bind(Json(&patch))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(row.map(|Json(doc)| doc))
    }

    async fn find_by_id_and_delete(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query_scalar::<_, Json<Document>>(
            "DELETE FROM records WHERE collection = $1 AND id = $2 RETURNING body",
        )
        .bind(collection.name())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|Json(doc)| doc))
    }

    async fn monthly_totals(
        &self,
        collection: Collection,
        since: DateTime<Utc>,
        measure: Measure,
    ) -> Result<Vec<MonthlyTotal>, StoreError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT EXTRACT(MONTH FROM created_at)::INT4 AS month, ");
        match &measure {
            Measure::Count => {
                builder.push("COUNT(*)::FLOAT8");
            }
            Measure::Sum(field) => {
                builder.push("COALESCE(SUM((body ->> ");
                builder.push_bind(field.clone());
                builder.push(")::FLOAT8), 0)::FLOAT8");
            }
        }
        builder.push(" AS total FROM records WHERE collection = ");
        builder.push_bind(collection.name());
        builder.push(" AND created_at >= ");
        builder.push_bind(since);
        builder.push(" GROUP BY month ORDER BY month");

        let rows = builder
            .build_query_as::<(i32, f64)>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(month, total)| MonthlyTotal {
                month: month.max(0) as u32,
                total,
            })
            .collect())
    }
}
