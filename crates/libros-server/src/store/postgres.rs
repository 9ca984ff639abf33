use async_trait::async_trait;
use libros_common::types::Record;
use sqlx::{
    postgres::{PgPool, PgPoolOptions},
    types::Json,
};
use std::time::Duration;
use tracing::{debug, info, instrument};

use super::{DocumentQuery, DocumentSnapshot, DocumentStore, StoreResult, WriteBatch};
use crate::config::DatabaseConfig;

/// Document store on PostgreSQL: one `documents` row per document, data as JSONB.
///
/// All comparisons use `COLLATE "C"` so ordering is plain byte order, matching
/// [`super::MemoryDocumentStore`].
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
    max_batch_ops: usize,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool, max_batch_ops: usize) -> Self {
        Self {
            pool,
            max_batch_ops,
        }
    }

    /// Open a connection pool with the configured limits.
    pub async fn connect(config: &DatabaseConfig, max_batch_ops: usize) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .connect(&config.url)
            .await?;

        info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "Database connection pool created"
        );

        Ok(Self::new(pool, max_batch_ops))
    }

    /// Apply pending schema migrations.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn into_snapshots(rows: Vec<(String, Json<Record>)>) -> Vec<DocumentSnapshot> {
    rows.into_iter()
        .map(|(id, Json(data))| DocumentSnapshot::new(id, data))
        .collect()
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    fn max_batch_ops(&self) -> usize {
        self.max_batch_ops
    }

    #[instrument(skip(self, batch), fields(ops = batch.len()))]
    async fn commit(&self, batch: WriteBatch) -> StoreResult<usize> {
        let count = batch.len();
        let mut tx = self.pool.begin().await?;

        for op in batch.into_operations() {
            sqlx::query(
                r#"
                INSERT INTO documents (collection, id, data)
                VALUES ($1, $2, $3)
                ON CONFLICT (collection, id)
                DO UPDATE SET data = EXCLUDED.data, updated_at = now()
                "#,
            )
            .bind(&op.collection)
            .bind(&op.id)
            .bind(Json(&op.data))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!(count, "Write batch committed");

        Ok(count)
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<DocumentSnapshot>> {
        let row: Option<(String, Json<Record>)> =
            sqlx::query_as("SELECT id, data FROM documents WHERE collection = $1 AND id = $2")
                .bind(collection)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(id, Json(data))| DocumentSnapshot::new(id, data)))
    }

    async fn list_collections(&self) -> StoreResult<Vec<String>> {
        let names: Vec<String> = sqlx::query_scalar(
            r#"SELECT DISTINCT collection FROM documents ORDER BY collection COLLATE "C""#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(names)
    }

    #[instrument(skip(self), fields(collection = %query.collection))]
    async fn query(&self, query: &DocumentQuery) -> StoreResult<Vec<DocumentSnapshot>> {
        let cursor = query.cursor_key()?;
        let limit = sql_limit(query.limit);

        let rows: Vec<(String, Json<Record>)> = match &query.range {
            None => {
                sqlx::query_as(
                    r#"
                    SELECT id, data FROM documents
                    WHERE collection = $1
                      AND ($2::text IS NULL OR id COLLATE "C" > $2)
                    ORDER BY id COLLATE "C"
                    LIMIT $3
                    "#,
                )
                .bind(&query.collection)
                .bind(cursor.map(|(_, id)| id))
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            },
            Some(range) => {
                let (cursor_value, cursor_id) = match cursor {
                    Some((value, id)) => (Some(value), Some(id)),
                    None => (None, None),
                };

                sqlx::query_as(
                    r#"
                    SELECT id, data FROM documents
                    WHERE collection = $1
                      AND jsonb_typeof(data -> $2) = 'string'
                      AND (data ->> $2) COLLATE "C" >= $3
                      AND (data ->> $2) COLLATE "C" <= $4
                      AND ($5::text IS NULL
                           OR (data ->> $2) COLLATE "C" > $5
                           OR ((data ->> $2) = $5 AND id COLLATE "C" > $6::text))
                    ORDER BY (data ->> $2) COLLATE "C", id COLLATE "C"
                    LIMIT $7
                    "#,
                )
                .bind(&query.collection)
                .bind(&range.field)
                .bind(&range.lower)
                .bind(&range.upper)
                .bind(cursor_value)
                .bind(cursor_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            },
        };

        Ok(into_snapshots(rows))
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
