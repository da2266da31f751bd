//! # hb-db-sqlite
//!
//! SQLite-backed `DocumentStore`. Documents live in a single table keyed by
//! `(collection, partition_key, doc_key)` with an integer version column;
//! the conditional write is an `UPDATE ... WHERE version = ?`, which SQLite
//! applies atomically. `created_at` is denormalized out of the JSON body
//! into an indexed column so keyset queries stay on the composite index.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use hb_core::{
    AppError, CreateOutcome, DocumentStore, PageQuery, ReplaceOutcome, Result, SortOrder,
    VersionTag, VersionedDoc,
};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;

const CREATE_TABLE: &str = "
CREATE TABLE IF NOT EXISTS documents (
    collection    TEXT NOT NULL,
    partition_key TEXT NOT NULL,
    doc_key       TEXT NOT NULL,
    body          TEXT NOT NULL,
    version       INTEGER NOT NULL,
    created_at    TEXT NOT NULL,
    PRIMARY KEY (collection, partition_key, doc_key)
)";

const CREATE_ORDER_INDEX: &str = "
CREATE INDEX IF NOT EXISTS idx_documents_order
    ON documents (collection, partition_key, created_at, doc_key)";

pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        // In-memory databases are per-connection; a second pooled
        // connection would see an empty schema.
        let max_connections = if url.contains(":memory:") { 1 } else { 8 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        sqlx::query(CREATE_ORDER_INDEX).execute(&pool).await?;
        log::info!("sqlite document store ready at {url}");
        Ok(Self { pool })
    }
}

fn internal(err: sqlx::Error) -> AppError {
    AppError::Internal(format!("sqlite: {err}"))
}

/// Fixed-width UTC so lexicographic TEXT comparison matches chronological
/// order.
fn normalize_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn created_at_column(key: &str, body: &serde_json::Value) -> Result<String> {
    let raw = body
        .get("created_at")
        .and_then(|v| v.as_str())
        .ok_or_else(|| AppError::Internal(format!("document {key} missing created_at")))?;
    let parsed = DateTime::parse_from_rfc3339(raw)
        .map_err(|e| AppError::Internal(format!("document {key} bad created_at: {e}")))?;
    Ok(normalize_ts(parsed.with_timezone(&Utc)))
}

fn parse_version(tag: &VersionTag) -> Result<i64> {
    tag.as_str()
        .parse()
        .map_err(|_| AppError::Internal(format!("malformed version tag {:?}", tag.as_str())))
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn get(
        &self,
        collection: &str,
        partition: &str,
        key: &str,
    ) -> Result<Option<VersionedDoc>> {
        let row = sqlx::query(
            "SELECT body, version FROM documents
             WHERE collection = ? AND partition_key = ? AND doc_key = ?",
        )
        .bind(collection)
        .bind(partition)
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(internal)?;

        match row {
            Some(row) => {
                let body = serde_json::from_str(&row.get::<String, _>("body"))?;
                Ok(Some(VersionedDoc {
                    key: key.to_string(),
                    body,
                    version: VersionTag(row.get::<i64, _>("version").to_string()),
                }))
            }
            None => Ok(None),
        }
    }

    async fn create(
        &self,
        collection: &str,
        partition: &str,
        key: &str,
        body: serde_json::Value,
    ) -> Result<CreateOutcome> {
        let created_at = created_at_column(key, &body)?;
        let result = sqlx::query(
            "INSERT INTO documents (collection, partition_key, doc_key, body, version, created_at)
             VALUES (?, ?, ?, ?, 1, ?)",
        )
        .bind(collection)
        .bind(partition)
        .bind(key)
        .bind(body.to_string())
        .bind(created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(CreateOutcome::Created),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Ok(CreateOutcome::AlreadyExists)
            }
            Err(e) => Err(internal(e)),
        }
    }

    async fn replace(
        &self,
        collection: &str,
        partition: &str,
        key: &str,
        body: serde_json::Value,
        expected: &VersionTag,
    ) -> Result<ReplaceOutcome> {
        let expected_version = parse_version(expected)?;
        let result = sqlx::query(
            "UPDATE documents SET body = ?, version = version + 1
             WHERE collection = ? AND partition_key = ? AND doc_key = ? AND version = ?",
        )
        .bind(body.to_string())
        .bind(collection)
        .bind(partition)
        .bind(key)
        .bind(expected_version)
        .execute(&self.pool)
        .await
        .map_err(internal)?;

        if result.rows_affected() == 1 {
            return Ok(ReplaceOutcome::Replaced(VersionTag(
                (expected_version + 1).to_string(),
            )));
        }

        // Distinguish a stale tag from a missing row.
        let exists = sqlx::query(
            "SELECT 1 FROM documents
             WHERE collection = ? AND partition_key = ? AND doc_key = ?",
        )
        .bind(collection)
        .bind(partition)
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(internal)?;

        if exists.is_some() {
            Ok(ReplaceOutcome::VersionConflict)
        } else {
            Err(AppError::NotFound(collection.to_string(), key.to_string()))
        }
    }

    async fn query(&self, collection: &str, query: PageQuery) -> Result<Vec<VersionedDoc>> {
        let mut sql = String::from(
            "SELECT doc_key, body, version FROM documents
             WHERE collection = ? AND partition_key = ?",
        );
        if query.filter.is_some() {
            sql.push_str(" AND json_extract(body, ?) = ?");
        }
        if query.cursor.is_some() {
            sql.push_str(match query.order {
                SortOrder::Ascending => {
                    " AND (created_at > ? OR (created_at = ? AND doc_key > ?))"
                }
                SortOrder::Descending => {
                    " AND (created_at < ? OR (created_at = ? AND doc_key < ?))"
                }
            });
        }
        sql.push_str(match query.order {
            SortOrder::Ascending => " ORDER BY created_at ASC, doc_key ASC LIMIT ?",
            SortOrder::Descending => " ORDER BY created_at DESC, doc_key DESC LIMIT ?",
        });

        let mut q = sqlx::query(&sql).bind(collection).bind(&query.partition);
        if let Some(filter) = &query.filter {
            q = q.bind(format!("$.{}", filter.field)).bind(&filter.equals);
        }
        if let Some(cursor) = &query.cursor {
            let ts = normalize_ts(cursor.created_at);
            q = q.bind(ts.clone()).bind(ts).bind(&cursor.key);
        }
        q = q.bind(query.limit as i64);

        let rows = q.fetch_all(&self.pool).await.map_err(internal)?;
        rows.into_iter()
            .map(|row| {
                let body = serde_json::from_str(&row.get::<String, _>("body"))?;
                Ok(VersionedDoc {
                    key: row.get("doc_key"),
                    body,
                    version: VersionTag(row.get::<i64, _>("version").to_string()),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hb_core::PageCursor;
    use serde_json::json;

    async fn store() -> SqliteDocumentStore {
        SqliteDocumentStore::new("sqlite::memory:").await.unwrap()
    }

    fn body(ts: &str, state: &str) -> serde_json::Value {
        json!({"created_at": ts, "moderation": state})
    }

    #[tokio::test]
    async fn test_create_get_roundtrip_and_uniqueness() {
        let store = store().await;

        let first = store
            .create("posts", "general", "1", body("2026-02-01T09:00:00Z", "accepted"))
            .await
            .unwrap();
        assert_eq!(first, CreateOutcome::Created);

        let dup = store
            .create("posts", "general", "1", body("2026-02-01T09:00:01Z", "accepted"))
            .await
            .unwrap();
        assert_eq!(dup, CreateOutcome::AlreadyExists);

        let doc = store.get("posts", "general", "1").await.unwrap().unwrap();
        assert_eq!(doc.body["moderation"], "accepted");
        assert_eq!(doc.version.as_str(), "1");
    }

    #[tokio::test]
    async fn test_conditional_replace() {
        let store = store().await;
        store
            .create("counters", "general", "general", body("2026-02-01T09:00:00Z", "accepted"))
            .await
            .unwrap();
        let doc = store.get("counters", "general", "general").await.unwrap().unwrap();

        let ok = store
            .replace(
                "counters",
                "general",
                "general",
                body("2026-02-01T09:00:00Z", "accepted"),
                &doc.version,
            )
            .await
            .unwrap();
        assert_eq!(ok, ReplaceOutcome::Replaced(VersionTag("2".to_string())));

        let stale = store
            .replace(
                "counters",
                "general",
                "general",
                body("2026-02-01T09:00:00Z", "accepted"),
                &doc.version,
            )
            .await
            .unwrap();
        assert_eq!(stale, ReplaceOutcome::VersionConflict);

        let missing = store
            .replace(
                "counters",
                "general",
                "gone",
                body("2026-02-01T09:00:00Z", "accepted"),
                &doc.version,
            )
            .await
            .unwrap_err();
        assert!(matches!(missing, AppError::NotFound(..)));
    }

    #[tokio::test]
    async fn test_keyset_query_with_filter_and_tiebreak() {
        let store = store().await;
        // Two documents share a timestamp; doc_key breaks the tie.
        for (key, ts, state) in [
            ("a", "2026-02-01T09:00:00Z", "accepted"),
            ("b", "2026-02-01T09:00:00Z", "accepted"),
            ("c", "2026-02-01T09:00:05Z", "pending"),
            ("d", "2026-02-01T09:00:09Z", "accepted"),
        ] {
            store.create("posts", "general", key, body(ts, state)).await.unwrap();
        }

        let filter = Some(hb_core::FieldFilter {
            field: "moderation".to_string(),
            equals: "accepted".to_string(),
        });

        let page = store
            .query(
                "posts",
                PageQuery {
                    partition: "general".to_string(),
                    filter: filter.clone(),
                    order: SortOrder::Descending,
                    limit: 2,
                    cursor: None,
                },
            )
            .await
            .unwrap();
        let keys: Vec<_> = page.iter().map(|d| d.key.as_str()).collect();
        assert_eq!(keys, vec!["d", "b"]);

        let rest = store
            .query(
                "posts",
                PageQuery {
                    partition: "general".to_string(),
                    filter,
                    order: SortOrder::Descending,
                    limit: 2,
                    cursor: Some(PageCursor {
                        created_at: "2026-02-01T09:00:00Z".parse().unwrap(),
                        key: "b".to_string(),
                    }),
                },
            )
            .await
            .unwrap();
        let keys: Vec<_> = rest.iter().map(|d| d.key.as_str()).collect();
        assert_eq!(keys, vec!["a"]);
    }
}
