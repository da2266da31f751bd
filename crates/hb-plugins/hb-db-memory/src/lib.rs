//! # hb-db-memory
//!
//! In-memory `DocumentStore` used by the tests and for local development.
//! Per-document version numbers back the conditional write; the DashMap
//! entry lock makes create and replace atomic per key, which is all the
//! contract asks of a backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use hb_core::{
    AppError, CreateOutcome, DocumentStore, PageQuery, ReplaceOutcome, Result, SortOrder,
    VersionTag, VersionedDoc,
};
use serde_json::Value;

type DocKey = (String, String, String);

struct StoredDoc {
    body: Value,
    version: u64,
}

pub struct MemoryDocumentStore {
    docs: DashMap<DocKey, StoredDoc>,
    keyset_ordering: bool,
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            docs: DashMap::new(),
            keyset_ordering: true,
        }
    }

    /// A store that pretends it has no composite ordering index: queries
    /// order by `created_at` alone, bound the window at the cursor
    /// timestamp inclusively, and leave ties unresolved. Exercises the
    /// paginator's over-fetch fallback.
    pub fn without_keyset_ordering() -> Self {
        Self {
            docs: DashMap::new(),
            keyset_ordering: false,
        }
    }
}

fn doc_key(collection: &str, partition: &str, key: &str) -> DocKey {
    (
        collection.to_string(),
        partition.to_string(),
        key.to_string(),
    )
}

fn created_at_of(key: &str, body: &Value) -> Result<DateTime<Utc>> {
    let raw = body
        .get("created_at")
        .and_then(|v| v.as_str())
        .ok_or_else(|| AppError::Internal(format!("document {key} missing created_at")))?;
    Ok(DateTime::parse_from_rfc3339(raw)
        .map_err(|e| AppError::Internal(format!("document {key} bad created_at: {e}")))?
        .with_timezone(&Utc))
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(
        &self,
        collection: &str,
        partition: &str,
        key: &str,
    ) -> Result<Option<VersionedDoc>> {
        Ok(self.docs.get(&doc_key(collection, partition, key)).map(|doc| {
            VersionedDoc {
                key: key.to_string(),
                body: doc.body.clone(),
                version: VersionTag(doc.version.to_string()),
            }
        }))
    }

    async fn create(
        &self,
        collection: &str,
        partition: &str,
        key: &str,
        body: Value,
    ) -> Result<CreateOutcome> {
        match self.docs.entry(doc_key(collection, partition, key)) {
            Entry::Occupied(_) => Ok(CreateOutcome::AlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(StoredDoc { body, version: 1 });
                Ok(CreateOutcome::Created)
            }
        }
    }

    async fn replace(
        &self,
        collection: &str,
        partition: &str,
        key: &str,
        body: Value,
        expected: &VersionTag,
    ) -> Result<ReplaceOutcome> {
        let mut doc = self
            .docs
            .get_mut(&doc_key(collection, partition, key))
            .ok_or_else(|| AppError::NotFound(collection.to_string(), key.to_string()))?;

        if doc.version.to_string() != expected.as_str() {
            return Ok(ReplaceOutcome::VersionConflict);
        }
        doc.body = body;
        doc.version += 1;
        Ok(ReplaceOutcome::Replaced(VersionTag(doc.version.to_string())))
    }

    async fn query(&self, collection: &str, query: PageQuery) -> Result<Vec<VersionedDoc>> {
        let mut matches = Vec::new();
        for entry in self.docs.iter() {
            let (coll, partition, key) = entry.key();
            if coll != collection || *partition != query.partition {
                continue;
            }
            if let Some(filter) = &query.filter {
                let field = entry
                    .value()
                    .body
                    .get(filter.field.as_str())
                    .and_then(|v| v.as_str());
                if field != Some(filter.equals.as_str()) {
                    continue;
                }
            }
            matches.push(VersionedDoc {
                key: key.clone(),
                body: entry.value().body.clone(),
                version: VersionTag(entry.value().version.to_string()),
            });
        }

        if !self.keyset_ordering {
            // Single-key index only: the cursor bound must be inclusive,
            // otherwise items sharing the cursor timestamp would never be
            // served. The paginator applies the strict composite predicate
            // on top of this window.
            let mut keyed = Vec::with_capacity(matches.len());
            for doc in matches {
                let created_at = created_at_of(&doc.key, &doc.body)?;
                keyed.push((created_at, doc));
            }
            if let Some(cursor) = &query.cursor {
                keyed.retain(|(ts, _)| match query.order {
                    SortOrder::Ascending => *ts >= cursor.created_at,
                    SortOrder::Descending => *ts <= cursor.created_at,
                });
            }
            keyed.sort_by(|a, b| match query.order {
                SortOrder::Ascending => a.0.cmp(&b.0),
                SortOrder::Descending => b.0.cmp(&a.0),
            });
            keyed.truncate(query.limit);
            return Ok(keyed.into_iter().map(|(_, doc)| doc).collect());
        }

        let mut keyed = Vec::with_capacity(matches.len());
        for doc in matches {
            let created_at = created_at_of(&doc.key, &doc.body)?;
            keyed.push(((created_at, doc.key.clone()), doc));
        }
        if let Some(cursor) = &query.cursor {
            let cursor = (cursor.created_at, cursor.key.clone());
            keyed.retain(|(key, _)| match query.order {
                SortOrder::Ascending => *key > cursor,
                SortOrder::Descending => *key < cursor,
            });
        }
        keyed.sort_by(|a, b| match query.order {
            SortOrder::Ascending => a.0.cmp(&b.0),
            SortOrder::Descending => b.0.cmp(&a.0),
        });
        keyed.truncate(query.limit);

        Ok(keyed.into_iter().map(|(_, doc)| doc).collect())
    }

    fn supports_keyset_ordering(&self) -> bool {
        self.keyset_ordering
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hb_core::PageCursor;
    use serde_json::json;

    fn body(ts: &str) -> Value {
        json!({"created_at": ts, "moderation": "accepted"})
    }

    #[tokio::test]
    async fn test_create_is_first_writer_wins() {
        let store = MemoryDocumentStore::new();
        let first = store
            .create("posts", "b", "1", body("2026-01-01T00:00:00Z"))
            .await
            .unwrap();
        let second = store
            .create("posts", "b", "1", body("2026-01-02T00:00:00Z"))
            .await
            .unwrap();
        assert_eq!(first, CreateOutcome::Created);
        assert_eq!(second, CreateOutcome::AlreadyExists);
    }

    #[tokio::test]
    async fn test_replace_detects_stale_version() {
        let store = MemoryDocumentStore::new();
        store
            .create("posts", "b", "1", body("2026-01-01T00:00:00Z"))
            .await
            .unwrap();
        let doc = store.get("posts", "b", "1").await.unwrap().unwrap();

        let ok = store
            .replace("posts", "b", "1", body("2026-01-01T00:00:00Z"), &doc.version)
            .await
            .unwrap();
        assert!(matches!(ok, ReplaceOutcome::Replaced(_)));

        // The tag we read is stale now.
        let stale = store
            .replace("posts", "b", "1", body("2026-01-01T00:00:00Z"), &doc.version)
            .await
            .unwrap();
        assert_eq!(stale, ReplaceOutcome::VersionConflict);
    }

    #[tokio::test]
    async fn test_query_orders_and_honors_cursor() {
        let store = MemoryDocumentStore::new();
        for (key, ts) in [
            ("1", "2026-01-01T00:00:01Z"),
            ("2", "2026-01-01T00:00:02Z"),
            ("3", "2026-01-01T00:00:03Z"),
        ] {
            store.create("posts", "b", key, body(ts)).await.unwrap();
        }

        let page = store
            .query(
                "posts",
                PageQuery {
                    partition: "b".to_string(),
                    filter: None,
                    order: SortOrder::Descending,
                    limit: 2,
                    cursor: None,
                },
            )
            .await
            .unwrap();
        let keys: Vec<_> = page.iter().map(|d| d.key.as_str()).collect();
        assert_eq!(keys, vec!["3", "2"]);

        let last = &page[1];
        let rest = store
            .query(
                "posts",
                PageQuery {
                    partition: "b".to_string(),
                    filter: None,
                    order: SortOrder::Descending,
                    limit: 2,
                    cursor: Some(PageCursor {
                        created_at: created_at_of(&last.key, &last.body).unwrap(),
                        key: last.key.clone(),
                    }),
                },
            )
            .await
            .unwrap();
        let keys: Vec<_> = rest.iter().map(|d| d.key.as_str()).collect();
        assert_eq!(keys, vec!["1"]);
    }

    #[tokio::test]
    async fn test_field_filter_matches_strings() {
        let store = MemoryDocumentStore::new();
        store
            .create(
                "posts",
                "b",
                "1",
                json!({"created_at": "2026-01-01T00:00:00Z", "moderation": "pending"}),
            )
            .await
            .unwrap();
        store
            .create("posts", "b", "2", body("2026-01-01T00:00:01Z"))
            .await
            .unwrap();

        let page = store
            .query(
                "posts",
                PageQuery {
                    partition: "b".to_string(),
                    filter: Some(hb_core::FieldFilter {
                        field: "moderation".to_string(),
                        equals: "accepted".to_string(),
                    }),
                    order: SortOrder::Ascending,
                    limit: 10,
                    cursor: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].key, "2");
    }
}
