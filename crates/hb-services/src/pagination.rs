//! Keyset pagination over the document store.
//!
//! The cursor carries the `(created_at, key)` of the last item served, so a
//! walk never skips or repeats an item even when timestamps collide or rows
//! are inserted mid-walk. Offset paging would do both under this write
//! pattern. Stores that cannot order by the composite key get an over-fetch
//! window that is ordered and sliced here instead.

use chrono::{DateTime, Utc};
use hb_core::{
    AppError, DocumentStore, FieldFilter, PageCursor, PageQuery, Result, SortOrder, VersionedDoc,
};
use serde::de::DeserializeOwned;

/// Window multiplier for stores without composite ordering.
pub const OVERFETCH_FACTOR: usize = 3;

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Cursor for the following page; `None` means this page was empty.
    pub next_cursor: Option<PageCursor>,
}

pub async fn list_page<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &str,
    partition: &str,
    filter: Option<FieldFilter>,
    order: SortOrder,
    limit: usize,
    cursor: Option<PageCursor>,
) -> Result<Page<T>> {
    let docs = if store.supports_keyset_ordering() {
        store
            .query(
                collection,
                PageQuery {
                    partition: partition.to_string(),
                    filter,
                    order,
                    limit,
                    cursor: cursor.clone(),
                },
            )
            .await?
    } else {
        let window = store
            .query(
                collection,
                PageQuery {
                    partition: partition.to_string(),
                    filter,
                    order,
                    limit: limit.saturating_mul(OVERFETCH_FACTOR),
                    cursor: cursor.clone(),
                },
            )
            .await?;
        order_and_slice(window, order, limit, cursor.as_ref())?
    };

    let next_cursor = match docs.last() {
        Some(last) => {
            let (created_at, key) = sort_key(last)?;
            Some(PageCursor { created_at, key })
        }
        None => None,
    };

    let items = docs
        .into_iter()
        .map(|doc| serde_json::from_value(doc.body).map_err(AppError::from))
        .collect::<Result<Vec<T>>>()?;

    Ok(Page { items, next_cursor })
}

/// Fallback path: the store returned a window ordered by `created_at`
/// alone, bounded inclusively at the cursor timestamp; apply the strict
/// composite predicate, composite ordering, and the slice here. Produces
/// the same ordering as the indexed path provided the items tied on the
/// cursor timestamp fit inside the window.
fn order_and_slice(
    window: Vec<VersionedDoc>,
    order: SortOrder,
    limit: usize,
    cursor: Option<&PageCursor>,
) -> Result<Vec<VersionedDoc>> {
    let mut keyed = Vec::with_capacity(window.len());
    for doc in window {
        let key = sort_key(&doc)?;
        if let Some(cursor) = cursor {
            if !strictly_after(&key, cursor, order) {
                continue;
            }
        }
        keyed.push((key, doc));
    }

    keyed.sort_by(|a, b| match order {
        SortOrder::Ascending => a.0.cmp(&b.0),
        SortOrder::Descending => b.0.cmp(&a.0),
    });
    keyed.truncate(limit);

    Ok(keyed.into_iter().map(|(_, doc)| doc).collect())
}

fn sort_key(doc: &VersionedDoc) -> Result<(DateTime<Utc>, String)> {
    let raw = doc
        .body
        .get("created_at")
        .and_then(|v| v.as_str())
        .ok_or_else(|| AppError::Internal(format!("document {} missing created_at", doc.key)))?;
    let created_at = DateTime::parse_from_rfc3339(raw)
        .map_err(|e| AppError::Internal(format!("document {} bad created_at: {e}", doc.key)))?
        .with_timezone(&Utc);
    Ok((created_at, doc.key.clone()))
}

fn strictly_after(
    key: &(DateTime<Utc>, String),
    cursor: &PageCursor,
    order: SortOrder,
) -> bool {
    let key = (key.0, key.1.as_str());
    let cursor = (cursor.created_at, cursor.key.as_str());
    match order {
        SortOrder::Ascending => key > cursor,
        SortOrder::Descending => key < cursor,
    }
}
