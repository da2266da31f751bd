//! Optimistic-concurrency retry loop shared by the counter service and the
//! like ledger: read a document with its version tag, mutate, and write back
//! conditionally, retrying on conflict until a fixed budget runs out.
//! In-process locks would not work here since multiple server instances may
//! run against the same store.

use hb_core::{AppError, DocumentStore, ReplaceOutcome, Result};
use serde_json::Value;

/// Fixed attempt budget; exceeding it fails explicitly rather than spinning.
pub const MAX_CAS_ATTEMPTS: u32 = 5;

/// Reads `collection/partition/key`, applies `mutate` to the body, and
/// writes it back with a compare-and-swap on the version tag. Returns the
/// body that won. Fails with [`AppError::ConcurrencyExhausted`] after
/// [`MAX_CAS_ATTEMPTS`] conflicts.
pub async fn update_with_cas<F>(
    store: &dyn DocumentStore,
    collection: &str,
    partition: &str,
    key: &str,
    mut mutate: F,
) -> Result<Value>
where
    F: FnMut(Value) -> Result<Value>,
{
    for attempt in 1..=MAX_CAS_ATTEMPTS {
        let doc = store
            .get(collection, partition, key)
            .await?
            .ok_or_else(|| AppError::NotFound(collection.to_string(), key.to_string()))?;

        let next = mutate(doc.body)?;

        match store
            .replace(collection, partition, key, next.clone(), &doc.version)
            .await?
        {
            ReplaceOutcome::Replaced(_) => return Ok(next),
            ReplaceOutcome::VersionConflict => {
                log::debug!("CAS conflict on {collection}/{key}, attempt {attempt}/{MAX_CAS_ATTEMPTS}");
            }
        }
    }

    Err(AppError::ConcurrencyExhausted(format!(
        "gave up on {collection}/{key} after {MAX_CAS_ATTEMPTS} attempts"
    )))
}
