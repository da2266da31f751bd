//! Shared fixtures for the service tests: seeding helpers and a store
//! wrapper that injects version conflicts to exercise the CAS retry paths.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use hb_core::collections::POSTS;
use hb_core::{
    CreateOutcome, DocumentStore, PageQuery, Post, ReplaceOutcome, Result, VersionTag,
    VersionedDoc,
};
use hb_db_memory::MemoryDocumentStore;
use serde_json::Value;

pub(crate) async fn store_post(store: &dyn DocumentStore, post: &Post) {
    store
        .create(
            POSTS,
            &post.board_id,
            &post.post_id,
            serde_json::to_value(post).unwrap(),
        )
        .await
        .unwrap();
}

/// Delegates to a real memory store but reports `VersionConflict` for the
/// first `conflicts` replace calls (or forever, with [`Self::always`]).
pub(crate) struct ConflictInjectingStore {
    inner: Arc<MemoryDocumentStore>,
    remaining: AtomicU32,
}

impl ConflictInjectingStore {
    pub(crate) fn new(inner: Arc<MemoryDocumentStore>, conflicts: u32) -> Self {
        Self {
            inner,
            remaining: AtomicU32::new(conflicts),
        }
    }

    pub(crate) fn always(inner: Arc<MemoryDocumentStore>) -> Self {
        Self::new(inner, u32::MAX)
    }
}

#[async_trait]
impl DocumentStore for ConflictInjectingStore {
    async fn get(
        &self,
        collection: &str,
        partition: &str,
        key: &str,
    ) -> Result<Option<VersionedDoc>> {
        self.inner.get(collection, partition, key).await
    }

    async fn create(
        &self,
        collection: &str,
        partition: &str,
        key: &str,
        body: Value,
    ) -> Result<CreateOutcome> {
        self.inner.create(collection, partition, key, body).await
    }

    async fn replace(
        &self,
        collection: &str,
        partition: &str,
        key: &str,
        body: Value,
        expected: &VersionTag,
    ) -> Result<ReplaceOutcome> {
        let mut current = self.remaining.load(Ordering::SeqCst);
        while current > 0 {
            match self.remaining.compare_exchange(
                current,
                current.saturating_sub(1),
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return Ok(ReplaceOutcome::VersionConflict),
                Err(observed) => current = observed,
            }
        }
        self.inner
            .replace(collection, partition, key, body, expected)
            .await
    }

    async fn query(&self, collection: &str, query: PageQuery) -> Result<Vec<VersionedDoc>> {
        self.inner.query(collection, query).await
    }

    fn supports_keyset_ordering(&self) -> bool {
        self.inner.supports_keyset_ordering()
    }
}
