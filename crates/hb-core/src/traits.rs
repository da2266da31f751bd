//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.
//! The document-store port is a capability contract: whichever backend is
//! configured must provide atomic unique-key creation and a
//! version-conditional replace. Everything above it is backend-agnostic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::Result;
use crate::models::LaundryStatus;

/// Collection names shared by every store implementation.
pub mod collections {
    pub const POSTS: &str = "posts";
    pub const COMMENTS: &str = "comments";
    pub const COUNTERS: &str = "counters";
    pub const LIKES: &str = "likes";
}

/// Opaque compare-and-swap token. Callers never inspect the contents;
/// they only hand it back on `replace`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionTag(pub String);

impl VersionTag {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A document plus the version it was read at.
#[derive(Debug, Clone)]
pub struct VersionedDoc {
    pub key: String,
    pub body: Value,
    pub version: VersionTag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    /// The unique key is already taken. Never an error: the counter fast
    /// path and the like ledger branch on it.
    AlreadyExists,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplaceOutcome {
    Replaced(VersionTag),
    /// The document changed since the version was read.
    VersionConflict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Keyset cursor: the `(created_at, key)` of the last item served.
/// The secondary key keeps pagination stable when timestamps collide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    pub created_at: DateTime<Utc>,
    pub key: String,
}

/// Equality filter on a top-level string field of the document body.
#[derive(Debug, Clone)]
pub struct FieldFilter {
    pub field: String,
    pub equals: String,
}

#[derive(Debug, Clone)]
pub struct PageQuery {
    pub partition: String,
    pub filter: Option<FieldFilter>,
    pub order: SortOrder,
    pub limit: usize,
    pub cursor: Option<PageCursor>,
}

/// Data persistence contract.
///
/// Every document body must carry a top-level `created_at` field (RFC 3339
/// string); stores use it, tie-broken by key, as the query sort key.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, partition: &str, key: &str)
        -> Result<Option<VersionedDoc>>;

    /// Atomic, unique-key-enforcing insert.
    async fn create(
        &self,
        collection: &str,
        partition: &str,
        key: &str,
        body: Value,
    ) -> Result<CreateOutcome>;

    /// Conditional write; succeeds only if `expected` is still current.
    async fn replace(
        &self,
        collection: &str,
        partition: &str,
        key: &str,
        body: Value,
        expected: &VersionTag,
    ) -> Result<ReplaceOutcome>;

    /// Keyset page query. Stores that cannot honor composite ordering
    /// report it via [`supports_keyset_ordering`](Self::supports_keyset_ordering)
    /// and may return an unordered window; the paginator compensates.
    async fn query(&self, collection: &str, query: PageQuery) -> Result<Vec<VersionedDoc>>;

    fn supports_keyset_ordering(&self) -> bool {
        true
    }
}

/// Shared-secret verification and like-identity derivation.
pub trait AuthProvider: Send + Sync {
    /// Gates the moderation endpoints.
    fn verify_admin_token(&self, token: &str) -> bool;

    /// Gates writes to the notice board.
    fn verify_notice_password(&self, password: &str) -> bool;

    /// Derives the like-ledger identity from a caller IP.
    fn like_identity(&self, ip: &str) -> String;
}

/// The laundry-room status upstream.
#[async_trait]
pub trait LaundryUpstream: Send + Sync {
    /// Fails with [`AppError::Unauthorized`](crate::error::AppError::Unauthorized)
    /// when `token` has expired; the caller refreshes once and retries.
    async fn fetch_status(&self, token: &str) -> Result<LaundryStatus>;

    async fn refresh_token(&self) -> Result<String>;
}
