//! # Domain Models
//!
//! These structs represent the core entities of Hallboard.
//! Posts carry per-board sequential string IDs issued by the counter
//! service; comments use UUID v4.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The trusted-author board: caller-supplied post IDs, password-gated
/// writes, content visible without moderation.
pub const NOTICE_BOARD: &str = "notice";

/// Moderation classification gating public visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationState {
    Pending,
    Accepted,
    Rejected,
}

impl ModerationState {
    /// Legal transitions. `Pending` is an initial state only; nothing
    /// returns to it.
    pub fn can_transition_to(self, target: ModerationState) -> bool {
        use ModerationState::*;
        matches!(
            (self, target),
            (Pending, Accepted) | (Pending, Rejected) | (Rejected, Accepted) | (Accepted, Rejected)
        )
    }

    pub fn is_public(self) -> bool {
        matches!(self, ModerationState::Accepted)
    }
}

/// A bulletin-board post. Boards are just string partitions; there is no
/// stored Board entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub post_id: String,
    pub board_id: String,
    pub title: String,
    pub content: String,
    pub user_id: String,
    /// Sole sort key for pagination; ties are broken by `post_id`.
    pub created_at: DateTime<Utc>,
    pub tag: Option<String>,
    pub moderation: ModerationState,
    /// Set on rejection, cleared again on re-acceptance.
    pub rejected_at: Option<DateTime<Utc>>,
    /// Denormalized like count; authoritative data is the like ledger.
    pub likes: u64,
    pub ip: String,
}

impl Post {
    pub fn new(
        board_id: String,
        post_id: String,
        title: String,
        content: String,
        user_id: String,
        tag: Option<String>,
        ip: String,
    ) -> Self {
        let moderation = if board_id == NOTICE_BOARD {
            ModerationState::Accepted
        } else {
            ModerationState::Pending
        };
        Self {
            post_id,
            board_id,
            title,
            content,
            user_id,
            created_at: Utc::now(),
            tag,
            moderation,
            rejected_at: None,
            likes: 0,
            ip,
        }
    }
}

/// A comment under a post. Partitioned by its owning post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub comment_id: Uuid,
    pub post_id: String,
    pub board_id: String,
    pub content: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub moderation: ModerationState,
    pub rejected_at: Option<DateTime<Utc>>,
    pub ip: String,
}

impl Comment {
    pub fn new(
        board_id: String,
        post_id: String,
        content: String,
        user_id: String,
        ip: String,
    ) -> Self {
        let moderation = if board_id == NOTICE_BOARD {
            ModerationState::Accepted
        } else {
            ModerationState::Pending
        };
        Self {
            comment_id: Uuid::new_v4(),
            post_id,
            board_id,
            content,
            user_id,
            created_at: Utc::now(),
            moderation,
            rejected_at: None,
            ip,
        }
    }
}

/// One counter document per board. Successive conditional writes bump
/// `count` by exactly 1; no value is ever issued twice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardCounter {
    pub board_id: String,
    pub count: u64,
}

/// The like ledger entry. Uniqueness of `(post_id, identity)` is what
/// makes "like once" enforceable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikeRecord {
    pub post_id: String,
    /// Salted hash of the caller's IP. Soft anti-abuse only.
    pub identity: String,
    pub created_at: DateTime<Utc>,
}

/// Snapshot of the dorm laundry room, fetched from the upstream proxy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaundryStatus {
    pub fetched_at: DateTime<Utc>,
    pub machines: Vec<LaundryMachine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaundryMachine {
    pub id: String,
    pub kind: MachineKind,
    pub available: bool,
    pub remaining_minutes: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MachineKind {
    Washer,
    Dryer,
}
