//! The like ledger: at most one like per `(post_id, identity)`, enforced by
//! an atomic create of the ledger record, plus a denormalized count on the
//! post maintained with the same CAS retry pattern as the ID counter.

use std::sync::Arc;

use chrono::Utc;
use hb_core::collections::{LIKES, POSTS};
use hb_core::{
    AppError, CreateOutcome, DocumentStore, LikeRecord, Post, Result, NOTICE_BOARD,
};

use crate::occ::update_with_cas;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeStatus {
    Applied,
    AlreadyLiked,
}

#[derive(Debug, Clone, Copy)]
pub struct LikeOutcome {
    pub status: LikeStatus,
    pub likes: u64,
}

#[derive(Clone)]
pub struct LikeLedger {
    store: Arc<dyn DocumentStore>,
}

impl LikeLedger {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Records a like for `identity` on the given post. Idempotent: a second
    /// call with the same identity returns `AlreadyLiked` and leaves the
    /// stored count untouched.
    pub async fn apply_like(
        &self,
        board_id: &str,
        post_id: &str,
        identity: &str,
    ) -> Result<LikeOutcome> {
        let doc = self
            .store
            .get(POSTS, board_id, post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("post".to_string(), post_id.to_string()))?;
        let post: Post = serde_json::from_value(doc.body)?;

        if post.board_id != NOTICE_BOARD && !post.moderation.is_public() {
            return Err(AppError::NotAcceptable(format!(
                "post {post_id} is not accepted"
            )));
        }

        let record = LikeRecord {
            post_id: post_id.to_string(),
            identity: identity.to_string(),
            created_at: Utc::now(),
        };
        match self
            .store
            .create(LIKES, post_id, identity, serde_json::to_value(&record)?)
            .await?
        {
            CreateOutcome::Created => {}
            // The count already fetched with the post is current enough;
            // no re-read needed.
            CreateOutcome::AlreadyExists => {
                return Ok(LikeOutcome {
                    status: LikeStatus::AlreadyLiked,
                    likes: post.likes,
                })
            }
        }

        match update_with_cas(self.store.as_ref(), POSTS, board_id, post_id, |body| {
            let mut post: Post = serde_json::from_value(body)?;
            post.likes += 1;
            Ok(serde_json::to_value(post)?)
        })
        .await
        {
            Ok(body) => {
                let post: Post = serde_json::from_value(body)?;
                Ok(LikeOutcome {
                    status: LikeStatus::Applied,
                    likes: post.likes,
                })
            }
            // The ledger record exists, so the like itself cannot be lost.
            // The denormalized count is allowed to lag until the next
            // successful increment; report the best count we can read.
            Err(AppError::ConcurrencyExhausted(msg)) => {
                log::warn!("like count increment exhausted for {board_id}/{post_id}: {msg}");
                let likes = match self.store.get(POSTS, board_id, post_id).await? {
                    Some(doc) => serde_json::from_value::<Post>(doc.body)?.likes,
                    None => post.likes,
                };
                Ok(LikeOutcome {
                    status: LikeStatus::Applied,
                    likes,
                })
            }
            Err(e) => Err(e),
        }
    }
}
