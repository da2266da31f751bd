//! Moderation transitions and the moderator-facing pending queues.
//!
//! Legal transitions live on `ModerationState` in hb-core; this service
//! persists them through the store's conditional write so two moderators
//! acting at once cannot clobber each other.

use std::sync::Arc;

use chrono::Utc;
use hb_core::collections::{COMMENTS, POSTS};
use hb_core::{
    AppError, Comment, DocumentStore, FieldFilter, ModerationState, PageCursor, Post, Result,
    SortOrder,
};
use serde_json::Value;

use crate::boards::clamp_limit;
use crate::occ::update_with_cas;
use crate::pagination::{list_page, Page};

#[derive(Clone)]
pub struct ModerationService {
    store: Arc<dyn DocumentStore>,
}

impl ModerationService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn set_post_state(
        &self,
        board_id: &str,
        post_id: &str,
        target: ModerationState,
    ) -> Result<Post> {
        let body = self.transition(POSTS, board_id, post_id, target).await?;
        Ok(serde_json::from_value(body)?)
    }

    pub async fn set_comment_state(
        &self,
        post_id: &str,
        comment_id: &str,
        target: ModerationState,
    ) -> Result<Comment> {
        let body = self.transition(COMMENTS, post_id, comment_id, target).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Oldest-first queue of posts awaiting review on a board.
    pub async fn pending_posts(
        &self,
        board_id: &str,
        limit: usize,
        cursor: Option<PageCursor>,
    ) -> Result<Page<Post>> {
        list_page(
            self.store.as_ref(),
            POSTS,
            board_id,
            Some(pending_filter()),
            SortOrder::Ascending,
            clamp_limit(limit),
            cursor,
        )
        .await
    }

    pub async fn pending_comments(
        &self,
        post_id: &str,
        limit: usize,
        cursor: Option<PageCursor>,
    ) -> Result<Page<Comment>> {
        list_page(
            self.store.as_ref(),
            COMMENTS,
            post_id,
            Some(pending_filter()),
            SortOrder::Ascending,
            clamp_limit(limit),
            cursor,
        )
        .await
    }

    async fn transition(
        &self,
        collection: &str,
        partition: &str,
        key: &str,
        target: ModerationState,
    ) -> Result<Value> {
        update_with_cas(self.store.as_ref(), collection, partition, key, |mut body| {
            let current: ModerationState = serde_json::from_value(
                body.get("moderation")
                    .cloned()
                    .ok_or_else(|| AppError::Internal(format!("{collection}/{key} has no moderation field")))?,
            )?;

            // Repeating an already-applied decision is a no-op.
            if current == target {
                return Ok(body);
            }
            if !current.can_transition_to(target) {
                return Err(AppError::Validation(format!(
                    "cannot move {collection}/{key} from {current:?} to {target:?}"
                )));
            }

            body["moderation"] = serde_json::to_value(target)?;
            // Re-acceptance clears the rejection timestamp.
            body["rejected_at"] = match target {
                ModerationState::Rejected => serde_json::to_value(Utc::now())?,
                _ => Value::Null,
            };
            Ok(body)
        })
        .await
    }
}

fn pending_filter() -> FieldFilter {
    FieldFilter {
        field: "moderation".to_string(),
        equals: "pending".to_string(),
    }
}
