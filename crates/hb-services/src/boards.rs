//! Post and comment orchestration: request validation, notice-board special
//! casing, ID issuance, sanitization, and the public list/detail queries.

use std::sync::Arc;

use hb_core::collections::{COMMENTS, POSTS};
use hb_core::{
    AppError, AuthProvider, Comment, CreateOutcome, DocumentStore, FieldFilter, PageCursor, Post,
    Result, SortOrder, NOTICE_BOARD,
};

use crate::counter::CounterService;
use crate::pagination::{list_page, Page};

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

/// Inbound post payload, pre-validation.
#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub user_id: String,
    pub tag: Option<String>,
    /// Caller-supplied ID; only honored on the notice board.
    pub post_id: Option<String>,
    pub notice_password: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewComment {
    pub content: String,
    pub user_id: String,
}

#[derive(Clone)]
pub struct BoardService {
    store: Arc<dyn DocumentStore>,
    auth: Arc<dyn AuthProvider>,
    counter: CounterService,
}

impl BoardService {
    pub fn new(store: Arc<dyn DocumentStore>, auth: Arc<dyn AuthProvider>) -> Self {
        let counter = CounterService::new(store.clone());
        Self {
            store,
            auth,
            counter,
        }
    }

    pub async fn create_post(&self, board_id: &str, req: NewPost, ip: &str) -> Result<Post> {
        require("title", &req.title)?;
        require("content", &req.content)?;
        require("user_id", &req.user_id)?;

        let post_id = if board_id == NOTICE_BOARD {
            let password = req.notice_password.as_deref().unwrap_or("");
            if !self.auth.verify_notice_password(password) {
                return Err(AppError::Unauthorized("bad notice password".to_string()));
            }
            let id = req.post_id.unwrap_or_default();
            require("post_id", &id)?;
            id
        } else {
            self.counter.next_id(board_id).await?
        };

        let post = Post::new(
            board_id.to_string(),
            post_id,
            sanitize(&req.title),
            sanitize(&req.content),
            req.user_id.trim().to_string(),
            req.tag.map(|t| sanitize(&t)),
            ip.to_string(),
        );

        match self
            .store
            .create(POSTS, board_id, &post.post_id, serde_json::to_value(&post)?)
            .await?
        {
            CreateOutcome::Created => Ok(post),
            CreateOutcome::AlreadyExists => Err(AppError::Conflict(format!(
                "post {} already exists on board {board_id}",
                post.post_id
            ))),
        }
    }

    /// Detail fetch. Unaccepted posts on non-notice boards read as absent
    /// unless `include_hidden` is set (moderator path).
    pub async fn get_post(
        &self,
        board_id: &str,
        post_id: &str,
        include_hidden: bool,
    ) -> Result<Post> {
        let doc = self
            .store
            .get(POSTS, board_id, post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("post".to_string(), post_id.to_string()))?;
        let post: Post = serde_json::from_value(doc.body)?;

        if !include_hidden && board_id != NOTICE_BOARD && !post.moderation.is_public() {
            return Err(AppError::NotFound("post".to_string(), post_id.to_string()));
        }
        Ok(post)
    }

    /// Newest-first public listing; pending and rejected posts are invisible.
    pub async fn list_posts(
        &self,
        board_id: &str,
        limit: usize,
        cursor: Option<PageCursor>,
    ) -> Result<Page<Post>> {
        list_page(
            self.store.as_ref(),
            POSTS,
            board_id,
            Some(accepted_filter()),
            SortOrder::Descending,
            clamp_limit(limit),
            cursor,
        )
        .await
    }

    pub async fn create_comment(
        &self,
        board_id: &str,
        post_id: &str,
        req: NewComment,
        ip: &str,
    ) -> Result<Comment> {
        // Commenting requires a publicly visible post.
        self.get_post(board_id, post_id, false).await?;
        require("content", &req.content)?;
        require("user_id", &req.user_id)?;

        let comment = Comment::new(
            board_id.to_string(),
            post_id.to_string(),
            sanitize(&req.content),
            req.user_id.trim().to_string(),
            ip.to_string(),
        );

        match self
            .store
            .create(
                COMMENTS,
                post_id,
                &comment.comment_id.to_string(),
                serde_json::to_value(&comment)?,
            )
            .await?
        {
            CreateOutcome::Created => Ok(comment),
            CreateOutcome::AlreadyExists => Err(AppError::Conflict(format!(
                "comment {} already exists",
                comment.comment_id
            ))),
        }
    }

    /// Oldest-first comment listing under a visible post.
    pub async fn list_comments(
        &self,
        board_id: &str,
        post_id: &str,
        limit: usize,
        cursor: Option<PageCursor>,
    ) -> Result<Page<Comment>> {
        self.get_post(board_id, post_id, false).await?;
        list_page(
            self.store.as_ref(),
            COMMENTS,
            post_id,
            Some(accepted_filter()),
            SortOrder::Ascending,
            clamp_limit(limit),
            cursor,
        )
        .await
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!(
            "missing required field: {field}"
        )));
    }
    Ok(())
}

/// Escape HTML to prevent XSS; unescaping is the client's concern.
fn sanitize(raw: &str) -> String {
    html_escape::encode_safe(raw.trim()).to_string()
}

pub(crate) fn clamp_limit(limit: usize) -> usize {
    limit.clamp(1, MAX_PAGE_SIZE)
}

fn accepted_filter() -> FieldFilter {
    FieldFilter {
        field: "moderation".to_string(),
        equals: "accepted".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hb_core::ModerationState;
    use hb_db_memory::MemoryDocumentStore;

    struct FakeAuth;

    impl AuthProvider for FakeAuth {
        fn verify_admin_token(&self, token: &str) -> bool {
            token == "admin-secret"
        }
        fn verify_notice_password(&self, password: &str) -> bool {
            password == "notice-secret"
        }
        fn like_identity(&self, ip: &str) -> String {
            ip.to_string()
        }
    }

    fn service() -> (Arc<MemoryDocumentStore>, BoardService) {
        let store = Arc::new(MemoryDocumentStore::new());
        let svc = BoardService::new(store.clone(), Arc::new(FakeAuth));
        (store, svc)
    }

    fn new_post(title: &str) -> NewPost {
        NewPost {
            title: title.to_string(),
            content: "World".to_string(),
            user_id: "u1".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_post_ids_are_sequential_per_board() {
        let (_, svc) = service();
        let a = svc.create_post("general", new_post("Hello"), "ip").await.unwrap();
        let b = svc.create_post("general", new_post("Again"), "ip").await.unwrap();
        let c = svc.create_post("random", new_post("Other"), "ip").await.unwrap();
        assert_eq!(a.post_id, "1");
        assert_eq!(b.post_id, "2");
        assert_eq!(c.post_id, "1");
    }

    #[tokio::test]
    async fn test_missing_fields_fail_validation() {
        let (_, svc) = service();
        let err = svc
            .create_post("general", new_post("  "), "ip")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_notice_board_requires_password_and_id() {
        let (_, svc) = service();

        let denied = svc
            .create_post(
                "notice",
                NewPost {
                    post_id: Some("a1".to_string()),
                    notice_password: Some("wrong".to_string()),
                    ..new_post("Maintenance")
                },
                "ip",
            )
            .await
            .unwrap_err();
        assert!(matches!(denied, AppError::Unauthorized(_)));

        let created = svc
            .create_post(
                "notice",
                NewPost {
                    post_id: Some("a1".to_string()),
                    notice_password: Some("notice-secret".to_string()),
                    ..new_post("Maintenance")
                },
                "ip",
            )
            .await
            .unwrap();
        assert_eq!(created.post_id, "a1");
        assert_eq!(created.moderation, ModerationState::Accepted);

        // Duplicate caller-supplied ID is a conflict, not a silent overwrite.
        let dup = svc
            .create_post(
                "notice",
                NewPost {
                    post_id: Some("a1".to_string()),
                    notice_password: Some("notice-secret".to_string()),
                    ..new_post("Maintenance")
                },
                "ip",
            )
            .await
            .unwrap_err();
        assert!(matches!(dup, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_pending_posts_hidden_until_accepted() {
        let (store, svc) = service();
        let post = svc.create_post("general", new_post("Hi"), "ip").await.unwrap();

        let err = svc.get_post("general", &post.post_id, false).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(..)));
        // Moderators still see it.
        svc.get_post("general", &post.post_id, true).await.unwrap();
        assert!(svc.list_posts("general", 10, None).await.unwrap().items.is_empty());

        crate::moderation::ModerationService::new(store)
            .set_post_state("general", &post.post_id, ModerationState::Accepted)
            .await
            .unwrap();

        svc.get_post("general", &post.post_id, false).await.unwrap();
        assert_eq!(svc.list_posts("general", 10, None).await.unwrap().items.len(), 1);
    }

    #[tokio::test]
    async fn test_content_is_escaped() {
        let (_, svc) = service();
        let post = svc
            .create_post("general", new_post("<script>alert(1)</script>"), "ip")
            .await
            .unwrap();
        assert!(!post.title.contains('<'));
        assert!(post.title.contains("&lt;script&gt;"));
    }

    #[tokio::test]
    async fn test_comments_require_visible_post() {
        let (store, svc) = service();
        let post = svc.create_post("general", new_post("Hi"), "ip").await.unwrap();

        let req = NewComment {
            content: "first".to_string(),
            user_id: "u2".to_string(),
        };
        let err = svc
            .create_comment("general", &post.post_id, req.clone(), "ip")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(..)));

        crate::moderation::ModerationService::new(store)
            .set_post_state("general", &post.post_id, ModerationState::Accepted)
            .await
            .unwrap();
        let comment = svc
            .create_comment("general", &post.post_id, req, "ip")
            .await
            .unwrap();
        assert_eq!(comment.post_id, post.post_id);
        // New comments on non-notice boards queue for moderation.
        assert_eq!(comment.moderation, ModerationState::Pending);
        assert!(svc
            .list_comments("general", &post.post_id, 10, None)
            .await
            .unwrap()
            .items
            .is_empty());
    }
}
