//! # hb-api Handlers
//!
//! This module coordinates the flow between HTTP requests and the service
//! layer. Bodies are JSON in and JSON out; stored IPs never leave through
//! the public views.

use std::sync::Arc;

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use hb_core::{
    AppError, AuthProvider, Comment, ModerationState, PageCursor, Post,
};
use hb_services::boards::{BoardService, NewComment, NewPost, DEFAULT_PAGE_SIZE};
use hb_services::laundry::LaundryService;
use hb_services::likes::{LikeLedger, LikeStatus};
use hb_services::moderation::ModerationService;
use hb_services::pagination::Page;

use crate::error::ApiError;

/// State shared across all Actix-web workers.
pub struct AppState {
    pub boards: BoardService,
    pub likes: LikeLedger,
    pub moderation: ModerationService,
    pub auth: Arc<dyn AuthProvider>,
    /// Absent when no laundry upstream is compiled in/configured.
    pub laundry: Option<LaundryService>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn hb_core::DocumentStore>,
        auth: Arc<dyn AuthProvider>,
        laundry: Option<LaundryService>,
    ) -> Self {
        Self {
            boards: BoardService::new(store.clone(), auth.clone()),
            likes: LikeLedger::new(store.clone()),
            moderation: ModerationService::new(store),
            auth,
            laundry,
        }
    }
}

// ── Wire types ──────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreatePostBody {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub user_id: String,
    pub tag: Option<String>,
    pub post_id: Option<String>,
    pub notice_password: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateCommentBody {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub user_id: String,
}

#[derive(Deserialize)]
pub struct PageParams {
    pub last: Option<String>,
    pub limit: Option<usize>,
}

/// Public projection of a post; the stored IP stays server-side.
#[derive(Serialize)]
pub struct PostView {
    pub post_id: String,
    pub board_id: String,
    pub title: String,
    pub content: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub tag: Option<String>,
    pub moderation: ModerationState,
    pub likes: u64,
}

impl From<Post> for PostView {
    fn from(post: Post) -> Self {
        Self {
            post_id: post.post_id,
            board_id: post.board_id,
            title: post.title,
            content: post.content,
            user_id: post.user_id,
            created_at: post.created_at,
            tag: post.tag,
            moderation: post.moderation,
            likes: post.likes,
        }
    }
}

#[derive(Serialize)]
pub struct CommentView {
    pub comment_id: String,
    pub post_id: String,
    pub content: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub moderation: ModerationState,
}

impl From<Comment> for CommentView {
    fn from(comment: Comment) -> Self {
        Self {
            comment_id: comment.comment_id.to_string(),
            post_id: comment.post_id,
            content: comment.content,
            user_id: comment.user_id,
            created_at: comment.created_at,
            moderation: comment.moderation,
        }
    }
}

// ── Cursor wire format ──────────────────────────────────────────────────────

// "<rfc3339>|<key>", opaque to clients. Full nanosecond precision: the
// stores compare timestamps exactly as stored, so a truncated cursor would
// sit before the item it names and re-serve it on every ascending page.
fn encode_cursor(cursor: &PageCursor) -> String {
    format!(
        "{}|{}",
        cursor.created_at.to_rfc3339_opts(SecondsFormat::Nanos, true),
        cursor.key
    )
}

fn decode_cursor(raw: Option<&str>) -> Result<Option<PageCursor>, ApiError> {
    let Some(raw) = raw else { return Ok(None) };
    // `?last=` with no value reads as no cursor.
    if raw.is_empty() {
        return Ok(None);
    }
    let (ts, key) = raw
        .split_once('|')
        .ok_or_else(|| AppError::Validation("malformed `last` cursor".to_string()))?;
    let created_at = DateTime::parse_from_rfc3339(ts)
        .map_err(|_| AppError::Validation("malformed `last` cursor".to_string()))?
        .with_timezone(&Utc);
    if key.is_empty() {
        return Err(AppError::Validation("malformed `last` cursor".to_string()).into());
    }
    Ok(Some(PageCursor {
        created_at,
        key: key.to_string(),
    }))
}

fn page_response<T, V: From<T> + Serialize>(page: Page<T>, field: &str) -> HttpResponse {
    let items: Vec<V> = page.items.into_iter().map(V::from).collect();
    let last = page.next_cursor.as_ref().map(encode_cursor);
    HttpResponse::Ok().json(serde_json::json!({ field: items, "last": last }))
}

fn client_ip(req: &HttpRequest) -> String {
    req.peer_addr().map(|a| a.ip().to_string()).unwrap_or_default()
}

fn require_admin(state: &AppState, req: &HttpRequest) -> Result<(), ApiError> {
    let token = req
        .headers()
        .get("x-admin-token")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if state.auth.verify_admin_token(token) {
        Ok(())
    } else {
        Err(AppError::Unauthorized("bad admin token".to_string()).into())
    }
}

// ── Public board surface ────────────────────────────────────────────────────

pub async fn create_post(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<CreatePostBody>,
) -> Result<HttpResponse, ApiError> {
    let board_id = path.into_inner();
    let body = body.into_inner();
    let post = state
        .boards
        .create_post(
            &board_id,
            NewPost {
                title: body.title,
                content: body.content,
                user_id: body.user_id,
                tag: body.tag,
                post_id: body.post_id,
                notice_password: body.notice_password,
            },
            &client_ip(&req),
        )
        .await?;
    Ok(HttpResponse::Created().json(serde_json::json!({ "post_id": post.post_id })))
}

pub async fn list_posts(
    state: web::Data<AppState>,
    path: web::Path<String>,
    params: web::Query<PageParams>,
) -> Result<HttpResponse, ApiError> {
    let board_id = path.into_inner();
    let cursor = decode_cursor(params.last.as_deref())?;
    let page = state
        .boards
        .list_posts(&board_id, params.limit.unwrap_or(DEFAULT_PAGE_SIZE), cursor)
        .await?;
    Ok(page_response::<Post, PostView>(page, "posts"))
}

pub async fn post_detail(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (board_id, post_id) = path.into_inner();
    // A valid admin token also reveals pending/rejected posts.
    let include_hidden = require_admin(&state, &req).is_ok();
    let post = state
        .boards
        .get_post(&board_id, &post_id, include_hidden)
        .await?;
    Ok(HttpResponse::Ok().json(PostView::from(post)))
}

pub async fn create_comment(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(String, String)>,
    body: web::Json<CreateCommentBody>,
) -> Result<HttpResponse, ApiError> {
    let (board_id, post_id) = path.into_inner();
    let body = body.into_inner();
    let comment = state
        .boards
        .create_comment(
            &board_id,
            &post_id,
            NewComment {
                content: body.content,
                user_id: body.user_id,
            },
            &client_ip(&req),
        )
        .await?;
    Ok(HttpResponse::Created()
        .json(serde_json::json!({ "comment_id": comment.comment_id.to_string() })))
}

pub async fn list_comments(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    params: web::Query<PageParams>,
) -> Result<HttpResponse, ApiError> {
    let (board_id, post_id) = path.into_inner();
    let cursor = decode_cursor(params.last.as_deref())?;
    let page = state
        .boards
        .list_comments(
            &board_id,
            &post_id,
            params.limit.unwrap_or(DEFAULT_PAGE_SIZE),
            cursor,
        )
        .await?;
    Ok(page_response::<Comment, CommentView>(page, "comments"))
}

pub async fn apply_like(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (board_id, post_id) = path.into_inner();
    let identity = state.auth.like_identity(&client_ip(&req));
    let outcome = state.likes.apply_like(&board_id, &post_id, &identity).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "likes": outcome.likes,
        "already_liked": outcome.status == LikeStatus::AlreadyLiked,
    })))
}

// ── Moderation surface ──────────────────────────────────────────────────────

async fn set_post_state(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(String, String)>,
    target: ModerationState,
) -> Result<HttpResponse, ApiError> {
    require_admin(&state, &req)?;
    let (board_id, post_id) = path.into_inner();
    let post = state
        .moderation
        .set_post_state(&board_id, &post_id, target)
        .await?;
    Ok(HttpResponse::Ok().json(PostView::from(post)))
}

pub async fn accept_post(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    set_post_state(state, req, path, ModerationState::Accepted).await
}

pub async fn reject_post(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    set_post_state(state, req, path, ModerationState::Rejected).await
}

async fn set_comment_state(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(String, String, String)>,
    target: ModerationState,
) -> Result<HttpResponse, ApiError> {
    require_admin(&state, &req)?;
    let (_board_id, post_id, comment_id) = path.into_inner();
    let comment = state
        .moderation
        .set_comment_state(&post_id, &comment_id, target)
        .await?;
    Ok(HttpResponse::Ok().json(CommentView::from(comment)))
}

pub async fn accept_comment(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(String, String, String)>,
) -> Result<HttpResponse, ApiError> {
    set_comment_state(state, req, path, ModerationState::Accepted).await
}

pub async fn reject_comment(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(String, String, String)>,
) -> Result<HttpResponse, ApiError> {
    set_comment_state(state, req, path, ModerationState::Rejected).await
}

pub async fn pending_posts(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    params: web::Query<PageParams>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&state, &req)?;
    let board_id = path.into_inner();
    let cursor = decode_cursor(params.last.as_deref())?;
    let page = state
        .moderation
        .pending_posts(&board_id, params.limit.unwrap_or(DEFAULT_PAGE_SIZE), cursor)
        .await?;
    Ok(page_response::<Post, PostView>(page, "posts"))
}

pub async fn pending_comments(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<(String, String)>,
    params: web::Query<PageParams>,
) -> Result<HttpResponse, ApiError> {
    require_admin(&state, &req)?;
    let (_board_id, post_id) = path.into_inner();
    let cursor = decode_cursor(params.last.as_deref())?;
    let page = state
        .moderation
        .pending_comments(&post_id, params.limit.unwrap_or(DEFAULT_PAGE_SIZE), cursor)
        .await?;
    Ok(page_response::<Comment, CommentView>(page, "comments"))
}

// ── Laundry proxy ───────────────────────────────────────────────────────────

pub async fn laundry_status(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let laundry = state
        .laundry
        .as_ref()
        .ok_or_else(|| AppError::Upstream("laundry upstream not configured".to_string()))?;
    let status = laundry.status().await?;
    Ok(HttpResponse::Ok().json(status))
}

pub async fn healthz() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}
