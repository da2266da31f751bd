//! # hb-api
//!
//! The web routing and orchestration layer for Hallboard.

pub mod error;
pub mod handlers;
pub mod middleware;

use actix_web::web;

/// Configures the routes for the bulletin board.
///
/// Scoped so the binary can mount the API under a different prefix
/// (e.g., /api/v1/) if needed.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("")
            .route("/healthz", web::get().to(handlers::healthz))
            .route("/laundry", web::get().to(handlers::laundry_status))
            // Moderation surface, gated by the admin token
            .route(
                "/admin/boards/{board}/pending",
                web::get().to(handlers::pending_posts),
            )
            .route(
                "/admin/boards/{board}/{post}/accept",
                web::post().to(handlers::accept_post),
            )
            .route(
                "/admin/boards/{board}/{post}/reject",
                web::post().to(handlers::reject_post),
            )
            .route(
                "/admin/boards/{board}/{post}/comments/pending",
                web::get().to(handlers::pending_comments),
            )
            .route(
                "/admin/boards/{board}/{post}/comments/{comment}/accept",
                web::post().to(handlers::accept_comment),
            )
            .route(
                "/admin/boards/{board}/{post}/comments/{comment}/reject",
                web::post().to(handlers::reject_comment),
            )
            // Public board surface
            .route("/boards/{board}", web::post().to(handlers::create_post))
            .route("/boards/{board}", web::get().to(handlers::list_posts))
            .route("/boards/{board}/{post}", web::get().to(handlers::post_detail))
            .route(
                "/boards/{board}/{post}/comments",
                web::post().to(handlers::create_comment),
            )
            .route(
                "/boards/{board}/{post}/comments",
                web::get().to(handlers::list_comments),
            )
            .route(
                "/boards/{board}/{post}/like",
                web::post().to(handlers::apply_like),
            ),
    );
}
