//! # Hallboard Binary
//!
//! The entry point that assembles the application based on compile-time features.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use actix_web::{web, App, HttpServer};
use hb_api::handlers::AppState;
use hb_api::middleware::{cors_policy, standard_middleware};

#[cfg(feature = "db-sqlite")]
use hb_db_sqlite::SqliteDocumentStore;

#[cfg(all(feature = "db-memory", not(feature = "db-sqlite")))]
use hb_db_memory::MemoryDocumentStore;

#[cfg(feature = "auth-simple")]
use hb_auth_simple::SimpleAuthProvider;

#[cfg(feature = "laundry-http")]
use hb_laundry_http::HttpLaundryUpstream;
#[cfg(feature = "laundry-http")]
use hb_services::laundry::LaundryService;

#[cfg(not(any(feature = "db-sqlite", feature = "db-memory")))]
compile_error!("enable a store feature: db-sqlite or db-memory");

#[cfg(not(feature = "auth-simple"))]
compile_error!("enable an auth feature: auth-simple");

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    // 1. Store implementation
    #[cfg(feature = "db-sqlite")]
    let store: Arc<dyn hb_core::DocumentStore> = {
        let url = env_or("DATABASE_URL", "sqlite:hallboard.db?mode=rwc");
        Arc::new(
            SqliteDocumentStore::new(&url)
                .await
                .expect("Failed to init SQLite store"),
        )
    };

    #[cfg(all(feature = "db-memory", not(feature = "db-sqlite")))]
    let store: Arc<dyn hb_core::DocumentStore> = {
        log::warn!("using the in-memory store; data is lost on restart");
        Arc::new(MemoryDocumentStore::new())
    };

    // 2. Auth implementation
    #[cfg(feature = "auth-simple")]
    let auth = Arc::new(SimpleAuthProvider::new(
        &env_or("ADMIN_TOKEN", ""),
        &env_or("NOTICE_PASSWORD", ""),
        &env_or("IDENTITY_SALT", "hallboard-dev-salt"),
    ));

    // 3. Laundry upstream
    #[cfg(feature = "laundry-http")]
    let laundry = match env::var("LAUNDRY_BASE_URL") {
        Ok(base_url) => {
            let ttl: u64 = env_or("LAUNDRY_CACHE_TTL_SECS", "60")
                .parse()
                .expect("LAUNDRY_CACHE_TTL_SECS must be an integer");
            let upstream =
                HttpLaundryUpstream::new(&base_url, &env_or("LAUNDRY_APP_KEY", ""));
            Some(LaundryService::new(
                Arc::new(upstream),
                Duration::from_secs(ttl),
            ))
        }
        Err(_) => {
            log::warn!("LAUNDRY_BASE_URL not set; /laundry will report the upstream as unavailable");
            None
        }
    };
    #[cfg(not(feature = "laundry-http"))]
    let laundry = None;

    let state = web::Data::new(AppState::new(store, auth, laundry));

    let addr = env_or("HALLBOARD_ADDR", "127.0.0.1:8080");
    log::info!("hallboard listening on http://{addr}");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(standard_middleware())
            .wrap(cors_policy())
            .configure(hb_api::configure_routes)
    })
    .bind(addr)?
    .run()
    .await
}
