//! hallboard/crates/hb-api/src/middleware.rs
//!
//! Standard middleware for logging and traffic control.

use actix_web::middleware::Logger;
use actix_cors::Cors;

// Returns the standard access logger:
// remote-ip "request-line" status-code response-size "referrer" "user-agent"
pub fn standard_middleware() -> Logger {
    Logger::default()
}

// Configures CORS (Cross-Origin Resource Sharing)
// The frontend and API live on different subdomains in deployment.
pub fn cors_policy() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec!["GET", "POST"])
        .allowed_headers(vec!["content-type", "x-admin-token"])
        .max_age(3600)
}
