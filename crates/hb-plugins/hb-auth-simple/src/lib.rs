//! # hb-auth-simple
//!
//! Shared-secret implementation of `AuthProvider`: admin-token and
//! notice-password checks plus salted like-identity hashing.

use hb_core::traits::AuthProvider;
use sha2::{Digest, Sha256};

pub struct SimpleAuthProvider {
    admin_token: String,
    notice_password: String,
    /// Salt for like identities (rotates on restart unless pinned via
    /// configuration).
    identity_salt: String,
}

impl SimpleAuthProvider {
    pub fn new(admin_token: &str, notice_password: &str, identity_salt: &str) -> Self {
        Self {
            admin_token: admin_token.to_string(),
            notice_password: notice_password.to_string(),
            identity_salt: identity_salt.to_string(),
        }
    }
}

impl AuthProvider for SimpleAuthProvider {
    fn verify_admin_token(&self, token: &str) -> bool {
        !self.admin_token.is_empty() && token == self.admin_token
    }

    fn verify_notice_password(&self, password: &str) -> bool {
        !self.notice_password.is_empty() && password == self.notice_password
    }

    /// Hashes the caller IP with the salt so raw addresses never reach the
    /// store. IPs are shared/spoofable, so this is soft anti-abuse only.
    fn like_identity(&self, ip: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.identity_salt.as_bytes());
        hasher.update(ip.as_bytes());
        let hash = hex::encode(hasher.finalize());
        hash[..16].to_string()
    }
}
