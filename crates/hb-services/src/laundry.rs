//! Cache-aside wrapper over the laundry-room status upstream.
//!
//! Token handling is a bounded retry, not a recursive handler: attempt the
//! fetch, on `Unauthorized` refresh the credential once, retry exactly once
//! more, then fail.

use std::sync::Arc;
use std::time::Duration;

use hb_core::{AppError, LaundryStatus, LaundryUpstream, Result};
use tokio::sync::RwLock;

use crate::cache::TtlCache;

const CACHE_KEY: &str = "laundry-status";

pub struct LaundryService {
    upstream: Arc<dyn LaundryUpstream>,
    cache: TtlCache<LaundryStatus>,
    token: RwLock<Option<String>>,
}

impl LaundryService {
    pub fn new(upstream: Arc<dyn LaundryUpstream>, cache_ttl: Duration) -> Self {
        Self {
            upstream,
            cache: TtlCache::new(cache_ttl),
            token: RwLock::new(None),
        }
    }

    pub async fn status(&self) -> Result<LaundryStatus> {
        if let Some(hit) = self.cache.get(CACHE_KEY) {
            return Ok(hit);
        }
        let status = self.fetch_with_refresh().await?;
        self.cache.insert(CACHE_KEY, status.clone());
        Ok(status)
    }

    async fn fetch_with_refresh(&self) -> Result<LaundryStatus> {
        // Bind the clone first: matching on the scrutinee temporary would hold
        // the read guard across `refresh()`, which takes the write lock.
        let held = self.token.read().await.clone();
        let token = match held {
            Some(token) => token,
            None => self.refresh().await?,
        };

        match self.upstream.fetch_status(&token).await {
            Err(AppError::Unauthorized(_)) => {
                log::info!("laundry token expired, refreshing once");
                let fresh = self.refresh().await?;
                self.upstream.fetch_status(&fresh).await
            }
            other => other,
        }
    }

    async fn refresh(&self) -> Result<String> {
        let fresh = self.upstream.refresh_token().await?;
        *self.token.write().await = Some(fresh.clone());
        Ok(fresh)
    }
}
