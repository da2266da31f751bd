//! # hb-laundry-http
//!
//! reqwest-backed implementation of the `LaundryUpstream` port. Talks to the
//! dorm laundry vendor API: a bearer-token status endpoint plus a token
//! endpoint keyed by an application secret.

use async_trait::async_trait;
use chrono::Utc;
use hb_core::{
    AppError, LaundryMachine, LaundryStatus, LaundryUpstream, MachineKind, Result,
};
use reqwest::StatusCode;
use serde::Deserialize;

pub struct HttpLaundryUpstream {
    client: reqwest::Client,
    base_url: String,
    app_key: String,
}

impl HttpLaundryUpstream {
    pub fn new(base_url: &str, app_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            app_key: app_key.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct WireStatus {
    machines: Vec<WireMachine>,
}

#[derive(Deserialize)]
struct WireMachine {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    state: String,
    #[serde(default)]
    remaining: Option<u32>,
}

#[derive(Deserialize)]
struct WireToken {
    token: String,
}

fn upstream_err(context: &str, err: reqwest::Error) -> AppError {
    AppError::Upstream(format!("laundry {context}: {err}"))
}

impl From<WireMachine> for LaundryMachine {
    fn from(wire: WireMachine) -> Self {
        LaundryMachine {
            kind: if wire.kind.eq_ignore_ascii_case("dryer") {
                MachineKind::Dryer
            } else {
                MachineKind::Washer
            },
            available: wire.state.eq_ignore_ascii_case("idle"),
            remaining_minutes: wire.remaining,
            id: wire.id,
        }
    }
}

#[async_trait]
impl LaundryUpstream for HttpLaundryUpstream {
    async fn fetch_status(&self, token: &str) -> Result<LaundryStatus> {
        let response = self
            .client
            .get(format!("{}/status", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| upstream_err("status request failed", e))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(AppError::Unauthorized("laundry token rejected".to_string()));
        }
        let response = response
            .error_for_status()
            .map_err(|e| upstream_err("status returned error", e))?;

        let wire: WireStatus = response
            .json()
            .await
            .map_err(|e| upstream_err("status body unreadable", e))?;

        Ok(LaundryStatus {
            fetched_at: Utc::now(),
            machines: wire.machines.into_iter().map(Into::into).collect(),
        })
    }

    async fn refresh_token(&self) -> Result<String> {
        log::debug!("requesting fresh laundry token");
        let wire: WireToken = self
            .client
            .post(format!("{}/token", self.base_url))
            .json(&serde_json::json!({ "app_key": self.app_key }))
            .send()
            .await
            .map_err(|e| upstream_err("token request failed", e))?
            .error_for_status()
            .map_err(|e| upstream_err("token returned error", e))?
            .json()
            .await
            .map_err(|e| upstream_err("token body unreadable", e))?;
        Ok(wire.token)
    }
}
