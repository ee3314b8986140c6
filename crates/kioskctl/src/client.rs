//! HTTP client for the kiosk daemon's localhost API.

use anyhow::{anyhow, Context, Result};
use kiosk_common::rpc::{
    AnalyzeRequest, AnalyzeResponse, ConfirmRoomRequest, ConfirmRoomResponse, ErrorResponse,
    HealthResponse, TicketsResponse,
};
use std::time::Duration;

const DEFAULT_URL: &str = "http://127.0.0.1:7870";

pub struct DaemonClient {
    client: reqwest::Client,
    base_url: String,
}

impl DaemonClient {
    /// Explicit flag wins, then $KIOSKD_URL, then localhost.
    pub fn new(explicit_url: Option<String>) -> Self {
        let base_url = explicit_url
            .or_else(|| std::env::var("KIOSKD_URL").ok())
            .unwrap_or_else(|| DEFAULT_URL.to_string());
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let response = self
            .client
            .get(format!("{}/v1/health", self.base_url))
            .send()
            .await
            .context("Daemon unavailable")?;
        Ok(response.json().await?)
    }

    pub async fn confirm_room(&self, room: &str) -> Result<ConfirmRoomResponse> {
        let response = self
            .client
            .post(format!("{}/v1/room/confirm", self.base_url))
            .json(&ConfirmRoomRequest {
                room: room.to_string(),
            })
            .send()
            .await
            .context("Daemon unavailable")?;
        Self::parse(response).await
    }

    pub async fn analyze(&self, room: &str, message: &str) -> Result<AnalyzeResponse> {
        let response = self
            .client
            .post(format!("{}/v1/analyze", self.base_url))
            .json(&AnalyzeRequest {
                room: room.to_string(),
                message: message.to_string(),
            })
            .send()
            .await
            .context("Daemon unavailable")?;
        Self::parse(response).await
    }

    pub async fn tickets(&self) -> Result<TicketsResponse> {
        let response = self
            .client
            .get(format!("{}/v1/tickets", self.base_url))
            .send()
            .await
            .context("Daemon unavailable")?;
        Ok(response.json().await?)
    }

    /// Decode the typed error body on failure statuses.
    async fn parse<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        if response.status().is_success() {
            return Ok(response.json().await?);
        }
        let status = response.status();
        match response.json::<ErrorResponse>().await {
            Ok(body) => Err(anyhow!("{} (code {})", body.message, body.code)),
            Err(_) => Err(anyhow!("Request failed: HTTP {}", status)),
        }
    }
}
