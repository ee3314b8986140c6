//! Support-backend client.
//!
//! The daemon talks to the campus support backend over HTTP for four
//! operations: diagnosis, ticket creation and the two room-metadata
//! sources. The `SupportBackend` trait is the seam the controller and
//! caches are written against; tests substitute their own
//! implementations.

use async_trait::async_trait;
use kiosk_common::config::{ApiConfig, TimeoutConfig};
use kiosk_common::room_info::Equipment;
use kiosk_common::ticket::Priority;
use kiosk_common::{KioskError, RoomId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Request body for a diagnosis attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosisRequest {
    pub room: RoomId,
    pub message: String,
    pub problem_type: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Diagnosis result from the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosisResponse {
    /// True when the backend ran an automatic fix.
    #[serde(default)]
    pub auto_executed: bool,
    /// Human-readable result of the fix, when one ran.
    #[serde(default)]
    pub auto_result: Option<String>,
}

/// Request body for ticket creation. Room-enrichment fields come from
/// the cached primary payload when available.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTicketRequest {
    pub room: RoomId,
    pub title: String,
    pub description: String,
    pub client_message: String,
    pub priority: Priority,
    pub session_id: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub building: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u64>,
}

/// Ticket fields the backend reports after creation. Everything is
/// optional; the store fills in locally generated values for the rest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendTicket {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTicketResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub ticket: Option<BackendTicket>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Response of the fallback equipment endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquipmentResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub devices: Vec<Equipment>,
    #[serde(default)]
    pub count: u64,
}

/// Outbound operations against the support backend.
#[async_trait]
pub trait SupportBackend: Send + Sync {
    /// Ask the backend to diagnose (and possibly auto-fix) a problem.
    async fn diagnose(&self, req: &DiagnosisRequest) -> Result<DiagnosisResponse, KioskError>;

    /// Create a support ticket.
    async fn create_ticket(
        &self,
        req: &CreateTicketRequest,
    ) -> Result<CreateTicketResponse, KioskError>;

    /// Primary room-metadata source. Returns the raw payload.
    async fn room_info(&self, room: &RoomId) -> Result<Value, KioskError>;

    /// Fallback equipment source.
    async fn room_equipment(&self, room: &RoomId) -> Result<EquipmentResponse, KioskError>;
}

/// Production backend over HTTP.
pub struct HttpBackend {
    client: reqwest::Client,
    api: ApiConfig,
}

impl HttpBackend {
    pub fn new(api: ApiConfig, timeouts: &TimeoutConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeouts.api_request_timeout())
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client, api }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api.base_url.trim_end_matches('/'), path)
    }
}

fn map_request_error(context: &str, e: reqwest::Error) -> KioskError {
    if e.is_timeout() {
        KioskError::Timeout(context.to_string())
    } else {
        KioskError::Network(format!("{}: {}", context, e))
    }
}

#[async_trait]
impl SupportBackend for HttpBackend {
    async fn diagnose(&self, req: &DiagnosisRequest) -> Result<DiagnosisResponse, KioskError> {
        let url = self.url(&self.api.diagnosis_path);
        debug!("POST {} for room {}", url, req.room);

        let response = self
            .client
            .post(&url)
            .json(req)
            .send()
            .await
            .map_err(|e| map_request_error("diagnose", e))?;

        response
            .json()
            .await
            .map_err(|e| KioskError::Network(format!("diagnose response: {}", e)))
    }

    async fn create_ticket(
        &self,
        req: &CreateTicketRequest,
    ) -> Result<CreateTicketResponse, KioskError> {
        let url = self.url(&self.api.create_ticket_path);
        debug!("POST {} for room {}", url, req.room);

        let response = self
            .client
            .post(&url)
            .json(req)
            .send()
            .await
            .map_err(|e| map_request_error("create_ticket", e))?;

        response
            .json()
            .await
            .map_err(|e| KioskError::Network(format!("create_ticket response: {}", e)))
    }

    async fn room_info(&self, room: &RoomId) -> Result<Value, KioskError> {
        let url = self.url(&self.api.room_info_path);
        debug!("GET {} for room {}", url, room);

        let response = self
            .client
            .get(&url)
            .query(&[("salle", room.as_str())])
            // Metadata lookups stay snappy even when the general bound is long.
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| map_request_error("room_info", e))?;

        if !response.status().is_success() {
            return Err(KioskError::Network(format!(
                "room_info: HTTP {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| KioskError::Network(format!("room_info response: {}", e)))
    }

    async fn room_equipment(&self, room: &RoomId) -> Result<EquipmentResponse, KioskError> {
        let url = self.url(&self.api.room_equipment_path);
        debug!("GET {} for room {}", url, room);

        let response = self
            .client
            .get(&url)
            .query(&[("salle", room.as_str())])
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| map_request_error("room_equipment", e))?;

        if !response.status().is_success() {
            return Err(KioskError::Network(format!(
                "room_equipment: HTTP {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| KioskError::Network(format!("room_equipment response: {}", e)))
    }
}

/// Pull the room-enrichment fields a primary payload may carry.
pub fn enrichment_from_payload(payload: &Value) -> (Option<String>, Option<String>, Option<String>, Option<u64>) {
    let text = |key: &str| {
        payload
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    (
        text("pavillon"),
        text("bassin"),
        text("type"),
        payload.get("capacite").and_then(Value::as_u64),
    )
}
