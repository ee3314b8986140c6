//! Room metadata records, as cached by the daemon.
//!
//! Records are immutable after creation; a refresh produces a
//! replacement record. A record past its expiry is logically absent
//! even while still resident in the cache.

use crate::room::RoomId;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Cache TTL for successful fetches.
pub const ROOM_INFO_TTL_MINS: i64 = 15;

/// Error records stay around just long enough to avoid hammering a
/// failing backend.
pub const ERROR_RECORD_TTL_SECS: i64 = 30;

/// Which source produced a record. Callers must check this before
/// trusting `payload` or `equipment`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomInfoSource {
    Primary,
    Fallback,
    Error,
}

impl std::fmt::Display for RoomInfoSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Fallback => write!(f, "fallback"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A piece of equipment installed in a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "type")]
    pub kind: String,
    #[serde(default)]
    pub status: String,
}

/// One cached room-metadata record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomInfoRecord {
    pub room: RoomId,
    pub source: RoomInfoSource,
    /// Raw payload from the source; `Value::Null` for error records.
    pub payload: Value,
    #[serde(default)]
    pub equipment: Vec<Equipment>,
    #[serde(default)]
    pub error: Option<String>,
    pub fetched_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl RoomInfoRecord {
    pub fn primary(room: RoomId, payload: Value, now: DateTime<Utc>) -> Self {
        Self {
            room,
            source: RoomInfoSource::Primary,
            payload,
            equipment: Vec::new(),
            error: None,
            fetched_at: now,
            expires_at: now + Duration::minutes(ROOM_INFO_TTL_MINS),
        }
    }

    pub fn fallback(
        room: RoomId,
        equipment: Vec<Equipment>,
        device_count: u64,
        now: DateTime<Utc>,
    ) -> Self {
        let payload = serde_json::json!({
            "room": room.as_str(),
            "device_count": device_count,
        });
        Self {
            room,
            source: RoomInfoSource::Fallback,
            payload,
            equipment,
            error: None,
            fetched_at: now,
            expires_at: now + Duration::minutes(ROOM_INFO_TTL_MINS),
        }
    }

    pub fn failed(room: RoomId, error: String, now: DateTime<Utc>) -> Self {
        Self {
            room,
            source: RoomInfoSource::Error,
            payload: Value::Null,
            equipment: Vec::new(),
            error: Some(error),
            fetched_at: now,
            expires_at: now + Duration::seconds(ERROR_RECORD_TTL_SECS),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Equipment list regardless of source. Fallback records carry it
    /// directly; primary payloads are mined best-effort; error records
    /// have none.
    pub fn equipment_list(&self) -> Vec<Equipment> {
        match self.source {
            RoomInfoSource::Fallback => self.equipment.clone(),
            RoomInfoSource::Primary => extract_equipment(&self.payload),
            RoomInfoSource::Error => Vec::new(),
        }
    }
}

/// Best-effort extraction of equipment from a primary payload. The
/// nested structure is not under our control; anything malformed yields
/// an empty list, never an error.
pub fn extract_equipment(payload: &Value) -> Vec<Equipment> {
    let Some(items) = payload.get("equipements").and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let name = item
                .get("nom")
                .or_else(|| item.get("name"))
                .and_then(Value::as_str)?;
            Some(Equipment {
                id: item.get("id").and_then(Value::as_str).map(String::from),
                name: name.to_string(),
                kind: item
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string(),
                status: item
                    .get("statut")
                    .or_else(|| item.get("status"))
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string(),
            })
        })
        .collect()
}
