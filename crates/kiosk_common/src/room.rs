//! Room identifiers.
//!
//! A room is a normalized `LETTER-DDDD` code such as `A-1750`. The
//! pattern is the single wire-level format contract: anything failing
//! it is rejected before reaching the decision pipeline.

use crate::error::KioskError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Validation pattern, applied after trim + uppercase.
static ROOM_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]-\d{4}$").expect("valid regex"));

/// Pattern for room mentions inside free text.
static ROOM_MENTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z]-\d{4}\b").expect("valid regex"));

/// A validated, case-normalized room identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Parse and normalize a raw room string.
    pub fn parse(raw: &str) -> Result<Self, KioskError> {
        let normalized = raw.trim().to_uppercase();
        if ROOM_PATTERN.is_match(&normalized) {
            Ok(RoomId(normalized))
        } else {
            Err(KioskError::InvalidRoomFormat(raw.trim().to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Detect room mentions in a free-text message, deduplicated in
    /// order of first appearance.
    pub fn detect_in_text(text: &str) -> Vec<RoomId> {
        let upper = text.to_uppercase();
        let mut found = Vec::new();
        for m in ROOM_MENTION.find_iter(&upper) {
            let room = RoomId(m.as_str().to_string());
            if !found.contains(&room) {
                found.push(room);
            }
        }
        found
    }

    /// Rooms mentioned in the text that differ from `self`. Non-empty
    /// means the user may be reporting for another room.
    pub fn conflicts_in_text(&self, text: &str) -> Vec<RoomId> {
        Self::detect_in_text(text)
            .into_iter()
            .filter(|r| r != self)
            .collect()
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for RoomId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        RoomId::parse(&raw).map_err(serde::de::Error::custom)
    }
}
