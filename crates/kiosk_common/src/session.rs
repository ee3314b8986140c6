//! File-backed session store.
//!
//! One JSON document holds everything the kiosk persists between
//! restarts: the last confirmed room, the room-metadata cache, the
//! session tickets and user preferences. TTLs are enforced at read
//! time by the services that load this data, not at storage time.

use crate::room::RoomId;
use crate::room_info::RoomInfoRecord;
use crate::ticket::Ticket;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::warn;

/// User preferences, including the per-install session identifier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Created once, reused for every ticket afterwards.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Everything persisted for one kiosk session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default)]
    pub last_room: Option<RoomId>,
    /// Keyed by normalized room id.
    #[serde(default)]
    pub room_cache: HashMap<String, RoomInfoRecord>,
    /// Keyed by ticket number (or id when the backend gave no number).
    #[serde(default)]
    pub session_tickets: HashMap<String, Ticket>,
    #[serde(default)]
    pub preferences: UserPreferences,
}

/// Handle on the session file.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Default location under the user cache directory.
    pub fn at_default_path() -> Self {
        let base = dirs::cache_dir().unwrap_or_else(|| PathBuf::from(".cache"));
        Self::new(base.join("kioskd").join("session.json"))
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Load the session document. A missing file is an empty session;
    /// a corrupt file is discarded with a warning rather than taking
    /// the daemon down.
    pub fn load(&self) -> SessionData {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(_) => return SessionData::default(),
        };
        match serde_json::from_str(&contents) {
            Ok(data) => data,
            Err(e) => {
                warn!("Corrupt session file {}: {}", self.path.display(), e);
                SessionData::default()
            }
        }
    }

    pub fn save(&self, data: &SessionData) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create session directory")?;
        }
        let json = serde_json::to_string_pretty(data)?;
        std::fs::write(&self.path, json).context("Failed to write session file")?;
        Ok(())
    }

    /// Read-modify-write helper for single mutations.
    pub fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut SessionData),
    {
        let mut data = self.load();
        f(&mut data);
        self.save(&data)
    }

    /// The stable session identifier, created on first use.
    pub fn ensure_session_id(&self) -> String {
        let data = self.load();
        if let Some(id) = data.preferences.session_id {
            return id;
        }
        let id = crate::ticket::generate_id();
        let stored = id.clone();
        if let Err(e) = self.update(move |d| d.preferences.session_id = Some(stored)) {
            warn!("Failed to persist session id: {}", e);
        }
        id
    }
}
