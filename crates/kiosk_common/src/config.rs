//! Configuration management for the kiosk daemon.
//!
//! Loads settings from /etc/kioskd/config.toml or uses defaults. Every
//! field has a serde default so partial files stay valid.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Config file path.
pub const CONFIG_PATH: &str = "/etc/kioskd/config.toml";

/// Backend endpoints consumed by the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the support backend.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// POST: automatic diagnosis attempt.
    #[serde(default = "default_diagnosis_path")]
    pub diagnosis_path: String,

    /// POST: ticket creation.
    #[serde(default = "default_create_ticket_path")]
    pub create_ticket_path: String,

    /// GET: primary room-metadata source.
    #[serde(default = "default_room_info_path")]
    pub room_info_path: String,

    /// GET: fallback room-equipment source.
    #[serde(default = "default_room_equipment_path")]
    pub room_equipment_path: String,
}

fn default_base_url() -> String {
    "http://127.0.0.1:7070".to_string()
}

fn default_diagnosis_path() -> String {
    "/api/assist/diagnose".to_string()
}

fn default_create_ticket_path() -> String {
    "/api/assist/create-ticket".to_string()
}

fn default_room_info_path() -> String {
    "/api/rooms/info".to_string()
}

fn default_room_equipment_path() -> String {
    "/api/rooms/equipment".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            diagnosis_path: default_diagnosis_path(),
            create_ticket_path: default_create_ticket_path(),
            room_info_path: default_room_info_path(),
            room_equipment_path: default_room_equipment_path(),
        }
    }
}

/// Timer and timeout settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Escalation timer raced against the diagnosis call.
    #[serde(default = "default_escalation_ms")]
    pub escalation_ms: u64,

    /// Outer bound on one diagnosis call; firing counts as a
    /// diagnosis failure, not a controller timeout.
    #[serde(default = "default_diagnosis_secs")]
    pub diagnosis_secs: u64,

    /// General bound on outbound API requests.
    #[serde(default = "default_api_request_secs")]
    pub api_request_secs: u64,
}

fn default_escalation_ms() -> u64 {
    2_000
}

fn default_diagnosis_secs() -> u64 {
    15
}

fn default_api_request_secs() -> u64 {
    30
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            escalation_ms: default_escalation_ms(),
            diagnosis_secs: default_diagnosis_secs(),
            api_request_secs: default_api_request_secs(),
        }
    }
}

impl TimeoutConfig {
    pub fn escalation_delay(&self) -> Duration {
        Duration::from_millis(self.escalation_ms)
    }

    pub fn diagnosis_timeout(&self) -> Duration {
        Duration::from_secs(self.diagnosis_secs)
    }

    pub fn api_request_timeout(&self) -> Duration {
        Duration::from_secs(self.api_request_secs)
    }
}

/// Cache and store lifetimes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How often the periodic sweep runs.
    #[serde(default = "default_sweep_mins")]
    pub sweep_mins: u64,
}

fn default_sweep_mins() -> u64 {
    30
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            sweep_mins: default_sweep_mins(),
        }
    }
}

impl CacheConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_mins * 60)
    }
}

/// Bounds on user-provided problem text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default = "default_min_problem_chars")]
    pub min_problem_chars: usize,

    #[serde(default = "default_max_problem_chars")]
    pub max_problem_chars: usize,
}

fn default_min_problem_chars() -> usize {
    10
}

fn default_max_problem_chars() -> usize {
    1_000
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_problem_chars: default_min_problem_chars(),
            max_problem_chars: default_max_problem_chars(),
        }
    }
}

/// Inbound HTTP API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Localhost only; the presentation layer runs on the same kiosk.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

fn default_listen_addr() -> String {
    "127.0.0.1:7870".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

/// Full daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KioskConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl KioskConfig {
    /// Load from a TOML file, falling back to defaults on any failure.
    pub fn load(path: &str) -> Self {
        if !Path::new(path).exists() {
            info!("No config at {}, using defaults", path);
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    info!("Loaded config from {}", path);
                    config
                }
                Err(e) => {
                    warn!("Failed to parse {}: {}, using defaults", path, e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read {}: {}, using defaults", path, e);
                Self::default()
            }
        }
    }
}
