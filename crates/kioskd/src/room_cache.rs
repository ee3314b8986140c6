//! Room-metadata cache.
//!
//! Lookups never fail: a fetch that exhausts both sources yields a
//! short-lived error record instead of an error, so the kiosk can keep
//! working with degraded information. A single-flight slot ensures at
//! most one fetch per cache at a time; concurrent callers wait and
//! then reuse the winner's record.

use crate::backend::SupportBackend;
use chrono::Utc;
use kiosk_common::room_info::RoomInfoRecord;
use kiosk_common::session::SessionStore;
use kiosk_common::RoomId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

pub struct RoomCache {
    backend: Arc<dyn SupportBackend>,
    store: SessionStore,
    entries: RwLock<HashMap<String, RoomInfoRecord>>,
    /// Held for the full duration of one fetch.
    fetch_slot: Mutex<()>,
}

impl RoomCache {
    /// Build the cache, seeding entries from the persisted session.
    /// Expiry is enforced at read time, so stale records may be seeded
    /// and linger until a lookup or sweep touches them.
    pub fn new(backend: Arc<dyn SupportBackend>, store: SessionStore) -> Self {
        let seeded = store.load().room_cache;
        if !seeded.is_empty() {
            info!("Seeded room cache with {} persisted records", seeded.len());
        }
        Self {
            backend,
            store,
            entries: RwLock::new(seeded),
            fetch_slot: Mutex::new(()),
        }
    }

    /// Current metadata for a room, fetching on miss or expiry.
    pub async fn lookup(&self, room: &RoomId, force_refresh: bool) -> RoomInfoRecord {
        let now = Utc::now();

        if !force_refresh {
            let entries = self.entries.read().await;
            if let Some(record) = entries.get(room.as_str()) {
                if !record.is_expired(now) {
                    debug!("Room cache hit for {} ({})", room, record.source);
                    return record.clone();
                }
            }
        }

        // Single fetch at a time. Waiters re-check after the winner
        // releases the slot.
        let _slot = self.fetch_slot.lock().await;

        if !force_refresh {
            let entries = self.entries.read().await;
            if let Some(record) = entries.get(room.as_str()) {
                if !record.is_expired(Utc::now()) {
                    debug!("Room {} fetched by a concurrent caller", room);
                    return record.clone();
                }
            }
        }

        let record = self.fetch(room).await;

        self.entries
            .write()
            .await
            .insert(room.as_str().to_string(), record.clone());
        self.persist(room, &record);

        record
    }

    /// Primary source first, fallback second, error record last. A
    /// primary payload carrying a non-null `error` field counts as a
    /// primary failure, not a success.
    async fn fetch(&self, room: &RoomId) -> RoomInfoRecord {
        let primary_err = match self.backend.room_info(room).await {
            Ok(payload) => match embedded_error(&payload) {
                None => {
                    info!("Room {} resolved from primary source", room);
                    return RoomInfoRecord::primary(room.clone(), payload, Utc::now());
                }
                Some(err) => {
                    warn!("Primary room source reported an error for {}: {}", room, err);
                    err
                }
            },
            Err(e) => {
                warn!("Primary room source failed for {}: {}", room, e);
                e.to_string()
            }
        };

        match self.backend.room_equipment(room).await {
            Ok(resp) if resp.success => {
                info!(
                    "Room {} resolved from fallback source ({} devices)",
                    room, resp.count
                );
                RoomInfoRecord::fallback(room.clone(), resp.devices, resp.count, Utc::now())
            }
            Ok(_) => {
                warn!("Fallback room source rejected {}", room);
                RoomInfoRecord::failed(
                    room.clone(),
                    format!("primary: {}; fallback: rejected", primary_err),
                    Utc::now(),
                )
            }
            Err(e) => {
                warn!("Fallback room source failed for {}: {}", room, e);
                RoomInfoRecord::failed(
                    room.clone(),
                    format!("primary: {}; fallback: {}", primary_err, e),
                    Utc::now(),
                )
            }
        }
    }

    /// Drop a room's record so the next lookup refetches.
    pub async fn invalidate(&self, room: &RoomId) {
        self.entries.write().await.remove(room.as_str());
        let key = room.as_str().to_string();
        if let Err(e) = self.store.update(|data| {
            data.room_cache.remove(&key);
        }) {
            warn!("Failed to persist cache invalidation: {}", e);
        }
    }

    /// Remove expired records. Returns how many were dropped.
    pub async fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, record| !record.is_expired(now));
        let dropped = before - entries.len();
        drop(entries);

        if dropped > 0 {
            debug!("Swept {} expired room records", dropped);
            if let Err(e) = self.store.update(|data| {
                data.room_cache.retain(|_, record| !record.is_expired(now));
            }) {
                warn!("Failed to persist cache sweep: {}", e);
            }
        }
        dropped
    }

    /// Number of resident records, expired or not.
    pub async fn cached_count(&self) -> usize {
        self.entries.read().await.len()
    }

    fn persist(&self, room: &RoomId, record: &RoomInfoRecord) {
        let key = room.as_str().to_string();
        let record = record.clone();
        if let Err(e) = self.store.update(move |data| {
            data.room_cache.insert(key, record);
        }) {
            warn!("Failed to persist room record: {}", e);
        }
    }
}

/// The error a primary payload embeds, if any. The source reports
/// unknown rooms with HTTP 200 and an `error` field in the body.
fn embedded_error(payload: &serde_json::Value) -> Option<String> {
    match payload.get("error") {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{
        CreateTicketRequest, CreateTicketResponse, DiagnosisRequest, DiagnosisResponse,
        EquipmentResponse,
    };
    use async_trait::async_trait;
    use kiosk_common::room_info::{Equipment, RoomInfoSource, ROOM_INFO_TTL_MINS};
    use kiosk_common::KioskError;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Backend stub with per-endpoint switches and call counters.
    struct StubBackend {
        primary_ok: bool,
        /// Answer the primary lookup with HTTP 200 and an `error` body.
        primary_error_body: bool,
        fallback_ok: bool,
        fetch_delay: Duration,
        primary_calls: AtomicUsize,
        fallback_calls: AtomicUsize,
    }

    impl StubBackend {
        fn new(primary_ok: bool, fallback_ok: bool) -> Self {
            Self {
                primary_ok,
                primary_error_body: false,
                fallback_ok,
                fetch_delay: Duration::ZERO,
                primary_calls: AtomicUsize::new(0),
                fallback_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SupportBackend for StubBackend {
        async fn diagnose(&self, _: &DiagnosisRequest) -> Result<DiagnosisResponse, KioskError> {
            unreachable!("cache tests never diagnose")
        }

        async fn create_ticket(
            &self,
            _: &CreateTicketRequest,
        ) -> Result<CreateTicketResponse, KioskError> {
            unreachable!("cache tests never create tickets")
        }

        async fn room_info(&self, room: &RoomId) -> Result<Value, KioskError> {
            self.primary_calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.fetch_delay).await;
            if self.primary_error_body {
                return Ok(serde_json::json!({ "error": "Salle introuvable" }));
            }
            if self.primary_ok {
                Ok(serde_json::json!({ "salle": room.as_str(), "pavillon": "Pavillon A" }))
            } else {
                Err(KioskError::Network("primary down".into()))
            }
        }

        async fn room_equipment(&self, _: &RoomId) -> Result<EquipmentResponse, KioskError> {
            self.fallback_calls.fetch_add(1, Ordering::SeqCst);
            if self.fallback_ok {
                Ok(EquipmentResponse {
                    success: true,
                    devices: vec![Equipment {
                        id: None,
                        name: "Projecteur".into(),
                        kind: "projecteur".into(),
                        status: "ok".into(),
                    }],
                    count: 1,
                })
            } else {
                Err(KioskError::Network("fallback down".into()))
            }
        }
    }

    fn cache_with(backend: StubBackend) -> (RoomCache, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        (RoomCache::new(Arc::new(backend), store), dir)
    }

    fn room() -> RoomId {
        RoomId::parse("A-1750").unwrap()
    }

    #[tokio::test]
    async fn test_primary_success_is_cached() {
        let (cache, _dir) = cache_with(StubBackend::new(true, true));

        let first = cache.lookup(&room(), false).await;
        assert_eq!(first.source, RoomInfoSource::Primary);

        let second = cache.lookup(&room(), false).await;
        assert_eq!(second.source, RoomInfoSource::Primary);
        assert_eq!(second.fetched_at, first.fetched_at);
        assert_eq!(cache.cached_count().await, 1);
    }

    #[tokio::test]
    async fn test_expired_record_triggers_exactly_one_refetch() {
        let backend = Arc::new(StubBackend::new(true, true));
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        let cache = RoomCache::new(backend.clone() as Arc<dyn SupportBackend>, store);

        // One fetch covers the whole window.
        cache.lookup(&room(), false).await;
        cache.lookup(&room(), false).await;
        assert_eq!(backend.primary_calls.load(Ordering::SeqCst), 1);

        // Replace the record with one fetched past the window.
        let aged = RoomInfoRecord::primary(
            room(),
            serde_json::json!({}),
            Utc::now() - chrono::Duration::minutes(ROOM_INFO_TTL_MINS + 1),
        );
        cache
            .entries
            .write()
            .await
            .insert(room().as_str().to_string(), aged);

        // Expiry costs exactly one more fetch.
        cache.lookup(&room(), false).await;
        cache.lookup(&room(), false).await;
        assert_eq!(backend.primary_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fallback_when_primary_fails() {
        let (cache, _dir) = cache_with(StubBackend::new(false, true));

        let record = cache.lookup(&room(), false).await;
        assert_eq!(record.source, RoomInfoSource::Fallback);
        assert_eq!(record.equipment_list().len(), 1);
        assert_eq!(record.payload["device_count"], 1);
    }

    #[tokio::test]
    async fn test_primary_error_body_uses_fallback() {
        // Unknown rooms come back as HTTP 200 with an `error` field;
        // that must drive the fallback ladder, not get cached as a
        // primary success.
        let mut backend = StubBackend::new(true, true);
        backend.primary_error_body = true;
        let (cache, _dir) = cache_with(backend);

        let record = cache.lookup(&room(), false).await;
        assert_eq!(record.source, RoomInfoSource::Fallback);
        assert_eq!(record.equipment_list().len(), 1);
    }

    #[tokio::test]
    async fn test_primary_error_body_without_fallback_is_an_error_record() {
        let mut backend = StubBackend::new(true, false);
        backend.primary_error_body = true;
        let (cache, _dir) = cache_with(backend);

        let record = cache.lookup(&room(), false).await;
        assert_eq!(record.source, RoomInfoSource::Error);
        assert!(record.error.as_deref().unwrap().contains("Salle introuvable"));
    }

    #[tokio::test]
    async fn test_error_record_when_both_sources_fail() {
        let (cache, _dir) = cache_with(StubBackend::new(false, false));

        let record = cache.lookup(&room(), false).await;
        assert_eq!(record.source, RoomInfoSource::Error);
        assert!(record.error.as_deref().unwrap().contains("primary"));
        assert!(record.equipment_list().is_empty());
        // Error records expire quickly rather than pinning the failure.
        assert!(record.expires_at - record.fetched_at < chrono::Duration::minutes(1));
    }

    #[tokio::test]
    async fn test_force_refresh_refetches() {
        let backend = StubBackend::new(true, true);
        let (cache, _dir) = cache_with(backend);

        cache.lookup(&room(), false).await;
        cache.lookup(&room(), true).await;

        // Both calls hit the primary source.
        let fresh = cache.lookup(&room(), false).await;
        assert_eq!(fresh.source, RoomInfoSource::Primary);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_lookups_share_one_fetch() {
        let mut backend = StubBackend::new(true, true);
        backend.fetch_delay = Duration::from_millis(200);
        let backend = Arc::new(backend);
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        let cache = Arc::new(RoomCache::new(
            backend.clone() as Arc<dyn SupportBackend>,
            store,
        ));

        let a = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.lookup(&room(), false).await })
        };
        let b = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.lookup(&room(), false).await })
        };

        let (ra, rb) = (a.await.unwrap(), b.await.unwrap());
        assert_eq!(ra.fetched_at, rb.fetched_at);
        assert_eq!(backend.primary_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let (cache, _dir) = cache_with(StubBackend::new(true, true));

        cache.lookup(&room(), false).await;
        assert_eq!(cache.cached_count().await, 1);

        cache.invalidate(&room()).await;
        assert_eq!(cache.cached_count().await, 0);
    }

    #[tokio::test]
    async fn test_persisted_records_survive_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        {
            let store = SessionStore::new(path.clone());
            let cache = RoomCache::new(Arc::new(StubBackend::new(true, true)), store);
            cache.lookup(&room(), false).await;
        }

        let store = SessionStore::new(path);
        let cache = RoomCache::new(Arc::new(StubBackend::new(false, false)), store);
        // Served from the seeded cache; the dead backend is never hit.
        let record = cache.lookup(&room(), false).await;
        assert_eq!(record.source, RoomInfoSource::Primary);
    }
}
