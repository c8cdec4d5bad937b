use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_utils::extractor::HasConfig;

use crate::services::coordinator::AvailabilityCoordinator;
use crate::services::driver::CoordinatorDriver;
use crate::services::sources::SessionSink;
use crate::services::submission::SessionSubmissionService;

/// One open booking form.
pub struct DraftEntry {
    pub owner_id: String,
    pub opened_at: DateTime<Utc>,
    pub coordinator: Mutex<AvailabilityCoordinator>,
    /// Milliseconds since the registry's epoch at the last access.
    last_active_ms: AtomicU64,
}

/// Open drafts, each visible only to the user who opened it. Drafts idle
/// for longer than `idle_ttl` are evicted.
pub struct DraftRegistry {
    drafts: RwLock<HashMap<Uuid, Arc<DraftEntry>>>,
    idle_ttl: Duration,
    epoch: Instant,
}

impl DraftRegistry {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            drafts: RwLock::new(HashMap::new()),
            idle_ttl,
            epoch: Instant::now(),
        }
    }

    fn offset_ms(&self, at: Instant) -> u64 {
        at.saturating_duration_since(self.epoch).as_millis() as u64
    }

    pub async fn insert(&self, owner_id: &str, coordinator: AvailabilityCoordinator) -> (Uuid, Arc<DraftEntry>) {
        let now = Instant::now();
        self.evict_idle(now).await;

        let draft_id = Uuid::new_v4();
        let entry = Arc::new(DraftEntry {
            owner_id: owner_id.to_string(),
            opened_at: Utc::now(),
            coordinator: Mutex::new(coordinator),
            last_active_ms: AtomicU64::new(self.offset_ms(now)),
        });
        self.drafts.write().await.insert(draft_id, entry.clone());
        debug!("Opened draft {} for user {}", draft_id, owner_id);
        (draft_id, entry)
    }

    /// Looks up the owner's draft and marks it active.
    pub async fn get(&self, draft_id: Uuid, owner_id: &str) -> Option<Arc<DraftEntry>> {
        let entry = self
            .drafts
            .read()
            .await
            .get(&draft_id)
            .filter(|entry| entry.owner_id == owner_id)
            .cloned()?;
        entry
            .last_active_ms
            .store(self.offset_ms(Instant::now()), Ordering::Relaxed);
        Some(entry)
    }

    /// Removes the draft. In-flight queries for it finish against the
    /// detached entry and are dropped with it.
    pub async fn remove(&self, draft_id: Uuid, owner_id: &str) -> bool {
        let mut drafts = self.drafts.write().await;
        match drafts.get(&draft_id) {
            Some(entry) if entry.owner_id == owner_id => {
                drafts.remove(&draft_id);
                debug!("Closed draft {}", draft_id);
                true
            }
            _ => false,
        }
    }

    /// Drops drafts not accessed within the idle TTL as of `now`. Returns
    /// how many were evicted.
    pub async fn evict_idle(&self, now: Instant) -> usize {
        let cutoff = self.offset_ms(now).saturating_sub(self.idle_ttl.as_millis() as u64);
        let mut drafts = self.drafts.write().await;
        let before = drafts.len();
        drafts.retain(|_, entry| entry.last_active_ms.load(Ordering::Relaxed) >= cutoff);

        let evicted = before - drafts.len();
        if evicted > 0 {
            info!("Evicted {} idle drafts", evicted);
        }
        evicted
    }

    pub async fn len(&self) -> usize {
        self.drafts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.drafts.read().await.is_empty()
    }
}

/// Shared state behind the desk routes.
pub struct DeskState {
    pub config: Arc<AppConfig>,
    pub drafts: DraftRegistry,
    pub driver: CoordinatorDriver,
    pub sink: Arc<dyn SessionSink>,
}

impl DeskState {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self {
            drafts: DraftRegistry::new(config.draft_idle_ttl()),
            driver: CoordinatorDriver::new(&config),
            sink: Arc::new(SessionSubmissionService::new(&config)),
            config,
        }
    }

    pub fn with_parts(
        config: Arc<AppConfig>,
        driver: CoordinatorDriver,
        sink: Arc<dyn SessionSink>,
    ) -> Self {
        Self {
            drafts: DraftRegistry::new(config.draft_idle_ttl()),
            config,
            driver,
            sink,
        }
    }
}

/// Periodically evicts idle drafts for as long as the desk is running.
pub fn spawn_draft_sweeper(state: Arc<DeskState>) -> JoinHandle<()> {
    let period = state.config.draft_idle_ttl().clamp(Duration::from_secs(1), Duration::from_secs(60));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            state.drafts.evict_idle(Instant::now()).await;
        }
    })
}

impl HasConfig for DeskState {
    fn config(&self) -> &AppConfig {
        &self.config
    }
}
