use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use std::time::Duration;

use chrono::Utc;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::app::{BrookError, Result};
use crate::client::SyncApi;
use crate::domain::{SyncAttempt, SyncMetrics, SyncPayload, SyncStatus};
use crate::notify::{Notification, NotificationSink, RetryAction};
use crate::store::{CacheData, CacheStore, StoreSnapshot, StoreSnapshotManager};
use crate::sync::classify::ErrorClassifier;
use crate::sync::debounce::SyncDebouncer;
use crate::sync::skeleton::SkeletonStateManager;

pub const ALREADY_IN_PROGRESS: &str = "Sync already in progress";

static INSTANCE: RwLock<Option<Arc<RefreshCoordinator>>> = RwLock::new(None);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncKind {
    /// Started by the user: shows skeletons, disables the sync button, toasts.
    Manual,
    /// Scheduler tick: updates data silently.
    Background,
}

/// Sync state exposed to the front end besides the skeleton flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncUiState {
    pub button_disabled: bool,
    pub error_message: Option<String>,
}

impl SyncUiState {
    pub fn has_error(&self) -> bool {
        self.error_message.is_some()
    }
}

/// Runs sync attempts one at a time.
///
/// The API client only fetches; the coordinator swaps the fetched
/// collections into the cache in one step once the attempt succeeds, and
/// restores the snapshot taken at the start if it fails. The debounce gate,
/// skeleton flags and sync button are released by a drop guard, which also
/// covers panics and futures dropped mid-flight.
///
/// An application builds one coordinator and shares it; [`install`] and
/// [`instance`] expose it process-wide for code that cannot have it passed in.
///
/// [`install`]: RefreshCoordinator::install
/// [`instance`]: RefreshCoordinator::instance
pub struct RefreshCoordinator {
    api: Arc<dyn SyncApi + Send + Sync>,
    cache: Arc<CacheStore>,
    notifier: Arc<dyn NotificationSink>,
    gate: Mutex<SyncDebouncer>,
    snapshots: StoreSnapshotManager,
    skeletons: SkeletonStateManager,
    ui: watch::Sender<SyncUiState>,
    last_attempt: Mutex<Option<SyncAttempt>>,
    this: Weak<RefreshCoordinator>,
}

impl RefreshCoordinator {
    pub fn new(
        api: Arc<dyn SyncApi + Send + Sync>,
        cache: Arc<CacheStore>,
        notifier: Arc<dyn NotificationSink>,
        debounce_window: Duration,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            api,
            cache,
            notifier,
            gate: Mutex::new(SyncDebouncer::new(debounce_window)),
            snapshots: StoreSnapshotManager::new(),
            skeletons: SkeletonStateManager::new(),
            ui: watch::channel(SyncUiState::default()).0,
            last_attempt: Mutex::new(None),
            this: this.clone(),
        })
    }

    /// Registers the process-wide coordinator. Fails if one is installed.
    pub fn install(coordinator: Arc<Self>) -> Result<Arc<Self>> {
        let mut slot = INSTANCE.write().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return Err(BrookError::Other(
                "A sync coordinator is already installed".to_string(),
            ));
        }
        *slot = Some(coordinator.clone());
        Ok(coordinator)
    }

    pub fn instance() -> Option<Arc<Self>> {
        INSTANCE
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Clears the process-wide slot so tests can install a fresh coordinator.
    pub fn reset() {
        INSTANCE
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    fn lock_gate(&self) -> MutexGuard<'_, SyncDebouncer> {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    pub fn skeletons(&self) -> &SkeletonStateManager {
        &self.skeletons
    }

    pub fn ui_state(&self) -> SyncUiState {
        self.ui.borrow().clone()
    }

    pub fn subscribe_ui(&self) -> watch::Receiver<SyncUiState> {
        self.ui.subscribe()
    }

    pub fn is_syncing(&self) -> bool {
        self.lock_gate().is_in_progress()
    }

    pub fn last_attempt(&self) -> Option<SyncAttempt> {
        self.last_attempt
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn dismiss_error(&self) {
        self.ui.send_if_modified(|ui| ui.error_message.take().is_some());
    }

    /// User-initiated sync.
    ///
    /// Returns `None` without side effects other than an info notification
    /// when another attempt is running or the previous one started less than
    /// the debounce window ago. Failures are reported through the
    /// notification sink and come back as a [`SyncStatus::Failed`] attempt.
    pub async fn request_sync(&self) -> Option<SyncAttempt> {
        let now = Instant::now();
        {
            let mut gate = self.lock_gate();
            if !gate.can_start(now) {
                let since_last = gate.last_attempt_at().map(|at| now.duration_since(at));
                debug!(
                    "Sync request rejected (in progress: {}, since last: {:?}, window: {:?})",
                    gate.is_in_progress(),
                    since_last,
                    gate.window()
                );
                drop(gate);
                self.notifier.notify(Notification::info(ALREADY_IN_PROGRESS));
                return None;
            }
            gate.record_attempt_start(now);
        }

        let guard = AttemptGuard {
            coordinator: self,
            kind: SyncKind::Manual,
        };
        let snapshot = self.snapshots.capture(&self.cache);
        self.skeletons.show_all();
        self.ui.send_modify(|ui| ui.button_disabled = true);

        let attempt = self.run_attempt(snapshot, SyncKind::Manual).await;
        drop(guard);

        self.remember(&attempt);
        Some(attempt)
    }

    /// Scheduler-initiated sync.
    ///
    /// Ignores the debounce window and leaves skeletons and the sync button
    /// alone, but never overlaps another attempt: returns `None` silently
    /// while one is in flight.
    pub async fn request_background_sync(&self) -> Option<SyncAttempt> {
        {
            let mut gate = self.lock_gate();
            if gate.is_in_progress() {
                debug!("Background sync skipped: attempt in flight");
                return None;
            }
            gate.record_background_start();
        }

        let guard = AttemptGuard {
            coordinator: self,
            kind: SyncKind::Background,
        };
        let snapshot = self.snapshots.capture(&self.cache);

        let attempt = self.run_attempt(snapshot, SyncKind::Background).await;
        drop(guard);

        self.remember(&attempt);
        Some(attempt)
    }

    async fn run_attempt(&self, snapshot: StoreSnapshot, kind: SyncKind) -> SyncAttempt {
        let attempt = SyncAttempt::begin();
        info!("Sync {} started ({:?})", attempt.sync_id, kind);

        match self.api.perform_sync().await {
            Ok(payload) if payload.response.metrics.classify() != SyncStatus::Failed => {
                self.commit(attempt, payload, kind)
            }
            Ok(payload) => {
                let metrics = payload.response.metrics;
                let error = BrookError::AllFeedsFailed(metrics.failed_feeds);
                self.roll_back(attempt, snapshot, error, metrics, kind)
            }
            Err(error) => self.roll_back(attempt, snapshot, error, SyncMetrics::default(), kind),
        }
    }

    /// Installs the fetched collections in one step.
    fn commit(&self, attempt: SyncAttempt, payload: SyncPayload, kind: SyncKind) -> SyncAttempt {
        let SyncPayload {
            response,
            feeds,
            tags,
            articles,
        } = payload;
        self.cache.replace(
            CacheData::default()
                .with_feeds(feeds)
                .with_tags(tags)
                .with_articles(articles)
                .with_last_update(Utc::now()),
        );
        self.dismiss_error();

        let metrics = response.metrics;
        let attempt = attempt.complete(response.sync_id, metrics);
        info!(
            "Sync {} {:?}: {} new, {} deleted, {} new tags, {} failed feeds",
            attempt.sync_id,
            attempt.status,
            metrics.new_articles,
            metrics.deleted_articles,
            metrics.new_tags,
            metrics.failed_feeds
        );

        if kind == SyncKind::Manual {
            let message = match attempt.status {
                SyncStatus::Partial => format!(
                    "Synced {} new articles ({} feeds failed)",
                    metrics.new_articles, metrics.failed_feeds
                ),
                _ => format!("Synced {} new articles", metrics.new_articles),
            };
            self.notifier.notify(Notification::success(message));
        }

        attempt
    }

    fn roll_back(
        &self,
        attempt: SyncAttempt,
        snapshot: StoreSnapshot,
        error: BrookError,
        metrics: SyncMetrics,
        kind: SyncKind,
    ) -> SyncAttempt {
        self.snapshots.restore(&self.cache, snapshot);
        warn!("Sync {} failed, cache restored: {}", attempt.sync_id, error);

        if kind == SyncKind::Manual {
            let classified = ErrorClassifier::classify(&error);
            let mut notification = Notification::error(classified.user_message.clone());
            if classified.retryable {
                if let Some(retry) = self.retry_action() {
                    notification = notification.with_retry(retry);
                }
            }
            self.ui
                .send_modify(|ui| ui.error_message = Some(classified.user_message));
            self.notifier.notify(notification);
        }

        attempt.fail(metrics)
    }

    /// `None` outside a tokio runtime, where there is nothing to spawn on.
    fn retry_action(&self) -> Option<RetryAction> {
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!("Retry unavailable without a tokio runtime: {}", e);
                return None;
            }
        };
        let this = self.this.clone();
        Some(RetryAction::new(move || {
            if let Some(coordinator) = this.upgrade() {
                runtime.spawn(async move {
                    coordinator.request_sync().await;
                });
            }
        }))
    }

    fn remember(&self, attempt: &SyncAttempt) {
        *self
            .last_attempt
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(attempt.clone());
    }
}

/// Releases everything an attempt holds, on every exit path.
struct AttemptGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    kind: SyncKind,
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        let coordinator = self.coordinator;
        if self.kind == SyncKind::Manual {
            coordinator.skeletons.hide_all();
        }
        coordinator.lock_gate().record_attempt_end();
        if self.kind == SyncKind::Manual {
            coordinator.ui.send_modify(|ui| ui.button_disabled = false);
        }
    }
}
