//! Background sync scheduler.
//!
//! Drives [`RefreshCoordinator::request_background_sync`] on a fixed interval
//! until shut down. Attempts it starts are reported to an optional listener.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::domain::SyncAttempt;
use crate::sync::RefreshCoordinator;

/// Parse interval string like "1h", "30m", "6h", "1d" into seconds.
pub fn parse_interval(s: &str) -> Result<u64, String> {
    let s = s.trim().to_lowercase();

    let (digits, unit) = match s.char_indices().last() {
        Some((i, c)) if c.is_ascii_alphabetic() => (&s[..i], c),
        _ => (s.as_str(), 's'),
    };

    let multiplier = match unit {
        's' => 1,
        'm' => 60,
        'h' => 3600,
        'd' => 86400,
        _ => {
            return Err(format!(
                "Invalid interval: {}. Use format like '1h', '30m', '1d'",
                s
            ))
        }
    };

    let value = digits
        .parse::<u64>()
        .map_err(|_| format!("Invalid interval: {}. Use format like '1h', '30m', '1d'", s))?;
    if value == 0 {
        return Err("Interval must be greater than zero".to_string());
    }
    Ok(value * multiplier)
}

/// Format interval for display
pub fn format_interval(secs: u64) -> String {
    if secs >= 86400 && secs.is_multiple_of(86400) {
        format!("{}d", secs / 86400)
    } else if secs >= 3600 && secs.is_multiple_of(3600) {
        format!("{}h", secs / 3600)
    } else if secs >= 60 && secs.is_multiple_of(60) {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}

pub struct BackgroundSync {
    coordinator: Arc<RefreshCoordinator>,
    every: Duration,
    sync_on_start: bool,
    listener: Option<mpsc::UnboundedSender<SyncAttempt>>,
}

impl BackgroundSync {
    pub fn new(coordinator: Arc<RefreshCoordinator>, every: Duration) -> Self {
        Self {
            coordinator,
            every,
            sync_on_start: true,
            listener: None,
        }
    }

    pub fn sync_on_start(mut self, enabled: bool) -> Self {
        self.sync_on_start = enabled;
        self
    }

    /// Sends every attempt the scheduler actually started.
    pub fn with_listener(mut self, listener: mpsc::UnboundedSender<SyncAttempt>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Background sync started (interval: {})",
            format_interval(self.every.as_secs())
        );

        let mut timer = interval(self.every);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        if !self.sync_on_start {
            // The first tick completes immediately.
            timer.tick().await;
        }

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    match self.coordinator.request_background_sync().await {
                        Some(attempt) => {
                            if let Some(listener) = &self.listener {
                                let _ = listener.send(attempt);
                            }
                        }
                        None => debug!("Background tick skipped, sync already running"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Background sync stopped");
    }

    pub fn spawn(self) -> BackgroundSyncHandle {
        let (tx, rx) = watch::channel(false);
        let join = tokio::spawn(self.run(rx));
        BackgroundSyncHandle { tx, join }
    }
}

/// Handle to stop a spawned [`BackgroundSync`].
pub struct BackgroundSyncHandle {
    tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl BackgroundSyncHandle {
    /// Stops the scheduler and waits for it. An attempt already in flight
    /// finishes first.
    pub async fn shutdown(self) {
        let _ = self.tx.send(true);
        if let Err(e) = self.join.await {
            tracing::error!("Background sync task failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::Result;
    use crate::client::SyncApi;
    use crate::domain::{SyncMetrics, SyncPayload, SyncResponse, SyncStatus};
    use crate::notify::LogSink;
    use crate::store::CacheStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::advance;

    struct CountingApi {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SyncApi for CountingApi {
        async fn perform_sync(&self) -> Result<SyncPayload> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(SyncPayload {
                response: SyncResponse {
                    sync_id: format!("bg-{}", n),
                    status: SyncStatus::Completed,
                    metrics: SyncMetrics::default(),
                },
                feeds: Vec::new(),
                tags: Vec::new(),
                articles: Vec::new(),
            })
        }
    }

    fn setup() -> (Arc<RefreshCoordinator>, Arc<CountingApi>) {
        let api = Arc::new(CountingApi {
            calls: AtomicUsize::new(0),
        });
        let coordinator = RefreshCoordinator::new(
            api.clone(),
            Arc::new(CacheStore::new()),
            Arc::new(LogSink),
            Duration::from_millis(500),
        );
        (coordinator, api)
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("1h").unwrap(), 3600);
        assert_eq!(parse_interval("30m").unwrap(), 1800);
        assert_eq!(parse_interval("1d").unwrap(), 86400);
        assert_eq!(parse_interval("60s").unwrap(), 60);
        assert_eq!(parse_interval("3600").unwrap(), 3600);
        assert_eq!(parse_interval(" 6H ").unwrap(), 21600);
        assert!(parse_interval("invalid").is_err());
        assert!(parse_interval("5w").is_err());
        assert!(parse_interval("0m").is_err());
        assert!(parse_interval("").is_err());
    }

    #[test]
    fn test_format_interval() {
        assert_eq!(format_interval(3600), "1h");
        assert_eq!(format_interval(1800), "30m");
        assert_eq!(format_interval(86400), "1d");
        assert_eq!(format_interval(90), "90s");
        assert_eq!(format_interval(7200), "2h");
    }

    #[tokio::test(start_paused = true)]
    async fn test_syncs_on_start_and_every_interval() {
        let (coordinator, api) = setup();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = BackgroundSync::new(coordinator, Duration::from_secs(60))
            .with_listener(tx)
            .spawn();

        settle().await;
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
        assert_eq!(rx.recv().await.unwrap().sync_id, "bg-1");

        advance(Duration::from_secs(60)).await;
        settle().await;
        assert_eq!(api.calls.load(Ordering::SeqCst), 2);

        handle.shutdown().await;
        advance(Duration::from_secs(600)).await;
        settle().await;
        assert_eq!(api.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_initial_sync() {
        let (coordinator, api) = setup();
        let handle = BackgroundSync::new(coordinator, Duration::from_secs(60))
            .sync_on_start(false)
            .spawn();

        settle().await;
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);

        advance(Duration::from_secs(60)).await;
        settle().await;
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);

        handle.shutdown().await;
    }
}
