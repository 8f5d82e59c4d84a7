use std::time::Duration;

use tokio::time::Instant;

pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// Gate deciding whether a new sync attempt may start.
///
/// `can_start(now)` holds exactly when no attempt is in progress and at least
/// `window` has passed since the last attempt started.
#[derive(Debug, Clone)]
pub struct SyncDebouncer {
    window: Duration,
    in_progress: bool,
    last_attempt_at: Option<Instant>,
}

impl SyncDebouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            in_progress: false,
            last_attempt_at: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn is_in_progress(&self) -> bool {
        self.in_progress
    }

    pub fn last_attempt_at(&self) -> Option<Instant> {
        self.last_attempt_at
    }

    pub fn can_start(&self, now: Instant) -> bool {
        if self.in_progress {
            return false;
        }
        match self.last_attempt_at {
            Some(last) => now.saturating_duration_since(last) >= self.window,
            None => true,
        }
    }

    pub fn record_attempt_start(&mut self, now: Instant) {
        self.in_progress = true;
        self.last_attempt_at = Some(now);
    }

    /// Marks an attempt in progress without moving the debounce origin.
    pub(crate) fn record_background_start(&mut self) {
        self.in_progress = true;
    }

    pub fn record_attempt_end(&mut self) {
        self.in_progress = false;
    }
}

impl Default for SyncDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_WINDOW)
    }
}
