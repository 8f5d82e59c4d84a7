use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, warn};

use crate::client::MarkReadApi;
use crate::reader::scheduled::ScheduledTask;

pub const DEFAULT_MARK_READ_DELAY: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    Idle,
    Running,
    Paused,
    /// Deadline reached; the mark-as-read call is in flight.
    Firing,
}

/// Read-only view of the timer for the front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerState {
    pub article_id: Option<String>,
    pub phase: TimerPhase,
    pub is_paused: bool,
    pub remaining: Duration,
    pub delay: Duration,
}

/// Result of the most recent mark-as-read call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FireOutcome {
    pub article_id: String,
    pub marked: bool,
}

struct TimerInner {
    phase: TimerPhase,
    article_id: Option<String>,
    /// Time left when paused; the running countdown lives in `task`.
    remaining: Duration,
    task: Option<ScheduledTask>,
    /// Bumped by every schedule and reset so stale callbacks and cleanups
    /// can tell they no longer own the timer.
    generation: u64,
    last_fire: Option<FireOutcome>,
}

type SharedInner = Arc<Mutex<TimerInner>>;

fn lock(inner: &SharedInner) -> MutexGuard<'_, TimerInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks the article being viewed as read once it has been on screen for
/// the dwell delay.
///
/// Only one countdown exists at a time: starting a new article cancels the
/// previous one, so only the most recently started article can be marked.
/// Scrolling pauses and resumes the countdown; leaving the article cancels it.
pub struct AutoMarkReadTimer {
    inner: SharedInner,
    api: Arc<dyn MarkReadApi + Send + Sync>,
    delay: Duration,
}

impl AutoMarkReadTimer {
    pub fn new(api: Arc<dyn MarkReadApi + Send + Sync>, delay: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(TimerInner {
                phase: TimerPhase::Idle,
                article_id: None,
                remaining: delay,
                task: None,
                generation: 0,
                last_fire: None,
            })),
            api,
            delay,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn start(&self, article_id: impl Into<String>) {
        let article_id = article_id.into();
        let mut inner = lock(&self.inner);

        let same_article = inner.article_id.as_deref() == Some(article_id.as_str());
        if same_article && matches!(inner.phase, TimerPhase::Running | TimerPhase::Paused) {
            return;
        }

        Self::reset(&mut inner, self.delay);
        debug!("Dwell timer started for article {}", article_id);
        inner.article_id = Some(article_id);
        inner.phase = TimerPhase::Running;
        self.schedule(&mut inner, self.delay);
    }

    pub fn pause(&self) {
        let mut inner = lock(&self.inner);
        if inner.phase != TimerPhase::Running {
            return;
        }
        if let Some(task) = inner.task.take() {
            inner.remaining = task.remaining();
            task.cancel();
        }
        inner.phase = TimerPhase::Paused;
    }

    pub fn resume(&self) {
        let mut inner = lock(&self.inner);
        if inner.phase != TimerPhase::Paused || inner.article_id.is_none() {
            return;
        }
        inner.phase = TimerPhase::Running;
        let remaining = inner.remaining;
        self.schedule(&mut inner, remaining);
    }

    /// Drops the countdown without marking anything read.
    pub fn cancel(&self) {
        let mut inner = lock(&self.inner);
        Self::reset(&mut inner, self.delay);
    }

    pub fn is_active(&self) -> bool {
        lock(&self.inner).phase != TimerPhase::Idle
    }

    pub fn state(&self) -> TimerState {
        let inner = lock(&self.inner);
        let remaining = match inner.phase {
            TimerPhase::Running => inner
                .task
                .as_ref()
                .map(ScheduledTask::remaining)
                .unwrap_or(inner.remaining),
            TimerPhase::Firing => Duration::ZERO,
            TimerPhase::Idle | TimerPhase::Paused => inner.remaining,
        };
        TimerState {
            article_id: inner.article_id.clone(),
            phase: inner.phase,
            is_paused: inner.phase == TimerPhase::Paused,
            remaining,
            delay: self.delay,
        }
    }

    /// Outcome of the last fire, kept across later starts and cancels.
    pub fn last_fire(&self) -> Option<FireOutcome> {
        lock(&self.inner).last_fire.clone()
    }

    fn reset(inner: &mut TimerInner, delay: Duration) {
        if let Some(task) = inner.task.take() {
            task.cancel();
        }
        inner.phase = TimerPhase::Idle;
        inner.article_id = None;
        inner.remaining = delay;
        inner.generation += 1;
    }

    fn schedule(&self, inner: &mut TimerInner, after: Duration) {
        inner.generation += 1;
        let generation = inner.generation;
        let shared = Arc::clone(&self.inner);
        let api = Arc::clone(&self.api);
        let delay = self.delay;
        inner.task = Some(ScheduledTask::spawn(after, async move {
            fire(shared, api, generation, delay).await;
        }));
    }
}

impl Drop for AutoMarkReadTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn fire(
    shared: SharedInner,
    api: Arc<dyn MarkReadApi + Send + Sync>,
    generation: u64,
    delay: Duration,
) {
    let article_id = {
        let mut inner = lock(&shared);
        if inner.generation != generation || inner.phase != TimerPhase::Running {
            return;
        }
        let Some(article_id) = inner.article_id.clone() else {
            return;
        };
        // Detach: a cancel from here on must not abort the call below.
        inner.task = None;
        inner.phase = TimerPhase::Firing;
        article_id
    };

    let mut cleanup = FireCleanup {
        shared: &shared,
        generation,
        delay,
        article_id,
        marked: false,
    };

    debug!("Dwell time reached, marking article {} as read", cleanup.article_id);
    match api.mark_as_read(&cleanup.article_id).await {
        Ok(()) => cleanup.marked = true,
        Err(e) => warn!("Failed to mark article {} as read: {}", cleanup.article_id, e),
    }
}

/// Returns the timer to idle after a fire, unless a newer start or cancel
/// already took it over.
struct FireCleanup<'a> {
    shared: &'a SharedInner,
    generation: u64,
    delay: Duration,
    article_id: String,
    marked: bool,
}

impl Drop for FireCleanup<'_> {
    fn drop(&mut self) {
        let mut inner = lock(self.shared);
        inner.last_fire = Some(FireOutcome {
            article_id: std::mem::take(&mut self.article_id),
            marked: self.marked,
        });
        if inner.generation == self.generation {
            AutoMarkReadTimer::reset(&mut inner, self.delay);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{BrookError, Result};
    use async_trait::async_trait;
    use tokio::time::advance;

    #[derive(Default)]
    struct RecordingApi {
        calls: Mutex<Vec<String>>,
        fail: bool,
        panic: bool,
        latency: Duration,
    }

    impl RecordingApi {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MarkReadApi for RecordingApi {
        async fn mark_as_read(&self, article_id: &str) -> Result<()> {
            self.calls.lock().unwrap().push(article_id.to_string());
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            if self.panic {
                panic!("mark-as-read blew up");
            }
            if self.fail {
                return Err(BrookError::Other("Server error".into()));
            }
            Ok(())
        }
    }

    fn timer_with(api: RecordingApi) -> (AutoMarkReadTimer, Arc<RecordingApi>) {
        let api = Arc::new(api);
        (AutoMarkReadTimer::new(api.clone(), DEFAULT_MARK_READ_DELAY), api)
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    async fn step(d: Duration) {
        advance(d).await;
        settle().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_delay() {
        let (timer, api) = timer_with(RecordingApi::default());
        timer.start("A");
        assert!(timer.is_active());
        assert_eq!(timer.state().remaining, ms(2000));

        step(ms(1999)).await;
        assert!(api.calls().is_empty());

        step(ms(1)).await;
        assert_eq!(api.calls(), vec!["A"]);

        let state = timer.state();
        assert_eq!(state.phase, TimerPhase::Idle);
        assert_eq!(state.article_id, None);
        assert_eq!(state.remaining, ms(2000));
        assert!(!state.is_paused);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_resume_accuracy() {
        let (timer, api) = timer_with(RecordingApi::default());
        timer.start("A");

        step(ms(500)).await;
        timer.pause();
        let state = timer.state();
        assert!(state.is_paused);
        assert_eq!(state.remaining, ms(1500));

        step(ms(1000)).await;
        assert!(api.calls().is_empty());
        assert_eq!(timer.state().remaining, ms(1500));

        timer.resume();
        step(ms(1499)).await;
        assert!(api.calls().is_empty());

        step(ms(1)).await;
        assert_eq!(api.calls(), vec!["A"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_pause_resume_cycles() {
        let (timer, api) = timer_with(RecordingApi::default());
        timer.start("A");

        for _ in 0..3 {
            step(ms(400)).await;
            timer.pause();
            step(ms(5000)).await;
            timer.resume();
        }
        assert_eq!(timer.state().remaining, ms(800));

        step(ms(799)).await;
        assert!(api.calls().is_empty());
        step(ms(1)).await;
        assert_eq!(api.calls(), vec!["A"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_starting_new_article_cancels_previous() {
        let (timer, api) = timer_with(RecordingApi::default());
        timer.start("A");
        step(ms(1500)).await;

        timer.start("B");
        assert_eq!(timer.state().article_id.as_deref(), Some("B"));
        assert_eq!(timer.state().remaining, ms(2000));

        step(ms(1999)).await;
        assert!(api.calls().is_empty());
        step(ms(1)).await;
        step(ms(10_000)).await;
        assert_eq!(api.calls(), vec!["B"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_replaces_paused_timer() {
        let (timer, api) = timer_with(RecordingApi::default());
        timer.start("A");
        step(ms(300)).await;
        timer.pause();

        timer.start("B");
        assert!(!timer.state().is_paused);
        step(ms(2000)).await;
        assert_eq!(api.calls(), vec!["B"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_same_article_keeps_countdown() {
        let (timer, api) = timer_with(RecordingApi::default());
        timer.start("A");
        step(ms(1500)).await;

        timer.start("A");
        assert_eq!(timer.state().remaining, ms(500));
        step(ms(500)).await;
        assert_eq!(api.calls(), vec!["A"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_fire() {
        let (timer, api) = timer_with(RecordingApi::default());
        timer.start("A");
        step(ms(1000)).await;

        timer.cancel();
        assert!(!timer.is_active());
        assert_eq!(timer.state().article_id, None);
        assert_eq!(timer.state().remaining, ms(2000));

        step(ms(5000)).await;
        assert!(api.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_and_resume_are_noops_when_not_applicable() {
        let (timer, api) = timer_with(RecordingApi::default());

        timer.pause();
        timer.resume();
        assert_eq!(timer.state().phase, TimerPhase::Idle);

        timer.start("A");
        timer.resume();
        assert_eq!(timer.state().phase, TimerPhase::Running);

        timer.pause();
        timer.pause();
        assert_eq!(timer.state().remaining, ms(2000));

        timer.cancel();
        timer.resume();
        step(ms(5000)).await;
        assert!(api.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_mark_as_read_returns_to_idle() {
        let (timer, api) = timer_with(RecordingApi {
            fail: true,
            ..Default::default()
        });
        timer.start("A");
        step(ms(2000)).await;

        assert_eq!(api.calls(), vec!["A"]);
        assert!(!timer.is_active());
        assert_eq!(
            timer.last_fire(),
            Some(FireOutcome {
                article_id: "A".into(),
                marked: false,
            })
        );

        timer.start("B");
        step(ms(2000)).await;
        assert_eq!(api.calls(), vec!["A", "B"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_fire_reports_success() {
        let (timer, _api) = timer_with(RecordingApi::default());
        assert!(timer.last_fire().is_none());

        timer.start("A");
        step(ms(2000)).await;
        assert_eq!(
            timer.last_fire(),
            Some(FireOutcome {
                article_id: "A".into(),
                marked: true,
            })
        );

        timer.start("B");
        timer.cancel();
        assert_eq!(timer.last_fire().unwrap().article_id, "A");
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_mark_as_read_still_cleans_up() {
        let (timer, api) = timer_with(RecordingApi {
            panic: true,
            ..Default::default()
        });
        timer.start("A");
        step(ms(2000)).await;

        assert_eq!(api.calls(), vec!["A"]);
        assert_eq!(timer.state().phase, TimerPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_start_during_inflight_call_is_not_clobbered() {
        let (timer, api) = timer_with(RecordingApi {
            latency: ms(100),
            ..Default::default()
        });
        timer.start("A");
        step(ms(2000)).await;
        assert_eq!(timer.state().phase, TimerPhase::Firing);
        assert_eq!(timer.state().remaining, Duration::ZERO);

        timer.start("B");
        step(ms(100)).await;
        let state = timer.state();
        assert_eq!(state.article_id.as_deref(), Some("B"));
        assert_eq!(state.phase, TimerPhase::Running);

        step(ms(1900)).await;
        assert_eq!(api.calls(), vec!["A", "B"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_inflight_call_lets_it_finish() {
        let (timer, api) = timer_with(RecordingApi {
            latency: ms(100),
            ..Default::default()
        });
        timer.start("A");
        step(ms(2000)).await;

        timer.cancel();
        assert!(!timer.is_active());
        step(ms(100)).await;
        assert_eq!(api.calls(), vec!["A"]);
        assert!(!timer.is_active());
    }
}
