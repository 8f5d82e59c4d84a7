use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

/// A future scheduled to run once a deadline passes.
///
/// Dropping the handle detaches the task, like a `JoinHandle`; use
/// [`cancel`](Self::cancel) to stop it.
#[derive(Debug)]
pub struct ScheduledTask {
    handle: JoinHandle<()>,
    deadline: Instant,
}

impl ScheduledTask {
    pub fn spawn<F>(delay: Duration, task: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let deadline = Instant::now() + delay;
        let handle = tokio::spawn(async move {
            sleep_until(deadline).await;
            task.await;
        });
        Self { handle, deadline }
    }

    /// Time left until the deadline, zero once it has passed.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Stops the task if it has not started running the scheduled future.
    pub fn cancel(self) {
        self.handle.abort();
    }
}
