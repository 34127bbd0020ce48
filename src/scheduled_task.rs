use std::future::Future;

use chrono::{DateTime, Utc};
use rocket::tokio::{self, task::JoinHandle, time::Duration};

/// A task that runs once at a given point in the future, unless cancelled
/// first.
pub struct ScheduledTask<T> {
    handle: JoinHandle<T>,
}

impl<T> ScheduledTask<T>
where
    T: Send + 'static,
{
    /// Schedule `task` to run at `run_at`, or immediately if that has passed.
    pub fn new<Fut>(task: Fut, run_at: DateTime<Utc>) -> Self
    where
        Fut: Future<Output = T> + Send + 'static,
    {
        let delay = duration_until(run_at);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await
        });
        Self { handle }
    }

    /// Cancel the task. Returns true iff it had already completed before we
    /// could cancel it.
    pub async fn cancel(self) -> bool {
        self.handle.abort();
        self.handle.await.is_ok()
    }
}

/// Time from now until `datetime`, or zero if it is in the past.
fn duration_until(datetime: DateTime<Utc>) -> Duration {
    (datetime - Utc::now()).to_std().unwrap_or(Duration::ZERO)
}
