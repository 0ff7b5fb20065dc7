use std::future::Future;
use std::sync::{Mutex, PoisonError};

use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, warn};

/// Handle to one piece of delayed work.
pub struct ScheduledTask<T> {
    name: &'static str,
    handle: JoinHandle<T>,
}

impl<T> ScheduledTask<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Output of the task, or `None` if it was cancelled before finishing.
    pub async fn wait(self) -> Option<T> {
        match self.handle.await {
            Ok(output) => Some(output),
            Err(error) if error.is_cancelled() => None,
            Err(error) => {
                warn!(
                    event_name = "scheduler.task.panicked",
                    task = self.name,
                    error = %error,
                    "scheduled task panicked"
                );
                None
            }
        }
    }
}

/// Owns every task a session schedules so teardown can cancel them.
/// Dropping the scheduler cancels whatever is still pending.
#[derive(Default)]
pub struct TaskScheduler {
    pending: Mutex<Vec<(&'static str, AbortHandle)>>,
}

impl TaskScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule<F>(&self, name: &'static str, future: F) -> ScheduledTask<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let handle = tokio::spawn(future);
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.retain(|(_, abort)| !abort.is_finished());
        pending.push((name, handle.abort_handle()));
        debug!(event_name = "scheduler.task.scheduled", task = name, "task scheduled");

        ScheduledTask { name, handle }
    }

    pub fn pending_count(&self) -> usize {
        let pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.iter().filter(|(_, abort)| !abort.is_finished()).count()
    }

    /// Aborts every unfinished task and returns how many were still pending.
    pub fn cancel_all(&self) -> usize {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let mut cancelled = 0;
        for (name, abort) in pending.drain(..) {
            if !abort.is_finished() {
                abort.abort();
                cancelled += 1;
                debug!(event_name = "scheduler.task.cancelled", task = name, "task cancelled");
            }
        }
        cancelled
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::TaskScheduler;

    #[tokio::test(start_paused = true)]
    async fn completed_task_yields_its_output() {
        let scheduler = TaskScheduler::new();
        let task = scheduler.schedule("answer", async {
            tokio::time::sleep(Duration::from_millis(600)).await;
            42
        });

        assert_eq!(task.name(), "answer");
        assert_eq!(task.wait().await, Some(42));
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_task_never_runs_its_side_effect() {
        let scheduler = TaskScheduler::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let task = scheduler.schedule("fire", async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            counter.fetch_add(1, Ordering::SeqCst);
        });

        task.cancel();
        tokio::time::sleep(Duration::from_secs(20)).await;

        assert_eq!(task.wait().await, None);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_all_and_drop_abort_pending_work() {
        let fired = Arc::new(AtomicUsize::new(0));
        let scheduler = TaskScheduler::new();
        for _ in 0..3 {
            let counter = fired.clone();
            scheduler.schedule("tick", async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(scheduler.pending_count(), 3);
        assert_eq!(scheduler.cancel_all(), 3);

        let dropped = TaskScheduler::new();
        let counter = fired.clone();
        let orphan = dropped.schedule("orphan", async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            counter.fetch_add(1, Ordering::SeqCst);
        });
        drop(dropped);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(orphan.wait().await, None);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
