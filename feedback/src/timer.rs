use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Handle to a scheduled action. Dropping the handle does not cancel the
/// action; call [`TimerHandle::cancel`].
#[derive(Debug)]
pub struct TimerHandle {
    cancelled: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl TimerHandle {
    /// Cancel the pending action. Idempotent: cancelling twice, or after the
    /// action already ran, is a silent no-op.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.task.abort();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Run `action` after `delay` unless cancelled first.
///
/// Replaces coroutine-style `WaitForSeconds` blocks: the wait is a spawned
/// task, never a blocking sleep, so a response arriving mid-delay can
/// pre-empt it cleanly.
pub fn schedule_after<F>(delay: Duration, action: F) -> TimerHandle
where
    F: Future<Output = ()> + Send + 'static,
{
    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = cancelled.clone();
    let task = tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if !flag.load(Ordering::SeqCst) {
            action.await;
        }
    });
    TimerHandle { cancelled, task }
}
