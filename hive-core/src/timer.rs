use futures::future::BoxFuture;
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// 一次性可取消定时器，由回调自身负责重新调度
///
/// 回调触发时先取消自身、执行工作、再重新调度，因此同一个周期任务不会与自身重叠。
#[derive(Debug)]
pub struct PeriodicTimer {
    name: &'static str,
    token: Mutex<Option<CancellationToken>>,
}

impl PeriodicTimer {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            token: Mutex::new(None),
        }
    }

    /// 取消尚未触发的调度
    pub fn cancel(&self) {
        if let Some(token) = self
            .token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
        {
            token.cancel();
        }
    }

    /// 是否存在尚未触发的调度
    pub fn is_active(&self) -> bool {
        self.token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .is_some_and(|token| !token.is_cancelled())
    }

    /// 在 `delay` 之后执行 `task`，替换之前的调度
    pub fn schedule(&self, delay: Duration, task: BoxFuture<'static, ()>) {
        let token = CancellationToken::new();
        let previous = self
            .token
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .replace(token.clone());
        if let Some(previous) = previous {
            previous.cancel();
        }

        let name = self.name;
        debug!("{} 定时器将在 {:?} 后触发", name, delay);
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("{} 定时器已取消", name);
                }
                _ = tokio::time::sleep(delay) => {
                    token.cancel();
                    task.await;
                }
            }
        });
    }
}

impl Drop for PeriodicTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_task(count: &Arc<AtomicUsize>) -> BoxFuture<'static, ()> {
        let count = count.clone();
        Box::pin(async move {
            count.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_delay() {
        let timer = PeriodicTimer::new("test");
        let count = Arc::new(AtomicUsize::new(0));

        timer.schedule(Duration::from_secs(10), counting_task(&count));
        assert!(timer.is_active());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!timer.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_firing() {
        let timer = PeriodicTimer::new("test");
        let count = Arc::new(AtomicUsize::new(0));

        timer.schedule(Duration::from_secs(10), counting_task(&count));
        timer.cancel();
        assert!(!timer.is_active());

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_replaces_previous() {
        let timer = PeriodicTimer::new("test");
        let count = Arc::new(AtomicUsize::new(0));

        timer.schedule(Duration::from_secs(10), counting_task(&count));
        timer.schedule(Duration::from_secs(30), counting_task(&count));

        tokio::time::sleep(Duration::from_secs(15)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
