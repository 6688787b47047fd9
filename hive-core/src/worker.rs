//! 按操作类型划分的后台任务池
//!
//! 每种操作同一时刻最多只有一个任务在执行：`try_spawn` 在已有任务时直接忽略新请求，
//! `spawn_queued` 则排在前一个任务之后执行。

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, Notify};
use tokio::task::JoinHandle;
use tracing::debug;

/// 后台操作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Start,
    Stop,
    UpdateCheck,
    LogRefresh,
    SelfUpdate,
    RecipeUpdate,
    RecipeSwap,
}

impl OperationKind {
    pub const ALL: [OperationKind; 7] = [
        OperationKind::Start,
        OperationKind::Stop,
        OperationKind::UpdateCheck,
        OperationKind::LogRefresh,
        OperationKind::SelfUpdate,
        OperationKind::RecipeUpdate,
        OperationKind::RecipeSwap,
    ];
}

#[derive(Debug, Default)]
struct Slot {
    lock: Arc<AsyncMutex<()>>,
    /// 已提交但尚未结束的后台任务数（含排队中的）
    pending: AtomicUsize,
    idle: Notify,
}

/// 任务结束（包括 panic）时递减计数
struct PendingGuard(Arc<Slot>);

impl PendingGuard {
    fn new(slot: Arc<Slot>) -> Self {
        slot.pending.fetch_add(1, Ordering::SeqCst);
        Self(slot)
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.0.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

#[derive(Debug, Default)]
pub struct WorkerPool {
    slots: Mutex<HashMap<OperationKind, Arc<Slot>>>,
}

impl WorkerPool {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, kind: OperationKind) -> Arc<Slot> {
        self.slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(kind)
            .or_default()
            .clone()
    }

    /// 该类型是否有任务正在执行或排队
    pub fn is_busy(&self, kind: OperationKind) -> bool {
        let slot = self.slot(kind);
        slot.pending.load(Ordering::SeqCst) > 0 || slot.lock.try_lock().is_err()
    }

    /// 空闲时启动任务，已有同类任务在执行时返回 `None`
    pub fn try_spawn<F>(&self, kind: OperationKind, task: F) -> Option<JoinHandle<()>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let slot = self.slot(kind);
        let guard = match slot.lock.clone().try_lock_owned() {
            Ok(guard) if slot.pending.load(Ordering::SeqCst) == 0 => guard,
            _ => {
                debug!("{:?} 任务正在执行，忽略本次请求", kind);
                return None;
            }
        };

        debug!("启动后台任务: {:?}", kind);
        let pending = PendingGuard::new(slot);
        Some(tokio::spawn(async move {
            task.await;
            drop(guard);
            drop(pending);
        }))
    }

    /// 启动任务，若已有同类任务则排队等待其结束
    pub fn spawn_queued<F>(&self, kind: OperationKind, task: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let slot = self.slot(kind);
        let lock = slot.lock.clone();
        let pending = PendingGuard::new(slot);
        debug!("提交后台任务: {:?}", kind);
        tokio::spawn(async move {
            let guard = lock.lock_owned().await;
            task.await;
            drop(guard);
            drop(pending);
        })
    }

    /// 在当前任务中独占执行，与同类的后台任务互斥
    pub async fn run_exclusive<F, T>(&self, kind: OperationKind, task: F) -> T
    where
        F: Future<Output = T>,
    {
        let slot = self.slot(kind);
        let _guard = slot.lock.lock().await;
        task.await
    }

    /// 等待该类型已提交的任务全部结束
    pub async fn wait_idle(&self, kind: OperationKind) {
        let slot = self.slot(kind);
        loop {
            let notified = slot.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if slot.pending.load(Ordering::SeqCst) == 0 {
                break;
            }
            notified.await;
        }
        let _guard = slot.lock.lock().await;
    }

    /// 等待所有类型空闲
    ///
    /// 任务可能提交其他类型的任务（例如停止后切换配方），因此循环直到一轮检查中全部空闲。
    pub async fn wait_all_idle(&self) {
        loop {
            for kind in OperationKind::ALL {
                self.wait_idle(kind).await;
            }
            if OperationKind::ALL.iter().all(|kind| !self.is_busy(*kind)) {
                break;
            }
        }
    }
}
