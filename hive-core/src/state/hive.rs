use super::types::{ActionOutcome, ClientState, ContainerState, DockerState, RepoState};
use crate::config::Settings;
use crate::recipe::Recipe;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

/// 可被订阅的状态字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateField {
    Recipe,
    DockerState,
    ClientState,
    RepoState,
    Containers,
    Logs,
    Notification,
}

/// 订阅标识，用于取消订阅
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(StateField) + Send + Sync>;

/// 某一时刻的完整状态副本
#[derive(Debug, Clone)]
pub struct HiveSnapshot {
    pub recipe: Option<Recipe>,
    pub repo_state: RepoState,
    pub docker_state: DockerState,
    pub client_state: ClientState,
    pub containers: Vec<ContainerState>,
    pub container_logs: Vec<String>,
    pub client_logs: Vec<String>,
    pub container_logs_num: usize,
    pub client_logs_num: usize,
    pub last_notification: Option<ActionOutcome>,
}

struct Inner {
    snapshot: RwLock<HiveSnapshot>,
    listeners: Mutex<Vec<(SubscriptionId, StateField, Listener)>>,
    next_id: AtomicU64,
}

/// 设备状态聚合
///
/// 唯一的状态来源：控制器及其驱动负责写入，其他观察者只读。克隆得到的句柄共享同一份状态。
/// 监听器在内部锁释放之后被调用，可以在回调中读取状态。
#[derive(Clone)]
pub struct HiveData {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for HiveData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HiveData")
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

impl HiveData {
    pub fn new(settings: &Settings) -> Self {
        let snapshot = HiveSnapshot {
            recipe: None,
            repo_state: RepoState::Unknown,
            docker_state: DockerState::NotConfigured,
            client_state: ClientState::UpToDate,
            containers: Vec::new(),
            container_logs: Vec::new(),
            client_logs: Vec::new(),
            container_logs_num: settings.container_logs_num,
            client_logs_num: settings.client_logs_num,
            last_notification: None,
        };
        Self {
            inner: Arc::new(Inner {
                snapshot: RwLock::new(snapshot),
                listeners: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HiveSnapshot> {
        self.inner
            .snapshot
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HiveSnapshot> {
        self.inner
            .snapshot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ========== 订阅 ==========

    /// 订阅单个字段的变化
    pub fn subscribe<F>(&self, field: StateField, listener: F) -> SubscriptionId
    where
        F: Fn(StateField) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((id, field, Arc::new(listener)));
        id
    }

    /// 取消订阅，返回该订阅是否存在
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = listeners.len();
        listeners.retain(|(existing, _, _)| *existing != id);
        listeners.len() != before
    }

    fn emit(&self, field: StateField) {
        let targets: Vec<Listener> = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .filter(|(_, f, _)| *f == field)
            .map(|(_, _, listener)| listener.clone())
            .collect();
        for listener in targets {
            listener(field);
        }
    }

    // ========== 读取 ==========

    pub fn snapshot(&self) -> HiveSnapshot {
        self.read().clone()
    }

    pub fn recipe(&self) -> Option<Recipe> {
        self.read().recipe.clone()
    }

    pub fn repo_state(&self) -> RepoState {
        self.read().repo_state
    }

    pub fn docker_state(&self) -> DockerState {
        self.read().docker_state
    }

    pub fn client_state(&self) -> ClientState {
        self.read().client_state
    }

    pub fn containers(&self) -> Vec<ContainerState> {
        self.read().containers.clone()
    }

    pub fn container_logs_num(&self) -> usize {
        self.read().container_logs_num
    }

    pub fn client_logs_num(&self) -> usize {
        self.read().client_logs_num
    }

    // ========== 写入 ==========

    /// 设置配方；与当前值相同也会重新通知，以便依赖视图在外部修改后刷新
    pub fn set_recipe(&self, recipe: Option<Recipe>) {
        {
            let mut state = self.write();
            if state.recipe == recipe {
                debug!("配方未变化，重新通知观察者");
            } else {
                info!(
                    "配方已切换: {}",
                    recipe
                        .as_ref()
                        .map(|r| r.path.display().to_string())
                        .unwrap_or_else(|| "无".to_string())
                );
                state.recipe = recipe;
            }
        }
        self.emit(StateField::Recipe);
    }

    pub fn set_repo_state(&self, value: RepoState) {
        let changed = {
            let mut state = self.write();
            let old = std::mem::replace(&mut state.repo_state, value);
            (old != value).then_some(old)
        };
        if let Some(old) = changed {
            info!("仓库状态由 {} 变为 {}", old, value);
            self.emit(StateField::RepoState);
        }
    }

    pub fn set_docker_state(&self, value: DockerState) {
        let changed = {
            let mut state = self.write();
            let old = std::mem::replace(&mut state.docker_state, value);
            (old != value).then_some(old)
        };
        if let Some(old) = changed {
            info!("Docker 状态由 {} 变为 {}", old, value);
            self.emit(StateField::DockerState);
        }
    }

    /// 仅当当前状态为 `from` 时切换到 `to`，返回是否切换成功
    pub fn transition_docker_state(&self, from: DockerState, to: DockerState) -> bool {
        {
            let mut state = self.write();
            if state.docker_state != from {
                return false;
            }
            state.docker_state = to;
        }
        if from != to {
            info!("Docker 状态由 {} 变为 {}", from, to);
            self.emit(StateField::DockerState);
        }
        true
    }

    pub fn set_client_state(&self, value: ClientState) {
        let changed = {
            let mut state = self.write();
            let old = std::mem::replace(&mut state.client_state, value);
            (old != value).then_some(old)
        };
        if let Some(old) = changed {
            info!("客户端状态由 {} 变为 {}", old, value);
            self.emit(StateField::ClientState);
        }
    }

    /// 整体替换容器快照
    pub fn set_containers(&self, containers: Vec<ContainerState>) {
        let changed = {
            let mut state = self.write();
            let changed = state.containers != containers;
            state.containers = containers;
            changed
        };
        if changed {
            self.emit(StateField::Containers);
        }
    }

    pub fn set_log_counts(&self, container_logs_num: usize, client_logs_num: usize) {
        let mut state = self.write();
        state.container_logs_num = container_logs_num;
        state.client_logs_num = client_logs_num;
    }

    /// 写入日志，只保留最新的若干行
    pub fn set_logs(&self, container_logs: Vec<String>, client_logs: Vec<String>) {
        {
            let mut state = self.write();
            let container_keep = state.container_logs_num;
            let client_keep = state.client_logs_num;
            state.container_logs = keep_tail(container_logs, container_keep);
            state.client_logs = keep_tail(client_logs, client_keep);
        }
        self.emit(StateField::Logs);
    }

    /// 记录一次用户操作结果
    pub fn notify(&self, outcome: ActionOutcome) {
        self.write().last_notification = Some(outcome);
        self.emit(StateField::Notification);
    }
}

fn keep_tail(lines: Vec<String>, keep: usize) -> Vec<String> {
    let mut ring: VecDeque<String> = lines.into();
    while ring.len() > keep {
        ring.pop_front();
    }
    ring.into()
}
