//! 运行时控制器
//!
//! 串联仓库同步器与容器编排器：周期性检查更新、刷新日志、在运行中的容器下安全切换配方，
//! 并处理来自界面或命令行的用户操作。

mod actions;
#[cfg(test)]
mod testing;

use crate::Result;
use crate::auth::TokenProvider;
use crate::config::SharedSettings;
use crate::container::DockerManager;
use crate::logs::ProcessLogBuffer;
use crate::recipe::Recipe;
use crate::repo::RepoManager;
use crate::runner::CommandRunner;
use crate::state::{ActionOutcome, DockerState, HiveData, RepoState};
use crate::timer::PeriodicTimer;
use crate::worker::{OperationKind, WorkerPool};
use futures::future::BoxFuture;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tracing::{debug, error, info, warn};

/// 等待停止完成后应用的配方
#[derive(Debug)]
struct PendingSwap {
    recipe: Option<Recipe>,
}

enum SwapRequest {
    Apply(Option<Recipe>),
    Parked,
    Replaced,
}

pub struct Controller {
    settings: SharedSettings,
    settings_path: PathBuf,
    hive: HiveData,
    repo: RepoManager,
    docker: DockerManager,
    workers: Arc<WorkerPool>,
    logs: ProcessLogBuffer,
    tokens: Option<Arc<dyn TokenProvider>>,
    update_timer: PeriodicTimer,
    log_timer: PeriodicTimer,
    pending_swap: Mutex<Option<PendingSwap>>,
    /// 因缺少令牌而未完成的提交，授权后自动重试
    commit_pending: AtomicBool,
    /// 退出后不再重新调度定时器
    shutting_down: AtomicBool,
}

impl Controller {
    /// 创建控制器：清理上次留下的重启标记、探测 Docker 并加载本地配方
    pub async fn new(
        settings: SharedSettings,
        settings_path: impl Into<PathBuf>,
        runner: Arc<dyn CommandRunner>,
        logs: ProcessLogBuffer,
        tokens: Option<Arc<dyn TokenProvider>>,
    ) -> Arc<Self> {
        let snapshot = settings
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        consume_restart_marker(&snapshot.restart_marker_path());

        let hive = HiveData::new(&snapshot);
        let workers = Arc::new(WorkerPool::new());
        let repo = RepoManager::new(settings.clone(), hive.clone(), runner.clone());
        let docker =
            DockerManager::connect(settings.clone(), hive.clone(), runner, workers.clone()).await;

        let controller = Arc::new(Self {
            settings,
            settings_path: settings_path.into(),
            hive,
            repo,
            docker,
            workers,
            logs,
            tokens,
            update_timer: PeriodicTimer::new("update"),
            log_timer: PeriodicTimer::new("logs"),
            pending_swap: Mutex::new(None),
            commit_pending: AtomicBool::new(false),
            shutting_down: AtomicBool::new(false),
        });

        if let Err(e) = controller.load_recipe().await {
            warn!("启动时加载配方失败: {}", e);
        }
        controller
    }

    pub fn hive(&self) -> &HiveData {
        &self.hive
    }

    pub fn repo(&self) -> &RepoManager {
        &self.repo
    }

    pub fn docker(&self) -> &DockerManager {
        &self.docker
    }

    pub fn workers(&self) -> &Arc<WorkerPool> {
        &self.workers
    }

    pub fn settings(&self) -> &SharedSettings {
        &self.settings
    }

    fn recipe_path(&self) -> PathBuf {
        self.settings
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .recipe_path()
    }

    /// 立即执行一次更新检查与日志刷新，并启动两个定时器
    pub async fn start(self: &Arc<Self>) {
        self.update().await;
        self.update_logs().await;
    }

    // ========== 更新检查 ==========

    /// 检查客户端与配置仓库的更新，结束后重新调度
    pub async fn update(self: &Arc<Self>) {
        debug!("触发更新检查");
        self.update_timer.cancel();
        self.workers
            .run_exclusive(OperationKind::UpdateCheck, self.check_for_updates())
            .await;
        self.schedule_update();
    }

    async fn check_for_updates(self: &Arc<Self>) {
        self.docker.check_cli_update().await;
        let state = self.repo.update_state().await;
        if state != RepoState::UpdateAvailable {
            return;
        }

        let auto_update = self
            .settings
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .auto_update_recipe;
        if auto_update {
            self.update_recipe();
            return;
        }

        let recipe_path = self.recipe_path();
        match self.repo.remote_changes(&recipe_path).await {
            Ok(true) => info!("远程配方 {} 有更新，等待手动应用", recipe_path.display()),
            Ok(false) => debug!("远程更新不涉及当前配方"),
            Err(e) => warn!("比较远程配方失败: {}", e),
        }
    }

    fn schedule_update(self: &Arc<Self>) {
        if self.is_shutting_down() {
            return;
        }
        let delay = self
            .settings
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .update_interval();
        self.update_timer
            .schedule(delay, Self::update_boxed(Arc::downgrade(self)));
    }

    fn update_boxed(this: Weak<Self>) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            if let Some(this) = this.upgrade() {
                this.update().await;
            }
        })
    }

    /// 在后台拉取远程配置并重新加载配方，返回是否已提交任务
    pub fn update_recipe(self: &Arc<Self>) -> bool {
        info!("远程配方有更新，开始同步");
        let this = self.clone();
        self.workers
            .try_spawn(OperationKind::RecipeUpdate, async move {
                this.run_update_recipe().await;
            })
            .is_some()
    }

    async fn run_update_recipe(self: &Arc<Self>) {
        self.hive.set_repo_state(RepoState::Updating);
        if let Err(e) = self.repo.update_repo().await {
            error!("同步配置仓库失败: {}", e);
        } else if let Err(e) = self.load_recipe().await {
            error!("重新加载配方失败: {}", e);
        }
        self.repo.update_state().await;
    }

    // ========== 日志 ==========

    /// 刷新容器日志与进程日志，结束后重新调度
    pub async fn update_logs(self: &Arc<Self>) {
        self.log_timer.cancel();
        self.workers
            .run_exclusive(OperationKind::LogRefresh, self.refresh_logs())
            .await;
        self.schedule_logs();
    }

    async fn refresh_logs(&self) {
        let container_logs = self
            .docker
            .get_container_logs(self.hive.container_logs_num())
            .await;
        let client_logs = self.logs.tail(self.hive.client_logs_num());
        self.hive.set_logs(container_logs, client_logs);
    }

    fn schedule_logs(self: &Arc<Self>) {
        if self.is_shutting_down() {
            return;
        }
        let delay = self
            .settings
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .log_interval();
        self.log_timer
            .schedule(delay, Self::logs_boxed(Arc::downgrade(self)));
    }

    fn logs_boxed(this: Weak<Self>) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            if let Some(this) = this.upgrade() {
                this.update_logs().await;
            }
        })
    }

    // ========== 配方 ==========

    /// 读取本地配方文件并应用
    ///
    /// 文件不存在时应用空配方；解析或校验失败时保留当前配方并返回错误。
    pub async fn load_recipe(self: &Arc<Self>) -> Result<Option<Recipe>> {
        let path = self.recipe_path();
        if !path.exists() {
            warn!("配方文件不存在: {}", path.display());
            self.set_recipe(None).await;
            return Ok(None);
        }

        let recipe = Recipe::load(&path).inspect_err(|e| {
            error!("加载配方 {} 失败: {}", path.display(), e);
        })?;
        self.set_recipe(Some(recipe.clone())).await;
        Ok(Some(recipe))
    }

    /// 应用配方
    ///
    /// 容器运行中或正在启停时，先等待启停结束并停止容器，状态确定为 `Stopped` 后才应用
    /// 新配方；若是为切换而停止的，应用后重新启动。切换等待期间的新请求会替换等待中的
    /// 配方，切换只执行一次。停止失败时保留当前配方。
    pub async fn set_recipe(self: &Arc<Self>, recipe: Option<Recipe>) {
        let request = {
            let mut slot = self.lock_swap();
            let state = self.hive.docker_state();
            match slot.as_mut() {
                Some(pending) => {
                    pending.recipe = recipe;
                    SwapRequest::Replaced
                }
                None if state == DockerState::Started || state.is_transient() => {
                    *slot = Some(PendingSwap { recipe });
                    SwapRequest::Parked
                }
                None => SwapRequest::Apply(recipe),
            }
        };

        match request {
            SwapRequest::Apply(recipe) => self.apply_recipe(recipe).await,
            SwapRequest::Replaced => info!("已有等待中的配方切换，改为应用最新配方"),
            SwapRequest::Parked => {
                info!("容器运行中，停止后切换配方");
                let this = self.clone();
                self.workers.spawn_queued(OperationKind::RecipeSwap, async move {
                    this.run_swap().await;
                });
            }
        }
    }

    async fn run_swap(&self) {
        // 等待进行中的启动或停止结束
        while self.workers.is_busy(OperationKind::Start)
            || self.workers.is_busy(OperationKind::Stop)
        {
            self.workers.wait_idle(OperationKind::Start).await;
            self.workers.wait_idle(OperationKind::Stop).await;
        }

        let state = self.hive.docker_state();
        let (settled, restart) = match state {
            DockerState::Started => match self.docker.stop() {
                Some(signal) => (signal.settled().await, true),
                None => (self.hive.docker_state(), false),
            },
            _ => (state, false),
        };
        self.finish_swap(settled, restart).await;
    }

    async fn finish_swap(&self, settled: DockerState, restart: bool) {
        let Some(pending) = self.take_swap() else {
            return;
        };
        if settled != DockerState::Stopped {
            let message = format!("容器未能停止（状态为 {settled}），保留当前配方");
            error!("{}", message);
            self.hive.notify(ActionOutcome::Failure(message));
            return;
        }
        self.apply_recipe(pending.recipe).await;
        if restart {
            self.docker.start();
        }
    }

    async fn apply_recipe(&self, recipe: Option<Recipe>) {
        self.hive.set_recipe(recipe);
        self.repo.update_state().await;
        self.docker.update_container_states().await;
    }

    fn lock_swap(&self) -> MutexGuard<'_, Option<PendingSwap>> {
        self.pending_swap
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    fn take_swap(&self) -> Option<PendingSwap> {
        self.lock_swap().take()
    }

    // ========== 退出 ==========

    /// 停止定时器并等待后台任务结束，返回是否需要重启进程
    pub async fn shutdown(&self) -> bool {
        info!("正在停止控制器");
        self.shutting_down.store(true, Ordering::SeqCst);
        self.update_timer.cancel();
        self.log_timer.cancel();
        self.workers.wait_all_idle().await;

        let marker = self
            .settings
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .restart_marker_path();
        let restart = marker.exists();
        if restart {
            info!("检测到重启标记，需要重启客户端");
        }
        restart
    }
}

/// 删除上次运行遗留的重启标记
fn consume_restart_marker(marker: &Path) {
    if marker.exists() {
        match std::fs::remove_file(marker) {
            Ok(()) => info!("已清理重启标记: {}", marker.display()),
            Err(e) => warn!("清理重启标记 {} 失败: {}", marker.display(), e),
        }
    }
}
