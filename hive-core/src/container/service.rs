use super::types::{DockerManager, StopSignal};
use crate::recipe::Recipe;
use crate::state::{ContainerState, DockerState};
use crate::worker::OperationKind;
use crate::{HiveError, Result};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

impl DockerManager {
    /// 根据 `docker compose ps` 重新计算容器快照与 Docker 状态
    ///
    /// 不返回错误：查询失败时状态降级为 `Unknown`。`NotAvailable` 下不执行任何操作。
    pub async fn update_container_states(&self) -> DockerState {
        if !self.is_available() {
            return DockerState::NotAvailable;
        }

        let Some(recipe) = self.hive.recipe() else {
            self.hive.set_containers(Vec::new());
            self.hive.set_docker_state(DockerState::NotConfigured);
            return DockerState::NotConfigured;
        };

        let (containers, state) = if recipe.resolved_compose_files().is_empty() {
            warn!("配方中没有可用的 compose 文件");
            (Vec::new(), DockerState::Stopped)
        } else {
            match self.query_containers(&recipe).await {
                Ok(containers) if containers.is_empty() => (containers, DockerState::Stopped),
                Ok(containers) => (containers, DockerState::Started),
                Err(e) => {
                    warn!("获取容器状态失败: {}", e);
                    (Vec::new(), DockerState::Unknown)
                }
            }
        };

        self.hive.set_containers(containers);
        self.hive.set_docker_state(state);
        state
    }

    async fn query_containers(&self, recipe: &Recipe) -> Result<Vec<ContainerState>> {
        let output = self
            .run_compose_command(recipe, &["ps", "--format", "json"])
            .await?;
        parse_containers(&output.stdout)
    }

    /// 获取最近 `num` 行容器日志，失败时返回空列表
    pub async fn get_container_logs(&self, num: usize) -> Vec<String> {
        let Some(recipe) = self.hive.recipe() else {
            return Vec::new();
        };
        let num = num.to_string();
        match self
            .run_compose_command(&recipe, &["logs", "--no-color", "-n", &num])
            .await
        {
            Ok(output) => output.lines().map(str::to_string).collect(),
            Err(e) => {
                debug!("获取容器日志失败: {}", e);
                Vec::new()
            }
        }
    }

    /// 拉取镜像并启动所有服务
    ///
    /// 仅在 `Stopped` 状态下生效，返回是否已提交启动任务。启动使用提交时的配方，
    /// 不受之后的配方切换影响。
    pub fn start(&self) -> bool {
        let Some(recipe) = self.hive.recipe() else {
            info!("没有配方，忽略启动请求");
            return false;
        };
        if !self
            .hive
            .transition_docker_state(DockerState::Stopped, DockerState::Pulling)
        {
            info!("当前 Docker 状态为 {}，忽略启动请求", self.hive.docker_state());
            return false;
        }

        let this = self.clone();
        self.workers.spawn_queued(OperationKind::Start, async move {
            this.run_start(recipe).await;
        });
        true
    }

    async fn run_start(&self, recipe: Recipe) {
        self.pull_images(&recipe).await;

        info!("启动 Docker Compose 服务");
        self.hive.set_docker_state(DockerState::Starting);
        match self.run_compose_command(&recipe, &["up", "-d"]).await {
            Ok(output) => output.lines().for_each(|line| debug!("{}", line)),
            Err(e) => error!("启动服务失败: {}", e),
        }
        self.update_container_states().await;
    }

    /// 停止所有服务
    ///
    /// 仅在 `Started` 状态下生效，停止的是提交时配方中的服务。返回的信号在停止任务结束后
    /// 携带最终状态触发。
    pub fn stop(&self) -> Option<StopSignal> {
        let recipe = self.hive.recipe()?;
        if !self
            .hive
            .transition_docker_state(DockerState::Started, DockerState::Stopping)
        {
            info!("当前 Docker 状态为 {}，忽略停止请求", self.hive.docker_state());
            return None;
        }

        let (tx, rx) = oneshot::channel();
        let this = self.clone();
        self.workers.spawn_queued(OperationKind::Stop, async move {
            let state = this.run_stop(recipe).await;
            let _ = tx.send(state);
        });
        Some(StopSignal(rx))
    }

    async fn run_stop(&self, recipe: Recipe) -> DockerState {
        info!("停止 Docker Compose 服务");
        match self.run_compose_command(&recipe, &["down"]).await {
            Ok(output) => output.lines().for_each(|line| debug!("{}", line)),
            Err(e) => error!("停止服务失败: {}", e),
        }
        self.update_container_states().await
    }
}

/// 解析 `docker compose ps --format json` 的输出
///
/// 新版本每行输出一个 JSON 对象，旧版本输出一个 JSON 数组，两种格式都接受。
pub(crate) fn parse_containers(output: &str) -> Result<Vec<ContainerState>> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        return Ok(serde_json::from_str(trimmed)?);
    }
    trimmed
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str::<ContainerState>(line).map_err(HiveError::from))
        .collect()
}
