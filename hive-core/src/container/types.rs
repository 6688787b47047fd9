use crate::config::SharedSettings;
use crate::runner::CommandRunner;
use crate::state::{DockerState, HiveData};
use crate::worker::WorkerPool;
use std::sync::Arc;
use tokio::sync::oneshot;

/// 容器编排器
///
/// 通过 `docker compose` 管理当前配方引用的所有 compose 文件，状态写入 [`HiveData`]。
/// 克隆得到的句柄共享同一个运行器与任务池。
#[derive(Clone)]
pub struct DockerManager {
    pub(crate) runner: Arc<dyn CommandRunner>,
    pub(crate) hive: HiveData,
    pub(crate) settings: SharedSettings,
    pub(crate) workers: Arc<WorkerPool>,
}

/// 停止操作完成的信号，只会被触发一次
#[derive(Debug)]
pub struct StopSignal(pub(crate) oneshot::Receiver<DockerState>);

impl StopSignal {
    /// 等待停止任务结束，返回其确定的 Docker 状态
    pub async fn settled(self) -> DockerState {
        self.0.await.unwrap_or(DockerState::Unknown)
    }
}
