use super::types::DockerManager;
use crate::config::SharedSettings;
use crate::runner::CommandRunner;
use crate::state::{DockerState, HiveData};
use crate::worker::WorkerPool;
use std::sync::Arc;
use tracing::{error, info};

impl DockerManager {
    /// 创建编排器并探测容器运行时
    ///
    /// 运行时不可用时进入 `NotAvailable`，之后只有 [`DockerManager::retry`] 能离开该状态。
    pub async fn connect(
        settings: SharedSettings,
        hive: HiveData,
        runner: Arc<dyn CommandRunner>,
        workers: Arc<WorkerPool>,
    ) -> Self {
        let manager = Self {
            runner,
            hive,
            settings,
            workers,
        };
        if manager.probe().await {
            manager.update_container_states().await;
        } else {
            manager.hive.set_docker_state(DockerState::NotAvailable);
        }
        manager
    }

    /// 检查 Docker 服务是否可用
    pub async fn probe(&self) -> bool {
        match self.run_docker_command(&["info"], None).await {
            Ok(_) => true,
            Err(e) => {
                error!("Docker 服务不可用: {}", e);
                false
            }
        }
    }

    /// 重新探测运行时，成功时重新计算容器状态
    pub async fn retry(&self) -> bool {
        if !self.probe().await {
            self.hive.set_docker_state(DockerState::NotAvailable);
            return false;
        }
        info!("Docker 服务已可用");
        self.hive.set_docker_state(DockerState::Unknown);
        self.update_container_states().await;
        true
    }

    pub fn is_available(&self) -> bool {
        self.hive.docker_state() != DockerState::NotAvailable
    }
}
