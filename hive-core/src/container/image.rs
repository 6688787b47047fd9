use super::types::DockerManager;
use crate::constants::docker;
use crate::recipe::Recipe;
use crate::state::ClientState;
use crate::worker::OperationKind;
use crate::{HiveError, Result};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

impl DockerManager {
    /// 逐个拉取配方中所有 compose 文件引用的镜像
    ///
    /// 单个镜像拉取失败只记录日志，不影响后续步骤。
    pub(crate) async fn pull_images(&self, recipe: &Recipe) {
        for (reference, compose) in recipe.compose_files() {
            for image in compose.images() {
                info!("拉取镜像 {} ({})", image, reference);
                match self.run_docker_command(&["pull", &image], Some(recipe)).await {
                    Ok(output) => output.lines().for_each(|line| debug!("{}", line)),
                    Err(e) => warn!("拉取镜像 {} 失败: {}", image, e),
                }
            }
        }
    }

    /// 镜像清单的 sha256 摘要
    async fn manifest_digest(&self, image: &str) -> Result<String> {
        let recipe = self.hive.recipe();
        let output = self
            .run_docker_command(&["manifest", "inspect", image], recipe.as_ref())
            .await?;
        if output.stdout.trim().is_empty() {
            return Err(HiveError::docker(format!("镜像 {image} 的清单为空")));
        }
        Ok(format!("{:x}", Sha256::digest(output.stdout.as_bytes())))
    }

    fn client_image(&self) -> (String, String) {
        let settings = self
            .settings
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        (settings.client_image.clone(), settings.client_version.clone())
    }

    /// 比较当前版本与最新版本的镜像清单，有差异时标记为可更新
    ///
    /// 任一清单获取失败时只记录日志，不改变客户端状态。
    pub async fn check_cli_update(&self) {
        info!("检查客户端更新");
        let (image, version) = self.client_image();
        let current = self.manifest_digest(&format!("{image}:{version}")).await;
        let latest = self
            .manifest_digest(&format!("{image}:{}", docker::LATEST_TAG))
            .await;

        match (current, latest) {
            (Ok(current), Ok(latest)) if current != latest => {
                info!("客户端有可用更新");
                self.hive.set_client_state(ClientState::UpdateAvailable);
            }
            (Ok(_), Ok(_)) => info!("客户端已是最新版本"),
            (Err(e), _) | (_, Err(e)) => warn!("检查客户端更新失败: {}", e),
        }
    }

    /// 拉取最新客户端镜像并写入重启标记
    ///
    /// 返回是否已提交更新任务。
    pub fn update_cli(&self) -> bool {
        let this = self.clone();
        let spawned = self
            .workers
            .try_spawn(OperationKind::SelfUpdate, async move {
                this.run_update_cli().await;
            })
            .is_some();
        if spawned {
            self.hive.set_client_state(ClientState::Updating);
        }
        spawned
    }

    async fn run_update_cli(&self) {
        self.hive.set_client_state(ClientState::Updating);
        let (image, _) = self.client_image();
        let latest = format!("{image}:{}", docker::LATEST_TAG);
        let recipe = self.hive.recipe();

        if let Err(e) = self.run_docker_command(&["pull", &latest], recipe.as_ref()).await {
            warn!("拉取客户端镜像失败: {}", e);
            self.hive.set_client_state(ClientState::UpdateAvailable);
            return;
        }

        let marker = self
            .settings
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .restart_marker_path();
        if let Err(e) = std::fs::write(&marker, b"") {
            warn!("写入重启标记 {} 失败: {}", marker.display(), e);
            self.hive.set_client_state(ClientState::UpdateAvailable);
            return;
        }

        info!("客户端更新完成，需要重启");
        self.hive.set_client_state(ClientState::RestartRequired);
    }
}
