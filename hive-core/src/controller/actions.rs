//! 用户操作
//!
//! 每个操作遵循同一流程：校验、执行、刷新状态，然后把结果作为 [`ActionOutcome`]
//! 写入状态聚合供界面展示。失败会记录日志并原样返回给调用方。

use super::Controller;
use crate::auth::{self, DeviceCode};
use crate::config::Settings;
use crate::recipe::{ComposeFile, Recipe, validate_compose_path};
use crate::state::{ActionOutcome, DockerState, RepoState};
use crate::{HiveError, Result};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{error, info};

impl Controller {
    fn publish<T>(&self, result: Result<T>, success: &str) -> Result<T> {
        match &result {
            Ok(_) => {
                info!("{}", success);
                self.hive.notify(ActionOutcome::Success(success.to_string()));
            }
            Err(e) => {
                error!("{}", e);
                self.hive.notify(ActionOutcome::Failure(e.to_string()));
            }
        }
        result
    }

    /// 为本设备创建空配方，仅在仓库为最新状态时允许
    pub async fn create_recipe(self: &Arc<Self>) -> Result<()> {
        let result = async {
            let state = self.hive.repo_state();
            if state != RepoState::UpToDate {
                return Err(HiveError::precondition(format!(
                    "仓库状态为 {state}，无法创建配方"
                )));
            }
            let recipe = Recipe::new(self.recipe_path());
            info!("创建配方: {}", recipe.path.display());
            recipe.save()?;
            self.set_recipe(Some(recipe)).await;
            Ok::<_, HiveError>(())
        }
        .await;
        self.publish(result, "配方已创建")
    }

    /// 保存界面提交的配方
    ///
    /// 任一 compose 路径不合法时整体拒绝，不写入任何文件。
    pub async fn save_recipe(self: &Arc<Self>, json: &str) -> Result<()> {
        let result = async {
            let recipe = Recipe::from_json(json, self.recipe_path())?;
            recipe.save()?;
            self.set_recipe(Some(recipe)).await;
            self.repo.update_state().await;
            Ok::<_, HiveError>(())
        }
        .await;
        self.publish(result, "配方已更新")
    }

    /// 保存 compose 文件，`relative_path` 相对于仓库根目录
    pub async fn save_compose(self: &Arc<Self>, json: &str, relative_path: &str) -> Result<()> {
        let result = async {
            validate_compose_path(relative_path)?;
            let compose = ComposeFile::from_json(json)?;
            compose.save(self.repo.repo_path().join(relative_path))?;
            Ok::<_, HiveError>(())
        }
        .await;
        self.repo.update_state().await;
        self.publish(result, "compose 文件已更新")
    }

    /// 保存设备配置
    ///
    /// 容器运行中时拒绝修改；更新检查间隔变化时立即按新间隔重新调度。
    pub async fn save_settings(self: &Arc<Self>, settings: Settings) -> Result<()> {
        let result = (|| -> Result<bool> {
            let running = self.hive.docker_state() == DockerState::Started
                || self.hive.containers().iter().any(|c| c.is_running());
            if running {
                return Err(HiveError::precondition("容器运行中，请先停止容器再修改配置"));
            }

            settings.save_to_file(&self.settings_path)?;
            let interval_changed = {
                let mut current = self
                    .settings
                    .write()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                let changed = current.update_interval != settings.update_interval;
                *current = settings;
                changed
            };
            Ok(interval_changed)
        })();

        if let Ok(interval_changed) = &result {
            let counts = {
                let current = self
                    .settings
                    .read()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                (current.container_logs_num, current.client_logs_num)
            };
            self.hive.set_log_counts(counts.0, counts.1);
            if *interval_changed && self.update_timer.is_active() {
                info!("更新检查间隔已变化，重新调度");
                self.schedule_update();
            }
        }
        self.publish(result, "配置已保存").map(|_| ())
    }

    pub fn start_docker(&self) -> Result<()> {
        let result = if self.docker.start() {
            Ok(())
        } else {
            Err(HiveError::precondition(format!(
                "当前状态为 {}，无法启动容器",
                self.hive.docker_state()
            )))
        };
        self.publish(result, "正在启动容器")
    }

    pub fn stop_docker(&self) -> Result<()> {
        let result = match self.docker.stop() {
            Some(_) => Ok(()),
            None => Err(HiveError::precondition(format!(
                "当前状态为 {}，无法停止容器",
                self.hive.docker_state()
            ))),
        };
        self.publish(result, "正在停止容器")
    }

    pub async fn retry_docker(&self) -> Result<()> {
        let result = if self.docker.retry().await {
            Ok(())
        } else {
            Err(HiveError::docker("Docker 服务仍不可用"))
        };
        self.publish(result, "Docker 服务已连接")
    }

    /// 丢弃本地修改并重新加载配方
    pub async fn reset_repo(self: &Arc<Self>) -> Result<()> {
        let result = async {
            self.repo.reset_repo().await?;
            self.load_recipe().await?;
            Ok::<_, HiveError>(())
        }
        .await;
        self.repo.update_state().await;
        self.publish(result, "仓库已重置")
    }

    /// 初始化本地配置仓库并加载配方
    pub async fn initialize_repo(self: &Arc<Self>) -> Result<()> {
        let result = async {
            self.repo.init().await?;
            self.load_recipe().await?;
            Ok::<_, HiveError>(())
        }
        .await;
        self.publish(result, "仓库已初始化")
    }

    /// 提交并推送本地修改
    ///
    /// 配置了令牌提供方但尚未授权时返回授权错误，授权完成后自动重试。
    pub async fn commit_changes(&self) -> Result<String> {
        let result = async {
            let token = self
                .settings
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .git_token
                .clone();
            if token.is_none() && self.tokens.is_some() {
                self.commit_pending.store(true, Ordering::SeqCst);
                return Err(HiveError::auth("推送前需要完成设备授权"));
            }
            let branch = self.repo.commit_changes(token.as_deref()).await?;
            self.repo.update_state().await;
            Ok::<_, HiveError>(branch)
        }
        .await;
        self.publish(result, "本地修改已提交")
    }

    /// 开始设备授权，返回需要展示给用户的验证码
    pub async fn request_device_code(&self) -> Result<DeviceCode> {
        let result = async {
            let provider = self
                .tokens
                .as_ref()
                .ok_or_else(|| HiveError::auth("未配置令牌提供方"))?;
            provider.request_code().await
        }
        .await;
        if let Err(e) = &result {
            error!("申请设备码失败: {}", e);
        }
        result
    }

    /// 等待用户完成授权，保存令牌并重试等待中的提交
    pub async fn authorize(&self, device_code: &str) -> Result<()> {
        let result = async {
            let provider = self
                .tokens
                .clone()
                .ok_or_else(|| HiveError::auth("未配置令牌提供方"))?;
            let token = auth::wait_for_authorization(provider.as_ref(), device_code).await?;

            let updated = {
                let mut settings = self
                    .settings
                    .write()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                settings.git_token = Some(token);
                settings.clone()
            };
            updated.save_to_file(&self.settings_path)?;
            Ok::<_, HiveError>(())
        }
        .await;
        self.publish(result, "授权成功")?;

        if self.commit_pending.swap(false, Ordering::SeqCst) {
            info!("授权完成，重试提交");
            self.commit_changes().await?;
        }
        Ok(())
    }

    /// 拉取最新客户端镜像
    pub fn update_client(&self) -> Result<()> {
        let result = if self.docker.update_cli() {
            Ok(())
        } else {
            Err(HiveError::precondition("客户端更新正在进行"))
        };
        self.publish(result, "正在更新客户端")
    }

    /// 修改日志展示条数并立即刷新
    pub async fn set_log_counts(self: &Arc<Self>, container: usize, client: usize) {
        {
            let mut settings = self
                .settings
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            settings.container_logs_num = container;
            settings.client_logs_num = client;
        }
        self.hive.set_log_counts(container, client);
        self.update_logs().await;
    }
}
