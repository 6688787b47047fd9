use crate::cli::Commands;
use anyhow::{Context, Result, bail};
use hive_core::HiveError;
use hive_core::auth::{GithubDeviceFlow, TokenProvider};
use hive_core::config::Settings;
use hive_core::controller::Controller;
use hive_core::logs::ProcessLogBuffer;
use hive_core::runner::SystemRunner;
use hive_core::state::HiveSnapshot;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

pub struct HiveApp {
    controller: Arc<Controller>,
}

impl HiveApp {
    /// 组装控制器：系统命令执行器、GitHub 设备授权与进程日志缓冲区
    pub async fn new(settings: Settings, config_path: PathBuf, logs: ProcessLogBuffer) -> Self {
        let tokens: Option<Arc<dyn TokenProvider>> =
            match GithubDeviceFlow::new(settings.github_client_id.clone()) {
                Ok(flow) => Some(Arc::new(flow)),
                Err(e) => {
                    warn!("设备授权不可用: {}", e);
                    None
                }
            };

        let controller = Controller::new(
            settings.into_shared(),
            config_path,
            Arc::new(SystemRunner),
            logs,
            tokens,
        )
        .await;
        Self { controller }
    }

    pub fn controller(&self) -> &Arc<Controller> {
        &self.controller
    }

    /// 运行应用命令
    pub async fn run_command(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Run => self.run_daemon().await,
            Commands::Init => {
                self.controller.initialize_repo().await?;
                self.print_status();
                Ok(())
            }
            Commands::Status => {
                self.controller.repo().update_state().await;
                self.controller.docker().update_container_states().await;
                self.controller.docker().check_cli_update().await;
                self.print_status();
                Ok(())
            }
            Commands::Start => {
                self.controller.start_docker()?;
                self.controller.workers().wait_all_idle().await;
                self.print_status();
                Ok(())
            }
            Commands::Stop => {
                self.controller.stop_docker()?;
                self.controller.workers().wait_all_idle().await;
                self.print_status();
                Ok(())
            }
            Commands::Reset => {
                self.controller.reset_repo().await?;
                self.print_status();
                Ok(())
            }
            Commands::Commit => self.commit().await,
            Commands::Login => self.login().await,
        }
    }

    /// 启动定时器并等待 Ctrl-C
    async fn run_daemon(&self) -> Result<()> {
        info!("🚀 Hive 客户端启动");
        self.controller.start().await;
        self.print_status();

        tokio::signal::ctrl_c()
            .await
            .context("无法监听退出信号")?;

        if self.controller.shutdown().await {
            info!("🔄 客户端已更新，请重启进程以使用新版本");
        }
        info!("👋 Hive 客户端已退出");
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        match self.controller.commit_changes().await {
            Ok(branch) => {
                info!("✅ 本地修改已推送到分支 {}", branch);
                Ok(())
            }
            Err(HiveError::Auth(msg)) => {
                bail!("{msg}，请先运行 'hive-cli login'")
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn login(&self) -> Result<()> {
        let code = self.controller.request_device_code().await?;
        info!("👉 请在浏览器中打开 {}", code.verification_uri);
        info!("👉 并输入验证码: {}", code.user_code);
        self.controller.authorize(&code.device_code).await?;
        info!("✅ 访问令牌已保存");
        Ok(())
    }

    fn print_status(&self) {
        for line in render_status(&self.controller.hive().snapshot()) {
            info!("{}", line);
        }
    }
}

/// 将状态快照渲染为适合终端展示的多行文本
pub fn render_status(snapshot: &HiveSnapshot) -> Vec<String> {
    let mut lines = Vec::new();
    match &snapshot.recipe {
        Some(recipe) => lines.push(format!("📄 配方: {}", recipe.path.display())),
        None => lines.push("📄 配方: 未加载".to_string()),
    }
    lines.push(format!("📦 仓库状态: {}", snapshot.repo_state));
    lines.push(format!("🐳 Docker 状态: {}", snapshot.docker_state));
    lines.push(format!("🔄 客户端状态: {}", snapshot.client_state));

    if !snapshot.containers.is_empty() {
        lines.push(format!("📋 容器 ({}):", snapshot.containers.len()));
        for container in &snapshot.containers {
            let marker = if container.is_running() { "🟢" } else { "🔴" };
            lines.push(format!(
                "   {} {} [{}] {}",
                marker, container.name, container.service, container.status
            ));
        }
    }
    lines
}
