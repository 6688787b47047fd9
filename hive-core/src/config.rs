use crate::constants::{auth, config, docker, logs, restart, timer, version};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// 在各组件之间共享的配置句柄
///
/// 进程启动时构造一次，随后以句柄形式注入到每个组件的构造函数中。
pub type SharedSettings = Arc<RwLock<Settings>>;

/// 设备配置
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// 设备标识，同时决定配方文件名 `<hive_id>.yml`
    pub hive_id: String,
    /// 本地配置仓库目录
    pub hive_repo: PathBuf,
    /// 配置仓库远程地址
    pub hive_url: String,
    /// 更新检查间隔（秒）
    pub update_interval: u64,
    /// 日志刷新间隔（秒）
    pub log_interval: u64,
    /// 检测到远程配方更新时是否自动应用
    pub auto_update_recipe: bool,
    /// 展示的容器日志条数
    pub container_logs_num: usize,
    /// 展示的客户端日志条数
    pub client_logs_num: usize,
    /// 推送变更使用的访问令牌
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_token: Option<String>,
    /// 客户端镜像（不含标签）
    pub client_image: String,
    /// 当前运行的客户端版本，对应镜像标签
    pub client_version: String,
    /// 设备授权流程使用的 OAuth 客户端 ID
    pub github_client_id: String,
    /// 日志级别
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        let id = uuid::Uuid::new_v4().simple().to_string();
        Self {
            hive_id: format!("hive-{}", &id[..8]),
            hive_repo: config::get_default_repo_dir(),
            hive_url: config::DEFAULT_HIVE_URL.to_string(),
            update_interval: timer::DEFAULT_UPDATE_INTERVAL,
            log_interval: timer::DEFAULT_LOG_INTERVAL,
            auto_update_recipe: false,
            container_logs_num: logs::DEFAULT_CONTAINER_LOGS_NUM,
            client_logs_num: logs::DEFAULT_CLIENT_LOGS_NUM,
            git_token: None,
            client_image: docker::CLIENT_IMAGE.to_string(),
            client_version: version::CORE_VERSION.to_string(),
            github_client_id: auth::DEFAULT_GITHUB_CLIENT_ID.to_string(),
            log_level: config::DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl Settings {
    /// 加载配置文件，不存在时写入默认配置
    pub fn find_and_load_config<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            tracing::info!("找到配置文件: {}", path.display());
            return Self::load_from_file(path);
        }

        tracing::warn!("未找到配置文件，创建默认配置: {}", path.display());
        let default_config = Self::default();
        default_config.save_to_file(path)?;
        Ok(default_config)
    }

    /// 从指定文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    /// 转换为共享句柄
    pub fn into_shared(self) -> SharedSettings {
        Arc::new(RwLock::new(self))
    }

    /// 配方文件路径
    pub fn recipe_path(&self) -> PathBuf {
        self.hive_repo.join(format!("{}.yml", self.hive_id))
    }

    /// 重启标记文件路径
    pub fn restart_marker_path(&self) -> PathBuf {
        self.hive_repo
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
            .join(restart::RESTART_MARKER_NAME)
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval)
    }

    pub fn log_interval(&self) -> Duration {
        Duration::from_secs(self.log_interval)
    }
}
