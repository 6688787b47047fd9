/// 配置文件相关常量
pub mod config {
    use std::path::{Path, PathBuf};

    /// 默认配置文件名
    pub const CONFIG_FILE_NAME: &str = "config.toml";

    /// 本地配置仓库目录名
    pub const HIVE_REPO_DIR_NAME: &str = "hive";

    /// 默认配置仓库远程地址
    pub const DEFAULT_HIVE_URL: &str = "https://github.com/caretech-owl/hive.git";

    /// 默认日志级别
    pub const DEFAULT_LOG_LEVEL: &str = "info";

    /// 获取默认本地仓库路径（跨平台）
    pub fn get_default_repo_dir() -> PathBuf {
        Path::new(".").join(HIVE_REPO_DIR_NAME)
    }
}

/// 定时任务相关常量（秒）
pub mod timer {
    /// 更新检查间隔
    pub const DEFAULT_UPDATE_INTERVAL: u64 = 600;

    /// 日志刷新间隔
    pub const DEFAULT_LOG_INTERVAL: u64 = 10;

    /// 设备授权轮询间隔
    pub const DEVICE_FLOW_POLL_INTERVAL: u64 = 5;

    /// 设备授权最大轮询次数
    pub const DEVICE_FLOW_MAX_ATTEMPTS: u32 = 60;
}

/// 日志缓冲相关常量
pub mod logs {
    /// 默认展示的容器日志条数
    pub const DEFAULT_CONTAINER_LOGS_NUM: usize = 20;

    /// 默认展示的客户端日志条数
    pub const DEFAULT_CLIENT_LOGS_NUM: usize = 20;

    /// 进程日志环形缓冲容量
    pub const PROCESS_LOG_CAPACITY: usize = 500;
}

/// Git 相关常量
pub mod git {
    /// 主分支名
    pub const MAIN_BRANCH: &str = "main";

    /// 默认远程名
    pub const ORIGIN: &str = "origin";

    /// 远程主分支引用
    pub const ORIGIN_MAIN: &str = "origin/main";

    /// 临时推送远程名前缀
    pub const EPHEMERAL_REMOTE_PREFIX: &str = "hive-push-";

    /// 携带令牌时使用的用户名
    pub const TOKEN_USER: &str = "x-access-token";

    /// 提交者邮箱域名
    pub const COMMITTER_EMAIL_DOMAIN: &str = "hive.local";
}

/// Docker 相关常量
pub mod docker {
    /// compose 文件路径规则（相对仓库根目录）
    pub const COMPOSE_FILE_PATTERN: &str = r"^compose/[A-Za-z0-9_-]+\.yml$";

    /// 客户端镜像
    pub const CLIENT_IMAGE: &str = "ghcr.io/caretech-owl/hive-cli";

    /// 最新版本标签
    pub const LATEST_TAG: &str = "latest";
}

/// 进程重启相关常量
pub mod restart {
    /// 重启标记文件名（位于仓库父目录）
    pub const RESTART_MARKER_NAME: &str = "_restart";
}

/// 设备授权相关常量
pub mod auth {
    /// GitHub OAuth App 客户端 ID
    pub const DEFAULT_GITHUB_CLIENT_ID: &str = "Iv23liyWGa2XGgyWYqBj";

    /// 设备码申请地址
    pub const DEVICE_CODE_URL: &str = "https://github.com/login/device/code";

    /// 访问令牌申请地址
    pub const ACCESS_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";

    /// 设备码授权类型
    pub const DEVICE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";

    /// HTTP 请求超时时间（秒）
    pub const HTTP_TIMEOUT: u64 = 5;
}

/// 版本信息
pub mod version {
    /// 核心库版本（自动从 Cargo.toml 同步）
    pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");
}
