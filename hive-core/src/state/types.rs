use serde::{Deserialize, Serialize};
use std::fmt;

/// 配置仓库状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RepoState {
    Unknown,
    NotFound,
    UpToDate,
    UpdateAvailable,
    ChangedLocally,
    ChangesCommitted,
    Updating,
}

/// 容器运行时状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DockerState {
    Unknown,
    NotAvailable,
    NotConfigured,
    Stopped,
    Pulling,
    Starting,
    Started,
    Stopping,
}

impl DockerState {
    /// 是否为正在进行中的过渡状态
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DockerState::Pulling | DockerState::Starting | DockerState::Stopping
        )
    }
}

/// 客户端自更新状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientState {
    UpToDate,
    UpdateAvailable,
    Updating,
    RestartRequired,
}

macro_rules! display_as_name {
    ($($ty:ty => { $($variant:ident => $name:literal),* $(,)? }),* $(,)?) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    let name = match self {
                        $(Self::$variant => $name,)*
                    };
                    f.write_str(name)
                }
            }
        )*
    };
}

display_as_name! {
    RepoState => {
        Unknown => "UNKNOWN",
        NotFound => "NOT_FOUND",
        UpToDate => "UP_TO_DATE",
        UpdateAvailable => "UPDATE_AVAILABLE",
        ChangedLocally => "CHANGED_LOCALLY",
        ChangesCommitted => "CHANGES_COMMITTED",
        Updating => "UPDATING",
    },
    DockerState => {
        Unknown => "UNKNOWN",
        NotAvailable => "NOT_AVAILABLE",
        NotConfigured => "NOT_CONFIGURED",
        Stopped => "STOPPED",
        Pulling => "PULLING",
        Starting => "STARTING",
        Started => "STARTED",
        Stopping => "STOPPING",
    },
    ClientState => {
        UpToDate => "UP_TO_DATE",
        UpdateAvailable => "UPDATE_AVAILABLE",
        Updating => "UPDATING",
        RestartRequired => "RESTART_REQUIRED",
    },
}

/// `docker compose ps --format json` 输出的一条容器记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerState {
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Image", default)]
    pub image: String,
    #[serde(rename = "Command", default)]
    pub command: String,
    #[serde(rename = "Health", default)]
    pub health: String,
    #[serde(rename = "Status", default)]
    pub status: String,
    #[serde(rename = "State", default)]
    pub state: String,
    #[serde(rename = "Service", default)]
    pub service: String,
}

impl ContainerState {
    pub fn is_running(&self) -> bool {
        self.state == "running"
    }
}

/// 用户操作的处理结果，供观察者展示为临时通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Success(String),
    Failure(String),
}

impl ActionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ActionOutcome::Success(_))
    }

    pub fn message(&self) -> &str {
        match self {
            ActionOutcome::Success(msg) | ActionOutcome::Failure(msg) => msg,
        }
    }
}
