// 模块声明
mod hive;
mod types;

// 重新导出公共API
pub use hive::{HiveData, HiveSnapshot, StateField, SubscriptionId};
pub use types::{ActionOutcome, ClientState, ContainerState, DockerState, RepoState};
