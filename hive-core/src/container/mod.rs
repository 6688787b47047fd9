// 模块声明
mod command;
mod image;
mod manager;
mod service;
mod types;

// 重新导出公共API
pub use types::{DockerManager, StopSignal};
