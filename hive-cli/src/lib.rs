// 私有模块声明
mod app;
mod cli;
pub mod project_info;
mod utils;

// 通过 pub use 精确控制对外暴露的接口
pub use app::{HiveApp, render_status};
pub use cli::{Cli, Commands};
pub use utils::{LOG_FILE_ENV, setup_logging};
