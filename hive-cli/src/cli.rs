use crate::project_info::{metadata, version_info};
use clap::{Parser, Subcommand};
use hive_core::constants::config;
use std::path::PathBuf;

/// Hive CLI - 边缘设备容器服务与配置同步工具
#[derive(Parser, Debug)]
#[command(name = "hive-cli")]
#[command(about = metadata::PROJECT_DESCRIPTION)]
#[command(version = version_info::CLI_VERSION)]
#[command(long_about = metadata::display::DESCRIPTION_LONG)]
#[command(author = metadata::PROJECT_AUTHORS)]
pub struct Cli {
    /// 配置文件路径
    #[arg(short, long, default_value = config::CONFIG_FILE_NAME, env = "HIVE_CONFIG")]
    pub config: PathBuf,

    /// 详细输出
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// 以守护进程方式运行：定时检查更新并刷新日志，直到收到 Ctrl-C
    Run,
    /// 克隆配置仓库
    Init,
    /// 刷新并显示设备状态
    Status,
    /// 启动配方中的服务
    Start,
    /// 停止配方中的服务
    Stop,
    /// 丢弃本地修改，恢复到远程主分支
    Reset,
    /// 将本地修改提交到新分支并推送
    Commit,
    /// 通过设备授权获取推送令牌
    Login,
}
