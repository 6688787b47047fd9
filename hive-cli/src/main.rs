use clap::Parser;
use hive_cli::{Cli, HiveApp, setup_logging};
use hive_core::config::Settings;
use hive_core::logs::ProcessLogBuffer;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // 解析命令行参数
    let cli = Cli::parse();

    // 日志级别来自配置文件，因此先于日志系统加载配置
    let settings = match Settings::find_and_load_config(&cli.config) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("❌ 无法加载配置文件 '{}': {}", cli.config.display(), e);
            std::process::exit(1);
        }
    };

    let logs = ProcessLogBuffer::default();
    let guard = match setup_logging(cli.verbose, &settings.log_level, &logs) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("❌ 日志初始化失败: {e:#}");
            std::process::exit(1);
        }
    };
    info!("使用配置文件: {}", cli.config.display());

    let app = HiveApp::new(settings, cli.config.clone(), logs).await;
    let result = app.run_command(cli.command).await;
    if let Err(e) = &result {
        error!("❌ 操作失败: {:#}", e);
    }

    // 退出前刷新文件日志
    drop(guard);
    if result.is_err() {
        std::process::exit(1);
    }
}
