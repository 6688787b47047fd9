use anyhow::{Context, Result};
use hive_core::logs::ProcessLogBuffer;
use std::fs::OpenOptions;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// 设置后日志写入该文件而非终端
pub const LOG_FILE_ENV: &str = "HIVE_LOG_FILE";

/// # 日志系统
///
/// 库代码只使用 `tracing` 宏，日志配置由入口统一完成。
///
/// - `-v, --verbose` 启用 DEBUG 级别，否则使用配置文件中的 `log_level`
/// - `RUST_LOG` 优先于以上两者
/// - `HIVE_LOG_FILE` 设置后输出到文件，包含模块路径与行号
///
/// 所有事件同时写入进程日志缓冲区，供状态中的客户端日志展示。
/// 返回的 guard 需要保持到进程退出，否则文件日志可能丢失。
pub fn setup_logging(
    verbose: bool,
    log_level: &str,
    buffer: &ProcessLogBuffer,
) -> Result<Option<WorkerGuard>> {
    let default_level = if verbose { "debug" } else { log_level };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let (file_layer, guard) = match std::env::var(LOG_FILE_ENV) {
        Ok(log_file) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_file)
                .with_context(|| format!("无法创建日志文件 {log_file}"))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_thread_names(true)
                .with_line_number(true);
            (Some(layer), Some(guard))
        }
        Err(_) => (None, None),
    };

    // 终端输出使用简洁格式
    let terminal_layer = file_layer.is_none().then(|| {
        fmt::layer()
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false)
            .without_time()
            .compact()
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(terminal_layer)
        .with(buffer.layer())
        .try_init()
        .context("日志系统已经初始化")?;

    Ok(guard)
}
