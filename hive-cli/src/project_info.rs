//! 项目元数据，自动从 Cargo.toml 同步

pub mod metadata {
    pub const PROJECT_NAME: &str = env!("CARGO_PKG_NAME");

    pub const PROJECT_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

    pub const PROJECT_AUTHORS: &str = env!("CARGO_PKG_AUTHORS");

    pub mod display {
        /// 命令行帮助中展示的详细描述
        pub const DESCRIPTION_LONG: &str = "在边缘设备上运行 Hive：从 Git 仓库同步配方，驱动 Docker Compose 拉取、启动与停止服务，并在运行中安全切换配方";
    }
}

pub mod version_info {
    pub const CLI_VERSION: &str = env!("CARGO_PKG_VERSION");

    pub const CORE_VERSION: &str = hive_core::constants::version::CORE_VERSION;
}
