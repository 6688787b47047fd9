use super::Controller;
use crate::auth::TokenProvider;
use crate::config::Settings;
use crate::logs::ProcessLogBuffer;
use crate::recipe::Recipe;
use crate::runner::testing::MockRunner;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

pub const RUNNING_CONTAINER: &str = r#"{"ID":"abc","Name":"app-web-1","Image":"x:latest","State":"running","Status":"Up 2 seconds","Service":"web"}"#;

pub struct Fixture {
    pub dir: Arc<TempDir>,
    pub repo: PathBuf,
    pub settings_path: PathBuf,
    pub runner: Arc<MockRunner>,
    pub logs: ProcessLogBuffer,
    pub controller: Arc<Controller>,
}

impl Fixture {
    pub async fn new(runner: MockRunner) -> Self {
        Self::build(runner, None, |_| {}).await
    }

    pub async fn with_settings(runner: MockRunner, configure: impl FnOnce(&mut Settings)) -> Self {
        Self::build(runner, None, configure).await
    }

    pub async fn with_tokens(runner: MockRunner, tokens: Arc<dyn TokenProvider>) -> Self {
        Self::build(runner, Some(tokens), |_| {}).await
    }

    /// 在同一目录上创建新的控制器，模拟进程重启
    pub async fn reuse(previous: &Fixture, runner: MockRunner) -> Self {
        let settings = Settings::load_from_file(&previous.settings_path).unwrap();
        Self::start(previous.dir.clone(), settings, runner, None).await
    }

    async fn build(
        runner: MockRunner,
        tokens: Option<Arc<dyn TokenProvider>>,
        configure: impl FnOnce(&mut Settings),
    ) -> Self {
        let dir = Arc::new(tempfile::tempdir().unwrap());
        let repo = dir.path().join("hive");
        std::fs::create_dir_all(repo.join("compose")).unwrap();
        std::fs::write(
            repo.join("compose/app.yml"),
            "services:\n  web:\n    image: x:latest\n",
        )
        .unwrap();

        let mut settings = Settings {
            hive_id: "hive-test".to_string(),
            hive_repo: repo,
            hive_url: "https://github.com/caretech-owl/hive.git".to_string(),
            client_version: "1.0.0".to_string(),
            ..Settings::default()
        };
        configure(&mut settings);
        settings.save_to_file(dir.path().join("config.toml")).unwrap();

        Self::start(dir, settings, runner, tokens).await
    }

    async fn start(
        dir: Arc<TempDir>,
        settings: Settings,
        runner: MockRunner,
        tokens: Option<Arc<dyn TokenProvider>>,
    ) -> Self {
        let repo = settings.hive_repo.clone();
        let settings_path = dir.path().join("config.toml");
        let runner = Arc::new(runner);
        let logs = ProcessLogBuffer::new(50);
        let controller = Controller::new(
            settings.into_shared(),
            settings_path.clone(),
            runner.clone(),
            logs.clone(),
            tokens,
        )
        .await;

        Self {
            dir,
            repo,
            settings_path,
            runner,
            logs,
            controller,
        }
    }
}

/// 引用示例 compose 文件的配方，`NAME` 环境变量用于区分不同配方
pub fn recipe_named(repo: &Path, name: &str) -> Recipe {
    let mut recipe = Recipe::new(repo.join("hive-test.yml"));
    recipe.compose = vec!["compose/app.yml".to_string()];
    recipe
        .environment
        .insert("NAME".to_string(), name.to_string());
    recipe
}
