use super::types::DockerManager;
use crate::recipe::Recipe;
use crate::runner::{CommandOutput, CommandSpec};
use crate::{HiveError, Result};
use tracing::debug;

impl DockerManager {
    /// 执行 docker 命令，非零退出码视为错误
    pub(crate) async fn run_docker_command(
        &self,
        args: &[&str],
        recipe: Option<&Recipe>,
    ) -> Result<CommandOutput> {
        let mut spec = CommandSpec::new("docker").args(args.iter().copied());
        if let Some(recipe) = recipe {
            spec = spec.current_dir(recipe.root()).envs(&recipe.environment);
        }
        self.execute(spec).await
    }

    /// 针对配方中实际存在的 compose 文件执行 `docker compose`
    ///
    /// 没有可用 compose 文件时返回错误。
    pub(crate) async fn run_compose_command(
        &self,
        recipe: &Recipe,
        args: &[&str],
    ) -> Result<CommandOutput> {
        let files = recipe.resolved_compose_files();
        if files.is_empty() {
            return Err(HiveError::docker("配方中没有可用的 compose 文件"));
        }

        let mut spec = CommandSpec::new("docker").arg("compose");
        for (reference, _) in &files {
            spec = spec.arg("-f").arg(reference.as_str());
        }
        let spec = spec
            .args(args.iter().copied())
            .current_dir(recipe.root())
            .envs(&recipe.environment);
        self.execute(spec).await
    }

    async fn execute(&self, spec: CommandSpec) -> Result<CommandOutput> {
        debug!("执行命令: {}", spec);
        let output = self.runner.run(&spec).await?;
        if !output.success {
            return Err(HiveError::docker(format!(
                "{} 失败: {}",
                spec,
                output.stderr.trim()
            )));
        }
        Ok(output)
    }
}
