use super::RepoManager;
use crate::runner::{CommandOutput, CommandSpec};
use crate::{HiveError, Result};
use tracing::debug;
use url::Url;

impl RepoManager {
    /// 在仓库目录中执行 git 命令，非零退出码视为错误
    pub(crate) async fn git(&self, args: &[&str]) -> Result<CommandOutput> {
        let spec = CommandSpec::new("git")
            .args(args.iter().copied())
            .current_dir(self.repo_path());
        debug!("执行命令: {}", redact_command(&spec));

        let output = self.runner.run(&spec).await?;
        if !output.success {
            return Err(HiveError::git(format!(
                "git {} 失败: {}",
                args.first().copied().unwrap_or_default(),
                output.stderr.trim()
            )));
        }
        Ok(output)
    }

    /// 执行 git 命令并返回去除首尾空白的 stdout
    pub(crate) async fn git_output(&self, args: &[&str]) -> Result<String> {
        Ok(self.git(args).await?.stdout.trim().to_string())
    }
}

/// 在远程地址中嵌入访问令牌
pub(crate) fn authenticated_url(remote: &str, user: &str, token: &str) -> Result<String> {
    let mut url = Url::parse(remote)?;
    url.set_username(user)
        .and_then(|_| url.set_password(Some(token)))
        .map_err(|_| HiveError::validation(format!("远程地址 {remote} 不支持嵌入凭据")))?;
    Ok(url.to_string())
}

/// 用于日志输出的命令行，隐藏地址中的凭据
fn redact_command(spec: &CommandSpec) -> String {
    let mut line = spec.program.clone();
    for arg in &spec.args {
        line.push(' ');
        match Url::parse(arg) {
            Ok(mut url) if url.password().is_some() => {
                let _ = url.set_password(Some("***"));
                line.push_str(url.as_str());
            }
            _ => line.push_str(arg),
        }
    }
    line
}
