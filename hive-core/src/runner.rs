//! 外部命令执行
//!
//! git 与 docker 的所有调用都经过 [`CommandRunner`]，测试中可替换为脚本化实现。

use crate::{HiveError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// 一次外部命令调用的完整描述
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// 叠加在当前进程环境变量之上的变量
    pub envs: BTreeMap<String, String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn envs(mut self, envs: &BTreeMap<String, String>) -> Self {
        self.envs
            .extend(envs.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// 命令行中是否包含给定的连续参数
    pub fn has_args(&self, needle: &[&str]) -> bool {
        needle.is_empty()
            || self
                .args
                .windows(needle.len())
                .any(|w| w.iter().zip(needle).all(|(a, b)| a == b))
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// 命令执行结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// stdout 与 stderr 的所有非空行
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.stdout
            .lines()
            .chain(self.stderr.lines())
            .map(str::trim)
            .filter(|l| !l.is_empty())
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// 执行命令并等待其结束。进程无法启动时返回错误，非零退出码体现在结果中。
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput>;
}

/// 基于 tokio 子进程的实现
#[derive(Debug, Clone, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let program = which::which(&spec.program)
            .map_err(|_| HiveError::custom(format!("{} 未安装或不在 PATH 中", spec.program)))?;
        let mut cmd = Command::new(program);
        cmd.args(&spec.args)
            .envs(&spec.envs)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &spec.cwd {
            cmd.current_dir(dir);
        }

        let output = cmd
            .output()
            .await
            .map_err(|e| HiveError::custom(format!("无法执行 {}: {e}", spec.program)))?;

        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    type Reply = std::result::Result<CommandOutput, String>;

    struct Rule {
        needle: Vec<String>,
        /// 依次返回，只剩最后一个时重复返回
        replies: VecDeque<Reply>,
    }

    /// 脚本化的命令执行器：按参数片段匹配返回预设结果，并记录所有调用
    #[derive(Default)]
    pub struct MockRunner {
        rules: Mutex<Vec<Rule>>,
        calls: Mutex<Vec<CommandSpec>>,
    }

    impl MockRunner {
        pub fn new() -> Self {
            Self::default()
        }

        fn push_rule(&self, needle: &[&str], replies: Vec<Reply>) -> &Self {
            self.rules.lock().unwrap().push(Rule {
                needle: needle.iter().map(|s| s.to_string()).collect(),
                replies: replies.into(),
            });
            self
        }

        /// 参数中包含 `needle` 时返回 `output`；后注册的规则优先
        pub fn on(&self, needle: &[&str], output: CommandOutput) -> &Self {
            self.push_rule(needle, vec![Ok(output)])
        }

        /// 参数中包含 `needle` 时依次返回 `outputs`，最后一个结果重复使用
        pub fn on_sequence(&self, needle: &[&str], outputs: Vec<CommandOutput>) -> &Self {
            self.push_rule(needle, outputs.into_iter().map(Ok).collect())
        }

        /// 参数中包含 `needle` 时模拟进程无法启动
        pub fn fail_spawn(&self, needle: &[&str]) -> &Self {
            self.push_rule(needle, vec![Err("spawn failed".to_string())])
        }

        pub fn calls(&self) -> Vec<CommandSpec> {
            self.calls.lock().unwrap().clone()
        }

        pub fn command_lines(&self) -> Vec<String> {
            self.calls().iter().map(ToString::to_string).collect()
        }

        /// 第一条包含 `needle` 的调用的位置
        pub fn position(&self, needle: &[&str]) -> Option<usize> {
            self.calls().iter().position(|c| c.has_args(needle))
        }

        pub fn count(&self, needle: &[&str]) -> usize {
            self.calls().iter().filter(|c| c.has_args(needle)).count()
        }
    }

    #[async_trait]
    impl CommandRunner for MockRunner {
        async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
            self.calls.lock().unwrap().push(spec.clone());
            let mut rules = self.rules.lock().unwrap();
            for rule in rules.iter_mut().rev() {
                let needle: Vec<&str> = rule.needle.iter().map(String::as_str).collect();
                if !spec.has_args(&needle) {
                    continue;
                }
                let reply = if rule.replies.len() > 1 {
                    rule.replies.pop_front()
                } else {
                    rule.replies.front().cloned()
                };
                if let Some(reply) = reply {
                    return reply.map_err(HiveError::custom);
                }
            }
            Ok(CommandOutput::ok(""))
        }
    }
}
