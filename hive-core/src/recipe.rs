//! 配方（recipe）与 compose 文件模型

use crate::constants::docker::COMPOSE_FILE_PATTERN;
use crate::{HiveError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, warn};

static COMPOSE_PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(COMPOSE_FILE_PATTERN).expect("compose 路径规则无效"));

/// 检查 compose 引用是否符合 `compose/<name>.yml`
pub fn validate_compose_path(reference: &str) -> Result<()> {
    if COMPOSE_PATH_RE.is_match(reference) {
        Ok(())
    } else {
        Err(HiveError::validation(format!(
            "compose 路径 {reference} 无效，必须符合 '{COMPOSE_FILE_PATTERN}'"
        )))
    }
}

/// 对外开放的网络端点
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub name: String,
    pub port: u16,
    #[serde(default = "Endpoint::default_protocol")]
    pub protocol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl Endpoint {
    fn default_protocol() -> String {
        "http".to_string()
    }
}

/// 设备配方：决定运行哪些 compose 文件、开放哪些端点以及注入哪些环境变量
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    /// 配方文件位置，不参与序列化
    #[serde(skip)]
    pub path: PathBuf,
    #[serde(default)]
    pub compose: Vec<String>,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
}

impl Recipe {
    /// 在指定位置创建空配方
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// 从 YAML 文件加载并校验配方
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let mut recipe: Recipe = if content.trim().is_empty() {
            Recipe::default()
        } else {
            serde_yaml::from_str(&content)?
        };
        recipe.path = path.to_path_buf();
        recipe.validate()?;
        Ok(recipe)
    }

    /// 解析前端提交的 JSON 配方并校验
    pub fn from_json<P: AsRef<Path>>(json: &str, path: P) -> Result<Self> {
        let mut recipe: Recipe = serde_json::from_str(json)?;
        recipe.path = path.as_ref().to_path_buf();
        recipe.validate()?;
        Ok(recipe)
    }

    /// 所有 compose 引用都必须符合路径规则，任一不符即整体拒绝
    pub fn validate(&self) -> Result<()> {
        self.compose
            .iter()
            .try_for_each(|reference| validate_compose_path(reference))
    }

    /// 校验后写回配方文件
    pub fn save(&self) -> Result<()> {
        self.validate()?;
        let content = serde_yaml::to_string(self)?;
        fs::write(&self.path, content)?;
        Ok(())
    }

    /// 配方所在目录，compose 引用相对于此目录解析
    pub fn root(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// 解析为实际存在的 compose 文件，按配方中的顺序返回 `(引用, 绝对路径)`
    pub fn resolved_compose_files(&self) -> Vec<(String, PathBuf)> {
        self.compose
            .iter()
            .filter_map(|reference| {
                let path = self.root().join(reference);
                if path.exists() {
                    Some((reference.clone(), path))
                } else {
                    warn!("compose 文件不存在，已跳过: {}", path.display());
                    None
                }
            })
            .collect()
    }

    /// 加载所有可解析的 compose 文件，无法解析的文件记录日志后跳过
    pub fn compose_files(&self) -> Vec<(String, ComposeFile)> {
        self.resolved_compose_files()
            .into_iter()
            .filter_map(|(reference, path)| match ComposeFile::load(&path) {
                Ok(file) => Some((reference, file)),
                Err(e) => {
                    warn!("解析 compose 文件 {} 失败: {}", path.display(), e);
                    None
                }
            })
            .collect()
    }
}

/// compose 文件中的单个服务
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComposeService {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<serde_yaml::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ports: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volumes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<serde_yaml::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<serde_yaml::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<serde_yaml::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<serde_yaml::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart: Option<String>,
}

/// compose 文件
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComposeFile {
    #[serde(default)]
    pub services: BTreeMap<String, ComposeService>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub networks: Option<BTreeMap<String, serde_yaml::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volumes: Option<BTreeMap<String, serde_yaml::Value>>,
}

impl ComposeFile {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(&content)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        debug!("写入 compose 文件: {}", path.display());
        fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    /// 所有非空镜像引用，用于启动前预拉取
    pub fn images(&self) -> Vec<String> {
        self.services
            .values()
            .filter_map(|service| service.image.as_deref())
            .filter(|image| !image.trim().is_empty())
            .map(str::to_string)
            .collect()
    }
}
