use thiserror::Error;

pub type Result<T> = std::result::Result<T, HiveError>;

#[derive(Error, Debug)]
pub enum HiveError {
    #[error("配置错误: {0}")]
    Config(#[from] toml::de::Error),

    #[error("配置序列化错误: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("HTTP 请求错误: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON 序列化错误: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML 序列化错误: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("远程仓库地址无效: {0}")]
    Url(#[from] url::ParseError),

    #[error("任务执行错误: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Git 命令执行失败: {0}")]
    Git(String),

    #[error("Docker 命令执行失败: {0}")]
    Docker(String),

    #[error("校验失败: {0}")]
    Validation(String),

    #[error("前置条件不满足: {0}")]
    Precondition(String),

    #[error("目录已存在: {0}")]
    AlreadyExists(String),

    #[error("授权失败: {0}")]
    Auth(String),

    #[error("自定义错误: {0}")]
    Custom(String),
}

impl HiveError {
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    pub fn git(msg: impl Into<String>) -> Self {
        Self::Git(msg.into())
    }

    pub fn docker(msg: impl Into<String>) -> Self {
        Self::Docker(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }
}
