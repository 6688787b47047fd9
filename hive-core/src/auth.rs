//! OAuth 设备授权流程，用于获取推送配置仓库的访问令牌

use crate::constants::{auth, timer};
use crate::{HiveError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info, warn};

/// 设备码申请结果
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceCode {
    pub user_code: String,
    pub device_code: String,
    pub verification_uri: String,
}

#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// 申请设备码，用户需在 `verification_uri` 输入 `user_code`
    async fn request_code(&self) -> Result<DeviceCode>;

    /// 用设备码换取访问令牌，用户尚未完成授权时返回 `None`
    async fn access_token(&self, device_code: &str) -> Result<Option<String>>;
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: Option<String>,
    error: Option<String>,
}

/// GitHub 设备授权流程
#[derive(Debug, Clone)]
pub struct GithubDeviceFlow {
    client: Client,
    client_id: String,
}

impl GithubDeviceFlow {
    pub fn new(client_id: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(auth::HTTP_TIMEOUT))
            .build()?;
        Ok(Self {
            client,
            client_id: client_id.into(),
        })
    }
}

#[async_trait]
impl TokenProvider for GithubDeviceFlow {
    async fn request_code(&self) -> Result<DeviceCode> {
        info!("向 GitHub 申请设备码");
        let response = self
            .client
            .post(auth::DEVICE_CODE_URL)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[("client_id", self.client_id.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            error!("申请设备码失败: {} - {}", status, text);
            return Err(HiveError::auth(format!("申请设备码失败: {status}")));
        }
        Ok(response.json().await?)
    }

    async fn access_token(&self, device_code: &str) -> Result<Option<String>> {
        let response = self
            .client
            .post(auth::ACCESS_TOKEN_URL)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[
                ("device_code", device_code),
                ("client_id", self.client_id.as_str()),
                ("grant_type", auth::DEVICE_GRANT_TYPE),
            ])
            .send()
            .await?;

        let body: AccessTokenResponse = response.json().await?;
        match body.access_token {
            Some(token) => Ok(Some(token)),
            None => {
                warn!(
                    "尚未获得访问令牌: {}",
                    body.error.as_deref().unwrap_or("unknown")
                );
                Ok(None)
            }
        }
    }
}

/// 按固定间隔轮询访问令牌，直到用户完成授权或超过次数上限
pub async fn poll_access_token(
    provider: &dyn TokenProvider,
    device_code: &str,
    interval: Duration,
    max_attempts: u32,
) -> Result<String> {
    for attempt in 1..=max_attempts {
        if let Some(token) = provider.access_token(device_code).await? {
            info!("设备授权完成");
            return Ok(token);
        }
        if attempt < max_attempts {
            tokio::time::sleep(interval).await;
        }
    }
    Err(HiveError::auth("等待用户授权超时"))
}

/// 使用默认轮询参数完成授权
pub async fn wait_for_authorization(
    provider: &dyn TokenProvider,
    device_code: &str,
) -> Result<String> {
    poll_access_token(
        provider,
        device_code,
        Duration::from_secs(timer::DEVICE_FLOW_POLL_INTERVAL),
        timer::DEVICE_FLOW_MAX_ATTEMPTS,
    )
    .await
}


#[cfg(test)]
mod tests {
    use super::testing::StaticTokenProvider;
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_poll_returns_token_once_ready() {
        let provider = StaticTokenProvider::new(Some("gho_token"), 3);
        let token = poll_access_token(&provider, "device", Duration::from_secs(5), 10)
            .await
            .unwrap();
        assert_eq!(token, "gho_token");
        assert_eq!(*provider.polls.lock().unwrap(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_gives_up_after_max_attempts() {
        let provider = StaticTokenProvider::new(None, 1);
        let err = poll_access_token(&provider, "device", Duration::from_secs(5), 4)
            .await
            .unwrap_err();
        assert!(matches!(err, HiveError::Auth(_)));
        assert_eq!(*provider.polls.lock().unwrap(), 4);
    }

    #[test]
    fn test_device_code_response_parses() {
        let json = r#"{"device_code":"3584d","user_code":"WDJB-MJHT","verification_uri":"https://github.com/login/device","expires_in":900,"interval":5}"#;
        let code: DeviceCode = serde_json::from_str(json).unwrap();
        assert_eq!(code.user_code, "WDJB-MJHT");
    }
}
