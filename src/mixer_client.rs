use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("mixer returned HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed XML: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("unexpected document shape: {0}")]
    Shape(String),
}

/// Functions understood by the mixer's `/api` endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixerAction {
    /// 直接切换节目源
    Cut,
    OverlayIn,
    OverlayOut,
}

impl MixerAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            MixerAction::Cut => "cut",
            MixerAction::OverlayIn => "OverlayInput1",
            MixerAction::OverlayOut => "OverlayInput1Out",
        }
    }
}

#[async_trait]
pub trait MixerApi: Send + Sync {
    /// Raw state document.
    async fn query_state(&self) -> Result<String, TransportError>;
    /// The response body is returned but callers don't act on it.
    async fn send_command(&self, action: MixerAction, key: &str) -> Result<String, TransportError>;
}

pub struct VmixClient {
    client: Client,
    api_url: String,
}

impl VmixClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.to_string(),
        })
    }
}

#[async_trait]
impl MixerApi for VmixClient {
    async fn query_state(&self) -> Result<String, TransportError> {
        let resp = self.client.get(&self.api_url).send().await?;
        if !resp.status().is_success() {
            return Err(TransportError::Status(resp.status()));
        }
        Ok(resp.text().await?)
    }

    async fn send_command(&self, action: MixerAction, key: &str) -> Result<String, TransportError> {
        let resp = self
            .client
            .get(&self.api_url)
            .query(&[("Function", action.as_str()), ("Input", key)])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(TransportError::Status(resp.status()));
        }
        Ok(resp.text().await?)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_names_match_mixer_functions() {
        assert_eq!(MixerAction::Cut.as_str(), "cut");
        assert_eq!(MixerAction::OverlayIn.as_str(), "OverlayInput1");
        assert_eq!(MixerAction::OverlayOut.as_str(), "OverlayInput1Out");
    }

    #[test]
    fn client_builds_from_config() {
        let config = crate::config::test_config();
        assert!(VmixClient::new(&config).is_ok());
    }
}
