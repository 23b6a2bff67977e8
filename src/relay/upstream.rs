use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::core::models::UpstreamSettings;
use crate::core::types::{BearerToken, Parameters};

/// Status, content type and raw body of an upstream reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn body_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Outbound calls to the upstream provider.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn exchange_token(&self, form: &Parameters) -> Result<UpstreamResponse, reqwest::Error>;
    async fn userinfo(&self, token: &BearerToken) -> Result<UpstreamResponse, reqwest::Error>;
}

#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: Client,
    token_endpoint: String,
    userinfo_endpoint: String,
}

impl HttpUpstream {
    pub fn new(settings: &UpstreamSettings, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            token_endpoint: settings.token_endpoint(),
            userinfo_endpoint: settings.userinfo_endpoint(),
        })
    }

    async fn collect(response: reqwest::Response) -> Result<UpstreamResponse, reqwest::Error> {
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        let body = response.bytes().await?.to_vec();

        Ok(UpstreamResponse {
            status,
            content_type,
            body,
        })
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn exchange_token(&self, form: &Parameters) -> Result<UpstreamResponse, reqwest::Error> {
        let response = self
            .client
            .post(&self.token_endpoint)
            .form(form)
            .send()
            .await?;
        Self::collect(response).await
    }

    async fn userinfo(&self, token: &BearerToken) -> Result<UpstreamResponse, reqwest::Error> {
        let response = self
            .client
            .get(&self.userinfo_endpoint)
            .bearer_auth(&token.0)
            .send()
            .await?;
        Self::collect(response).await
    }
}
