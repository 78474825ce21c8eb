//! API gateway trait and the reqwest-backed implementation.
//!
//! Every outbound call goes through [`ApiGateway::call`]. The gateway attaches
//! the caller's bearer token, maps non-2xx answers to [`ApiError::Rejected`]
//! and turns empty bodies into [`ApiBody::Empty`]. It never retries.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, RETRY_AFTER};
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::request::{ApiBody, ApiRequest, ApiToken, Method};

/// Single point of outbound calls to the provider.
#[async_trait]
pub trait ApiGateway: Send + Sync {
    /// Perform one request with the given token.
    async fn call(&self, token: &ApiToken, request: ApiRequest) -> ApiResult<ApiBody>;
}

/// Gateway backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct HttpGateway {
    config: ApiConfig,
    client: reqwest::Client,
}

impl HttpGateway {
    /// Create a gateway from configuration.
    pub fn new(config: ApiConfig) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn builder(&self, request: &ApiRequest) -> reqwest::RequestBuilder {
        let url = self.config.url_for(&request.path);
        let builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
            Method::Put => self.client.put(url),
            Method::Patch => self.client.patch(url),
            Method::Delete => self.client.delete(url),
        };
        let builder = if request.query.is_empty() {
            builder
        } else {
            builder.query(&request.query)
        };
        match &request.body {
            Some(body) => builder.json(body),
            None => builder,
        }
    }
}

#[async_trait]
impl ApiGateway for HttpGateway {
    async fn call(&self, token: &ApiToken, request: ApiRequest) -> ApiResult<ApiBody> {
        debug!("{} {}", request.method, request.path);

        let response = self
            .builder(&request)
            .header(AUTHORIZATION, token.bearer())
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            warn!("Provider rate limit hit on {} {}", request.method, request.path);
            return Err(ApiError::RateLimited { retry_after });
        }

        let text = response.text().await?;

        if !status.is_success() {
            debug!("{} {} -> {}", request.method, request.path, status);
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                body: text,
            });
        }

        if status == reqwest::StatusCode::NO_CONTENT {
            return Ok(ApiBody::Empty);
        }

        ApiBody::from_text(&text)
    }
}
