//! HTTP client for the BRVM analysis gateway: retried GETs behind a TTL cache.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::cache::{CacheMode, CacheTtls, ResponseCache};
use crate::config::{DashboardConfig, DEFAULT_API_URL, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::model::{Analysis, Company, ScreenerPayload, ScreenerRow};
use crate::retry::{retry_async, RetryPolicy};
use crate::source::MarketDataSource;

const USER_AGENT: &str = concat!("brvm-dashboard/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid gateway URL: {0}")]
    InvalidUrl(String),
    #[error("no company symbol given")]
    EmptySymbol,
    #[error("HTTP client build error: {0}")]
    ClientBuild(String),
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("unexpected HTTP status {status} at {url}")]
    Status { url: String, status: u16 },
    #[error("unexpected payload from {url}: {message}")]
    Decode { url: String, message: String },
    #[error("gateway unreachable after {attempts} attempts ({url}): {last}")]
    Exhausted {
        url: String,
        attempts: u32,
        last: Box<GatewayError>,
    },
}

impl GatewayError {
    /// The innermost error, looking through retry exhaustion.
    pub fn root(&self) -> &GatewayError {
        match self {
            GatewayError::Exhausted { last, .. } => last.root(),
            other => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScreenerScope {
    All,
    Symbol(String),
}

#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: Url,
    retry: RetryPolicy,
    ttls: CacheTtls,
    cache: Option<Arc<ResponseCache>>,
}

impl GatewayClient {
    pub fn builder() -> GatewayClientBuilder {
        GatewayClientBuilder::default()
    }

    pub fn from_config(config: &DashboardConfig) -> Result<Self, GatewayError> {
        Self::builder()
            .base_url(config.api_url.clone())
            .timeout(config.request_timeout)
            .retry_policy(config.retry.clone())
            .cache_ttls(config.cache.ttls)
            .cache_enabled(config.cache.enabled)
            .build()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache.is_some()
    }

    pub async fn companies(&self, mode: CacheMode) -> Result<Vec<Company>, GatewayError> {
        let url = self.endpoint(&["companies"], true)?;
        self.get_json(url, self.ttls.companies, mode).await
    }

    pub async fn analysis(&self, symbol: &str, mode: CacheMode) -> Result<Analysis, GatewayError> {
        let symbol = normalize_symbol(symbol)?;
        let url = self.endpoint(&["analysis", symbol], false)?;
        self.get_json(url, self.ttls.analysis, mode).await
    }

    pub async fn screener(
        &self,
        scope: &ScreenerScope,
        mode: CacheMode,
    ) -> Result<Vec<ScreenerRow>, GatewayError> {
        let url = match scope {
            ScreenerScope::All => self.endpoint(&["screener"], true)?,
            ScreenerScope::Symbol(symbol) => {
                self.endpoint(&["screener", normalize_symbol(symbol)?], false)?
            }
        };
        let payload: ScreenerPayload = self.get_json(url, self.ttls.screener, mode).await?;
        Ok(payload.into_rows())
    }

    pub async fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear().await;
        }
    }

    fn endpoint(&self, segments: &[&str], trailing_slash: bool) -> Result<Url, GatewayError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| GatewayError::InvalidUrl(self.base_url.to_string()))?;
            path.pop_if_empty();
            path.extend(segments);
            if trailing_slash {
                path.push("");
            }
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        ttl: Duration,
        mode: CacheMode,
    ) -> Result<T, GatewayError> {
        if mode == CacheMode::Use {
            if let Some(cache) = &self.cache {
                if let Some(body) = cache.get(url.as_str()).await {
                    if let Ok(value) = serde_json::from_str::<T>(&body) {
                        debug!(
                            component = "gateway",
                            event = "gateway.cache.hit",
                            url = %url
                        );
                        return Ok(value);
                    }
                }
            }
        }

        let (value, body) =
            retry_async(&self.retry, url.as_str(), || self.fetch_once::<T>(&url)).await?;

        if mode != CacheMode::Bypass {
            if let Some(cache) = &self.cache {
                cache.put(url.as_str(), &body, ttl).await;
            }
        }

        Ok(value)
    }

    async fn fetch_once<T: DeserializeOwned>(
        &self,
        url: &Url,
    ) -> Result<(T, String), GatewayError> {
        let response = self
            .http
            .get(url.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|err| request_error(url, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|err| request_error(url, err))?;
        let value = serde_json::from_str::<T>(&body).map_err(|err| GatewayError::Decode {
            url: url.to_string(),
            message: err.to_string(),
        })?;

        info!(
            component = "gateway",
            event = "gateway.request.ok",
            url = %url,
            status = status.as_u16(),
            bytes = body.len()
        );

        Ok((value, body))
    }
}

impl MarketDataSource for GatewayClient {
    async fn companies(&self, mode: CacheMode) -> Result<Vec<Company>, GatewayError> {
        GatewayClient::companies(self, mode).await
    }

    async fn analysis(&self, symbol: &str, mode: CacheMode) -> Result<Analysis, GatewayError> {
        GatewayClient::analysis(self, symbol, mode).await
    }

    async fn screener(
        &self,
        scope: &ScreenerScope,
        mode: CacheMode,
    ) -> Result<Vec<ScreenerRow>, GatewayError> {
        GatewayClient::screener(self, scope, mode).await
    }

    async fn clear_cache(&self) {
        GatewayClient::clear_cache(self).await;
    }
}

#[derive(Debug, Default)]
pub struct GatewayClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    retry: Option<RetryPolicy>,
    ttls: Option<CacheTtls>,
    cache_enabled: Option<bool>,
    user_agent: Option<String>,
}

impl GatewayClientBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Per-request timeout. Default: 30 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    pub fn cache_ttls(mut self, ttls: CacheTtls) -> Self {
        self.ttls = Some(ttls);
        self
    }

    /// Caching is on unless switched off here.
    pub fn cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = Some(enabled);
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    pub fn build(self) -> Result<GatewayClient, GatewayError> {
        let raw = self.base_url.unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let base_url = Url::parse(&raw).map_err(|_| GatewayError::InvalidUrl(raw.clone()))?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(GatewayError::InvalidUrl(raw));
        }

        let http = reqwest::Client::builder()
            .user_agent(self.user_agent.as_deref().unwrap_or(USER_AGENT))
            .timeout(
                self.timeout
                    .unwrap_or(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)),
            )
            .build()
            .map_err(|err| GatewayError::ClientBuild(err.to_string()))?;

        let mut retry = self.retry.unwrap_or_default();
        retry.attempts = retry.attempts.max(1);

        Ok(GatewayClient {
            http,
            base_url,
            retry,
            ttls: self.ttls.unwrap_or_default(),
            cache: self
                .cache_enabled
                .unwrap_or(true)
                .then(|| Arc::new(ResponseCache::new())),
        })
    }
}

fn normalize_symbol(symbol: &str) -> Result<&str, GatewayError> {
    let trimmed = symbol.trim();
    if trimmed.is_empty() {
        Err(GatewayError::EmptySymbol)
    } else {
        Ok(trimmed)
    }
}

fn request_error(url: &Url, err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout {
            url: url.to_string(),
        }
    } else {
        GatewayError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> GatewayClient {
        GatewayClient::builder().base_url(base).build().unwrap()
    }

    #[test]
    fn endpoints_follow_gateway_routes() {
        let gw = client("https://brvm-api-gateway.onrender.com");
        assert_eq!(
            gw.endpoint(&["companies"], true).unwrap().as_str(),
            "https://brvm-api-gateway.onrender.com/companies/"
        );
        assert_eq!(
            gw.endpoint(&["analysis", "SNTS"], false).unwrap().as_str(),
            "https://brvm-api-gateway.onrender.com/analysis/SNTS"
        );
    }

    #[test]
    fn base_path_prefix_is_preserved() {
        let with_slash = client("http://localhost:9000/api/");
        let without_slash = client("http://localhost:9000/api");

        for gw in [with_slash, without_slash] {
            assert_eq!(
                gw.endpoint(&["screener"], true).unwrap().as_str(),
                "http://localhost:9000/api/screener/"
            );
        }
    }

    #[test]
    fn symbol_is_a_single_encoded_segment() {
        let gw = client("http://localhost:9000");
        assert_eq!(
            gw.endpoint(&["analysis", "A/B C"], false).unwrap().as_str(),
            "http://localhost:9000/analysis/A%2FB%20C"
        );
    }

    #[test]
    fn invalid_base_urls_are_rejected() {
        for raw in ["not a url", "mailto:ops@example.com", "ftp://example.com"] {
            let err = GatewayClient::builder().base_url(raw).build().unwrap_err();
            assert!(matches!(err, GatewayError::InvalidUrl(_)), "{raw}");
        }
    }

    #[test]
    fn zero_attempt_policy_is_clamped_to_one() {
        let gw = GatewayClient::builder()
            .retry_policy(RetryPolicy::fixed(0, Duration::ZERO))
            .build()
            .unwrap();
        assert_eq!(gw.retry.attempts, 1);
    }

    #[tokio::test]
    async fn blank_symbol_fails_without_network() {
        let gw = client("http://127.0.0.1:9");
        let err = gw.analysis("   ", CacheMode::Use).await.unwrap_err();
        assert!(matches!(err, GatewayError::EmptySymbol));
    }

    #[test]
    fn root_looks_through_exhaustion() {
        let err = GatewayError::Exhausted {
            url: "http://gw/companies/".to_string(),
            attempts: 3,
            last: Box::new(GatewayError::Status {
                url: "http://gw/companies/".to_string(),
                status: 503,
            }),
        };
        assert!(matches!(err.root(), GatewayError::Status { status: 503, .. }));
    }
}
