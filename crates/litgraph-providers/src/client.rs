//! Domain-allowlisted, rate-limited, retrying HTTP client shared by all
//! concrete providers (spec §4.1). The allowlist follows the sandboxing
//! pattern used elsewhere in this codebase's ingestion layer: network
//! capability is capped at construction time, not left to caller discipline.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use litgraph_common::config::ProviderConfig;
use reqwest::{Client, RequestBuilder};
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use url::Url;

use crate::error::ProviderError;
use crate::rate_limit::TokenBucket;
use crate::retry::{retry_with_backoff, NoopRetryObserver, RetryObserver};

/// A client bound to one upstream provider: one token bucket, one retry
/// policy, one domain allowlist, one retry observer.
pub struct ProviderClient {
    http: Client,
    bucket: TokenBucket,
    cfg: ProviderConfig,
    allowlist: HashSet<String>,
    name: &'static str,
    observer: Arc<dyn RetryObserver>,
}

impl ProviderClient {
    /// Builds a client whose retries go nowhere. Use [`Self::with_observer`]
    /// to wire retries into a caller's metrics sink.
    pub fn new(name: &'static str, cfg: ProviderConfig, extra_domains: &[&str]) -> Result<Self, ProviderError> {
        Self::with_observer(name, cfg, extra_domains, Arc::new(NoopRetryObserver))
    }

    pub fn with_observer(
        name: &'static str,
        cfg: ProviderConfig,
        extra_domains: &[&str],
        observer: Arc<dyn RetryObserver>,
    ) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(ProviderError::from)?;

        let mut allowlist = HashSet::new();
        if let Ok(parsed) = Url::parse(&cfg.base_url) {
            if let Some(host) = parsed.host_str() {
                allowlist.insert(host.to_string());
            }
        }
        for d in extra_domains {
            allowlist.insert((*d).to_string());
        }

        let bucket = TokenBucket::new(cfg.rate_limit.clone());
        Ok(Self { http, bucket, cfg, allowlist, name, observer })
    }

    fn is_allowed(&self, url: &str) -> bool {
        Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(String::from))
            .map(|host| self.allowlist.iter().any(|d| host == *d || host.ends_with(&format!(".{d}"))))
            .unwrap_or(false)
    }

    fn get(&self, url: &str) -> Result<RequestBuilder, ProviderError> {
        if !self.is_allowed(url) {
            return Err(ProviderError::InvalidInput(format!("url not in allowlist: {url}")));
        }
        Ok(self.http.get(url))
    }

    fn post(&self, url: &str) -> Result<RequestBuilder, ProviderError> {
        if !self.is_allowed(url) {
            return Err(ProviderError::InvalidInput(format!("url not in allowlist: {url}")));
        }
        Ok(self.http.post(url))
    }

    pub fn base_url(&self) -> &str {
        &self.cfg.base_url
    }

    pub fn api_key(&self) -> Option<String> {
        self.cfg.api_key.as_ref().map(|k| {
            use secrecy::ExposeSecret;
            k.expose_secret().to_string()
        })
    }

    /// Rate-limit, retry, and execute a GET built from `build` against `url`,
    /// decoding JSON from the response. Every retry is reported to this
    /// client's observer (spec §4.1).
    #[instrument(skip(self, build), fields(provider = self.name))]
    pub async fn get_json<T, F>(&self, url: &str, cancel: &CancellationToken, build: F) -> Result<T, ProviderError>
    where
        T: serde::de::DeserializeOwned,
        F: Fn(RequestBuilder) -> RequestBuilder,
    {
        let observer = self.observer.as_ref();
        retry_with_backoff(
            &self.cfg.retry,
            cancel,
            self.name,
            || async {
                self.bucket.acquire().await?;
                let req = build(self.get(url)?);
                let resp = req.send().await.map_err(ProviderError::from)?;
                handle_response_json(resp).await
            },
            |provider, kind| observer.record_retry(provider, kind),
        )
        .await
    }

    /// Rate-limit, retry, and execute a GET, returning the raw response text.
    #[instrument(skip(self, build), fields(provider = self.name))]
    pub async fn get_text<F>(&self, url: &str, cancel: &CancellationToken, build: F) -> Result<String, ProviderError>
    where
        F: Fn(RequestBuilder) -> RequestBuilder,
    {
        let observer = self.observer.as_ref();
        retry_with_backoff(
            &self.cfg.retry,
            cancel,
            self.name,
            || async {
                self.bucket.acquire().await?;
                let req = build(self.get(url)?);
                let resp = req.send().await.map_err(ProviderError::from)?;
                handle_response_text(resp).await
            },
            |provider, kind| observer.record_retry(provider, kind),
        )
        .await
    }

    /// Rate-limit, retry, and execute a POST with a JSON body, decoding a JSON response.
    #[instrument(skip(self, body), fields(provider = self.name))]
    pub async fn post_json<B, T>(&self, url: &str, body: &B, cancel: &CancellationToken) -> Result<T, ProviderError>
    where
        B: serde::Serialize + Sync,
        T: serde::de::DeserializeOwned,
    {
        let observer = self.observer.as_ref();
        retry_with_backoff(
            &self.cfg.retry,
            cancel,
            self.name,
            || async {
                self.bucket.acquire().await?;
                let resp = self.post(url)?.json(body).send().await.map_err(ProviderError::from)?;
                handle_response_json(resp).await
            },
            |provider, kind| observer.record_retry(provider, kind),
        )
        .await
    }
}

async fn handle_response_json<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T, ProviderError> {
    let status = resp.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after_ms = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .map(|secs| secs * 1000);
        return Err(ProviderError::RateLimited { retry_after_ms });
    }
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(ProviderError::NotFound);
    }
    if status.is_server_error() {
        return Err(ProviderError::Unavailable);
    }
    if !status.is_success() {
        return Err(ProviderError::InvalidInput(format!("unexpected status {status}")));
    }
    resp.json::<T>().await.map_err(ProviderError::from)
}

async fn handle_response_text(resp: reqwest::Response) -> Result<String, ProviderError> {
    let status = resp.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(ProviderError::RateLimited { retry_after_ms: None });
    }
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(ProviderError::NotFound);
    }
    if status.is_server_error() {
        return Err(ProviderError::Unavailable);
    }
    if !status.is_success() {
        return Err(ProviderError::InvalidInput(format!("unexpected status {status}")));
    }
    resp.text().await.map_err(ProviderError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use litgraph_common::config::{RateLimitConfig, RetryConfig};

    fn cfg(base_url: &str) -> ProviderConfig {
        ProviderConfig {
            base_url: base_url.to_string(),
            api_key: None,
            rate_limit: RateLimitConfig::default(),
            retry: RetryConfig::default(),
        }
    }

    #[test]
    fn host_of_base_url_is_allowlisted() {
        let client = ProviderClient::new("test", cfg("https://export.arxiv.org/api/query"), &[]).unwrap();
        assert!(client.is_allowed("https://export.arxiv.org/foo"));
        assert!(!client.is_allowed("https://evil.example.com/foo"));
    }

    #[test]
    fn extra_domains_are_allowlisted() {
        let client = ProviderClient::new("test", cfg("https://api.example.com"), &["api.openai.com"]).unwrap();
        assert!(client.is_allowed("https://api.openai.com/v1/chat"));
    }

    #[test]
    fn subdomains_of_allowed_domains_are_allowed() {
        let client = ProviderClient::new("test", cfg("https://export.arxiv.org"), &[]).unwrap();
        assert!(client.is_allowed("https://sub.export.arxiv.org/x"));
    }
}
