use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use url::Url;

use crate::config::FetchConfig;
use crate::error::FetchError;

#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    pub timeout: Duration,
    /// Bodies longer than this are truncated, not rejected.
    pub max_body_bytes: Option<usize>,
}

impl FetchOptions {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            max_body_bytes: None,
        }
    }

    pub fn with_max_body_bytes(mut self, max: usize) -> Self {
        self.max_body_bytes = Some(max);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// HTTP GET capability. Non-2xx statuses are responses, not errors.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn get(&self, url: &str, options: FetchOptions) -> Result<FetchResponse, FetchError>;
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    user_agent: String,
    relay_url: Option<String>,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> anyhow::Result<Self> {
        let mut builder =
            reqwest::Client::builder().redirect(reqwest::redirect::Policy::limited(10));
        if !config.system_proxy {
            builder = builder.no_proxy();
        }
        let client = builder.build().context("build http client")?;
        Ok(Self {
            client,
            user_agent: config.user_agent.clone(),
            relay_url: config.relay_url.clone(),
        })
    }

    fn request_url(&self, url: &str) -> Result<Url, FetchError> {
        let target = Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;
        let Some(relay) = self.relay_url.as_deref() else {
            return Ok(target);
        };
        let encoded: String = url::form_urlencoded::byte_serialize(target.as_str().as_bytes()).collect();
        let relayed = format!("{relay}{encoded}");
        Url::parse(&relayed).map_err(|_| FetchError::InvalidUrl(relayed))
    }

    async fn send(&self, url: Url, max_body_bytes: Option<usize>) -> Result<FetchResponse, FetchError> {
        let request_error = |err: reqwest::Error| FetchError::Request {
            url: url.to_string(),
            message: err.to_string(),
        };

        let mut response = self
            .client
            .get(url.clone())
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "application/xml,text/xml,text/html;q=0.9,*/*;q=0.8")
            .send()
            .await
            .map_err(request_error)?;
        let status = response.status().as_u16();

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(request_error)? {
            body.extend_from_slice(&chunk);
            if let Some(max) = max_body_bytes {
                if body.len() >= max {
                    body.truncate(max);
                    break;
                }
            }
        }

        Ok(FetchResponse {
            status,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, url: &str, options: FetchOptions) -> Result<FetchResponse, FetchError> {
        let request_url = self.request_url(url)?;
        match tokio::time::timeout(options.timeout, self.send(request_url, options.max_body_bytes)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                url: url.to_string(),
                timeout_ms: options.timeout.as_millis() as u64,
            }),
        }
    }
}
