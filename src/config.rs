use std::time::Duration;

use anyhow::Context as _;

pub const DEFAULT_USER_AGENT: &str = "sitemapwatch/0.1";
pub const RELAY_URL_ENV: &str = "SITEMAPWATCH_RELAY_URL";
pub const USER_AGENT_ENV: &str = "SITEMAPWATCH_USER_AGENT";
pub const NO_PROXY_ENV: &str = "SITEMAPWATCH_NO_PROXY";

/// Outbound HTTP settings shared by robots.txt, sitemap and title fetches.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub robots_timeout: Duration,
    pub sitemap_timeout: Duration,
    pub title_timeout: Duration,
    pub title_max_bytes: usize,
    /// CORS-bypass relay prefix; the percent-encoded target URL is appended.
    pub relay_url: Option<String>,
    /// Honor `HTTP_PROXY`/`HTTPS_PROXY` from the environment.
    pub system_proxy: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            robots_timeout: Duration::from_secs(5),
            sitemap_timeout: Duration::from_secs(15),
            title_timeout: Duration::from_secs(3),
            title_max_bytes: 500 * 1024,
            relay_url: None,
            system_proxy: true,
        }
    }
}

impl FetchConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();
        if let Some(raw) = non_empty_env(RELAY_URL_ENV) {
            config.relay_url = Some(parse_relay_url(&raw).with_context(|| {
                format!("invalid {RELAY_URL_ENV}={raw:?}. expected an http(s) url prefix")
            })?);
        }
        if let Some(user_agent) = non_empty_env(USER_AGENT_ENV) {
            config.user_agent = user_agent;
        }
        if let Some(raw) = non_empty_env(NO_PROXY_ENV) {
            config.system_proxy = !parse_flag(&raw)
                .with_context(|| format!("invalid {NO_PROXY_ENV}={raw:?}. expected 1/0/true/false"))?;
        }
        Ok(config)
    }
}

pub fn parse_relay_url(raw: &str) -> anyhow::Result<String> {
    let raw = raw.trim();
    let parsed = url::Url::parse(raw).context("parse relay url")?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        anyhow::bail!("relay url must be http/https: {raw}");
    }
    Ok(raw.to_string())
}

pub fn parse_flag(raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => anyhow::bail!("unsupported flag value: {other}"),
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on concurrent title fetches within one scan.
    pub enrich_concurrency: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enrich_concurrency: 4,
        }
    }
}
