//! Sitemap discovery for a bare domain.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::config::FetchConfig;
use crate::error::ParseError;
use crate::fetch::{FetchOptions, Fetcher};
use crate::model::SiteStatus;
use crate::sitemap::{SitemapDocument, parse_sitemap};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SitemapLocation {
    pub sitemap_url: String,
    pub status: SiteStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Canonical domain key for a user-supplied site (`https://Example.com/x` -> `example.com`).
pub fn normalize_domain(input: &str) -> anyhow::Result<String> {
    let mut rest = input.trim();
    for prefix in ["https://", "http://"] {
        if rest
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
        {
            rest = &rest[prefix.len()..];
            break;
        }
    }
    let host = rest
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if host.is_empty() {
        anyhow::bail!("domain is empty: {input:?}");
    }
    if host.chars().any(char::is_whitespace) {
        anyhow::bail!("domain must not contain whitespace: {input:?}");
    }
    Ok(host)
}

/// Local and bare-IPv4 hosts are served over plain http.
pub fn choose_scheme(domain: &str) -> &'static str {
    let host = match domain.rsplit_once(':') {
        Some((host, port)) if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => host,
        _ => domain,
    };
    let is_local = matches!(host, "localhost" | "127.0.0.1" | "0.0.0.0");
    if is_local || host.parse::<Ipv4Addr>().is_ok() {
        "http://"
    } else {
        "https://"
    }
}

/// First `Sitemap:` directive in a robots.txt body, resolved against `origin`.
pub fn sitemap_from_robots(robots_txt: &str, origin: &str) -> Option<String> {
    let body = robots_txt.strip_prefix('\u{feff}').unwrap_or(robots_txt);
    for line in body.lines() {
        let Some((key, value)) = line.trim().split_once(':') else {
            continue;
        };
        if !key.trim().eq_ignore_ascii_case("sitemap") {
            continue;
        }
        let value = strip_inline_comment(value).trim();
        if value.is_empty() {
            continue;
        }

        if has_http_scheme(value) {
            return Some(value.to_string());
        }
        let path = if value.starts_with('/') {
            value.to_string()
        } else {
            format!("/{value}")
        };
        return Some(format!("{origin}{path}"));
    }
    None
}

/// Cut a trailing `# comment`. A `#` glued to the URL is left alone.
fn strip_inline_comment(value: &str) -> &str {
    let mut prev_is_space = true;
    for (idx, c) in value.char_indices() {
        if c == '#' && prev_is_space {
            return &value[..idx];
        }
        prev_is_space = c.is_whitespace();
    }
    value
}

fn has_http_scheme(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Resolve and validate the sitemap for `domain`.
///
/// robots.txt failures fall back to `/sitemap.xml`; only the sitemap fetch
/// itself decides the resulting status.
pub async fn locate_sitemap(
    fetcher: &dyn Fetcher,
    config: &FetchConfig,
    domain: &str,
) -> SitemapLocation {
    let origin = format!("{}{domain}", choose_scheme(domain));
    let robots_url = format!("{origin}/robots.txt");

    let from_robots = match fetcher
        .get(&robots_url, FetchOptions::new(config.robots_timeout))
        .await
    {
        Ok(response) if response.is_ok() => sitemap_from_robots(&response.body, &origin),
        Ok(response) => {
            tracing::debug!(url = %robots_url, status = response.status, "robots.txt unavailable");
            None
        }
        Err(err) => {
            tracing::debug!(url = %robots_url, ?err, "robots.txt fetch failed");
            None
        }
    };
    let sitemap_url = from_robots.unwrap_or_else(|| format!("{origin}/sitemap.xml"));

    let (status, error) = match fetcher
        .get(&sitemap_url, FetchOptions::new(config.sitemap_timeout))
        .await
    {
        Ok(response) if !response.is_ok() => {
            (SiteStatus::Failed, Some(format!("HTTP {}", response.status)))
        }
        Ok(response) => match parse_sitemap(&response.body) {
            Ok(SitemapDocument::Urlset(_)) => (SiteStatus::Ok, None),
            Ok(SitemapDocument::SitemapIndex) => (
                SiteStatus::Unsupported,
                Some(ParseError::SitemapIndex.to_string()),
            ),
            Ok(SitemapDocument::Unrecognized) => (
                SiteStatus::Unsupported,
                Some(ParseError::UnknownStructure.to_string()),
            ),
            Err(err) => (SiteStatus::Failed, Some(err.to_string())),
        },
        Err(err) => (SiteStatus::Failed, Some(err.to_string())),
    };

    tracing::debug!(domain, sitemap_url = %sitemap_url, ?status, "located sitemap");
    SitemapLocation {
        sitemap_url,
        status,
        error,
    }
}
