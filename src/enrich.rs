//! Best-effort page titles for review. Never fails the enclosing scan.

use scraper::{Html, Selector};

use crate::config::FetchConfig;
use crate::fetch::{FetchOptions, Fetcher};

pub async fn fetch_title(fetcher: &dyn Fetcher, config: &FetchConfig, url: &str) -> Option<String> {
    let options =
        FetchOptions::new(config.title_timeout).with_max_body_bytes(config.title_max_bytes);
    match fetcher.get(url, options).await {
        Ok(response) if response.is_ok() => extract_title(&response.body),
        Ok(response) => {
            tracing::debug!(url, status = response.status, "title fetch skipped");
            None
        }
        Err(err) => {
            tracing::debug!(url, ?err, "title fetch failed");
            None
        }
    }
}

/// `og:title` if present, else `<title>`.
pub fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    if let Ok(selector) = Selector::parse(r#"meta[property="og:title"], meta[name="og:title"]"#) {
        let og_title = document
            .select(&selector)
            .filter_map(|el| el.value().attr("content"))
            .map(collapse_whitespace)
            .find(|title| !title.is_empty());
        if og_title.is_some() {
            return og_title;
        }
    }

    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .find(|title| !title.is_empty())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
