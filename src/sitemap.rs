//! Sitemap XML decoding.
//!
//! Only `<urlset>` documents yield URLs. A `<sitemapindex>` is recognized so
//! callers can report it, but nested sitemaps are never followed.

use std::time::Duration;

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::{ParseError, ScanError};
use crate::fetch::{FetchOptions, Fetcher};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapDocument {
    /// `<loc>` values of every `<url>` entry, in document order.
    Urlset(Vec<String>),
    SitemapIndex,
    Unrecognized,
}

pub fn parse_sitemap(xml: &str) -> Result<SitemapDocument, ParseError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut seen_root = false;
    let mut urls = Vec::new();
    let mut in_url = false;
    let mut in_loc = false;
    let mut loc_text = String::new();
    let mut current_loc: Option<String> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|err| ParseError::Xml(err.to_string()))?;
        match event {
            Event::Start(e) | Event::Empty(e) if !seen_root => {
                seen_root = true;
                match e.local_name().as_ref() {
                    b"urlset" => {}
                    b"sitemapindex" => return Ok(SitemapDocument::SitemapIndex),
                    _ => return Ok(SitemapDocument::Unrecognized),
                }
            }
            Event::Start(e) => match e.local_name().as_ref() {
                b"url" => {
                    in_url = true;
                    current_loc = None;
                }
                b"loc" if in_url => {
                    in_loc = true;
                    loc_text.clear();
                }
                _ => {}
            },
            Event::Text(e) if in_loc => match e.unescape() {
                Ok(text) => loc_text.push_str(&text),
                // Bare `&` in query strings is common; keep the raw text.
                Err(_) => loc_text.push_str(&String::from_utf8_lossy(&e)),
            },
            Event::CData(e) if in_loc => {
                loc_text.push_str(&String::from_utf8_lossy(&e[..]));
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"loc" if in_loc => {
                    in_loc = false;
                    let loc = loc_text.trim();
                    if !loc.is_empty() {
                        current_loc = Some(loc.to_owned());
                    }
                }
                b"url" if in_url => {
                    in_url = false;
                    if let Some(loc) = current_loc.take() {
                        urls.push(loc);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Ok(SitemapDocument::Unrecognized);
    }
    Ok(SitemapDocument::Urlset(urls))
}

/// Fetch a sitemap and return its raw `<loc>` values in document order.
pub async fn fetch_urls(
    fetcher: &dyn Fetcher,
    sitemap_url: &str,
    timeout: Duration,
) -> Result<Vec<String>, ScanError> {
    let response = fetcher.get(sitemap_url, FetchOptions::new(timeout)).await?;
    if !response.is_ok() {
        return Err(ScanError::http_status(response.status));
    }

    match parse_sitemap(&response.body)? {
        SitemapDocument::Urlset(urls) => Ok(urls),
        SitemapDocument::SitemapIndex => Err(ParseError::SitemapIndex.into()),
        SitemapDocument::Unrecognized => Err(ParseError::UnknownStructure.into()),
    }
}
