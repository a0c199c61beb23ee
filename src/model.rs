use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::locate::SitemapLocation;
use crate::summary::ScanSummary;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SiteStatus {
    #[default]
    Unknown,
    Ok,
    Failed,
    Unsupported,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Site {
    pub id: String,
    pub domain: String,
    #[serde(default)]
    pub sitemap_url: Option<String>,
    #[serde(default)]
    pub status: SiteStatus,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub baseline_ready: bool,
    #[serde(default)]
    pub baseline_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_scan_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub seen_count: usize,
    #[serde(default)]
    pub last_new_found: usize,
    #[serde(default)]
    pub last_result: Option<ScanSummary>,
}

impl Site {
    /// A freshly imported site: nothing located, no baseline.
    pub fn new(id: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            domain: domain.into(),
            sitemap_url: None,
            status: SiteStatus::Unknown,
            error_message: None,
            baseline_ready: false,
            baseline_at: None,
            last_scan_at: None,
            seen_count: 0,
            last_new_found: 0,
            last_result: None,
        }
    }

    /// Record a locate result. Baseline state survives a re-locate: seen-set
    /// keys are URL hashes and stay valid if the sitemap moves.
    pub fn apply_location(&mut self, location: SitemapLocation) {
        self.sitemap_url = Some(location.sitemap_url);
        self.status = location.status;
        self.error_message = location.error;
    }

    pub(crate) fn mark_failed(&mut self, message: String, summary: ScanSummary) {
        self.status = SiteStatus::Failed;
        self.error_message = Some(message);
        self.last_result = Some(summary);
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UrlType {
    Game,
    Tag,
    Category,
    Home,
    Unknown,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Confirmed,
    Ignored,
    NotGame,
}

impl ReviewStatus {
    /// Non-game pages are triaged out of the review queue up front.
    pub fn initial_for(url_type: UrlType) -> Self {
        match url_type {
            UrlType::Game => Self::Pending,
            _ => Self::NotGame,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewItem {
    pub id: String,
    pub site_id: String,
    pub domain: String,
    pub url: String,
    pub keyword_auto: String,
    pub keyword_final: String,
    pub review_status: ReviewStatus,
    pub url_type: UrlType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub discovered_at: DateTime<Utc>,
    pub source_sitemap_url: String,
}

/// Normalized-URL hash -> normalized URL, for one site.
pub type SeenSet = BTreeMap<String, String>;

/// Reviewer edits applied through `ItemStore::update_item`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ItemUpdate {
    #[serde(default)]
    pub review_status: Option<ReviewStatus>,
    #[serde(default)]
    pub keyword_final: Option<String>,
}
