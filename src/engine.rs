//! Baseline and incremental scan of one site's sitemap against its seen-set.
//!
//! Each run is all-or-nothing from the store's point of view: the seen-set
//! and item list are written only after every URL has been classified and
//! enriched, and a failure leaves both exactly as they were. Callers must not
//! run two operations on the same site concurrently.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::StreamExt as _;

use crate::classify::{classify_url, extract_keyword};
use crate::clock::{Clock, elapsed_ms};
use crate::config::{EngineConfig, FetchConfig};
use crate::enrich::fetch_title;
use crate::error::ScanError;
use crate::fetch::Fetcher;
use crate::locate::{SitemapLocation, locate_sitemap};
use crate::model::{NewItem, ReviewStatus, SeenSet, Site, SiteStatus};
use crate::normalize::{normalize_url, url_hash};
use crate::sitemap::fetch_urls;
use crate::store::{ItemStore, SeenStore};
use crate::summary::{SAMPLE_LIMIT, ScanSummary};

#[derive(Debug, Clone)]
pub struct BaselineReport {
    pub site: Site,
    pub summary: ScanSummary,
}

#[derive(Debug, Clone)]
pub struct ScanReport {
    pub site: Site,
    pub new_items: Vec<NewItem>,
    pub summary: ScanSummary,
}

/// A failed run. `site` is what the caller should persist: it carries the
/// failure status and summary, or is unchanged for precondition errors.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct ScanFailure {
    pub site: Site,
    #[source]
    pub error: ScanError,
}

pub struct DiffEngine {
    fetcher: Arc<dyn Fetcher>,
    clock: Arc<dyn Clock>,
    fetch_config: FetchConfig,
    config: EngineConfig,
}

struct ScanOutput {
    parsed_count: usize,
    seen_count: usize,
    stored: Vec<NewItem>,
}

impl DiffEngine {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        clock: Arc<dyn Clock>,
        fetch_config: FetchConfig,
        config: EngineConfig,
    ) -> Self {
        Self {
            fetcher,
            clock,
            fetch_config,
            config,
        }
    }

    pub async fn locate(&self, domain: &str) -> SitemapLocation {
        locate_sitemap(self.fetcher.as_ref(), &self.fetch_config, domain).await
    }

    pub async fn locate_site(&self, site: &Site) -> Site {
        let location = self.locate(&site.domain).await;
        let mut updated = site.clone();
        updated.apply_location(location);
        updated
    }

    /// Record every current sitemap URL as seen without producing items.
    pub async fn run_baseline(
        &self,
        site: &Site,
        seen_store: &dyn SeenStore,
    ) -> Result<BaselineReport, ScanFailure> {
        let started = self.clock.now();
        let Some(sitemap_url) = site.sitemap_url.as_deref() else {
            return Err(ScanFailure {
                site: site.clone(),
                error: ScanError::Precondition("sitemap not located"),
            });
        };

        let (parsed_count, added, seen_count, sample) =
            match self.try_baseline(site, sitemap_url, seen_store).await {
                Ok(output) => output,
                Err(error) => return Err(self.fail(site, error, started)),
            };

        let finished = self.clock.now();
        let summary =
            ScanSummary::success(parsed_count, added, elapsed_ms(started, finished), sample);
        let mut updated = site.clone();
        updated.baseline_ready = true;
        updated.baseline_at = Some(finished);
        updated.status = SiteStatus::Ok;
        updated.error_message = None;
        updated.seen_count = seen_count;
        updated.last_result = Some(summary.clone());

        tracing::info!(
            site_id = %site.id,
            domain = %site.domain,
            parsed_count,
            added,
            seen_count,
            "baseline complete"
        );
        Ok(BaselineReport {
            site: updated,
            summary,
        })
    }

    async fn try_baseline(
        &self,
        site: &Site,
        sitemap_url: &str,
        seen_store: &dyn SeenStore,
    ) -> Result<(usize, usize, usize, Vec<String>), ScanError> {
        let urls = fetch_urls(
            self.fetcher.as_ref(),
            sitemap_url,
            self.fetch_config.sitemap_timeout,
        )
        .await?;
        let mut seen = seen_store
            .load_seen(&site.id)
            .await
            .map_err(ScanError::Store)?;

        let mut added = 0_usize;
        let mut sample = Vec::with_capacity(SAMPLE_LIMIT);
        for raw in &urls {
            let normalized = normalize_url(raw);
            if normalized.is_empty() {
                continue;
            }
            if sample.len() < SAMPLE_LIMIT {
                sample.push(normalized.clone());
            }
            let hash = url_hash(&normalized);
            if !seen.contains_key(&hash) {
                seen.insert(hash, normalized);
                added += 1;
            }
        }

        seen_store
            .save_seen(&site.id, &seen)
            .await
            .map_err(ScanError::Store)?;
        Ok((urls.len(), added, seen.len(), sample))
    }

    /// Diff the current sitemap against the seen-set and emit review items
    /// for URLs never observed before.
    pub async fn run_scan(
        &self,
        site: &Site,
        seen_store: &dyn SeenStore,
        item_store: &dyn ItemStore,
    ) -> Result<ScanReport, ScanFailure> {
        let started = self.clock.now();
        if !site.baseline_ready {
            return Err(ScanFailure {
                site: site.clone(),
                error: ScanError::Precondition("baseline required before scan"),
            });
        }
        let Some(sitemap_url) = site.sitemap_url.as_deref() else {
            return Err(ScanFailure {
                site: site.clone(),
                error: ScanError::Precondition("sitemap not located"),
            });
        };

        let output = match self
            .try_scan(site, sitemap_url, seen_store, item_store)
            .await
        {
            Ok(output) => output,
            Err(error) => return Err(self.fail(site, error, started)),
        };

        let finished = self.clock.now();
        let summary = ScanSummary::success(
            output.parsed_count,
            output.stored.len(),
            elapsed_ms(started, finished),
            output.stored.iter().map(|item| item.url.clone()),
        );
        let mut updated = site.clone();
        updated.last_scan_at = Some(finished);
        updated.status = SiteStatus::Ok;
        updated.error_message = None;
        updated.seen_count = output.seen_count;
        updated.last_new_found = output.stored.len();
        updated.last_result = Some(summary.clone());

        tracing::info!(
            site_id = %site.id,
            domain = %site.domain,
            parsed_count = output.parsed_count,
            new_found = output.stored.len(),
            seen_count = output.seen_count,
            "scan complete"
        );
        Ok(ScanReport {
            site: updated,
            new_items: output.stored,
            summary,
        })
    }

    async fn try_scan(
        &self,
        site: &Site,
        sitemap_url: &str,
        seen_store: &dyn SeenStore,
        item_store: &dyn ItemStore,
    ) -> Result<ScanOutput, ScanError> {
        let urls = fetch_urls(
            self.fetcher.as_ref(),
            sitemap_url,
            self.fetch_config.sitemap_timeout,
        )
        .await?;
        let snapshot = seen_store
            .load_seen(&site.id)
            .await
            .map_err(ScanError::Store)?;
        let existing = item_store
            .load_items(&site.id)
            .await
            .map_err(ScanError::Store)?;

        // Novelty is judged against the snapshot only; a URL repeated within
        // this sitemap is recorded once, at its first position.
        let mut fresh_hashes = HashSet::new();
        let mut fresh = Vec::new();
        for raw in &urls {
            let normalized = normalize_url(raw);
            if normalized.is_empty() {
                continue;
            }
            let hash = url_hash(&normalized);
            if snapshot.contains_key(&hash) || !fresh_hashes.insert(hash.clone()) {
                continue;
            }
            fresh.push((hash, normalized));
        }

        let discovered_at = self.clock.now();
        let items = self
            .build_items(site, sitemap_url, &fresh, discovered_at)
            .await;

        let mut merged = snapshot.clone();
        for (hash, url) in fresh {
            merged.insert(hash, url);
        }

        let stored_urls: HashSet<String> = existing
            .iter()
            .map(|item| normalize_url(&item.url))
            .collect();
        let (stored, skipped): (Vec<NewItem>, Vec<NewItem>) = items
            .into_iter()
            .partition(|item| !stored_urls.contains(&item.url));
        if !skipped.is_empty() {
            tracing::warn!(
                site_id = %site.id,
                skipped = skipped.len(),
                "new urls already have stored items; seen-set and item store have diverged"
            );
        }

        seen_store
            .save_seen(&site.id, &merged)
            .await
            .map_err(ScanError::Store)?;
        if let Err(err) = item_store.append_items(&site.id, &stored).await {
            self.restore_seen(site, seen_store, &snapshot).await;
            return Err(ScanError::Store(err));
        }

        Ok(ScanOutput {
            parsed_count: urls.len(),
            seen_count: merged.len(),
            stored,
        })
    }

    async fn build_items(
        &self,
        site: &Site,
        sitemap_url: &str,
        fresh: &[(String, String)],
        discovered_at: DateTime<Utc>,
    ) -> Vec<NewItem> {
        let fetcher = self.fetcher.as_ref();
        let fetch_config = &self.fetch_config;

        futures::stream::iter(fresh)
            .map(|(_, url)| async move {
                let url_type = classify_url(url);
                let keyword = extract_keyword(url);
                let title = fetch_title(fetcher, fetch_config, url).await;
                NewItem {
                    id: uuid::Uuid::new_v4().to_string(),
                    site_id: site.id.clone(),
                    domain: site.domain.clone(),
                    url: url.clone(),
                    keyword_auto: keyword.clone(),
                    keyword_final: keyword,
                    review_status: ReviewStatus::initial_for(url_type),
                    url_type,
                    title,
                    discovered_at,
                    source_sitemap_url: sitemap_url.to_string(),
                }
            })
            .buffered(self.config.enrich_concurrency.max(1))
            .collect()
            .await
    }

    async fn restore_seen(&self, site: &Site, seen_store: &dyn SeenStore, snapshot: &SeenSet) {
        match seen_store.save_seen(&site.id, snapshot).await {
            Ok(()) => tracing::warn!(site_id = %site.id, "item append failed; seen-set restored"),
            Err(err) => tracing::error!(
                site_id = %site.id,
                ?err,
                "item append failed and seen-set restore failed"
            ),
        }
    }

    fn fail(&self, site: &Site, error: ScanError, started: DateTime<Utc>) -> ScanFailure {
        let message = error.to_string();
        let duration_ms = elapsed_ms(started, self.clock.now());
        tracing::warn!(site_id = %site.id, domain = %site.domain, error = %message, "run failed");

        let mut updated = site.clone();
        updated.mark_failed(message.clone(), ScanSummary::failure(message, duration_ms));
        ScanFailure {
            site: updated,
            error,
        }
    }
}
