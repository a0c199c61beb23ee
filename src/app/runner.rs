use std::sync::Arc;

use anyhow::Context as _;
use futures::StreamExt as _;
use serde::{Deserialize, Serialize};

use crate::app::locks::SiteLocks;
use crate::engine::{DiffEngine, ScanFailure};
use crate::error::ScanError;
use crate::locate::normalize_domain;
use crate::model::{ItemUpdate, NewItem, ReviewStatus, Site};
use crate::store::{ItemStore, SeenStore, SiteStore};

/// What one locate/baseline/scan did to a site, as persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteRun {
    pub site: Site,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub new_items: Vec<NewItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SiteRun {
    fn ok(site: Site, new_items: Vec<NewItem>) -> Self {
        Self {
            site,
            new_items,
            error: None,
        }
    }
}

/// Loads a site, runs one engine operation under the site's lock and writes
/// the resulting site record back.
pub struct SiteRunner {
    engine: DiffEngine,
    sites: Arc<dyn SiteStore>,
    seen: Arc<dyn SeenStore>,
    items: Arc<dyn ItemStore>,
    locks: SiteLocks,
}

impl SiteRunner {
    pub fn new<S>(engine: DiffEngine, store: Arc<S>) -> Self
    where
        S: SiteStore + SeenStore + ItemStore + 'static,
    {
        Self {
            engine,
            sites: store.clone(),
            seen: store.clone(),
            items: store,
            locks: SiteLocks::new(),
        }
    }

    /// Register domains. Re-importing a known domain returns the existing site.
    pub async fn import(&self, domains: &[String]) -> anyhow::Result<Vec<Site>> {
        let mut known = self.sites.list_sites().await.context("list sites")?;
        let mut out = Vec::with_capacity(domains.len());

        for input in domains {
            let domain = normalize_domain(input)?;
            if let Some(existing) = known.iter().find(|site| site.domain == domain) {
                out.push(existing.clone());
                continue;
            }

            let site = Site::new(uuid::Uuid::new_v4().to_string(), domain);
            self.sites.put_site(&site).await.context("save site")?;
            tracing::info!(site_id = %site.id, domain = %site.domain, "imported site");
            known.push(site.clone());
            out.push(site);
        }

        Ok(out)
    }

    pub async fn sites(&self) -> anyhow::Result<Vec<Site>> {
        self.sites.list_sites().await
    }

    pub async fn locate(&self, site_id: &str) -> anyhow::Result<SiteRun> {
        let _guard = self.locks.acquire(site_id).await;
        let site = self.load_site(site_id).await?;

        let located = self.engine.locate_site(&site).await;
        self.sites.put_site(&located).await.context("save site")?;
        let error = located.error_message.clone();
        Ok(SiteRun {
            site: located,
            new_items: Vec::new(),
            error,
        })
    }

    pub async fn baseline(&self, site_id: &str) -> anyhow::Result<SiteRun> {
        let _guard = self.locks.acquire(site_id).await;
        let site = self.load_site(site_id).await?;

        match self.engine.run_baseline(&site, self.seen.as_ref()).await {
            Ok(report) => {
                self.save_after_run(&report.site, "baseline").await?;
                Ok(SiteRun::ok(report.site, Vec::new()))
            }
            Err(failure) => self.record_failure(failure).await,
        }
    }

    pub async fn scan(&self, site_id: &str) -> anyhow::Result<SiteRun> {
        let _guard = self.locks.acquire(site_id).await;
        let site = self.load_site(site_id).await?;

        match self
            .engine
            .run_scan(&site, self.seen.as_ref(), self.items.as_ref())
            .await
        {
            Ok(report) => {
                self.save_after_run(&report.site, "scan").await?;
                Ok(SiteRun::ok(report.site, report.new_items))
            }
            Err(failure) => self.record_failure(failure).await,
        }
    }

    /// Scan every baselined site, up to `max_concurrency` at a time.
    pub async fn scan_all(&self, max_concurrency: usize) -> anyhow::Result<Vec<SiteRun>> {
        let site_ids: Vec<String> = self
            .sites
            .list_sites()
            .await
            .context("list sites")?
            .into_iter()
            .filter(|site| site.baseline_ready)
            .map(|site| site.id)
            .collect();

        let runs = futures::stream::iter(site_ids)
            .map(|site_id| async move {
                let result = self.scan(&site_id).await;
                (site_id, result)
            })
            .buffer_unordered(max_concurrency.max(1))
            .collect::<Vec<_>>()
            .await;

        Ok(collect_runs(runs))
    }

    /// Re-run sitemap discovery for every site, up to `max_concurrency` at a time.
    pub async fn locate_all(&self, max_concurrency: usize) -> anyhow::Result<Vec<SiteRun>> {
        let site_ids: Vec<String> = self
            .sites
            .list_sites()
            .await
            .context("list sites")?
            .into_iter()
            .map(|site| site.id)
            .collect();

        let runs = futures::stream::iter(site_ids)
            .map(|site_id| async move {
                let result = self.locate(&site_id).await;
                (site_id, result)
            })
            .buffer_unordered(max_concurrency.max(1))
            .collect::<Vec<_>>()
            .await;

        Ok(collect_runs(runs))
    }

    pub async fn items(
        &self,
        site_id: &str,
        status: Option<ReviewStatus>,
    ) -> anyhow::Result<Vec<NewItem>> {
        let items = self.items.load_items(site_id).await.context("load items")?;
        Ok(items
            .into_iter()
            .filter(|item| status.is_none_or(|status| item.review_status == status))
            .collect())
    }

    pub async fn review(
        &self,
        site_id: &str,
        item_id: &str,
        update: &ItemUpdate,
    ) -> anyhow::Result<NewItem> {
        let _guard = self.locks.acquire(site_id).await;
        self.items
            .update_item(site_id, item_id, update)
            .await
            .context("update item")?
            .ok_or_else(|| anyhow::anyhow!("item not found: {item_id}"))
    }

    async fn load_site(&self, site_id: &str) -> anyhow::Result<Site> {
        self.sites
            .get_site(site_id)
            .await
            .context("load site")?
            .ok_or_else(|| anyhow::anyhow!("site not found: {site_id}"))
    }

    /// The seen-set (and items) are already written at this point; a failed
    /// site write leaves `seen_count`/`last_new_found` stale until the next run.
    async fn save_after_run(&self, site: &Site, operation: &'static str) -> anyhow::Result<()> {
        if let Err(err) = self.sites.put_site(site).await {
            tracing::error!(
                site_id = %site.id,
                domain = %site.domain,
                operation,
                ?err,
                "site record not saved after seen-set write; record is stale"
            );
            return Err(err.context(format!("save site {} after {operation}", site.id)));
        }
        Ok(())
    }

    async fn record_failure(&self, failure: ScanFailure) -> anyhow::Result<SiteRun> {
        let ScanFailure { site, error } = failure;
        if let ScanError::Precondition(reason) = error {
            anyhow::bail!("{}: {reason}", site.domain);
        }
        self.sites.put_site(&site).await.context("save site")?;
        Ok(SiteRun {
            site,
            new_items: Vec::new(),
            error: Some(error.to_string()),
        })
    }
}

fn collect_runs(runs: Vec<(String, anyhow::Result<SiteRun>)>) -> Vec<SiteRun> {
    let mut out = Vec::with_capacity(runs.len());
    for (site_id, result) in runs {
        match result {
            Ok(run) => out.push(run),
            Err(err) => tracing::error!(site_id = %site_id, ?err, "site run failed"),
        }
    }
    out.sort_by(|a, b| a.site.domain.cmp(&b.site.domain));
    out
}
