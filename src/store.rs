use std::path::{Path, PathBuf};

use anyhow::Context as _;
use async_trait::async_trait;
use tokio::fs;

use crate::model::{ItemUpdate, NewItem, SeenSet, Site};

#[async_trait]
pub trait SiteStore: Send + Sync {
    async fn list_sites(&self) -> anyhow::Result<Vec<Site>>;
    async fn get_site(&self, site_id: &str) -> anyhow::Result<Option<Site>>;
    async fn put_site(&self, site: &Site) -> anyhow::Result<()>;
}

#[async_trait]
pub trait SeenStore: Send + Sync {
    /// A site that was never baselined has an empty seen-set.
    async fn load_seen(&self, site_id: &str) -> anyhow::Result<SeenSet>;
    async fn save_seen(&self, site_id: &str, seen: &SeenSet) -> anyhow::Result<()>;
}

#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn load_items(&self, site_id: &str) -> anyhow::Result<Vec<NewItem>>;
    async fn append_items(&self, site_id: &str, items: &[NewItem]) -> anyhow::Result<()>;
    async fn update_item(
        &self,
        site_id: &str,
        item_id: &str,
        update: &ItemUpdate,
    ) -> anyhow::Result<Option<NewItem>>;
}

/// JSON files under one data directory; each write replaces a whole file
/// atomically. Concurrent writers to the same site are last-writer-wins.
#[derive(Debug, Clone)]
pub struct LocalFsStore {
    base_dir: PathBuf,
}

impl LocalFsStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn sites_dir(&self) -> PathBuf {
        self.base_dir.join("sites")
    }

    fn site_json_path(&self, site_id: &str) -> anyhow::Result<PathBuf> {
        ensure_safe_id(site_id)?;
        Ok(self.sites_dir().join(format!("{site_id}.json")))
    }

    fn seen_json_path(&self, site_id: &str) -> anyhow::Result<PathBuf> {
        ensure_safe_id(site_id)?;
        Ok(self.base_dir.join("seen").join(format!("{site_id}.json")))
    }

    fn items_json_path(&self, site_id: &str) -> anyhow::Result<PathBuf> {
        ensure_safe_id(site_id)?;
        Ok(self.base_dir.join("items").join(format!("{site_id}.json")))
    }
}

#[async_trait]
impl SiteStore for LocalFsStore {
    async fn list_sites(&self) -> anyhow::Result<Vec<Site>> {
        let dir = self.sites_dir();
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err).with_context(|| format!("read sites dir: {}", dir.display()));
            }
        };

        let mut sites = Vec::new();
        while let Some(entry) = entries.next_entry().await.context("read sites dir entry")? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(site) = read_json::<Site>(&path)
                .await
                .with_context(|| format!("read: {}", path.display()))?
            {
                sites.push(site);
            }
        }
        sites.sort_by(|a, b| a.domain.cmp(&b.domain).then_with(|| a.id.cmp(&b.id)));
        Ok(sites)
    }

    async fn get_site(&self, site_id: &str) -> anyhow::Result<Option<Site>> {
        let path = self.site_json_path(site_id)?;
        read_json(&path)
            .await
            .with_context(|| format!("read: {}", path.display()))
    }

    async fn put_site(&self, site: &Site) -> anyhow::Result<()> {
        let path = self.site_json_path(&site.id)?;
        write_json_atomic(&path, site)
            .await
            .with_context(|| format!("write site: {}", site.id))
    }
}

#[async_trait]
impl SeenStore for LocalFsStore {
    async fn load_seen(&self, site_id: &str) -> anyhow::Result<SeenSet> {
        let path = self.seen_json_path(site_id)?;
        let seen = read_json(&path)
            .await
            .with_context(|| format!("read: {}", path.display()))?;
        Ok(seen.unwrap_or_default())
    }

    async fn save_seen(&self, site_id: &str, seen: &SeenSet) -> anyhow::Result<()> {
        let path = self.seen_json_path(site_id)?;
        write_json_atomic(&path, seen)
            .await
            .with_context(|| format!("write seen-set: {site_id}"))
    }
}

#[async_trait]
impl ItemStore for LocalFsStore {
    async fn load_items(&self, site_id: &str) -> anyhow::Result<Vec<NewItem>> {
        let path = self.items_json_path(site_id)?;
        let items = read_json(&path)
            .await
            .with_context(|| format!("read: {}", path.display()))?;
        Ok(items.unwrap_or_default())
    }

    async fn append_items(&self, site_id: &str, items: &[NewItem]) -> anyhow::Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        let mut stored = self.load_items(site_id).await?;
        stored.extend_from_slice(items);
        let path = self.items_json_path(site_id)?;
        write_json_atomic(&path, &stored)
            .await
            .with_context(|| format!("write items: {site_id}"))
    }

    async fn update_item(
        &self,
        site_id: &str,
        item_id: &str,
        update: &ItemUpdate,
    ) -> anyhow::Result<Option<NewItem>> {
        let mut stored = self.load_items(site_id).await?;
        let Some(item) = stored.iter_mut().find(|item| item.id == item_id) else {
            return Ok(None);
        };
        if let Some(status) = update.review_status {
            item.review_status = status;
        }
        if let Some(keyword) = &update.keyword_final {
            item.keyword_final = keyword.trim().to_string();
        }
        let updated = item.clone();

        let path = self.items_json_path(site_id)?;
        write_json_atomic(&path, &stored)
            .await
            .with_context(|| format!("write items: {site_id}"))?;
        Ok(Some(updated))
    }
}

fn ensure_safe_id(id: &str) -> anyhow::Result<()> {
    if id.is_empty()
        || !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        anyhow::bail!("invalid id: {id:?}");
    }
    Ok(())
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<Option<T>> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let value = serde_json::from_slice(&bytes).context("parse json")?;
    Ok(Some(value))
}

async fn write_json_atomic<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("path has no parent: {}", path.display()))?;
    fs::create_dir_all(parent)
        .await
        .with_context(|| format!("create parent dir: {}", parent.display()))?;

    let tmp_path = path.with_extension(format!("tmp.{}", uuid::Uuid::new_v4().simple()));
    let data = serde_json::to_vec_pretty(value).context("serialize json")?;
    fs::write(&tmp_path, &data)
        .await
        .with_context(|| format!("write tmp: {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("rename tmp to final: {}", path.display()))?;
    Ok(())
}
