mod site_stub;

use std::sync::Arc;

use sitemapwatch::app::runner::SiteRunner;
use sitemapwatch::clock::SystemClock;
use sitemapwatch::config::{EngineConfig, FetchConfig};
use sitemapwatch::engine::DiffEngine;
use sitemapwatch::fetch::HttpFetcher;
use sitemapwatch::model::{ItemUpdate, ReviewStatus, SiteStatus, UrlType};
use sitemapwatch::store::LocalFsStore;
use sitemapwatch::summary::ScanOutcome;

use site_stub::SiteStub;

fn runner(data_dir: &std::path::Path) -> anyhow::Result<SiteRunner> {
    let fetch_config = FetchConfig {
        system_proxy: false,
        ..FetchConfig::default()
    };
    let fetcher = HttpFetcher::new(&fetch_config)?;
    let engine = DiffEngine::new(
        Arc::new(fetcher),
        Arc::new(SystemClock),
        fetch_config,
        EngineConfig::default(),
    );
    Ok(SiteRunner::new(engine, Arc::new(LocalFsStore::new(data_dir))))
}

#[tokio::test]
async fn baseline_then_scan_surfaces_only_new_pages() -> anyhow::Result<()> {
    let stub = SiteStub::spawn();
    stub.robots("User-agent: *\nDisallow: /admin\nSitemap: /s1.xml\n");
    stub.sitemap("/s1.xml", &["/", "/c/puzzle", "/space-run"]);

    let temp = tempfile::TempDir::new()?;
    let runner = runner(temp.path())?;

    let sites = runner.import(&[format!("http://{}/", stub.domain)]).await?;
    assert_eq!(sites.len(), 1);
    let site_id = sites[0].id.clone();
    assert_eq!(sites[0].domain, stub.domain);
    assert_eq!(sites[0].status, SiteStatus::Unknown);

    let located = runner.locate(&site_id).await?;
    assert_eq!(located.error, None);
    assert_eq!(located.site.status, SiteStatus::Ok);
    assert_eq!(located.site.sitemap_url, Some(stub.url("/s1.xml")));

    let baseline = runner.baseline(&site_id).await?;
    assert_eq!(baseline.error, None);
    assert!(baseline.site.baseline_ready);
    assert_eq!(baseline.site.seen_count, 3);
    let summary = baseline.site.last_result.as_ref().expect("baseline summary");
    assert_eq!(summary.new_or_inserted_count, 3);
    assert_eq!(
        summary.sample_urls,
        vec![stub.url(""), stub.url("/c/puzzle"), stub.url("/space-run")]
    );
    assert!(baseline.new_items.is_empty());

    stub.sitemap(
        "/s1.xml",
        &["/", "/c/puzzle", "/space-run", "/mega-jump", "/t/fun"],
    );
    stub.page("/mega-jump", "Mega Jump");
    let scan = runner.scan(&site_id).await?;
    assert_eq!(scan.error, None);
    assert_eq!(scan.new_items.len(), 2);

    let game = &scan.new_items[0];
    assert_eq!(game.url, stub.url("/mega-jump"));
    assert_eq!(game.url_type, UrlType::Game);
    assert_eq!(game.review_status, ReviewStatus::Pending);
    assert_eq!(game.keyword_auto, "mega jump");
    assert_eq!(game.title.as_deref(), Some("Mega Jump"));
    assert_eq!(game.source_sitemap_url, stub.url("/s1.xml"));

    let tag = &scan.new_items[1];
    assert_eq!(tag.url_type, UrlType::Tag);
    assert_eq!(tag.review_status, ReviewStatus::NotGame);
    assert_eq!(tag.title, None);

    assert_eq!(scan.site.seen_count, 5);
    assert_eq!(scan.site.last_new_found, 2);

    let rescan = runner.scan(&site_id).await?;
    assert!(rescan.new_items.is_empty());
    assert_eq!(rescan.site.last_new_found, 0);

    let pending = runner.items(&site_id, Some(ReviewStatus::Pending)).await?;
    assert_eq!(pending.len(), 1);

    let reviewed = runner
        .review(
            &site_id,
            &pending[0].id,
            &ItemUpdate {
                review_status: Some(ReviewStatus::Confirmed),
                keyword_final: Some("mega jump deluxe".to_string()),
            },
        )
        .await?;
    assert_eq!(reviewed.review_status, ReviewStatus::Confirmed);
    assert_eq!(reviewed.keyword_final, "mega jump deluxe");
    assert_eq!(reviewed.keyword_auto, "mega jump");
    assert!(
        runner
            .items(&site_id, Some(ReviewStatus::Pending))
            .await?
            .is_empty()
    );
    Ok(())
}

#[tokio::test]
async fn sitemap_index_from_robots_is_unsupported() -> anyhow::Result<()> {
    let stub = SiteStub::spawn();
    stub.robots("Sitemap: /s1.xml");
    stub.route(
        "/s1.xml",
        200,
        "application/xml",
        "<sitemapindex><sitemap><loc>http://x/p.xml</loc></sitemap></sitemapindex>",
    );

    let temp = tempfile::TempDir::new()?;
    let runner = runner(temp.path())?;
    let site_id = runner.import(&[stub.domain.clone()]).await?[0].id.clone();

    let located = runner.locate(&site_id).await?;
    assert_eq!(located.site.status, SiteStatus::Unsupported);
    assert_eq!(located.error.as_deref(), Some("Type: sitemapindex"));
    assert_eq!(located.site.sitemap_url, Some(stub.url("/s1.xml")));
    Ok(())
}

#[tokio::test]
async fn missing_robots_falls_back_to_sitemap_xml() -> anyhow::Result<()> {
    let stub = SiteStub::spawn();
    stub.sitemap("/sitemap.xml", &["/a"]);

    let temp = tempfile::TempDir::new()?;
    let runner = runner(temp.path())?;
    let site_id = runner.import(&[stub.domain.clone()]).await?[0].id.clone();

    let located = runner.locate(&site_id).await?;
    assert_eq!(located.site.status, SiteStatus::Ok);
    assert_eq!(located.site.sitemap_url, Some(stub.url("/sitemap.xml")));
    Ok(())
}

#[tokio::test]
async fn failed_scan_keeps_seen_set_and_counts() -> anyhow::Result<()> {
    let stub = SiteStub::spawn();
    stub.sitemap("/sitemap.xml", &["/a", "/b", "/c"]);

    let temp = tempfile::TempDir::new()?;
    let runner = runner(temp.path())?;
    let site_id = runner.import(&[stub.domain.clone()]).await?[0].id.clone();
    runner.locate(&site_id).await?;
    let baseline = runner.baseline(&site_id).await?;

    let seen_path = temp.path().join("seen").join(format!("{site_id}.json"));
    let seen_before = std::fs::read(&seen_path)?;

    stub.route("/sitemap.xml", 500, "text/plain", "boom");
    let failed = runner.scan(&site_id).await?;
    assert_eq!(failed.error.as_deref(), Some("HTTP 500"));
    assert_eq!(failed.site.status, SiteStatus::Failed);
    assert_eq!(failed.site.error_message.as_deref(), Some("HTTP 500"));
    assert_eq!(failed.site.seen_count, baseline.site.seen_count);
    assert_eq!(failed.site.last_new_found, baseline.site.last_new_found);
    assert_eq!(
        failed.site.last_result.as_ref().map(|s| s.outcome),
        Some(ScanOutcome::Failure)
    );
    assert_eq!(std::fs::read(&seen_path)?, seen_before);
    assert!(runner.items(&site_id, None).await?.is_empty());

    // The failure is persisted on the site record.
    let stored = runner
        .sites()
        .await?
        .into_iter()
        .find(|site| site.id == site_id)
        .expect("site stored");
    assert_eq!(stored.status, SiteStatus::Failed);

    stub.sitemap("/sitemap.xml", &["/a", "/b", "/c", "/d"]);
    let recovered = runner.scan(&site_id).await?;
    assert_eq!(recovered.site.status, SiteStatus::Ok);
    assert_eq!(recovered.site.error_message, None);
    assert_eq!(recovered.new_items.len(), 1);
    Ok(())
}

#[tokio::test]
async fn scan_before_baseline_is_rejected() -> anyhow::Result<()> {
    let stub = SiteStub::spawn();
    stub.sitemap("/sitemap.xml", &["/a"]);

    let temp = tempfile::TempDir::new()?;
    let runner = runner(temp.path())?;
    let site_id = runner.import(&[stub.domain.clone()]).await?[0].id.clone();
    runner.locate(&site_id).await?;

    let err = runner.scan(&site_id).await.unwrap_err().to_string();
    assert!(err.contains("baseline required"), "unexpected error: {err}");
    Ok(())
}

#[tokio::test]
async fn scan_all_covers_every_baselined_site() -> anyhow::Result<()> {
    let first = SiteStub::spawn();
    let second = SiteStub::spawn();
    first.sitemap("/sitemap.xml", &["/a"]);
    second.sitemap("/sitemap.xml", &["/b"]);

    let temp = tempfile::TempDir::new()?;
    let runner = runner(temp.path())?;
    let sites = runner
        .import(&[first.domain.clone(), second.domain.clone(), "never-baselined.test".to_string()])
        .await?;
    for site in &sites[..2] {
        runner.locate(&site.id).await?;
        runner.baseline(&site.id).await?;
    }

    first.sitemap("/sitemap.xml", &["/a", "/a2"]);
    second.sitemap("/sitemap.xml", &["/b", "/b2", "/b3"]);
    let runs = runner.scan_all(2).await?;
    assert_eq!(runs.len(), 2);
    let mut found: Vec<usize> = runs.iter().map(|run| run.new_items.len()).collect();
    found.sort();
    assert_eq!(found, vec![1, 2]);
    Ok(())
}

#[tokio::test]
async fn import_is_idempotent_per_domain() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let runner = runner(temp.path())?;

    let first = runner.import(&["https://Games.Example.com/".to_string()]).await?;
    let again = runner
        .import(&["games.example.com".to_string(), "other.example.com".to_string()])
        .await?;
    assert_eq!(again[0].id, first[0].id);
    assert_eq!(runner.sites().await?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn locate_all_reports_every_site() -> anyhow::Result<()> {
    let good = SiteStub::spawn();
    good.sitemap("/sitemap.xml", &["/a"]);
    let broken = SiteStub::spawn();
    broken.route("/sitemap.xml", 500, "text/plain", "boom");

    let temp = tempfile::TempDir::new()?;
    let runner = runner(temp.path())?;
    runner
        .import(&[good.domain.clone(), broken.domain.clone()])
        .await?;

    let runs = runner.locate_all(2).await?;
    assert_eq!(runs.len(), 2);
    let by_domain = |domain: &str| {
        runs.iter()
            .find(|run| run.site.domain == domain)
            .expect("run for domain")
    };
    assert_eq!(by_domain(&good.domain).site.status, SiteStatus::Ok);
    assert_eq!(by_domain(&good.domain).error, None);
    assert_eq!(by_domain(&broken.domain).site.status, SiteStatus::Failed);
    assert_eq!(by_domain(&broken.domain).error.as_deref(), Some("HTTP 500"));

    let stored = runner.sites().await?;
    assert!(stored.iter().all(|site| site.sitemap_url.is_some()));
    Ok(())
}
