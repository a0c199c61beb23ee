use std::io::Write as _;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser as _;

use sitemapwatch::app::runner::{SiteRun, SiteRunner};
use sitemapwatch::cli::{Cli, Command, TargetArgs};
use sitemapwatch::clock::SystemClock;
use sitemapwatch::config::{EngineConfig, FetchConfig};
use sitemapwatch::engine::DiffEngine;
use sitemapwatch::fetch::HttpFetcher;
use sitemapwatch::model::ItemUpdate;
use sitemapwatch::store::LocalFsStore;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    sitemapwatch::logging::init(cli.verbose).context("init logging")?;
    tracing::debug!(?cli, "parsed cli");

    let fetch_config = FetchConfig::from_env().context("load fetch config")?;
    let fetcher = HttpFetcher::new(&fetch_config).context("build fetcher")?;
    let engine = DiffEngine::new(
        Arc::new(fetcher),
        Arc::new(SystemClock),
        fetch_config,
        EngineConfig {
            enrich_concurrency: cli.enrich_concurrency,
        },
    );
    let runner = SiteRunner::new(engine, Arc::new(LocalFsStore::new(&cli.data_dir)));

    match cli.command {
        Command::Import(args) => {
            for site in runner.import(&args.domains).await.context("import")? {
                print_json_line(&site)?;
            }
        }
        Command::Sites => {
            for site in runner.sites().await.context("list sites")? {
                print_json_line(&site)?;
            }
        }
        Command::Locate(args) => match target(&args)? {
            Some(site_id) => report_single(runner.locate(site_id).await.context("locate")?)?,
            None => report_all(runner.locate_all(args.max_concurrency).await.context("locate")?)?,
        },
        Command::Baseline(args) => {
            report_single(runner.baseline(&args.site).await.context("baseline")?)?;
        }
        Command::Scan(args) => match target(&args)? {
            Some(site_id) => report_single(runner.scan(site_id).await.context("scan")?)?,
            None => report_all(runner.scan_all(args.max_concurrency).await.context("scan")?)?,
        },
        Command::Items(args) => {
            for item in runner.items(&args.site, args.status).await.context("items")? {
                print_json_line(&item)?;
            }
        }
        Command::Review(args) => {
            if args.status.is_none() && args.keyword.is_none() {
                anyhow::bail!("review needs --status or --keyword");
            }
            let update = ItemUpdate {
                review_status: args.status,
                keyword_final: args.keyword,
            };
            let item = runner
                .review(&args.site, &args.item, &update)
                .await
                .context("review")?;
            print_json_line(&item)?;
        }
    }

    Ok(())
}

fn target(args: &TargetArgs) -> anyhow::Result<Option<&str>> {
    match (&args.site, args.all) {
        (Some(site_id), false) => Ok(Some(site_id.as_str())),
        (None, true) => Ok(None),
        _ => anyhow::bail!("pass exactly one of --site or --all"),
    }
}

fn report_single(run: SiteRun) -> anyhow::Result<()> {
    print_json_line(&run)?;
    if let Some(error) = &run.error {
        anyhow::bail!("{}: {error}", run.site.domain);
    }
    Ok(())
}

fn report_all(runs: Vec<SiteRun>) -> anyhow::Result<()> {
    for run in &runs {
        print_json_line(run)?;
    }
    Ok(())
}

fn print_json_line<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer(&mut stdout, value).context("write json")?;
    stdout.write_all(b"\n").context("write newline")?;
    Ok(())
}
