use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::model::ReviewStatus;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Directory holding site records, seen-sets and review items.
    #[arg(long, global = true, default_value = "sitemapwatch-data")]
    pub data_dir: PathBuf,

    /// Debug logging for sitemapwatch itself (`RUST_LOG` takes precedence).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Maximum concurrent title fetches within one scan.
    #[arg(long, global = true, default_value_t = 4)]
    pub enrich_concurrency: usize,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Register sites by domain.
    Import(ImportArgs),
    /// List registered sites.
    Sites,
    /// Find and validate each site's sitemap.
    Locate(TargetArgs),
    /// Record the current sitemap as already seen.
    Baseline(SiteArgs),
    /// Report sitemap URLs not seen before.
    Scan(TargetArgs),
    /// List review items for a site.
    Items(ItemsArgs),
    /// Update the review status or final keyword of an item.
    Review(ReviewArgs),
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Domain to watch (repeatable). A scheme or path is stripped.
    #[arg(long = "domain", required = true)]
    pub domains: Vec<String>,
}

#[derive(Debug, Args)]
pub struct SiteArgs {
    /// Site id (see `sites`).
    #[arg(long)]
    pub site: String,
}

#[derive(Debug, Args)]
pub struct TargetArgs {
    /// Site id (see `sites`).
    #[arg(long, required_unless_present = "all", conflicts_with = "all")]
    pub site: Option<String>,

    /// Run for every eligible site.
    #[arg(long)]
    pub all: bool,

    /// Maximum sites processed concurrently with `--all`.
    #[arg(long, default_value_t = 4)]
    pub max_concurrency: usize,
}

#[derive(Debug, Args)]
pub struct ItemsArgs {
    /// Site id (see `sites`).
    #[arg(long)]
    pub site: String,

    /// Only items in this review status.
    #[arg(long, value_enum)]
    pub status: Option<ReviewStatus>,
}

#[derive(Debug, Args)]
pub struct ReviewArgs {
    /// Site id (see `sites`).
    #[arg(long)]
    pub site: String,

    /// Item id (see `items`).
    #[arg(long)]
    pub item: String,

    #[arg(long, value_enum)]
    pub status: Option<ReviewStatus>,

    /// Replacement for the auto-extracted keyword.
    #[arg(long)]
    pub keyword: Option<String>,
}
