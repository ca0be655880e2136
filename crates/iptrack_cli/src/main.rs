//! `iptrack` command-line front end.
//!
//! # Responsibility
//! - Load an asset portfolio and engine configuration from JSON files.
//! - Print the notification feed, portfolio summary or search results.
//!
//! # Invariants
//! - Portfolio data only ever comes from `--assets`; there is no built-in
//!   sample list.
//! - Output is deterministic for a fixed `--today`.
//! - A record that fails to decode or validate is skipped with a warning;
//!   the rest of the portfolio is still reported.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use iptrack_core::engine::summary::NoValuation;
use iptrack_core::model::asset::parse_calendar_date;
use iptrack_core::search::filter::{sort_assets, AssetSortKey, Selector};
use iptrack_core::{
    default_log_level, filter_notifications, init_logging, Asset, AssetFilter, AssetId,
    AssetKind, AssetStatus, Clock, EngineConfig, FixedClock, InMemoryAssetRepository,
    NotificationFilter, PortfolioService, Priority, SystemClock, UrgencyTier,
};
use log::info;
use std::collections::BTreeMap;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "iptrack")]
#[command(about = "IP portfolio deadline tracking and notification feed")]
struct Cli {
    /// Portfolio JSON file (array of assets)
    #[arg(long, global = true)]
    assets: Option<PathBuf>,

    /// Engine configuration JSON file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Evaluation day (YYYY-MM-DD); defaults to the current UTC day
    #[arg(long, global = true, value_parser = parse_day)]
    today: Option<NaiveDate>,

    /// Absolute directory for rolling log files; logging is off without it
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ordered notification feed
    Feed(FeedArgs),
    /// Portfolio counters and risk metrics
    Summary(SummaryArgs),
    /// Filter assets by text, kind, status and priority
    Search(SearchArgs),
    /// Print the core version
    Version,
}

#[derive(Args)]
struct FeedArgs {
    /// urgent|warning|info|all
    #[arg(long, default_value = "all")]
    tier: Selector<UrgencyTier>,

    /// high|medium|low|all
    #[arg(long, default_value = "all")]
    priority: Selector<Priority>,

    /// patent|trademark|design|copyright|all
    #[arg(long, default_value = "all")]
    kind: Selector<AssetKind>,

    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct SummaryArgs {
    /// JSON object mapping asset id to estimated value
    #[arg(long)]
    values: Option<PathBuf>,

    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct SearchArgs {
    /// Case-insensitive substring of title or id
    #[arg(long)]
    text: Option<String>,

    #[arg(long, default_value = "all")]
    kind: Selector<AssetKind>,

    #[arg(long, default_value = "all")]
    status: Selector<AssetStatus>,

    #[arg(long, default_value = "all")]
    priority: Selector<Priority>,

    /// id|title|filing_date|expiry_date|priority; input order when omitted
    #[arg(long)]
    sort: Option<AssetSortKey>,

    #[arg(long)]
    desc: bool,

    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,
}

fn parse_day(value: &str) -> Result<NaiveDate, String> {
    parse_calendar_date(value).map_err(|err| err.to_string())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    if let Command::Version = cli.command {
        println!("iptrack_core ping={}", iptrack_core::ping());
        println!("iptrack_core version={}", iptrack_core::core_version());
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    if let Some(log_dir) = &cli.log_dir {
        let level = config.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir)?;
    }

    let assets_path = cli
        .assets
        .as_deref()
        .ok_or("--assets <FILE> is required for this command")?;
    let (assets, mut skipped) = load_assets(assets_path)?;
    let (repo, refused) = InMemoryAssetRepository::import(assets);
    skipped.extend(refused.iter().map(ToString::to_string));
    for reason in &skipped {
        eprintln!("warning: skipped asset record: {reason}");
    }
    let today = cli.today.unwrap_or_else(|| SystemClock.today());
    let service = PortfolioService::new(repo, FixedClock::on(today), &config);
    info!(
        "event=cli_run module=cli status=start today={today} skipped={}",
        skipped.len()
    );

    match cli.command {
        Command::Feed(args) => print_feed(&service, &args),
        Command::Summary(args) => print_summary(&service, &args),
        Command::Search(args) => print_search(&service, args),
        Command::Version => Ok(()),
    }
}

/// Decodes the portfolio file record by record.
///
/// A file that is not a JSON array fails outright; a record that does not
/// decode is skipped and described in the returned list.
fn load_assets(path: &Path) -> CliResult<(Vec<Asset>, Vec<String>)> {
    let text = std::fs::read_to_string(path)
        .map_err(|err| format!("failed to read assets `{}`: {err}", path.display()))?;
    let records: Vec<serde_json::Value> = serde_json::from_str(&text)
        .map_err(|err| format!("invalid assets JSON `{}`: {err}", path.display()))?;

    let mut assets = Vec::with_capacity(records.len());
    let mut skipped = Vec::new();
    for (index, record) in records.into_iter().enumerate() {
        match serde_json::from_value::<Asset>(record) {
            Ok(asset) => assets.push(asset),
            Err(err) => skipped.push(format!("record {index}: {err}")),
        }
    }
    Ok((assets, skipped))
}

type Service = PortfolioService<InMemoryAssetRepository, FixedClock>;

fn print_feed(service: &Service, args: &FeedArgs) -> CliResult<()> {
    let feed = service.notifications()?;
    let filter = NotificationFilter {
        tier: args.tier,
        priority: args.priority,
        asset_kind: args.kind,
    };
    let selected = filter_notifications(&feed, &filter);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&selected)?);
    } else {
        for notification in &selected {
            println!(
                "{:<8} {:<6} {:<12} {:<18} {:>3}%  {}  {}",
                notification.tier.as_str(),
                notification.priority.as_str(),
                notification.asset_id.as_str(),
                notification.due_label(),
                notification.progress_percent(),
                notification.due_date,
                notification.label
            );
        }
    }
    for unresolved in feed.unresolved_references() {
        eprintln!("warning: {unresolved}");
    }
    Ok(())
}

fn print_summary(service: &Service, args: &SummaryArgs) -> CliResult<()> {
    let summary = match &args.values {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|err| format!("failed to read values `{}`: {err}", path.display()))?;
            let values: BTreeMap<AssetId, f64> = serde_json::from_str(&text)?;
            service.summary(&values)?
        }
        None => service.summary(&NoValuation)?,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("total assets:          {}", summary.total_assets);
    for (kind, count) in &summary.by_kind {
        println!("  {:<20} {count}", kind.as_str());
    }
    for (status, count) in &summary.by_status {
        println!("  {:<20} {count}", status.as_str());
    }
    println!("pending applications:  {}", summary.pending_applications);
    println!("assets with urgent:    {}", summary.assets_with_urgent);
    println!(
        "notifications:         urgent={} warning={} info={}",
        summary.tier_counts.urgent, summary.tier_counts.warning, summary.tier_counts.info
    );
    println!("upcoming deadlines:    {}", summary.upcoming_deadlines);
    println!("overdue deadlines:     {}", summary.overdue_deadlines);
    println!("risk score:            {}", summary.risk_score);
    println!("total value:           {:.2}", summary.total_value);
    for unresolved in &summary.unresolved {
        eprintln!("warning: {unresolved}");
    }
    Ok(())
}

fn print_search(service: &Service, args: SearchArgs) -> CliResult<()> {
    let filter = AssetFilter {
        text: args.text,
        kind: args.kind,
        status: args.status,
        priority: args.priority,
    };
    let assets = service.search(&filter)?;
    let mut selected: Vec<&Asset> = assets.iter().collect();
    if let Some(key) = args.sort {
        sort_assets(&mut selected, key, args.desc);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&selected)?);
    } else {
        for asset in selected {
            println!(
                "{:<12} {:<10} {:<13} {:<6} {}",
                asset.id.as_str(),
                asset.kind.as_str(),
                asset.status.as_str(),
                asset.priority.as_str(),
                asset.title
            );
        }
    }
    Ok(())
}
