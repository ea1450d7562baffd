use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Parser;
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;

use polyrank::api::{ApiClient, Calls};
use polyrank::config::Config;
use polyrank::constants::USER_AGENT;
use polyrank::controller::*;
use polyrank::event::OutcomeDiff;
use polyrank::format::*;
use polyrank::identity::{Identity, IdentityInput, IdentityResolver};
use polyrank::stats::*;
use polyrank::tracks::{Category, TrackRegistry};

/// Look up a player's records on every track.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// The player's secret user token.
    #[arg(long, conflicts_with_all = ["id", "rank"])]
    token: Option<String>,

    /// The player's ID, which is the SHA-256 hash of their user token.
    #[arg(long, conflicts_with = "rank")]
    id: Option<String>,

    /// Look up whoever holds this rank on --track.
    #[arg(long, requires = "track", allow_negative_numbers = true)]
    rank: Option<i64>,

    /// A track ID, for --rank and --page.
    #[arg(long)]
    track: Option<String>,

    /// Show a page of the --track leaderboard instead.
    #[arg(long, requires = "track")]
    page: Option<u32>,

    /// Only list verified records with --page.
    #[arg(long)]
    verified: bool,

    /// Keep re-attempting failed tracks until no retries are left.
    #[arg(long)]
    watch: bool,

    /// track-order, percentile, rank, time, wr-time-gap, wr-percent-gap or alphabetical.
    #[arg(long, default_value = "track-order")]
    sort: SortKey,

    /// Reverse the sort order. Tracks without a value are still listed last.
    #[arg(long)]
    reverse: bool,

    /// Print JSON instead of text.
    #[arg(long)]
    json: bool,
}

impl Args {
    fn identity_input(&self) -> Result<IdentityInput<'_>> {
        if let Some(token) = &self.token {
            return Ok(IdentityInput::Token(token));
        }
        if let Some(id) = &self.id {
            return Ok(IdentityInput::RawId(id));
        }
        if let (Some(rank), Some(track_id)) = (self.rank, &self.track) {
            return Ok(IdentityInput::Rank { rank, track_id });
        }
        bail!("expected one of --token, --id or --rank")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    use dotenv::dotenv;

    // Read environment variables from an '.env' file in the working directory.
    // We use these env vars:
    //  - RUST_LOG
    //  - POLYRANK_CONFIG
    let using_env_file = dotenv().is_ok();

    env_logger::init(); // Use log::* to write to stderr

    if using_env_file {
        log::info!("using .env file")
    }

    let args = Args::parse();
    let config = Config::load()?;

    let tracks = Arc::new(TrackRegistry::builtin(&config.extra_tracks));
    let client = ApiClient::new(config.api.clone(), USER_AGENT)?;
    log::info!("using leaderboard at {}", client.settings().leaderboard_url);
    let api = Arc::new(client) as Arc<dyn Calls>;

    let controller = ResolutionController::new(&api, &tracks, &config.retry);

    if let (Some(page), Some(track_id)) = (args.page, &args.track) {
        let player_id = match args.identity_input() {
            Ok(input) => Some(IdentityResolver::new(&api, &tracks).resolve(input).await?.player_id),
            Err(_) => None,
        };
        let view = controller
            .fetcher()
            .fetch_page(track_id, page, args.verified, player_id.as_deref())
            .await?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&view)?);
        } else {
            print_page(&view, &tracks);
        }
        return Ok(());
    }

    let identity = IdentityResolver::new(&api, &tracks)
        .resolve(args.identity_input()?)
        .await?;

    let mut snapshot = controller.resolve_all_tracks(&identity.player_id).await;
    if args.watch {
        snapshot = watch(&controller).await;
    }
    controller.stop().await;

    let max_retry_attempts = config.retry.max_retry_attempts;
    let mut rows = track_rows(&snapshot, &tracks, None);
    sort_rows(&mut rows, args.sort, args.reverse);

    let report = Report {
        player: &identity,
        tracks: rows,
        stats: aggregate(&snapshot, &tracks),
        failures: snapshot.failures(&tracks, max_retry_attempts),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

/// Wait until every failed track was re-attempted as often as allowed,
/// or until it succeeded.
async fn watch(controller: &ResolutionController) -> OutcomeSnapshot {
    let max_retry_attempts = controller.retry_config().max_retry_attempts;
    let mut events = controller.subscribe();
    loop {
        let snapshot = controller.snapshot().await;
        if !snapshot.has_pending_retries(max_retry_attempts) {
            return snapshot;
        }
        match events.recv().await {
            Ok(OutcomeDiff::Settled {
                track_id, outcome, ..
            }) => log::info!("track {}: {:?}", track_id, outcome),
            Ok(OutcomeDiff::Reset { .. }) => {}
            Err(RecvError::Lagged(n)) => log::debug!("skipped {} outcome changes", n),
            Err(RecvError::Closed) => return controller.snapshot().await,
        }
    }
}

#[derive(Serialize)]
struct Report<'a> {
    player: &'a Identity,
    tracks: Vec<TrackRow<'a>>,
    stats: Aggregate<'a>,
    failures: Vec<TrackFailure<'a>>,
}

fn print_report(report: &Report) {
    match &report.player.profile {
        Some(p) => println!("{} ({})", p.name, report.player.player_id),
        None => println!("{}", report.player.player_id),
    }
    println!();

    for row in &report.tracks {
        println!("{:<28} {}", row.track.name, describe_outcome(row.outcome));
    }

    for (category, stats) in &report.stats.by_category {
        print_stats(category.name(), stats);
    }
    print_stats("Overall", &report.stats.overall);

    if !report.failures.is_empty() {
        println!();
        println!("Failed tracks:");
        for f in &report.failures {
            println!(
                "  {:<26} {} (retried {}x{})",
                f.track.name,
                f.message,
                f.retry_count,
                if f.permanent { ", gave up" } else { "" }
            );
        }
    }
}

fn describe_outcome(outcome: Option<&FetchOutcome>) -> String {
    let record = match outcome {
        None => return "pending".to_string(),
        Some(FetchOutcome::Absent) => return "no record".to_string(),
        Some(FetchOutcome::Retrying { retry_count }) => return format!("retrying ({})", retry_count),
        Some(FetchOutcome::Failed { message, .. }) => return format!("error: {}", message),
        Some(FetchOutcome::Success(record)) => record,
    };

    let gap = match (record.wr_time_gap_ms, record.wr_percent_gap) {
        (Some(ms), Some(p)) => format!("{} ({})", format_gap(ms), format_percent(p, 2)),
        _ => "WR unknown".to_string(),
    };
    let medals: String = record_medals(record)
        .iter()
        .map(|m| format!(" {}{}", m.icon(), m.label()))
        .collect();

    format!(
        "{:>12}  #{}/{}  top {}  {}{}",
        format_time(record.time_ms),
        record.rank,
        record.total,
        format_percent(record.percentile, 3),
        gap,
        medals
    )
}

fn print_stats(title: &str, stats: &CategoryStats) {
    println!();
    println!("{} ({} records)", title, stats.records.len());

    let avg = match &stats.averages {
        Some(avg) => avg,
        None => {
            println!("  no data");
            return;
        }
    };

    println!("  avg time:       {}", format_time(avg.avg_time_ms.round() as u64));
    if let Some(rank) = avg.avg_rank {
        let medal = avg.rank_medal().map(|m| Medal::from(m).label()).unwrap_or("");
        println!("  avg rank:       {:.1} {}", rank, medal);
    }
    if let Some(p) = avg.avg_percentile {
        let medal = avg.percentile_medal().map(|m| Medal::from(m).label()).unwrap_or("");
        println!("  avg percentile: {} {}", format_percent(p, 3), medal);
    }
    if let (Some(ms), Some(p)) = (avg.avg_wr_time_gap_ms, avg.avg_wr_percent_gap) {
        let medal = avg.gap_medal().map(|m| Medal::from(m).label()).unwrap_or("");
        println!(
            "  avg WR gap:     {} ({}) {}",
            format_gap(ms.round() as i64),
            format_percent(p, 2),
            medal
        );
    }

    let bw = &stats.best_worst;
    print_extremes("time", &bw.time);
    print_extremes("rank", &bw.rank);
    print_extremes("percentile", &bw.percentile);
    print_extremes("WR gap", &bw.wr_time_gap);

    for (label, holders) in &stats.medals {
        let names: Vec<&str> = holders.iter().map(|r| r.track.name.as_str()).collect();
        println!("  {:<12} {}", label, names.join(", "));
    }
}

fn print_extremes(what: &str, extremes: &Extremes) {
    if let (Some(best), Some(worst)) = (extremes.best, extremes.worst) {
        println!(
            "  {:<15} best {}, worst {}",
            what, best.track.name, worst.track.name
        );
    }
}

fn print_page(view: &LeaderboardView, tracks: &TrackRegistry) {
    let name = tracks
        .get(&view.track_id)
        .map(|t| t.name.as_str())
        .unwrap_or(&view.track_id);
    let category = tracks
        .get(&view.track_id)
        .map(|t| t.category)
        .unwrap_or(Category::Community);

    println!(
        "{} [{}] page {}/{} ({} records{})",
        name,
        category.name(),
        view.page,
        view.total_pages,
        view.total,
        if view.only_verified { ", verified only" } else { "" }
    );
    for (idx, r) in view.records.iter().enumerate() {
        let marker = if Some(idx) == view.highlight { '>' } else { ' ' };
        let colors = CarColors::parse(&r.car_colors);
        println!(
            "{} {:>6}  {:<24} {:>12}  {:?}  {}",
            marker,
            r.rank,
            r.display_name,
            format_time(r.time_ms),
            r.verification,
            colors.0.first().map(String::as_str).unwrap_or("")
        );
    }
    if view.highlight.is_none() {
        log::debug!("player not on this page");
    }
}
