use clap::{Parser, Subcommand};

use tubestats::{
    ApiConfig, Database, PlaylistSummary, Source, StoreConfig, SyncReport, Throttle, TubeStats,
    WebConfig, YouTubeClient,
};

#[derive(Parser)]
#[command(name = "tubestats", about = "YouTube playlist statistics warehouse CLI")]
struct Cli {
    /// Database path (default: $TUBESTATS_DB or ~/.tubestats/tubestats.db)
    #[arg(long)]
    db: Option<String>,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Progress reporter that writes to stderr.
struct StderrProgress;

impl tubestats::SyncProgress for StderrProgress {
    fn on_playlist_start(&self, playlist: &PlaylistSummary, index: usize, total: usize) {
        eprintln!("[{}/{}] Syncing {} ({})...", index + 1, total, playlist.title, playlist.id);
    }

    fn on_playlist_complete(&self, _playlist: &PlaylistSummary, inserted: u64, updated: u64) {
        eprintln!("  Done: {} new, {} updated", inserted, updated);
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Sync channel playlists and video statistics
    Sync {
        /// Full load of every playlist, skipping videos already stored
        #[arg(long)]
        initial: bool,
        /// Insert new videos and refresh counts on stored ones
        #[arg(long)]
        check: bool,
    },
    /// Recompute the stored summary tables
    Aggregate,
    /// Print reports from the warehouse
    Report {
        #[command(subcommand)]
        target: ReportTarget,
    },
    /// Show warehouse status
    Status,
    /// Serve the read-only JSON interface
    Serve {
        /// Bind host (default: $WEB_HOST or 127.0.0.1)
        #[arg(long)]
        host: Option<String>,
        /// Bind port (default: $WEB_PORT or 5000)
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Subcommand)]
enum ReportTarget {
    /// Playlists ranked by total views
    Top {
        /// Compute from the video table instead of the summary table
        #[arg(long)]
        live: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Per-playlist totals by publication month
    Monthly {
        #[arg(long)]
        live: bool,
        #[arg(long)]
        json: bool,
    },
    /// Every playlist with its top videos
    Playlists {
        #[arg(long)]
        json: bool,
    },
    /// Stored videos of one playlist
    Videos {
        /// Playlist ID or playlist URL
        playlist: String,
        #[arg(long)]
        json: bool,
    },
}

fn source(live: bool) -> Source {
    if live {
        Source::Live
    } else {
        Source::Stored
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("tubestats: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut store_config = StoreConfig::from_env();
    if let Some(path) = &cli.db {
        store_config.path = Some(path.into());
    }

    match cli.command {
        Commands::Sync { initial, check } => {
            if !initial && !check {
                anyhow::bail!("sync needs --initial, --check or both");
            }
            // Credentials are checked before anything touches the database.
            let api = ApiConfig::from_env()?;
            let throttle = Throttle::from_env()?;
            let client = YouTubeClient::from_config(&api, throttle)?;
            let db = Database::open(&store_config).await?;
            let ts = TubeStats::new(db, client);

            if initial {
                let report = ts.initial_load(&StderrProgress).await?;
                print_sync_report(&report);
            }
            if check {
                let report = ts.check_for_new_videos(&StderrProgress).await?;
                print_sync_report(&report);
            }
        }
        Commands::Aggregate => {
            let db = Database::open(&store_config).await?;
            let report = tubestats::aggregate::refresh_summaries(&db).await?;
            println!(
                "Summaries refreshed: {} playlists, {} playlist-months",
                report.playlists, report.months
            );
        }
        Commands::Report { target } => {
            let db = Database::open(&store_config).await?;
            handle_report(&db, target).await?;
        }
        Commands::Status => {
            let db = Database::open(&store_config).await?;
            print_status(&db).await?;
        }
        Commands::Serve { host, port } => {
            let mut web = WebConfig::from_env()?;
            if let Some(host) = host {
                web.host = host;
            }
            if let Some(port) = port {
                web.port = port;
            }
            let db = Database::open(&store_config).await?;
            eprintln!("Listening on http://{}:{}", web.host, web.port);
            tubestats::web::serve(db, &web).await?;
        }
    }

    Ok(())
}

fn print_sync_report(report: &SyncReport) {
    let mut line = format!(
        "{} sync complete: {} playlists, {} new videos, {} updated",
        report.mode, report.playlists_processed, report.new_videos, report.updated_videos
    );
    if report.new_playlists > 0 {
        line.push_str(&format!(", {} new playlists", report.new_playlists));
    }
    if report.already_present > 0 {
        line.push_str(&format!(", {} already stored", report.already_present));
    }
    if report.missing_on_update > 0 {
        line.push_str(&format!(", {} updates matched no row", report.missing_on_update));
    }
    if report.failed_inserts > 0 {
        line.push_str(&format!(", {} inserts failed", report.failed_inserts));
    }
    println!("{line}");
}

async fn handle_report(db: &Database, target: ReportTarget) -> anyhow::Result<()> {
    match target {
        ReportTarget::Top { live, json } => {
            let rows = tubestats::aggregate::top_playlists(db, source(live)).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
                return Ok(());
            }
            if rows.is_empty() {
                println!("No playlist totals. Run 'tubestats aggregate' or pass --live.");
                return Ok(());
            }
            println!(
                "{:<40} {:>7} {:>12} {:>10} {:>12}",
                "Playlist", "Videos", "Views", "Likes", "Avg views"
            );
            for row in &rows {
                println!(
                    "{:<40} {:>7} {:>12} {:>10} {:>12.1}",
                    truncate(&row.playlist_title, 40),
                    row.total_videos,
                    row.total_views,
                    row.total_likes,
                    row.avg_views
                );
            }
        }
        ReportTarget::Monthly { live, json } => {
            let rows = tubestats::aggregate::playlists_monthly(db, source(live)).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
                return Ok(());
            }
            if rows.is_empty() {
                println!("No monthly totals. Run 'tubestats aggregate' or pass --live.");
                return Ok(());
            }
            println!(
                "{:<40} {:<8} {:>7} {:>12} {:>10}",
                "Playlist", "Month", "Videos", "Views", "Likes"
            );
            for row in &rows {
                println!(
                    "{:<40} {:<8} {:>7} {:>12} {:>10}",
                    truncate(&row.playlist_title, 40),
                    row.year_month,
                    row.total_videos,
                    row.total_views,
                    row.total_likes
                );
            }
        }
        ReportTarget::Playlists { json } => {
            let playlists = tubestats::aggregate::playlists_overview(db).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&playlists)?);
                return Ok(());
            }
            for playlist in &playlists {
                println!("{} ({} videos)", playlist.title, playlist.videos.len());
                println!("  {}", playlist.url);
                for video in &playlist.top_videos {
                    println!(
                        "  {:>10} views  {}",
                        video.view_count,
                        truncate(&video.title, 60)
                    );
                }
            }
        }
        ReportTarget::Videos { playlist, json } => {
            let playlist_id = tubestats::resolve_playlist_id(&playlist)?;
            let videos = tubestats::aggregate::playlist_videos(db, &playlist_id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&videos)?);
                return Ok(());
            }
            if videos.is_empty() {
                println!("No stored videos for playlist {playlist_id}");
                return Ok(());
            }
            for video in &videos {
                println!(
                    "{:<11} {:<20} {:>10} {:>8}  {}",
                    video.video_id,
                    video.published_at.as_deref().unwrap_or("-"),
                    video.view_count,
                    video.like_count,
                    truncate(&video.title, 50)
                );
            }
        }
    }
    Ok(())
}

async fn print_status(db: &Database) -> anyhow::Result<()> {
    let status = tubestats::warehouse_status(db).await?;

    println!("Videos:    {}", status.videos);
    println!("Playlists: {}", status.playlists);
    match &status.last_sync {
        Some(run) => println!(
            "Last sync: {} at {} ({} new, {} updated)",
            run.mode,
            run.completed_at.as_deref().unwrap_or(&run.started_at),
            run.new_videos,
            run.updated_videos
        ),
        None => println!("Last sync: never"),
    }
    if let Some(run) = &status.last_failure {
        println!(
            "Last failure: {} at {}: {}",
            run.mode,
            run.started_at,
            run.error_message.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}
