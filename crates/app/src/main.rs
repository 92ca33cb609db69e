use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use testimony_feed_core::{
    seed, Catalog, ContentWindowPlanner, FeedConfig, FeedError, FeedSession, InnerPage, NavEvent, Overlay,
    PointerEvent, RequestOutcome, SessionEvent, SimulatedAudio,
};
use tracing_subscriber::EnvFilter;

fn main() -> testimony_feed_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            source,
            script,
            step_ms,
        } => run_simulate(&source, &script, step_ms),
        Commands::Windows { source, recording } => run_windows(&source, recording.as_deref()),
        Commands::Seed { seed, draws } => run_seed(&seed, draws),
        Commands::Sample {
            seed,
            count,
            output,
        } => run_sample(&seed, count, output.as_deref()),
    }
}

fn run_simulate(source: &SourceArgs, script: &str, step_ms: u64) -> testimony_feed_core::Result<()> {
    let (config, catalog) = source.resolve()?;
    tracing::info!(recordings = catalog.len(), script, "starting simulation");

    let planner = ContentWindowPlanner::new(config.planner.clone());
    let backend = catalog
        .recordings()
        .iter()
        .fold(SimulatedAudio::default(), |audio, recording| {
            audio.with_duration(recording.full_track.clone(), planner.full_duration(recording))
        });

    let mut session = FeedSession::new(config, backend);
    let mut now = 0;
    report(&session.load_catalog(catalog, now));

    for step in script.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let events = match step {
            "left" => swipe(&mut session, -120.0, 0.0, now),
            "right" => swipe(&mut session, 120.0, 0.0, now),
            "up" => swipe(&mut session, 0.0, -120.0, now),
            "down" => swipe(&mut session, 0.0, 120.0, now),
            "tap" => swipe(&mut session, 2.0, 1.0, now),
            "play" => session.toggle_play(),
            "transcript" => session.open_overlay(Overlay::Transcript, now),
            "reactions" => session.open_overlay(Overlay::Reactions, now),
            "more" => session.request_new_content(now),
            "decline" => session.finish_request(RequestOutcome::Declined, now)?,
            other => match other.strip_prefix("wait:") {
                Some(ms) => {
                    let ms: u64 = ms
                        .parse()
                        .map_err(|_| FeedError::msg(format!("invalid wait step `{other}`")))?;
                    let until = now + ms;
                    let mut events = Vec::new();
                    while now < until {
                        now = (now + 16).min(until);
                        events.extend(session.frame(now));
                    }
                    events
                }
                None => return Err(FeedError::msg(format!("unknown script step `{other}`"))),
            },
        };
        report(&events);

        now += step_ms;
        report(&session.frame(now));

        let progress = session.progress();
        println!(
            "{step:>10} -> {:?} | {:.1}/{:.1}s playing={} blocked={}",
            session.state(),
            progress.elapsed,
            progress.duration,
            progress.playing,
            progress.blocked
        );
    }
    Ok(())
}

fn run_windows(source: &SourceArgs, only: Option<&str>) -> testimony_feed_core::Result<()> {
    let (config, catalog) = source.resolve()?;
    let planner = ContentWindowPlanner::new(config.planner);

    let recordings = match only {
        Some(id) => {
            let index = catalog.position(id)?;
            &catalog.recordings()[index..=index]
        }
        None => catalog.recordings(),
    };
    for recording in recordings {
        let pages = (0..recording.snippet_count())
            .map(|index| InnerPage::OnSnippet { index })
            .chain(std::iter::once(InnerPage::OnFullTrack));
        for page in pages {
            let plan = planner.plan_page(recording, page);
            let variant = planner.page_variant(recording, page);
            let line = serde_json::json!({
                "recording": recording.id,
                "page": page,
                "source": plan.source,
                "window": plan.window,
                "variant": variant,
            });
            println!("{line}");
        }
    }
    Ok(())
}

fn run_seed(value: &str, draws: usize) -> testimony_feed_core::Result<()> {
    let hash = seed::hash(value);
    println!("hash({value:?}) = {hash} (0x{hash:08x})");
    for (n, draw) in seed::stream_from(hash).take(draws).enumerate() {
        println!("  draw[{n}] = {draw:.12}");
    }
    Ok(())
}

fn run_sample(value: &str, count: usize, output: Option<&Path>) -> testimony_feed_core::Result<()> {
    let json = Catalog::sample(value, count).to_json_pretty()?;
    match output {
        Some(path) => {
            tracing::info!(?path, count, "writing sample catalog");
            std::fs::write(path, json)?;
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn swipe(
    session: &mut FeedSession<SimulatedAudio>,
    dx: f32,
    dy: f32,
    now: u64,
) -> Vec<SessionEvent> {
    let (x, y) = (180.0, 320.0);
    session.pointer_down(PointerEvent::new(1, x, y, now));
    session.pointer_move(PointerEvent::new(1, x + dx / 2.0, y + dy / 2.0, now + 16));
    session.pointer_up(PointerEvent::new(1, x + dx, y + dy, now + 32))
}

fn report(events: &[SessionEvent]) {
    for event in events {
        match event {
            SessionEvent::Nav(NavEvent::PageChanged {
                recording_index,
                page,
                plan,
            }) => tracing::info!(
                recording_index,
                ?page,
                source = %plan.source,
                start = plan.window.start,
                end = plan.window.end,
                "page"
            ),
            other => tracing::debug!(?other, "event"),
        }
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Swipe-driven testimony feed engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a comma separated script of gestures against a catalog.
    ///
    /// Steps: left, right, up, down, tap, play, transcript, reactions, more,
    /// decline, wait:<ms>.
    Simulate {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(short, long, default_value = "left,left,left,left,down,wait:2000,down")]
        script: String,
        /// Simulated time between script steps.
        #[arg(long, default_value_t = 250)]
        step_ms: u64,
    },
    /// Print the derived playback window and visual variant of every page.
    Windows {
        #[command(flatten)]
        source: SourceArgs,
        /// Only print the pages of this recording id.
        #[arg(long)]
        recording: Option<String>,
    },
    /// Print the hash and first draws of a seed string.
    Seed {
        seed: String,
        #[arg(short, long, default_value_t = 5)]
        draws: usize,
    },
    /// Emit a deterministic sample catalog as JSON.
    Sample {
        #[arg(long, default_value = "demo")]
        seed: String,
        #[arg(short, long, default_value_t = 3)]
        count: usize,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Catalog JSON file. A seeded sample catalog is used when omitted.
    #[arg(long)]
    catalog: Option<PathBuf>,
    /// Configuration JSON file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Seed for the sample catalog.
    #[arg(long, default_value = "demo")]
    sample_seed: String,
    /// Number of recordings in the sample catalog.
    #[arg(long, default_value_t = 3)]
    sample_count: usize,
    #[arg(long)]
    reduced_motion: bool,
}

impl SourceArgs {
    fn resolve(&self) -> testimony_feed_core::Result<(FeedConfig, Catalog)> {
        let mut config = match &self.config {
            Some(path) => FeedConfig::load(path)?,
            None => FeedConfig::default(),
        };
        if self.reduced_motion {
            config.timing.reduced_motion = true;
        }
        let catalog = match &self.catalog {
            Some(path) => Catalog::load(path)?,
            None => Catalog::sample(&self.sample_seed, self.sample_count),
        };
        Ok((config, catalog))
    }
}
