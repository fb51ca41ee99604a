//! AIS heatmap command-line front end.
//!
//! Renders frames for a date range on a background worker, lists and plays
//! back what is on disk, and exports the current map view as a PNG.

mod console;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ais_common::{parse_datetime, HeatmapConfig, IntervalLabel};
use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand, ValueEnum};
use frame_pipeline::{RenderRequest, RenderWorker, Renderer};
use playback::{Direction, MapViewer, PlaybackController};
use storage::FrameStore;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::console::{Console, COMPLETE_MESSAGE};

#[derive(Parser, Debug)]
#[command(name = "ais-heatmap")]
#[command(about = "Render and play back AIS traffic density heatmaps")]
struct Cli {
    /// YAML configuration file; defaults plus AIS_* environment overrides otherwise
    #[arg(short, long, global = true, env = "AIS_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render every missing frame of a date range
    Render {
        /// First window start (YYYY-MM-DD or datetime)
        #[arg(short, long)]
        start: String,

        /// Last window start, inclusive
        #[arg(short, long)]
        end: String,

        /// Interval label, e.g. "1 Day"
        #[arg(short, long, default_value = "1 Day")]
        interval: String,

        /// Print every per-window status line
        #[arg(short, long)]
        verbose: bool,
    },

    /// List rendered frames
    Frames {
        #[arg(short, long, default_value = "1 Day")]
        interval: String,

        #[arg(long)]
        start: Option<String>,

        #[arg(long)]
        end: Option<String>,
    },

    /// Auto-play rendered frames, printing each timestamp
    Play {
        #[arg(short, long, default_value = "1 Day")]
        interval: String,

        #[arg(long)]
        start: Option<String>,

        #[arg(long)]
        end: Option<String>,

        /// Frames to show before stopping; one full loop by default
        #[arg(short = 'n', long)]
        frames: Option<usize>,
    },

    /// Export the map view of one frame as a PNG
    Snapshot {
        #[arg(short, long, default_value = "1 Day")]
        interval: String,

        /// Frame to export, by position in the sequence
        #[arg(long, default_value = "0")]
        index: usize,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Output width in pixels; canvas width by default
        #[arg(long)]
        width: Option<u32>,

        /// Output height in pixels; canvas height by default
        #[arg(long)]
        height: Option<u32>,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_format);

    if let Err(e) = run(cli).await {
        error!(error = %format!("{:#}", e), "Command failed");
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Render {
            start,
            end,
            interval,
            verbose,
        } => render(config, &start, &end, &interval, verbose).await,
        Commands::Frames { interval, start, end } => {
            list_frames(&config, &interval, start.as_deref(), end.as_deref())
        }
        Commands::Play {
            interval,
            start,
            end,
            frames,
        } => play(config, &interval, start.as_deref(), end.as_deref(), frames).await,
        Commands::Snapshot {
            interval,
            index,
            output,
            width,
            height,
        } => snapshot(config, &interval, index, &output, width, height),
    }
}

fn load_config(path: Option<&Path>) -> Result<Arc<HeatmapConfig>> {
    let config = match path {
        Some(path) => HeatmapConfig::from_yaml_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => HeatmapConfig::from_env().context("reading configuration from the environment")?,
    };
    config.validate().context("invalid configuration")?;
    info!(
        source = %config.source.base_path.display(),
        output = %config.output.root.display(),
        fingerprint = %config.render_fingerprint(),
        "Configuration loaded"
    );
    Ok(Arc::new(config))
}

fn parse_bound(value: Option<&str>) -> Result<Option<NaiveDateTime>> {
    value
        .map(|s| parse_datetime(s).with_context(|| format!("bad date {:?}", s)))
        .transpose()
}

fn viewer_for(
    config: Arc<HeatmapConfig>,
    interval: &str,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<MapViewer> {
    let interval: IntervalLabel = interval.parse()?;
    let mut viewer = MapViewer::new(config, interval)?;
    let (start, end) = (parse_bound(start)?, parse_bound(end)?);
    if start.is_some() || end.is_some() {
        viewer.set_bounds(start, end)?;
    }
    Ok(viewer)
}

async fn render(config: Arc<HeatmapConfig>, start: &str, end: &str, interval: &str, verbose: bool) -> Result<()> {
    let start = parse_datetime(start).with_context(|| format!("bad start date {:?}", start))?;
    let end = parse_datetime(end).with_context(|| format!("bad end date {:?}", end))?;

    let worker = RenderWorker::new(Renderer::from_config(config.clone())?);
    let handle = worker.spawn(RenderRequest {
        start,
        end,
        interval: interval.to_string(),
    })?;

    let mut console = Console::new(verbose);
    let produced = handle.finish(|event| console.on_event(event)).await?;

    console.say(COMPLETE_MESSAGE);
    info!(produced, "Render complete");

    let label: IntervalLabel = interval.parse()?;
    let mut viewer = MapViewer::new(config, label)?;
    let frames = viewer.show_range(label, start, end)?;
    console.say(&format!(
        "{} new frame(s); {} frame(s) ready to play for {} from {} to {}",
        produced,
        frames,
        label,
        start.date(),
        end.date()
    ));
    Ok(())
}

fn list_frames(config: &HeatmapConfig, interval: &str, start: Option<&str>, end: Option<&str>) -> Result<()> {
    let interval: IntervalLabel = interval.parse()?;
    let (start, end) = (parse_bound(start)?, parse_bound(end)?);
    let store = FrameStore::from_config(&config.output);

    let frames = store
        .list(interval)
        .with_context(|| format!("listing {}", store.interval_dir(interval).display()))?;
    let mut shown = 0;
    for frame in frames
        .iter()
        .filter(|f| start.map_or(true, |s| f.timestamp >= s) && end.map_or(true, |e| f.timestamp <= e))
    {
        println!("{}  {}", frame.timestamp.format("%Y-%m-%d %H:%M"), frame.path.display());
        shown += 1;
    }
    if shown == 0 {
        println!("No frames for {}", interval);
    }
    Ok(())
}

async fn play(
    config: Arc<HeatmapConfig>,
    interval: &str,
    start: Option<&str>,
    end: Option<&str>,
    frames: Option<usize>,
) -> Result<()> {
    let tick = Duration::from_millis(config.viewer.tick_ms);
    let viewer = viewer_for(config, interval, start, end)?;
    let mut controller = PlaybackController::new(viewer, tick);
    let mut updates = controller.subscribe();

    if !controller.play().await? {
        println!("No frames to play for {}", interval);
        return Ok(());
    }

    let state = updates.borrow_and_update().clone();
    let total = frames.unwrap_or(state.len);
    println!("[{}/{}] {}", state.index + 1, state.len, state.label);

    for _ in 1..total {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                println!("[{}/{}] {}", state.index + 1, state.len, state.label);
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    controller.pause().await;
    Ok(())
}

fn snapshot(
    config: Arc<HeatmapConfig>,
    interval: &str,
    index: usize,
    output: &Path,
    width: Option<u32>,
    height: Option<u32>,
) -> Result<()> {
    let (width, height) = (
        width.unwrap_or(config.canvas.width),
        height.unwrap_or(config.canvas.height),
    );
    let mut viewer = viewer_for(config, interval, None, None)?;
    let len = viewer.sequencer().len();
    if len == 0 {
        bail!("no frames rendered for {}", interval);
    }
    if index >= len {
        bail!("frame {} out of range, {} frame(s) available", index, len);
    }
    for _ in 0..index {
        viewer.step(Direction::Forward);
    }

    let composite = viewer.render_current()?;
    let image = composite.rasterize(&viewer.initial_view(), width, height)?;
    let png = renderer::encode_png(&image)?;
    std::fs::write(output, png).with_context(|| format!("writing {}", output.display()))?;
    println!("{} → {}", composite.timestamp, output.display());
    Ok(())
}
