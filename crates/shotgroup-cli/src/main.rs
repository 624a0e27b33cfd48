//! shotgroup CLI: group statistics from detector output or event scripts.

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use shotgroup::{
    AnalyzerConfig, Circle, ClickOutcome, Event, Mode, Point, ResultSummary, Scale, Session,
    ShotId, Snapshot,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "shotgroup")]
#[command(about = "Measure shooting groups from detected bullet holes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze detector output, optionally with manual points and a selection.
    Analyze(AnalyzeArgs),

    /// Apply an event script (JSON array) and report the final state.
    Replay(ReplayArgs),

    /// Print the effective analyzer configuration.
    ConfigInfo(ConfigArgs),
}

#[derive(Debug, Clone, Args, Default)]
struct ConfigArgs {
    /// Analyzer configuration file (JSON). Missing fields use defaults.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct OutputArgs {
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Write the report here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Full snapshot as pretty JSON.
    Json,
    /// Human-readable result table.
    Text,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Edit,
    Distance,
    Stddev,
}

impl ModeArg {
    fn to_core(self) -> Mode {
        match self {
            Self::Edit => Mode::Edit,
            Self::Distance => Mode::Distance,
            Self::Stddev => Mode::StdDev,
        }
    }
}

#[derive(Debug, Clone, Args)]
struct AnalyzeArgs {
    /// Detector output: JSON array of {x, y, radius} in image pixels.
    #[arg(long)]
    circles: PathBuf,

    /// Manual points: JSON array of {x, y} in image pixels.
    #[arg(long)]
    manual: Option<PathBuf>,

    /// Interaction mode used for the analysis.
    #[arg(long, value_enum, default_value_t = ModeArg::Edit)]
    mode: ModeArg,

    /// Shot ids to select (detected shots are numbered first, from 0).
    #[arg(long, num_args = 1..)]
    select: Vec<u64>,

    /// Scale in pixels per millimeter (overrides the configuration).
    #[arg(long)]
    px_per_mm: Option<f64>,

    #[command(flatten)]
    config: ConfigArgs,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Debug, Clone, Args)]
struct ReplayArgs {
    /// Event script: JSON array of tagged events.
    #[arg(long)]
    events: PathBuf,

    #[command(flatten)]
    config: ConfigArgs,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Debug, Deserialize)]
struct ManualPoint {
    x: f64,
    y: f64,
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze(args) => run_analyze(&args),
        Commands::Replay(args) => run_replay(&args),
        Commands::ConfigInfo(args) => run_config_info(&args),
    }
}

fn load_config(args: &ConfigArgs) -> CliResult<AnalyzerConfig> {
    match &args.config {
        Some(path) => {
            tracing::info!("Loading config: {}", path.display());
            AnalyzerConfig::from_json_file(path).map_err(|e| -> CliError {
                format!("Failed to load config {}: {}", path.display(), e).into()
            })
        }
        None => Ok(AnalyzerConfig::default()),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> CliResult<T> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| -> CliError { format!("Failed to read {}: {}", path.display(), e).into() })?;
    serde_json::from_str(&data)
        .map_err(|e| -> CliError { format!("Failed to parse {}: {}", path.display(), e).into() })
}

fn emit(session: &Session, output: &OutputArgs) -> CliResult<()> {
    let rendered = match output.format {
        OutputFormat::Json => serde_json::to_string_pretty(&Snapshot::capture(session))?,
        OutputFormat::Text => ResultSummary::from_session(session).to_string(),
    };
    match &output.out {
        Some(path) => {
            std::fs::write(path, &rendered)?;
            tracing::info!("Report written to {}", path.display());
        }
        None => println!("{}", rendered),
    }
    Ok(())
}

// ── analyze ────────────────────────────────────────────────────────────

fn run_analyze(args: &AnalyzeArgs) -> CliResult<()> {
    let config = load_config(&args.config)?;
    let scale = args.px_per_mm.map(Scale::new).transpose()?;

    let mode = args.mode.to_core();
    if !args.select.is_empty() && !mode.selects() {
        return Err("--select requires --mode distance or stddev".into());
    }

    let circles: Vec<Circle> = read_json(&args.circles)?;
    tracing::info!("{} circles loaded from {}", circles.len(), args.circles.display());

    let mut session = Session::new(config);
    session.on_image_ready(scale);
    let ticket = session.begin_detection();
    session.complete_detection(ticket, Ok(circles));

    if let Some(path) = &args.manual {
        let points: Vec<ManualPoint> = read_json(path)?;
        let added = points
            .iter()
            .filter_map(|p| session.add_manual_point(Point::new(p.x, p.y)))
            .count();
        tracing::info!("{} of {} manual points added", added, points.len());
    }

    session.on_mode_change(mode);
    for &raw in &args.select {
        match session.toggle_select(ShotId(raw)) {
            ClickOutcome::Selected(_) => {}
            ClickOutcome::Ignored => tracing::warn!("no shot with id {}", raw),
            other => tracing::warn!("selecting {} had no effect: {:?}", raw, other),
        }
    }

    emit(&session, &args.output)
}

// ── replay ─────────────────────────────────────────────────────────────

fn run_replay(args: &ReplayArgs) -> CliResult<()> {
    let config = load_config(&args.config)?;
    let events: Vec<Event> = read_json(&args.events)?;
    tracing::info!("Replaying {} events from {}", events.len(), args.events.display());

    let mut session = Session::new(config);
    for (i, event) in events.into_iter().enumerate() {
        let applied = session.apply(event);
        tracing::debug!("event {}: {:?}", i, applied);
    }

    emit(&session, &args.output)
}

// ── config-info ────────────────────────────────────────────────────────

fn run_config_info(args: &ConfigArgs) -> CliResult<()> {
    let config = load_config(args)?;
    println!("shotgroup analyzer configuration");
    println!("  scale:             {:.4} px/mm", config.pixels_per_mm);
    println!("  hit tolerance:     {} px", config.hit_tolerance_px);
    println!("  manual radius:     {} px", config.default_manual_radius_px);
    println!("  bullet diameter:   {} mm", config.bullet_diameter_mm);
    println!(
        "  initial mode:      {} ({})",
        config.initial_mode,
        config.initial_mode.label()
    );
    let d = &config.detector;
    println!(
        "  detector:          blur {}px sigma {}, dp {}, min dist {}px",
        d.blur_kernel, d.blur_sigma, d.dp, d.min_dist_px
    );
    println!(
        "                     canny {}, accumulator {}, radius {}..={} px",
        d.canny_threshold, d.accumulator_threshold, d.min_radius_px, d.max_radius_px
    );
    Ok(())
}
