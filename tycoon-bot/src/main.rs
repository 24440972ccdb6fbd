mod config;
mod games;
mod report;
mod runner;
mod transport;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};

use config::BotConfig;
use games::GameRegistry;
use report::{ProjectionReport, write_report};
use runner::{compose, now_ms};
use transport::{WsTransport, load_frames, replay};
use tycoon_core::{CancellationToken, JsonSnapshotLoader, Snapshot, SnapshotLoader};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RunMode {
    /// Project traffic and ad earnings from a saved state
    Project,
    /// Replay a recorded event stream over a saved state, then project
    Replay,
    /// Connect to the game server and run the configured game
    Live,
}

#[derive(Debug, Parser)]
#[command(name = "tycoon-bot", version = "0.1.0")]
#[command(about = "Web Tycoon automation: state sync, traffic and revenue projection, games")]
struct Args {
    /// Run mode: project, replay or live
    #[arg(long, value_enum, default_value_t = RunMode::Project)]
    mode: RunMode,

    /// Initial state tree (JSON)
    #[arg(long)]
    state: Option<PathBuf>,

    /// Recorded event stream, one JSON frame per line (replay mode)
    #[arg(long)]
    events: Option<PathBuf>,

    /// Bot config file (JSON); TYCOON_* environment variables override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Game author, overriding the config
    #[arg(long)]
    author: Option<String>,

    /// Game name, overriding the config
    #[arg(long)]
    game: Option<String>,

    /// Projection time in epoch milliseconds (defaults to now)
    #[arg(long)]
    at: Option<i64>,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console", "csv"])]
    report: String,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// List all registered games and exit
    #[arg(long)]
    list_games: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_games(&args)? {
        return Ok(());
    }

    match args.mode {
        RunMode::Project => run_project(&args),
        RunMode::Replay => run_replay(&args).await,
        RunMode::Live => run_live(&args).await,
    }
}

fn maybe_list_games(args: &Args) -> Result<bool> {
    if !args.list_games {
        return Ok(false);
    }
    let registry = GameRegistry::builtin()?;
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available games:")?;
    for spec in registry.iter() {
        let stream = if spec.needs_stream { "live" } else { "once" };
        let every = format!("{:?}", spec.waiting);
        writeln!(
            output_target.writer(),
            "  {:25} [{stream:4}] every {every:>6} - {}",
            spec.key(),
            spec.description
        )?;
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner(mode: RunMode) {
    eprintln!(
        "{} {}",
        "🕸️  Web Tycoon Bot".bright_cyan().bold(),
        format!("({mode:?})").cyan()
    );
}

fn load_state(path: &Path) -> Result<Snapshot> {
    let document = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read state {}", path.display()))?;
    JsonSnapshotLoader::new(document)
        .load_snapshot()
        .with_context(|| format!("failed to parse state {}", path.display()))
}

fn require_state(args: &Args) -> Result<Snapshot> {
    let Some(path) = args.state.as_deref() else {
        bail!("--state is required in {:?} mode", args.mode);
    };
    load_state(path)
}

fn write_projection(args: &Args, report: &ProjectionReport) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;
    write_report(&args.report, &mut output_target, report)?;
    output_target.flush_inner()?;
    Ok(())
}

fn run_project(args: &Args) -> Result<()> {
    announce_banner(args.mode);
    let snapshot = require_state(args)?;
    let report = ProjectionReport::build(&snapshot, args.at.unwrap_or_else(now_ms))?;
    write_projection(args, &report)
}

async fn run_replay(args: &Args) -> Result<()> {
    announce_banner(args.mode);
    let snapshot = require_state(args)?;
    let Some(events) = args.events.as_deref() else {
        bail!("--events is required in replay mode");
    };
    let frames = load_frames(events)?;
    let replayed = replay(snapshot, frames).await?;
    log::info!("replay finished {:?}", replayed.state);
    let report = ProjectionReport::build(&replayed.snapshot, args.at.unwrap_or_else(now_ms))?
        .with_applied_frames(replayed.frames);
    write_projection(args, &report)
}

fn live_config(args: &Args) -> Result<BotConfig> {
    let mut config = BotConfig::load(args.config.as_deref())?.with_env();
    if let Some(author) = &args.author {
        config.author.clone_from(author);
    }
    if let Some(game) = &args.game {
        config.game.clone_from(game);
    }
    Ok(config)
}

async fn run_live(args: &Args) -> Result<()> {
    announce_banner(args.mode);
    let config = live_config(args)?;
    let endpoint = config.endpoint.clone();
    let runner = compose(config)?;
    let initial = match args.state.as_deref() {
        Some(path) => load_state(path)?,
        None => {
            log::warn!("no --state given, starting from an empty state tree");
            Snapshot::default()
        }
    };
    let mut output_target = OutputTarget::new(args.output.clone())?;

    if !runner.spec().needs_stream {
        runner.tick(&initial, args.at.unwrap_or_else(now_ms), &mut output_target)?;
        output_target.flush_inner()?;
        return Ok(());
    }

    let token = CancellationToken::new();
    let interrupt = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("interrupted, closing the connection");
            interrupt.cancel();
        }
    });
    let state = runner
        .run_live(WsTransport::new(endpoint), initial, token, &mut output_target)
        .await?;
    output_target.flush_inner()?;
    eprintln!("🏁 Connection {state:?}");
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args {
            mode: RunMode::Project,
            state: None,
            events: None,
            config: None,
            author: None,
            game: None,
            at: Some(0),
            report: "json".to_string(),
            output: None,
            list_games: false,
        }
    }

    #[test]
    fn cli_flags_override_config() {
        let args = Args {
            author: Some("thekiba".into()),
            game: Some("extra-ads".into()),
            ..base_args()
        };
        let config = live_config(&args).unwrap();
        assert_eq!(config.author, "thekiba");
        assert_eq!(config.game, "extra-ads");
    }

    #[test]
    fn project_requires_a_state_file() {
        let err = run_project(&base_args()).unwrap_err();
        assert!(err.to_string().contains("--state"));
        let missing = Args {
            state: Some(PathBuf::from("/definitely/missing.json")),
            ..base_args()
        };
        assert!(format!("{:#}", run_project(&missing).unwrap_err()).contains("missing.json"));
    }

    #[test]
    fn replay_requires_events() {
        let state = std::env::temp_dir().join(format!("tycoon-state-{}.json", std::process::id()));
        std::fs::write(&state, "{}").unwrap();
        let args = Args {
            mode: RunMode::Replay,
            state: Some(state.clone()),
            ..base_args()
        };
        let err = tokio_test::block_on(run_replay(&args)).unwrap_err();
        assert!(err.to_string().contains("--events"));
        std::fs::remove_file(state).ok();
    }

    #[test]
    fn output_target_writes_to_file() {
        let path = std::env::temp_dir().join(format!("tycoon-out-{}.txt", std::process::id()));
        let mut target = OutputTarget::new(Some(path.clone())).unwrap();
        writeln!(target, "hello").unwrap();
        target.flush_inner().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello\n");
        std::fs::remove_file(path).ok();
    }
}
