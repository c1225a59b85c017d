//! repowatch - demo CLI for the repository-processing engine
//!
//! Runs the engine against a JSON fixture of repository changes with an
//! offline digest summarizer. State is kept per mode (`state.json` for news,
//! `state_forks.json` for forks) so a second run only reports what is new.

mod fixture;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::Level;

use repowatch_core::app::{OrderPolicy, RunConfig, SchedulerBuilder, WatchConfig};
use repowatch_core::domain::{RunError, RunReport, TaskMode};
use repowatch_core::impls::{JsonStateFile, RetryingDeltaSource, TerminalRenderer};
use repowatch_core::observability::init_tracing;
use repowatch_core::queue::RetryPolicy;

use crate::fixture::{DigestSummarizer, FixtureFile};

#[derive(Parser)]
#[command(name = "repowatch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Summarize what changed in a set of repositories", long_about = None)]
struct Cli {
    /// Watch list (repositories + settings)
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Recorded repository changes to serve instead of a remote host
    #[arg(short, long)]
    fixture: PathBuf,

    /// Directory holding the state documents
    #[arg(long, default_value = ".")]
    state_dir: PathBuf,

    #[arg(short, long, value_enum, default_value_t = ModeArg::News)]
    mode: ModeArg,

    /// Override settings.max_workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// Override settings.repo_timeout (seconds)
    #[arg(long)]
    repo_timeout: Option<f64>,

    /// Override settings.global_timeout (seconds)
    #[arg(long)]
    global_timeout: Option<f64>,

    #[arg(long)]
    show_costs: bool,

    /// Print a line for repositories with nothing new
    #[arg(long)]
    show_unchanged: bool,

    /// Render summaries in watch-list order instead of completion order
    #[arg(long)]
    input_order: bool,

    /// Do not write the state document
    #[arg(long)]
    no_save: bool,

    /// Emit JSON log lines on stderr
    #[arg(long)]
    json_logs: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    News,
    Forks,
}

impl From<ModeArg> for TaskMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::News => TaskMode::News,
            ModeArg::Forks => TaskMode::Forks,
        }
    }
}

impl Cli {
    /// File settings with command-line overrides applied.
    fn run_config(&self, mut config: RunConfig) -> Result<RunConfig> {
        if let Some(workers) = self.workers {
            config.max_workers = workers;
        }
        if let Some(secs) = self.repo_timeout {
            config.repo_timeout =
                Duration::try_from_secs_f64(secs).context("invalid --repo-timeout")?;
        }
        if let Some(secs) = self.global_timeout {
            config.global_timeout =
                Duration::try_from_secs_f64(secs).context("invalid --global-timeout")?;
        }
        config.show_costs |= self.show_costs;
        config.show_unchanged |= self.show_unchanged;
        if self.input_order {
            config.order_policy = OrderPolicy::InputOrder;
        }
        if self.no_save {
            config.save_state = false;
        }
        Ok(config)
    }
}

fn state_path(dir: &Path, mode: TaskMode) -> PathBuf {
    match mode {
        TaskMode::News => dir.join("state.json"),
        TaskMode::Forks => dir.join("state_forks.json"),
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    init_tracing(cli.json_logs, level);

    let mode = TaskMode::from(cli.mode);
    let watch = WatchConfig::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    let config = cli.run_config(watch.settings.clone())?;

    // entries without an explicit mode run in the selected one
    let tasks: Vec<_> = watch
        .tasks(mode)
        .into_iter()
        .filter(|t| t.mode() == mode)
        .collect();
    if tasks.is_empty() {
        eprintln!("❌ No {mode} repositories configured in {}", cli.config.display());
        return Ok(ExitCode::FAILURE);
    }

    let fixture = FixtureFile::load(&cli.fixture)?;
    let source = RetryingDeltaSource::new(fixture.source(mode), RetryPolicy::default());
    let scheduler = SchedulerBuilder::new()
        .register(mode, Arc::new(source), Arc::new(DigestSummarizer::new(10)))?
        .expect_modes(&[mode])
        .renderer(Arc::new(TerminalRenderer::stdout()))
        .persistence(Arc::new(JsonStateFile::new(state_path(&cli.state_dir, mode))))
        .build()?;

    let (report, deadline_hit) = match scheduler.run(tasks, &config).await {
        Ok(report) => (report, false),
        Err(RunError::GlobalTimeout { report, .. }) => (*report, true),
        Err(e) => return Err(e.into()),
    };

    print_footer(&report, &config);
    if deadline_hit {
        eprintln!(
            "⚠️  Global timeout reached; {} repositories were not processed",
            report.pending.len()
        );
    }
    Ok(if report.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_footer(report: &RunReport, config: &RunConfig) {
    let counts = report.counts();
    println!(
        "Processed {} repositories: {} updated, {} unchanged, {} failed",
        counts.total(),
        counts.succeeded,
        counts.skipped,
        counts.failed
    );
    for outcome in report.failed() {
        if let Some(error) = &outcome.error {
            eprintln!("❌ {}: {error}", outcome.key);
        }
    }
    let total = report.total_cost();
    if config.show_costs && !total.is_zero() {
        println!("💰 Total cost: {total}");
    }
    if config.save_state {
        println!("✅ State saved");
    }
}
