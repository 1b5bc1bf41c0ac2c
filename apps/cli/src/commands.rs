//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use batchline_batch::{StepExecution, StepListener};
use batchline_core::{ExportJobConfig, SeedOutcome, run_export, seed};
use batchline_shared::{config_file_path, init_config, load_config};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Batchline — chunked batch export of employee records.
#[derive(Parser)]
#[command(
    name = "batchline",
    version,
    about = "Seed, transform, and export employee records in committed chunks.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Seed (if needed) and run the export job to completion.
    Run {
        /// Database file path (overrides config).
        #[arg(long)]
        db: Option<PathBuf>,

        /// Output file path (overrides config).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Records per committed chunk (overrides config).
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Emit a header row.
        #[arg(long)]
        header: bool,
    },

    /// Seed the demo employee rows without running the job.
    Seed {
        /// Database file path (overrides config).
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Create a default config file at ~/.batchline/batchline.toml.
    Init,
    /// Print the effective configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "batchline=info",
        1 => "batchline=debug",
        _ => "batchline=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command routing
// ---------------------------------------------------------------------------

pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run {
            db,
            out,
            chunk_size,
            header,
        } => cmd_run(db, out, chunk_size, header).await,
        Command::Seed { db } => cmd_seed(db).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Chunk-commit progress spinner for interactive runs.
struct ChunkProgress {
    bar: ProgressBar,
}

impl ChunkProgress {
    fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .expect("valid progress template"),
        );
        Self { bar }
    }
}

impl StepListener for ChunkProgress {
    fn chunk_committed(&self, step_name: &str, chunk_index: usize, items: usize) {
        self.bar
            .set_message(format!("{step_name}: chunk {chunk_index} ({items} records)"));
        self.bar.tick();
    }

    fn step_finished(&self, execution: &StepExecution) {
        self.bar.finish_with_message(format!(
            "{}: {} read, {} written, {} chunks",
            execution.name, execution.read_count, execution.write_count, execution.chunk_count
        ));
    }
}

// ---------------------------------------------------------------------------
// Command implementations
// ---------------------------------------------------------------------------

async fn cmd_run(
    db: Option<PathBuf>,
    out: Option<PathBuf>,
    chunk_size: Option<usize>,
    header: bool,
) -> Result<()> {
    let app_config = load_config().map_err(|e| eyre!(e))?;
    let mut config = ExportJobConfig::from(&app_config);

    if let Some(db) = db {
        config.db_path = db;
    }
    if let Some(out) = out {
        config.output_path = out;
    }
    if let Some(chunk_size) = chunk_size {
        config.chunk_size = chunk_size;
    }
    if header {
        config.header = true;
    }

    let progress = ChunkProgress::new();
    let result = run_export(&config, &progress)
        .await
        .map_err(|e| eyre!("export job failed: {e}"))?;

    println!(
        "Exported {} records in {} chunk(s) to {} ({} ms)",
        result.write_count,
        result.chunk_count,
        result.output_path.display(),
        result.elapsed.as_millis()
    );
    if result.skip_count > 0 {
        println!("Skipped {} record(s) on transform failures", result.skip_count);
    }
    Ok(())
}

async fn cmd_seed(db: Option<PathBuf>) -> Result<()> {
    let app_config = load_config().map_err(|e| eyre!(e))?;
    let db_path = db.unwrap_or_else(|| PathBuf::from(&app_config.storage.db_path));

    match seed(&db_path).await.map_err(|e| eyre!(e))? {
        SeedOutcome::Seeded(ids) => {
            println!("Seeded {} employees (ids {:?})", ids.len(), ids);
        }
        SeedOutcome::AlreadyPopulated(n) => {
            println!("Employees table already has {n} row(s); nothing to do");
        }
    }
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config().map_err(|e| eyre!(e))?;
    info!(path = %path.display(), "config initialized");
    println!("Wrote default config to {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config = load_config().map_err(|e| eyre!(e))?;
    let rendered = toml::to_string_pretty(&config).map_err(|e| eyre!(e))?;
    let path = config_file_path().map_err(|e| eyre!(e))?;
    println!("# {}", path.display());
    print!("{rendered}");
    Ok(())
}
