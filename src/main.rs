mod config;
mod db;
mod document;
mod error;
mod ipc;
mod seed;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use config::{LoadOptions, StoreConfig, DEFAULT_BUSY_TIMEOUT_MS};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sgpa-seed")]
#[command(version)]
#[command(about = "Load an SGPA seed document into the attendance store")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log output format (logs go to stderr)
    #[arg(long, global = true, default_value = "text", value_enum)]
    log_format: LogFormat,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(clap::Args)]
struct StoreArgs {
    /// SQLite database file (created if missing)
    #[arg(long, env = "SGPA_DB")]
    db: PathBuf,

    /// How long to wait on a locked database
    #[arg(long, env = "SGPA_BUSY_TIMEOUT_MS", default_value_t = DEFAULT_BUSY_TIMEOUT_MS)]
    busy_timeout_ms: u64,
}

impl StoreArgs {
    fn config(&self) -> StoreConfig {
        StoreConfig::new(&self.db).with_busy_timeout_ms(self.busy_timeout_ms)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Load a seed document in one transaction
    Load {
        #[command(flatten)]
        store: StoreArgs,

        /// Run the load, report it, then roll back
        #[arg(long)]
        dry_run: bool,

        /// Seed document (JSON)
        input: PathBuf,
    },

    /// Print the row count of every entity table
    Counts {
        #[command(flatten)]
        store: StoreArgs,
    },

    /// Serve JSON-lines requests on stdin/stdout
    Serve,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Commands::Load {
            store,
            dry_run,
            input,
        } => run_load(&store.config(), &input, &LoadOptions { dry_run }),
        Commands::Counts { store } => match run_counts(&store.config()) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!(error = %e, "counts failed");
                println!("ERROR: {e:#}");
                ExitCode::FAILURE
            }
        },
        Commands::Serve => {
            serve();
            ExitCode::SUCCESS
        }
    }
}

fn run_load(config: &StoreConfig, input: &std::path::Path, opts: &LoadOptions) -> ExitCode {
    let conn = match db::open_db(config).with_context(|| {
        format!("failed to open store {}", config.path().to_string_lossy())
    }) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "store unavailable");
            println!("ERROR: seed rolled back: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    match seed::load_file(&conn, input, opts) {
        Ok(report) if report.committed => {
            println!(
                "OK: seed committed ({} inserted, {} skipped) run={}",
                report.total_inserted(),
                report.total_skipped(),
                report.run_id
            );
            ExitCode::SUCCESS
        }
        Ok(report) => {
            println!(
                "OK: dry run rolled back ({} would insert, {} skipped)",
                report.total_inserted(),
                report.total_skipped()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, input = %input.display(), "seed failed");
            println!("ERROR: seed rolled back: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_counts(config: &StoreConfig) -> anyhow::Result<()> {
    let conn = db::open_db(config)
        .with_context(|| format!("failed to open store {}", config.path().to_string_lossy()))?;
    let counts = db::table_counts(&conn).context("failed to count rows")?;
    for (table, n) in counts {
        println!("{table}\t{n}");
    }
    Ok(())
}

fn serve() {
    let mut state = ipc::AppState::new();

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    info!("sidecar ready");

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let resp = match serde_json::from_str::<ipc::Request>(&line) {
            Ok(req) => ipc::handle_request(&mut state, req),
            // Can't echo an id we failed to read.
            Err(e) => ipc::err("", "bad_json", e.to_string(), None),
        };
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}
