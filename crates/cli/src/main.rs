//! The gloop binary.
//!
//! Two modes:
//! - interactive (default): a line-oriented terminal agent
//! - `--task "<task>"`: headless, writing a JSONL event stream; this is
//!   the mode subagent spawns use
//!
//! Exit codes: 0 success, 1 error, 75 reboot (a supervising launcher
//! respawns the process on 75).

use clap::Parser;
use std::path::PathBuf;

mod effects;
mod runtime;
mod spawn;
mod task;
mod terminal;

use gloop_config::GloopConfig;
use runtime::Runtime;

#[derive(Parser, Debug)]
#[command(
    name = "gloop",
    about = "gloop — a terminal-resident agent that works until the task is done",
    version
)]
struct Cli {
    /// Model override (same as --model)
    model_positional: Option<String>,

    /// Run one task headless and exit
    #[arg(long)]
    task: Option<String>,

    /// Model override
    #[arg(long)]
    model: Option<String>,

    /// Provider routing hint (upstream pin)
    #[arg(long)]
    provider: Option<String>,

    /// Event file path for task mode (default: a temp file)
    #[arg(long)]
    events: Option<PathBuf>,

    /// Verbose logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = match GloopConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("config error: {e}");
            std::process::exit(1);
        }
    };

    let model = cli.model.or(cli.model_positional);
    let runtime = match Runtime::new(config, model, cli.provider) {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    if let Some(task) = cli.task {
        let code = task::run(runtime, task, cli.events).await;
        std::process::exit(code);
    }

    if let Err(e) = terminal::run(runtime).await {
        eprintln!("fatal: {e}");
        std::process::exit(1);
    }
}
