//! binpatch: patch binary artifacts with plugin patches
//!
//! Usage:
//!   binpatch                      → header, usage and exit codes
//!   binpatch -c game              → run with game.ini (created on first use)
//!   binpatch -fc game             → reset game.ini to defaults, then run
//!   binpatch -c game -r           → re-patch from the newest backups

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use binpatch::orchestrator::{PatchOrchestrator, RunOptions, RunOutcome, RunReport};
use binpatch::console;
use binpatch_core::ExitCode;
use binpatch_patches::builtin_catalog;

#[derive(Parser)]
#[command(
    name = "binpatch",
    about = "Apply patch plugins to binary artifacts, with backups and idempotency markers",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    /// Config file to use, created with defaults if missing (.ini appended)
    #[arg(short = 'c', value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Overwrite the config with defaults before running
    #[arg(short = 'f', default_value_t = false)]
    force: bool,

    /// Wait for Enter before exiting
    #[arg(short = 'w', default_value_t = false)]
    wait: bool,

    /// Load artifacts from their newest backup when one exists
    #[arg(short = 'r', default_value_t = false)]
    reload: bool,

    /// Write logs to a file (in addition to stderr)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Write a JSON report of the run
    #[arg(long)]
    report: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    let code = run(&cli);
    if cli.wait {
        console::wait_for_enter();
    }
    std::process::exit(code.code());
}

fn run(cli: &Cli) -> ExitCode {
    println!("{}", console::header());

    let Some(config) = &cli.config else {
        println!("{}", console::usage());
        return ExitCode::Success;
    };

    let _guard = match init_tracing(cli.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::InternalException;
        }
    };

    let options = RunOptions {
        config_path: config.clone(),
        force_create: cli.force,
        prefer_backup: cli.reload,
    };

    println!("{}", console::splitter("Patching"));
    let mut orchestrator = PatchOrchestrator::new(builtin_catalog());
    let code = match orchestrator.run(&options) {
        Ok(RunOutcome::ConfigCreated(path)) => {
            println!(
                "Config file {} was created. Edit it and run again.",
                path.display()
            );
            ExitCode::Success
        }
        Ok(RunOutcome::Completed(report)) => {
            if let Some(path) = &cli.report {
                if let Err(e) = write_report(path, &report) {
                    warn!("{e:#}");
                }
            }
            ExitCode::Success
        }
        Err(failure) => {
            eprintln!("Error: {failure}");
            failure.code
        }
    };
    println!("{}", console::splitter(code.name()));
    code
}

fn write_report(path: &Path, report: &RunReport) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json).with_context(|| format!("writing report {}", path.display()))?;
    Ok(())
}

fn init_tracing(log_file: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let (file_layer, guard) = match log_file {
        Some(path) => {
            let name = path
                .file_name()
                .with_context(|| format!("--log-file {} has no file name", path.display()))?;
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "binpatch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(guard)
}
