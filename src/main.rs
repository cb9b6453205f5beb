//! Nightshift CLI entry point.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use console::style;
use nightshift::cli::commands::run::RunCommand;
use nightshift::cli::{Cli, CommandDispatcher, Commands};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber for logging.
///
/// Log level is controlled by:
/// 1. `--debug` flag sets level to DEBUG
/// 2. `RUST_LOG` environment variable (if set)
/// 3. Default is INFO
///
/// When `log_file` can be opened, everything is also appended to it without
/// ANSI colors.
fn init_tracing(debug: bool, log_file: Option<PathBuf>) {
    let filter = if debug {
        EnvFilter::new("nightshift=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nightshift=info"))
    };

    let file_layer = log_file.and_then(|path| {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).ok()?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .ok()?;
        Some(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file)),
        )
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let root = cli
        .target_root()
        .cloned()
        .unwrap_or_else(|| PathBuf::from("."));
    let root = root.canonicalize().unwrap_or(root);

    let log_file = match &cli.command {
        Some(Commands::Run(_)) | None => RunCommand::new(&root, cli.config.as_deref()).log_file(),
        _ => None,
    };
    init_tracing(cli.debug, log_file);

    tracing::debug!("Nightshift starting with args: {:?}", cli);

    let dispatcher = CommandDispatcher::new(root, cli.config.clone());
    match dispatcher.dispatch(&cli) {
        Ok(result) => ExitCode::from(result.exit_code as u8),
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            ExitCode::from(1)
        }
    }
}
