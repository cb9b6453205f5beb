//! CLI argument definitions.
//!
//! The main entry point is the [`Cli`] struct. With no subcommand the
//! binary behaves like `nightshift run`.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Nightshift - Resumable, unattended step orchestration.
#[derive(Debug, Parser)]
#[command(name = "nightshift")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Path to config file (overrides <ROOT>/.nightshift/config.yml)
    #[arg(short, long, global = true, env = "NIGHTSHIFT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Root to orchestrate when no subcommand is given
    #[arg(value_name = "ROOT")]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// The root named on the command line, for whichever command runs.
    pub fn target_root(&self) -> Option<&PathBuf> {
        match &self.command {
            Some(Commands::Run(args)) => args.root.as_ref().or(self.root.as_ref()),
            Some(Commands::Status(args)) => args.root.as_ref().or(self.root.as_ref()),
            _ => self.root.as_ref(),
        }
    }
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run or resume the step sequence (default if no command specified)
    Run(RunArgs),

    /// Show the saved progress snapshot
    Status(StatusArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the `run` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct RunArgs {
    /// Root to orchestrate (defaults to the current directory)
    #[arg(value_name = "ROOT")]
    pub root: Option<PathBuf>,
}

/// Arguments for the `status` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct StatusArgs {
    /// Root whose progress to show (defaults to the current directory)
    #[arg(value_name = "ROOT")]
    pub root: Option<PathBuf>,

    /// Print the raw snapshot as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `completions` command.
#[derive(Debug, Clone, clap::Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
