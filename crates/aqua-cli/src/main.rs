use anyhow::{Context, Result};
use aqua_cli::commands::{cmd_credentials, cmd_log, cmd_run, cmd_verify, RunArgs};
use aqua_cli::config::AquaConfig;
use clap::{Parser, Subcommand};
use std::env;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Aqua CLI entry point. Without a subcommand, runs the notarization pipeline.
#[derive(Parser, Debug)]
#[command(name = "aqua", author = "Aqua Contributors", version)]
struct Cli {
    /// Path to an `aqua.toml` config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create, verify, sign and persist a genesis revision of a document.
    Run(RunArgs),
    /// Verify a persisted aqua tree against documents on disk.
    Verify {
        /// Path to the `.aqua.json` tree
        tree: PathBuf,
        /// Documents referenced by the tree
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Display an aqua tree in human-readable format.
    Log {
        /// Path to the `.aqua.json` tree
        tree: PathBuf,
    },
    /// Generate new signing credentials.
    Credentials {
        /// Write the credentials JSON here instead of printing it
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    if cli.no_color {
        colored::control::set_override(false);
    }

    match cli.command {
        Some(Commands::Run(args)) => handle_run(cli.config, args),
        None => handle_run(cli.config, RunArgs::default()),
        Some(Commands::Verify { tree, files }) => cmd_verify(tree, files),
        Some(Commands::Log { tree }) => cmd_log(tree),
        Some(Commands::Credentials { output }) => cmd_credentials(output),
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn handle_run(config_path: Option<PathBuf>, args: RunArgs) -> Result<()> {
    let cwd = env::current_dir().context("failed to resolve working directory")?;
    let mut config = AquaConfig::discover(config_path.as_deref(), &cwd)?;
    args.apply(&mut config);
    debug!(?config, "resolved configuration");

    // Stage failures are reported by the runner; only unhandled errors exit non-zero.
    cmd_run(&config)?;
    Ok(())
}
