mod cmd;
mod console;
mod flags;
mod output;
mod root;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use pkgflow_core::config::{Config, WarnLevel};
use pkgflow_core::FlowError;
use std::ffi::OsString;
use std::io::{BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "pkgflow",
    about = "Run multi-step maintenance actions that can pause for manual work and resume later",
    version,
    after_help = "Actions and their flags come from pkgflow.yaml; see --list."
)]
struct Cli {
    /// Project root (default: auto-detect from pkgflow.yaml or .git/)
    #[arg(long, global = true, env = "PKGFLOW_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// More logging (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Resume the action in progress
    #[arg(short = 'c', long = "continue")]
    cont: bool,

    /// Discard the action in progress
    #[arg(long)]
    abort: bool,

    /// Show the action in progress
    #[arg(long)]
    status: bool,

    /// List the configured actions
    #[arg(long)]
    list: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// An action from pkgflow.yaml, followed by its flags
    #[command(external_subcommand)]
    Action(Vec<OsString>),
}

fn main() {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    if let Err(e) = run(cli, &root) {
        eprintln!("error: {e:#}");
        if let Some(FlowError::CorruptCheckpoint { path, .. }) = e.downcast_ref::<FlowError>() {
            offer_checkpoint_removal(path);
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli, root: &Path) -> anyhow::Result<()> {
    let modes = [cli.cont, cli.abort, cli.status, cli.list]
        .iter()
        .filter(|&&m| m)
        .count();
    if modes > 1 {
        anyhow::bail!("--continue, --abort, --status and --list are mutually exclusive");
    }
    if modes == 1 && cli.command.is_some() {
        anyhow::bail!("an action name cannot be combined with --continue, --abort, --status or --list");
    }

    let config = Config::load(root).context("failed to load pkgflow.yaml")?;
    for w in config.validate() {
        match w.level {
            WarnLevel::Error => tracing::error!("pkgflow.yaml: {}", w.message),
            WarnLevel::Warning => tracing::warn!("pkgflow.yaml: {}", w.message),
        }
    }

    if cli.cont {
        return cmd::resume::run(root, &config, cli.json);
    }
    if cli.abort {
        return cmd::abort::run(root, &config, cli.json);
    }
    if cli.status {
        return cmd::status::run(root, &config, cli.json);
    }
    if cli.list {
        return cmd::list::run(root, &config, cli.json);
    }

    match cli.command {
        Some(Commands::Action(argv)) => cmd::action::run(root, &config, argv, cli.json),
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    }
}

/// On an interactive terminal, offer to delete a checkpoint that no longer
/// parses. Otherwise point at `--abort`.
fn offer_checkpoint_removal(path: &Path) {
    if !std::io::stdin().is_terminal() {
        eprintln!("hint: run 'pkgflow --abort' to discard it");
        return;
    }

    eprint!("Delete {}? [y/N] ", path.display());
    let _ = std::io::stderr().flush();
    let mut answer = String::new();
    if std::io::stdin().lock().read_line(&mut answer).is_err() {
        return;
    }
    if matches!(answer.trim(), "y" | "Y" | "yes") {
        match std::fs::remove_file(path) {
            Ok(()) => eprintln!("Deleted {}.", path.display()),
            Err(e) => eprintln!("error: failed to delete {}: {e}", path.display()),
        }
    }
}
