//! CLI surface for cadence.
//!
//! Flags are the top config layer: they are folded into the loaded `Config` and the
//! result is turned into plain settings before any stage runs.

use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::Result;
use crate::config::{self, Config};

mod commands;
mod render;

#[derive(Parser, Debug)]
#[command(
    name = "cadence",
    version,
    about = "Paint a contribution calendar with backdated commits",
    arg_required_else_help = true
)]
pub struct Cli {
    /// Machine-readable JSON output.
    #[arg(long, global = true)]
    pub json: bool,

    /// Extra config file, applied after the user and project files.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// More log output (repeat for more).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate, commit and push a plan.
    Run(RunArgs),

    /// Validate a plan and print its commit summary. Touches no repository.
    #[command(alias = "check")]
    Plan(PlanArgs),

    /// Show how much of a plan the repository already holds.
    Status(StatusArgs),

    /// Push an already applied plan.
    Publish(PublishArgs),

    /// Print the effective configuration.
    Config(ConfigArgs),
}

/// The plan file and the date its week 0 starts on.
#[derive(Args, Debug, Clone)]
pub struct PlanInput {
    /// Plan file (`<date|week:day> <intensity>` per line).
    #[arg(long, value_name = "FILE")]
    pub plan: PathBuf,

    /// First day of week 0 (YYYY-MM-DD or DD/MM/YYYY).
    #[arg(long, value_name = "DATE")]
    pub anchor: String,

    /// Keep dates after today.
    #[arg(long)]
    pub allow_future: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RepoArgs {
    /// Working repository (default: a workspace named after the remote).
    #[arg(long, value_name = "PATH")]
    pub repo: Option<PathBuf>,

    /// Remote URL to push to.
    #[arg(long, value_name = "URL")]
    pub remote: Option<String>,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub input: PlanInput,

    #[command(flatten)]
    pub repo: RepoArgs,

    /// Commit author email.
    #[arg(long, value_name = "EMAIL")]
    pub email: Option<String>,

    /// Commit author name (default: the email's local part).
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    /// Commit locally without pushing.
    #[arg(long)]
    pub no_push: bool,
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub input: PlanInput,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub input: PlanInput,

    #[command(flatten)]
    pub repo: RepoArgs,
}

#[derive(Args, Debug)]
pub struct PublishArgs {
    #[command(flatten)]
    pub input: PlanInput,

    #[command(flatten)]
    pub repo: RepoArgs,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Also write the effective config to FILE (default: the user config path).
    #[arg(long, value_name = "FILE", num_args = 0..=1)]
    pub write: Option<Option<PathBuf>>,
}

/// Parse CLI from raw args.
pub fn parse_from<I, T>(args: I) -> Cli
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Cli::parse_from(args)
}

/// Run the CLI (used by bin). `cancel` is raised by SIGINT/SIGTERM.
pub fn run(cli: Cli, cancel: Arc<AtomicBool>) -> Result<()> {
    let config = config::load(cli.config.as_deref())?;
    let ctx = Ctx {
        config,
        json: cli.json,
        cancel,
    };

    match cli.command {
        Commands::Run(args) => commands::run::handle(&ctx, args),
        Commands::Plan(args) => commands::plan::handle(&ctx, args),
        Commands::Status(args) => commands::status::handle(&ctx, args),
        Commands::Publish(args) => commands::publish::handle(&ctx, args),
        Commands::Config(args) => commands::config::handle(&ctx, args),
    }
}

struct Ctx {
    config: Config,
    json: bool,
    cancel: Arc<AtomicBool>,
}

impl Ctx {
    /// Loaded config with the shared flags folded in.
    fn config_with(&self, input: &PlanInput, repo: &RepoArgs) -> Config {
        let mut config = self.config.clone();
        if input.allow_future {
            config.calendar.allow_future_dates = true;
        }
        if let Some(path) = &repo.repo {
            config.repository.path = Some(absolute(path));
        }
        if let Some(url) = &repo.remote {
            config.repository.remote_url = Some(url.clone());
        }
        config
    }
}

fn absolute(path: &std::path::Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

fn print_output(ctx: &Ctx, human: impl FnOnce() -> String, json: serde_json::Value) {
    let out = if ctx.json {
        serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string())
    } else {
        human()
    };

    let mut stdout = std::io::stdout().lock();
    if let Err(e) = writeln!(stdout, "{out}")
        && e.kind() != std::io::ErrorKind::BrokenPipe
    {
        tracing::warn!("failed to write output: {e}");
    }
}
