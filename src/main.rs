use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use git_release::config;
use git_release::domain::BumpRequest;
use git_release::git::Git2Repository;
use git_release::resolver::{Resolver, StrictResolver};
use git_release::runner::ShellRunner;
use git_release::sequencer::{ReleaseRequest, Sequencer};
use git_release::ui;

#[derive(clap::Parser)]
#[command(
    name = "git-release",
    version,
    about = "Bump project versions, release the changelog, then commit, tag and push"
)]
struct Args {
    #[arg(help = "Version bump: patch, minor, major or an explicit X.Y.Z")]
    bump: Option<String>,

    #[arg(short, long, default_value = ".", help = "Project root directory")]
    path: PathBuf,

    #[arg(short, long, help = "Custom configuration file path")]
    config: Option<PathBuf>,

    #[arg(long, help = "Release even if the working tree has uncommitted changes")]
    allow_dirty: bool,

    #[arg(long, help = "Preview the release plan without making changes")]
    dry_run: bool,

    #[arg(long, help = "Create the commit and tag locally without pushing")]
    no_push: bool,

    #[arg(short, long, help = "Never prompt; abort on any ambiguity")]
    yes: bool,

    #[arg(long, help = "Print the result as JSON")]
    json: bool,

    #[arg(short, long, action = clap::ArgAction::Count, help = "Increase log verbosity")]
    verbose: u8,
}

fn init_tracing(args: &Args) {
    let filter = match args.verbose {
        0 => "warn",
        1 => "warn,git_release=info",
        2 => "info,git_release=debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_tracing(&args);

    let root = args
        .path
        .canonicalize()
        .with_context(|| format!("cannot access project root {}", args.path.display()))?;

    let config = match config::load_config(args.config.as_deref(), &root) {
        Ok(cfg) => cfg,
        Err(e) => {
            ui::display_error(&format!("Error loading config: {}", e));
            return Ok(ExitCode::FAILURE);
        }
    };

    let bump = match args.bump.as_deref().map(str::parse::<BumpRequest>).transpose() {
        Ok(bump) => bump,
        Err(e) => {
            ui::display_error(&e.to_string());
            return Ok(ExitCode::FAILURE);
        }
    };

    let repo = match Git2Repository::open(&root) {
        Ok(repo) => repo,
        Err(e) => {
            ui::display_error(&format!("Git repository error: {}", e));
            return Ok(ExitCode::FAILURE);
        }
    };

    let runner = ShellRunner::new().with_timeout(config.commands.timeout());

    // Prompts would interleave with JSON on stdout
    let mut resolver: Box<dyn Resolver> = if args.yes || args.json {
        Box::new(StrictResolver)
    } else {
        Box::new(ui::PromptResolver::stdin(&root))
    };

    let request = ReleaseRequest {
        bump,
        allow_dirty: args.allow_dirty,
        dry_run: args.dry_run,
        push: !args.no_push,
    };

    if !args.json {
        ui::display_status(&format!("Preparing release in {}", root.display()));
    }

    let outcome = Sequencer::new(&root, &config, &repo, &runner, resolver.as_mut()).run(&request);

    match outcome {
        Ok(summary) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                ui::display_summary(&root, &summary);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(failure) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&failure.report())?);
            } else {
                ui::display_failure(&root, &failure);
            }
            Ok(ExitCode::FAILURE)
        }
    }
}
