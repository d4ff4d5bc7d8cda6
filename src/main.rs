//! auto-commit - CLI entry point.

use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use auto_commit::config::{CliOverrides, config_dir};
use auto_commit::git::SystemGit;
use auto_commit::workflow::{RunOutcome, Workflow, run_checks};
use auto_commit::{BackendKind, Language, Settings, TemplateStore};

/// Generate a commit message for the pending changes with Claude Code or Codex.
#[derive(Parser, Debug)]
#[command(name = "auto-commit")]
#[command(about = "Generate a commit message for the pending changes with Claude Code or Codex")]
#[command(version)]
struct Cli {
    /// Message language (zh, en, ja)
    #[arg(short, long)]
    language: Option<Language>,

    /// Include emojis
    #[arg(short, long)]
    emoji: bool,

    /// Do not include emojis
    #[arg(long, conflicts_with = "emoji")]
    no_emoji: bool,

    /// Use Conventional Commits
    #[arg(short, long)]
    conventional: bool,

    /// Conventional Commits type to enforce (implies --conventional)
    #[arg(short = 't', long = "type")]
    commit_type: Option<String>,

    /// Generate and show the message without committing
    #[arg(short, long)]
    dry_run: bool,

    /// Print phase timings and recent history
    #[arg(short, long)]
    verbose: bool,

    /// Push to origin after committing
    #[arg(short, long)]
    push: bool,

    /// Use a saved template instead of generating
    #[arg(long, value_name = "NAME")]
    template: Option<String>,

    /// Save the message as a template (dry run only)
    #[arg(long, value_name = "NAME")]
    save_template: Option<String>,

    /// List saved templates and exit
    #[arg(long)]
    list_templates: bool,

    /// Generation backend (claude, codex)
    #[arg(long, conflicts_with_all = ["claude", "codex"])]
    provider: Option<BackendKind>,

    /// Shorthand for --provider claude
    #[arg(long, conflicts_with = "codex")]
    claude: bool,

    /// Shorthand for --provider codex
    #[arg(long)]
    codex: bool,

    /// Model passed to the backend
    #[arg(long, alias = "codex-model")]
    model: Option<String>,

    /// Total generation attempts
    #[arg(long)]
    max_retries: Option<u32>,

    /// Per-attempt timeout in milliseconds
    #[arg(long, value_name = "MS")]
    timeout: Option<u64>,

    /// Do not append the signature line
    #[arg(long)]
    no_signature: bool,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        let backend = match (self.provider, self.claude, self.codex) {
            (Some(kind), _, _) => Some(kind),
            (None, true, _) => Some(BackendKind::Claude),
            (None, _, true) => Some(BackendKind::Codex),
            (None, false, false) => None,
        };

        CliOverrides {
            language: self.language,
            emoji: match (self.emoji, self.no_emoji) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            },
            conventional: self.conventional,
            commit_type: self.commit_type.clone(),
            dry_run: self.dry_run,
            verbose: self.verbose,
            push: self.push,
            template_name: self.template.clone(),
            save_template: self.save_template.clone(),
            backend,
            model: self.model.clone(),
            max_retries: self.max_retries,
            timeout_ms: self.timeout,
            no_signature: self.no_signature,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.list_templates {
        return match list_templates() {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error: {e:#}");
                ExitCode::FAILURE
            }
        };
    }

    let settings = match Settings::load(cli.overrides()).context("Failed to load configuration") {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    match run(&settings).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error (trace_id={}): {e:#}", settings.run.trace_id);
            ExitCode::FAILURE
        }
    }
}

async fn run(settings: &Settings) -> Result<RunOutcome> {
    println!(
        "auto-commit v{} ({}, trace_id={})",
        env!("CARGO_PKG_VERSION"),
        settings.generation.backend,
        settings.run.trace_id
    );

    let cwd = std::env::current_dir().context("Failed to resolve the current directory")?;

    let start = Instant::now();
    let preflight = run_checks(&cwd, &settings.generation).await?;
    if settings.run.verbose {
        println!(
            "Git & provider check: {:.2}ms",
            start.elapsed().as_secs_f64() * 1000.0
        );
    }

    let git = SystemGit::new();
    let templates = TemplateStore::in_config_dir(&config_dir()?);

    let outcome = Workflow::new(&git, preflight.backend.as_ref(), templates, settings)
        .run()
        .await?;
    Ok(outcome)
}

fn list_templates() -> Result<()> {
    let store = TemplateStore::in_config_dir(&config_dir()?);
    let names = store.list()?;

    println!("Available templates:");
    if names.is_empty() {
        println!("  No templates found");
    } else {
        for name in names {
            println!("  - {name}");
        }
    }
    Ok(())
}

/// Log to stderr. `RUST_LOG` wins; otherwise warnings, or debug output for
/// this crate with `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "warn,auto_commit=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
