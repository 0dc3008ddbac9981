use anyhow::Context;
use clap::{Parser, Subcommand};
use configuration::{DatabaseSettings, LogFormat, Settings};
use database::PgConnector;
use engine::{Driver, DriverOptions};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::process::ExitCode;

mod summary;

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine; the variables may already be set.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut settings = match configuration::load_settings(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(format) = cli.log_format {
        settings.logging.format = format;
    }
    let _log_guard = configuration::init_tracing(&settings.logging);

    match run(cli.command, &settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Applies a SQL bootstrap script to PostgreSQL, statement by statement, and
/// reports what exists afterwards.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML settings file (defaults to ./bootstrap.toml when present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Console log format.
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply the script, then verify the resulting schema.
    Apply(ApplyArgs),
    /// Drop every configured table and view, in dependency order.
    Teardown(TeardownArgs),
    /// Split the script and list its statements without connecting.
    Plan(PlanArgs),
}

#[derive(Parser)]
struct ApplyArgs {
    /// Script to apply instead of the configured `script.path`.
    #[arg(long)]
    script: Option<PathBuf>,

    /// Show a progress bar while statements run.
    #[arg(long)]
    progress: bool,
}

#[derive(Parser)]
struct TeardownArgs {
    /// Confirm that all configured objects and their data should be dropped.
    #[arg(long)]
    yes: bool,
}

#[derive(Parser)]
struct PlanArgs {
    /// Script to split instead of the configured `script.path`.
    #[arg(long)]
    script: Option<PathBuf>,
}

// ==============================================================================
// Command Handlers
// ==============================================================================

async fn run(command: Commands, settings: &Settings) -> anyhow::Result<()> {
    match command {
        Commands::Apply(args) => handle_apply(args, settings).await,
        Commands::Teardown(args) => handle_teardown(args, settings).await,
        Commands::Plan(args) => handle_plan(args, settings).await,
    }
}

async fn handle_apply(args: ApplyArgs, settings: &Settings) -> anyhow::Result<()> {
    let driver = build_driver(settings, args.script)?;
    tracing::info!(script = %driver.options().script_path.display(), "Starting apply");

    let report = if args.progress {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("#>-"),
        );
        let result = driver
            .apply_with(|outcome, total| {
                bar.set_length(total as u64);
                bar.set_message(outcome.status.to_string());
                bar.inc(1);
            })
            .await;
        bar.finish_and_clear();
        result?
    } else {
        driver.apply().await?
    };

    println!("{}", summary::format_apply(&report));
    if report.counts.unexpected_failures > 0 {
        tracing::warn!(
            count = report.counts.unexpected_failures,
            "Some statements failed unexpectedly; review them before re-running"
        );
    }
    Ok(())
}

async fn handle_teardown(args: TeardownArgs, settings: &Settings) -> anyhow::Result<()> {
    tracing::warn!("Teardown drops all configured tables and views together with their data");
    if !args.yes {
        anyhow::bail!("teardown not confirmed; re-run with --yes to drop the schema objects");
    }

    let report = build_driver(settings, None)?.teardown().await?;
    println!("{}", summary::format_teardown(&report));
    Ok(())
}

async fn handle_plan(args: PlanArgs, settings: &Settings) -> anyhow::Result<()> {
    let path = args.script.unwrap_or_else(|| settings.script.path.clone());
    let statements = engine::plan_script(&path).await?;
    tracing::info!(path = %path.display(), statements = statements.len(), "Script split");
    println!("{}", summary::format_plan(&statements));
    Ok(())
}

fn build_driver(
    settings: &Settings,
    script: Option<PathBuf>,
) -> anyhow::Result<Driver<PgConnector>> {
    log_database_settings(&settings.database);
    let connector =
        PgConnector::from_settings(&settings.database, settings.execution.statement_timeout())
            .context("Invalid database settings")?;
    let mut options = DriverOptions::from_settings(settings)?;
    if let Some(path) = script {
        options = options.with_script_path(path);
    }
    Ok(Driver::new(connector, options))
}

fn log_database_settings(database: &DatabaseSettings) {
    tracing::info!(
        host = %database.host,
        port = database.port,
        user = %database.user,
        database = %database.name,
        schema = %database.schema,
        from_url = database.url.is_some(),
        "Database configuration (password redacted)"
    );
}
