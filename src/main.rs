//! jobfill - autofill orchestration for job-application forms.
//!
//! Main entry point for the jobfill CLI.

mod app;
mod cli;
mod cmd_cache;
mod cmd_fill;

use clap::Parser;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use jobfill_config::Config;
use jobfill_pipeline::RunOptions;

use crate::app::{App, AppResult};
use crate::cli::{Cli, Commands};

/// Initialize tracing with console and file output.
///
/// Log files are written to ~/.jobfill/logs/ with daily rotation.
fn init_tracing() -> AppResult<()> {
    let log_dir = Config::logs_dir();
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("jobfill")
        .filename_suffix("log")
        .max_log_files(14)
        .build(&log_dir)?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Flushes the file writer on exit.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> AppResult<()> {
    init_tracing()?;

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(Config::default_path);
    let app = App::open(&config_path).await?;

    match cli.command {
        Commands::Fill {
            tab,
            url,
            scope,
            ats,
            json,
        } => cmd_fill::fill(&app, &tab, RunOptions { page_url: url, scope, ats }, json).await,
        Commands::Feedback { file } => cmd_fill::feedback(&app, &file).await,
        Commands::Cache { action } => cmd_cache::handle_cache_command(&app, action).await,
        Commands::Token { action } => cmd_cache::handle_token_command(&app, action).await,
        Commands::Resume { action } => cmd_cache::handle_resume_command(&app, action).await,
    }
}
