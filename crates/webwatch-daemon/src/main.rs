use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{info, warn};
use webwatch_core::WebwatchConfig;
use webwatch_scheduler::CronScheduler;

mod app;

/// Watches web content on a schedule and reports what changed.
#[derive(Debug, Parser)]
#[command(name = "webwatch", version)]
struct Cli {
    /// Settings file (TOML). Defaults to ~/.webwatch/webwatch.toml.
    #[arg(long, global = true, env = "WEBWATCH_SETTINGS")]
    settings: Option<String>,

    /// Debug-level, human-readable log output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate the jobs and run them on their schedules until interrupted.
    Watch { jobs_file: PathBuf },
    /// Run every job once, in order, stopping at the first failure.
    Run { jobs_file: PathBuf },
    /// Validate the jobs document and exit.
    Check { jobs_file: PathBuf },
    /// Delete the stored values of one job.
    Forget { jobs_file: PathBuf, job_name: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = WebwatchConfig::load(cli.settings.as_deref())?;
    init_tracing(cli.verbose || config.verbose);

    match cli.command {
        Command::Check { jobs_file } => {
            let watcher = app::build_watcher(&config, &jobs_file, app::scratch_store())?;
            watcher.check_config()?;
            info!(jobs = watcher.jobs().len(), "configuration is valid");
        }
        Command::Run { jobs_file } => {
            let watcher = app::build_watcher(&config, &jobs_file, app::open_store(&config)?)?;
            watcher.check_config()?;
            let reports = watcher.run_now().await?;
            info!(jobs = reports.len(), "all jobs ran");
        }
        Command::Forget {
            jobs_file,
            job_name,
        } => {
            let watcher = app::build_watcher(&config, &jobs_file, app::open_store(&config)?)?;
            watcher.forget(&job_name)?;
        }
        Command::Watch { jobs_file } => {
            let store = app::open_store(&config)?;
            let watcher = Arc::new(app::build_watcher(&config, &jobs_file, store)?);
            watcher.check_config()?;

            let mut scheduler = CronScheduler::new();
            watcher.register_cron_jobs(&mut scheduler)?;

            let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
            let engine = tokio::spawn(scheduler.run(shutdown_rx));
            info!(jobs = watcher.jobs().len(), "webwatch started");

            shutdown_signal().await;
            info!("shutdown requested; letting running jobs finish");
            let _ = shutdown_tx.send(true);
            engine.await?;
        }
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "webwatch=debug" } else { "webwatch=info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    if verbose {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_subcommands() {
        let cli = Cli::try_parse_from(["webwatch", "watch", "jobs.json"]).unwrap();
        assert!(matches!(cli.command, Command::Watch { ref jobs_file } if jobs_file.ends_with("jobs.json")));
        assert!(!cli.verbose);

        let cli = Cli::try_parse_from([
            "webwatch",
            "forget",
            "jobs.yaml",
            "Price Check",
            "--verbose",
            "--settings",
            "/etc/webwatch.toml",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.settings.as_deref(), Some("/etc/webwatch.toml"));
        assert!(matches!(cli.command, Command::Forget { ref job_name, .. } if job_name == "Price Check"));
    }

    #[test]
    fn jobs_file_is_required() {
        assert!(Cli::try_parse_from(["webwatch", "run"]).is_err());
    }
}
