use clap::Parser;
use log::{error, info, warn};
use rustsyncer::daemon::config::{default_config_path, default_log_path, Config, ConfigFile};
use rustsyncer::daemon::context::{ShutdownHandle, SyncContext};
use rustsyncer::daemon::engine::SyncEngine;
use rustsyncer::daemon::git_ops::GitRunner;
use rustsyncer::daemon::logging;
use rustsyncer::daemon::notify::LogSink;
use rustsyncer::daemon::watcher;
use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

/// Keep git working directories pulled, committed and pushed on a schedule.
#[derive(Parser)]
struct Cli {
    /// Path to config TOML (default: <config dir>/rustsyncer/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Pull every repository with auto_pull enabled once, then exit
    #[arg(long, conflicts_with = "commit_push_on_exit")]
    pull_on_login: bool,
    /// Commit and push every repository with those enabled once, then exit
    #[arg(long)]
    commit_push_on_exit: bool,
    /// Seconds between scheduler ticks, overrides the config file
    #[arg(long)]
    poll_interval: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Cli::parse();
    logging::init(default_log_path().ok().as_deref());

    let config_path = match args.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    info!("Using configuration {}", config_path.display());

    let settings = match Config::load_config(&config_path) {
        Ok(config) => config.daemon,
        Err(error) => {
            warn!("{error}. Starting with default daemon settings.");
            Default::default()
        }
    };

    let (ctx, shutdown) = SyncContext::new();
    let ctx = ctx.with_ssh_auth_sock(settings.ssh_auth_sock.clone());
    let runner = GitRunner::new(&settings.git_program);
    let mut engine = SyncEngine::new(runner, ConfigFile::new(&config_path), LogSink)
        .with_timeouts(settings.timeouts());

    if args.pull_on_login {
        info!("rustsyncer started in --pull-on-login mode.");
        watcher::pull_all_once(&mut engine, &ctx).await;
        return Ok(());
    }
    if args.commit_push_on_exit {
        info!("rustsyncer started in --commit-push-on-exit mode.");
        watcher::commit_push_all_once(&mut engine, &ctx).await;
        return Ok(());
    }

    tokio::spawn(forward_signals(shutdown));

    let poll_interval = args
        .poll_interval
        .map(|secs| Duration::from_secs(secs.max(1)))
        .unwrap_or_else(|| settings.poll_interval());
    watcher::watch_repos(&mut engine, &ctx, poll_interval).await;
    Ok(())
}

/// Turn SIGINT/SIGTERM into a shutdown request. Keeps the handle alive until then.
async fn forward_signals(shutdown: ShutdownHandle) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Received SIGINT."),
                    _ = terminate.recv() => info!("Received SIGTERM."),
                }
            }
            Err(error) => {
                error!("Could not listen for SIGTERM: {error}");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received Ctrl-C.");
    }

    info!("Shutting down rustsyncer gracefully...");
    shutdown.request_shutdown();
}
