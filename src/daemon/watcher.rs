use super::context::SyncContext;
use super::engine::SyncEngine;
use super::git_ops::CommandRunner;
use super::repo_config::OperationKind;
use chrono::Local;
use log::{debug, info};
use std::time::Duration;
use tokio::time;

/// Tick `engine` every `poll_interval` until shutdown is requested.
///
/// A tick that is already running is allowed to finish; shutdown only stops
/// the next one from starting. Returns the number of ticks run.
pub async fn watch_repos<R: CommandRunner>(
    engine: &mut SyncEngine<R>,
    ctx: &SyncContext,
    poll_interval: Duration,
) -> usize {
    info!("rustsyncer periodic service started at {}", Local::now());
    let mut ticks = 0;

    while !ctx.is_shutdown() {
        let summary = engine.tick(ctx).await;
        ticks += 1;
        debug!(
            "Tick {ticks}: {} attempted, {} succeeded, {} failed",
            summary.attempted, summary.succeeded, summary.failed
        );

        tokio::select! {
            _ = time::sleep(poll_interval) => {}
            _ = ctx.shutdown_requested() => {}
        }
    }

    info!("rustsyncer periodic service finished at {}", Local::now());
    ticks
}

/// Pull every repository with pulling enabled, once.
pub async fn pull_all_once<R: CommandRunner>(engine: &mut SyncEngine<R>, ctx: &SyncContext) {
    info!("Initiating one-shot pull for all enabled repositories.");
    let summary = engine.run_now(ctx, &[OperationKind::Pull]).await;
    info!(
        "One-shot pull completed: {} succeeded, {} failed.",
        summary.succeeded, summary.failed
    );
}

/// Commit then push every repository with those operations enabled, once.
pub async fn commit_push_all_once<R: CommandRunner>(
    engine: &mut SyncEngine<R>,
    ctx: &SyncContext,
) {
    info!("Initiating one-shot commit and push for all enabled repositories.");
    let summary = engine.run_now(ctx, &[OperationKind::Commit, OperationKind::Push]).await;
    info!(
        "One-shot commit and push completed: {} succeeded, {} failed.",
        summary.succeeded, summary.failed
    );
}
