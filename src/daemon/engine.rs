use super::auth::is_missing_upstream;
use super::config::{ConfigSource, GlobalOverrides, Timeouts};
use super::context::SyncContext;
use super::errors::FailureKind;
use super::git_ops::{CommandOutcome, CommandRunner};
use super::notify::{Disposition, NotificationSink, OperationReport};
use super::repo_config::{OperationKind, RepositoryConfig};
use super::store::RepositoryStore;
use super::upstream::{self, UpstreamState};
use chrono::{DateTime, Local};
use log::{debug, info, warn};

/// Counts for one pass over the repositories.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    /// Only operations whose interval elapsed.
    Schedule,
    /// Every enabled, unpaused operation regardless of its interval.
    Forced,
}

/// Decides when each repository is pulled, committed and pushed, runs the
/// operation and keeps the last-success bookkeeping.
pub struct SyncEngine<R> {
    runner: R,
    source: Box<dyn ConfigSource + Send + Sync>,
    sink: Box<dyn NotificationSink + Send + Sync>,
    store: RepositoryStore,
    overrides: GlobalOverrides,
    timeouts: Timeouts,
}

impl<R: CommandRunner> SyncEngine<R> {
    pub fn new(
        runner: R,
        source: impl ConfigSource + Send + Sync + 'static,
        sink: impl NotificationSink + Send + Sync + 'static,
    ) -> Self {
        Self {
            runner,
            source: Box::new(source),
            sink: Box::new(sink),
            store: RepositoryStore::new(),
            overrides: GlobalOverrides::default(),
            timeouts: Timeouts::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn store(&self) -> &RepositoryStore {
        &self.store
    }

    pub fn overrides(&self) -> GlobalOverrides {
        self.overrides
    }

    /// Re-read settings and overrides. A failed read keeps the previous
    /// snapshot; the next tick tries again.
    pub fn reload(&mut self) {
        match self.source.load() {
            Ok(config) => {
                self.overrides = config.overrides;
                self.store.merge(config.repos);
            }
            Err(error) => {
                warn!("Could not reload configuration, keeping previous settings: {error}")
            }
        }
    }

    pub async fn tick(&mut self, ctx: &SyncContext) -> TickSummary {
        self.tick_at(ctx, Local::now()).await
    }

    /// One scheduling pass with `now` as the current time.
    pub async fn tick_at(&mut self, ctx: &SyncContext, now: DateTime<Local>) -> TickSummary {
        self.reload();
        self.process(ctx, now, &OperationKind::ALL, Trigger::Schedule).await
    }

    /// Run `kinds` for every repository that has them enabled, without
    /// waiting for their intervals. Global pauses still apply.
    pub async fn run_now(&mut self, ctx: &SyncContext, kinds: &[OperationKind]) -> TickSummary {
        self.reload();
        self.process(ctx, Local::now(), kinds, Trigger::Forced).await
    }

    async fn process(
        &mut self,
        ctx: &SyncContext,
        now: DateTime<Local>,
        kinds: &[OperationKind],
        trigger: Trigger,
    ) -> TickSummary {
        let mut summary = TickSummary::default();
        if self.store.is_empty() {
            info!("No repositories configured. Waiting for configuration...");
            return summary;
        }

        let kinds: Vec<OperationKind> =
            OperationKind::ALL.into_iter().filter(|kind| kinds.contains(kind)).collect();

        for repo in self.store.iter_mut() {
            for &kind in &kinds {
                if !should_run(repo, kind, &self.overrides, now, trigger) {
                    continue;
                }

                summary.attempted += 1;
                let report = execute(&self.runner, &self.timeouts, ctx, repo, kind, now).await;

                if report.disposition == Disposition::Completed {
                    repo.operation_mut(kind).record_success(now);
                }
                if report.success() {
                    summary.succeeded += 1;
                } else {
                    summary.failed += 1;
                }
                self.sink.notify(&report);

                if report.failure() == Some(FailureKind::InvalidTarget) {
                    warn!("Skipping remaining operations for {} this tick", repo.path.display());
                    break;
                }
            }
        }

        summary
    }
}

fn should_run(
    repo: &RepositoryConfig,
    kind: OperationKind,
    overrides: &GlobalOverrides,
    now: DateTime<Local>,
    trigger: Trigger,
) -> bool {
    let operation = repo.operation(kind);
    if !operation.enabled() {
        debug!("Auto-{kind} is disabled for {}.", repo.path.display());
        return false;
    }
    if overrides.is_paused(kind) {
        debug!("{kind} is paused globally, skipping {}.", repo.path.display());
        return false;
    }
    if trigger == Trigger::Forced {
        return true;
    }
    if !operation.is_elapsed(now) {
        debug!(
            "Repository {} not due for {kind} yet. Next {kind} in {}s.",
            repo.path.display(),
            operation.remaining_secs(now)
        );
        return false;
    }

    match operation.last_success() {
        Some(last) => info!(
            "Repository {} is due for a {kind} (last success {last}).",
            repo.path.display()
        ),
        None => info!(
            "Repository {} is due for a {kind} (never succeeded).",
            repo.path.display()
        ),
    }
    true
}

async fn execute<R: CommandRunner>(
    runner: &R,
    timeouts: &Timeouts,
    ctx: &SyncContext,
    repo: &RepositoryConfig,
    kind: OperationKind,
    now: DateTime<Local>,
) -> OperationReport {
    let (disposition, message) = match kind {
        OperationKind::Pull => {
            settle(runner.run(&repo.path, &["pull"], timeouts.command, ctx).await)
        }
        OperationKind::Commit => commit(runner, timeouts, ctx, repo, now).await,
        OperationKind::Push => push(runner, timeouts, ctx, repo).await,
    };

    OperationReport { repository: repo.path.clone(), operation: kind, disposition, message }
}

fn settle(outcome: CommandOutcome) -> (Disposition, String) {
    if outcome.succeeded {
        return (Disposition::Completed, outcome.output);
    }
    let kind = outcome.failure.unwrap_or(FailureKind::CommandFailed);
    (Disposition::Failed(kind), outcome.output)
}

/// Stage and commit everything, or report a no-op on a clean tree.
async fn commit<R: CommandRunner>(
    runner: &R,
    timeouts: &Timeouts,
    ctx: &SyncContext,
    repo: &RepositoryConfig,
    now: DateTime<Local>,
) -> (Disposition, String) {
    let path = &repo.path;

    let status = runner.run(path, &["status", "--porcelain"], timeouts.status, ctx).await;
    if !status.succeeded {
        let (disposition, output) = settle(status);
        return (disposition, format!("Failed to get status: {output}"));
    }
    if status.output.trim().is_empty() {
        info!("No changes to commit in {}. Skipping commit.", path.display());
        return (Disposition::NoChanges, "No changes to commit".to_string());
    }

    info!("Staging changes in {}...", path.display());
    let staged = runner.run(path, &["add", "--all"], timeouts.command, ctx).await;
    if !staged.succeeded {
        let (disposition, output) = settle(staged);
        return (disposition, format!("Failed to stage changes: {output}"));
    }

    let message = repo.commit_message(now);
    info!("Committing {} with message: '{message}'", path.display());
    settle(runner.run(path, &["commit", "-m", message.as_str()], timeouts.command, ctx).await)
}

/// Push unless the branch has nowhere to go; that decision belongs to the
/// operator, not to the scheduler.
async fn push<R: CommandRunner>(
    runner: &R,
    timeouts: &Timeouts,
    ctx: &SyncContext,
    repo: &RepositoryConfig,
) -> (Disposition, String) {
    let path = &repo.path;

    match upstream::inspect(path) {
        Ok(UpstreamState::Missing { branch }) => {
            return (
                Disposition::Failed(FailureKind::NoUpstream),
                format!("Branch '{branch}' has no upstream branch configured"),
            );
        }
        Ok(state) => debug!("Upstream of {}: {state:?}", path.display()),
        Err(error) => debug!("Could not inspect upstream of {}: {error}", path.display()),
    }

    let outcome = runner.run(path, &["push"], timeouts.command, ctx).await;
    if !outcome.succeeded && !outcome.is_auth_error && is_missing_upstream(&outcome.output) {
        return (Disposition::Failed(FailureKind::NoUpstream), outcome.output);
    }
    settle(outcome)
}
