use chrono::{DateTime, Local, TimeDelta};
use std::fmt;
use std::path::{Path, PathBuf};

/// Smallest interval any operation may be scheduled at, in seconds.
pub const MIN_INTERVAL_SECS: u64 = 60;
/// Largest interval any operation may be scheduled at: one year, in seconds.
pub const MAX_INTERVAL_SECS: u64 = 365 * 24 * 60 * 60;

pub const DEFAULT_PULL_INTERVAL_SECS: u64 = 5 * 60;
pub const DEFAULT_COMMIT_INTERVAL_SECS: u64 = 60 * 60;
pub const DEFAULT_PUSH_INTERVAL_SECS: u64 = 60 * 60;

pub const DEFAULT_COMMIT_TEMPLATE: &str = "Auto-commit from rustsyncer: {timestamp}";

const TIMESTAMP_PLACEHOLDER: &str = "{timestamp}";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Pull,
    Commit,
    Push,
}

impl OperationKind {
    /// Per-repository execution order within a tick.
    pub const ALL: [OperationKind; 3] =
        [OperationKind::Pull, OperationKind::Commit, OperationKind::Push];

    pub fn default_interval_secs(self) -> u64 {
        match self {
            OperationKind::Pull => DEFAULT_PULL_INTERVAL_SECS,
            OperationKind::Commit => DEFAULT_COMMIT_INTERVAL_SECS,
            OperationKind::Push => DEFAULT_PUSH_INTERVAL_SECS,
        }
    }

    pub fn enabled_by_default(self) -> bool {
        matches!(self, OperationKind::Pull)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Pull => "pull",
            OperationKind::Commit => "commit",
            OperationKind::Push => "push",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Turn a caller-supplied interval into a usable one.
///
/// Non-positive values fall back to `default_secs`; the result always lies
/// within [`MIN_INTERVAL_SECS`]..=[`MAX_INTERVAL_SECS`].
pub fn clamp_interval_secs(requested: i64, default_secs: u64) -> u64 {
    let secs = if requested <= 0 { default_secs } else { requested as u64 };
    secs.clamp(MIN_INTERVAL_SECS, MAX_INTERVAL_SECS)
}

/// One schedulable operation of a repository: its settings plus the time it
/// last succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledOperation {
    enabled: bool,
    interval_secs: u64,
    last_success: Option<DateTime<Local>>,
}

impl ScheduledOperation {
    pub fn new(enabled: bool, interval_secs: i64, default_secs: u64) -> Self {
        Self {
            enabled,
            interval_secs: clamp_interval_secs(interval_secs, default_secs),
            last_success: None,
        }
    }

    fn with_defaults(kind: OperationKind) -> Self {
        Self {
            enabled: kind.enabled_by_default(),
            interval_secs: kind.default_interval_secs(),
            last_success: None,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_secs
    }

    /// `None` means the operation never succeeded.
    pub fn last_success(&self) -> Option<DateTime<Local>> {
        self.last_success
    }

    /// Whether enough time has passed since the last success. Ignores the
    /// enabled flag and global pauses.
    pub fn is_elapsed(&self, now: DateTime<Local>) -> bool {
        match self.last_success {
            None => true,
            Some(last) => now.signed_duration_since(last) >= self.interval(),
        }
    }

    /// Seconds left until the interval elapses, zero when already due.
    pub fn remaining_secs(&self, now: DateTime<Local>) -> i64 {
        match self.last_success {
            None => 0,
            Some(last) => {
                let elapsed = now.signed_duration_since(last).num_seconds();
                (self.interval_secs as i64).saturating_sub(elapsed).max(0)
            }
        }
    }

    fn interval(&self) -> TimeDelta {
        TimeDelta::try_seconds(self.interval_secs as i64).unwrap_or(TimeDelta::MAX)
    }

    pub(super) fn record_success(&mut self, at: DateTime<Local>) {
        self.last_success = Some(at);
    }

    pub(super) fn carry_last_success(&mut self, from: &ScheduledOperation) {
        self.last_success = from.last_success;
    }
}

/// Settings and scheduling state of one tracked working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryConfig {
    pub path: PathBuf,
    pub commit_message_template: String,
    pull: ScheduledOperation,
    commit: ScheduledOperation,
    push: ScheduledOperation,
}

impl RepositoryConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            commit_message_template: DEFAULT_COMMIT_TEMPLATE.to_string(),
            pull: ScheduledOperation::with_defaults(OperationKind::Pull),
            commit: ScheduledOperation::with_defaults(OperationKind::Commit),
            push: ScheduledOperation::with_defaults(OperationKind::Push),
        }
    }

    /// Configure one operation. `interval_secs` is clamped, see [`clamp_interval_secs`].
    pub fn with_operation(
        mut self,
        kind: OperationKind,
        enabled: bool,
        interval_secs: i64,
    ) -> Self {
        let last_success = self.operation(kind).last_success;
        let operation = self.operation_mut(kind);
        *operation = ScheduledOperation::new(enabled, interval_secs, kind.default_interval_secs());
        operation.last_success = last_success;
        self
    }

    pub fn with_commit_message_template(mut self, template: impl Into<String>) -> Self {
        self.commit_message_template = template.into();
        self
    }

    pub fn operation(&self, kind: OperationKind) -> &ScheduledOperation {
        match kind {
            OperationKind::Pull => &self.pull,
            OperationKind::Commit => &self.commit,
            OperationKind::Push => &self.push,
        }
    }

    pub(super) fn operation_mut(&mut self, kind: OperationKind) -> &mut ScheduledOperation {
        match kind {
            OperationKind::Pull => &mut self.pull,
            OperationKind::Commit => &mut self.commit,
            OperationKind::Push => &mut self.push,
        }
    }

    pub fn last_success(&self, kind: OperationKind) -> Option<DateTime<Local>> {
        self.operation(kind).last_success()
    }

    /// Short name for messages, the last path component.
    pub fn name(&self) -> String {
        display_name(&self.path)
    }

    pub fn commit_message(&self, now: DateTime<Local>) -> String {
        render_commit_message(&self.commit_message_template, now)
    }
}

pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Replace every `{timestamp}` in `template` with `now` as `YYYY-MM-DD HH:MM:SS`.
pub fn render_commit_message(template: &str, now: DateTime<Local>) -> String {
    template.replace(TIMESTAMP_PLACEHOLDER, &now.format(TIMESTAMP_FORMAT).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDateTime, TimeZone};

    fn at(text: &str) -> DateTime<Local> {
        let naive =
            NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT).expect("valid test timestamp");
        Local.from_local_datetime(&naive).earliest().expect("representable local time")
    }

    #[test]
    fn new_repository_uses_defaults() {
        let repo = RepositoryConfig::new("/srv/notes");

        assert!(repo.operation(OperationKind::Pull).enabled());
        assert!(!repo.operation(OperationKind::Commit).enabled());
        assert!(!repo.operation(OperationKind::Push).enabled());
        assert_eq!(repo.operation(OperationKind::Pull).interval_secs(), 300);
        assert_eq!(repo.operation(OperationKind::Push).interval_secs(), 3600);
        assert_eq!(repo.last_success(OperationKind::Commit), None);
        assert_eq!(repo.name(), "notes");
    }

    #[test]
    fn zero_and_negative_intervals_never_go_below_minimum() {
        assert_eq!(clamp_interval_secs(0, 300), 300);
        assert_eq!(clamp_interval_secs(-15, 300), 300);
        assert_eq!(clamp_interval_secs(-15, 10), MIN_INTERVAL_SECS);
        assert_eq!(clamp_interval_secs(5, 300), MIN_INTERVAL_SECS);
        assert_eq!(clamp_interval_secs(90, 300), 90);

        let repo =
            RepositoryConfig::new("/srv/notes").with_operation(OperationKind::Push, true, 0);
        assert!(repo.operation(OperationKind::Push).interval_secs() >= MIN_INTERVAL_SECS);
    }

    #[test]
    fn huge_intervals_are_capped_and_never_overflow() {
        assert_eq!(clamp_interval_secs(i64::MAX, 300), MAX_INTERVAL_SECS);

        let mut operation = ScheduledOperation::new(true, 60_000_000_000_000_000, 300);
        assert_eq!(operation.interval_secs(), MAX_INTERVAL_SECS);

        operation.record_success(at("2024-03-01 12:00:00"));
        assert!(!operation.is_elapsed(at("2024-03-02 12:00:00")));
        assert_eq!(
            operation.remaining_secs(at("2024-03-01 12:00:00")),
            MAX_INTERVAL_SECS as i64
        );
        assert!(operation.is_elapsed(at("2025-03-02 12:00:00")));
    }

    #[test]
    fn never_run_operation_is_elapsed() {
        let operation = ScheduledOperation::new(true, 60, 300);
        assert!(operation.is_elapsed(at("2024-03-01 12:00:00")));
        assert_eq!(operation.remaining_secs(at("2024-03-01 12:00:00")), 0);
    }

    #[test]
    fn elapsed_once_interval_has_passed_since_last_success() {
        let mut operation = ScheduledOperation::new(true, 60, 300);
        operation.record_success(at("2024-03-01 12:00:00"));

        assert!(!operation.is_elapsed(at("2024-03-01 12:00:59")));
        assert_eq!(operation.remaining_secs(at("2024-03-01 12:00:30")), 30);
        assert!(operation.is_elapsed(at("2024-03-01 12:01:00")));
        assert!(operation.is_elapsed(at("2024-03-01 12:01:01")));
    }

    #[test]
    fn reconfiguring_keeps_last_success() {
        let mut repo = RepositoryConfig::new("/srv/notes");
        repo.operation_mut(OperationKind::Pull).record_success(at("2024-03-01 12:00:00"));

        let repo = repo.with_operation(OperationKind::Pull, true, 600);
        assert_eq!(
            repo.last_success(OperationKind::Pull),
            Some(at("2024-03-01 12:00:00"))
        );
        assert_eq!(repo.operation(OperationKind::Pull).interval_secs(), 600);
    }

    #[test]
    fn commit_message_substitutes_every_placeholder() {
        let message = render_commit_message("Sync: {timestamp}", at("2024-03-01 08:05:09"));
        assert_eq!(message, "Sync: 2024-03-01 08:05:09");
        assert!(!message.contains("{timestamp}"));

        let stamp = message.trim_start_matches("Sync: ");
        assert!(NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).is_ok());

        let twice =
            render_commit_message("{timestamp} / {timestamp}", at("2024-03-01 08:05:09"));
        assert_eq!(twice, "2024-03-01 08:05:09 / 2024-03-01 08:05:09");
    }

    #[test]
    fn template_without_placeholder_is_used_verbatim() {
        assert_eq!(render_commit_message("wip", at("2024-03-01 08:05:09")), "wip");
    }

    #[test]
    fn operations_run_pull_commit_push() {
        assert_eq!(
            OperationKind::ALL,
            [OperationKind::Pull, OperationKind::Commit, OperationKind::Push]
        );
        assert_eq!(OperationKind::Commit.to_string(), "commit");
    }
}
