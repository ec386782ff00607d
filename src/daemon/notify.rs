use super::errors::FailureKind;
use super::repo_config::{display_name, OperationKind};
use log::{debug, error, info, warn};
use std::path::PathBuf;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Completed,
    /// Commit found a clean working tree.
    NoChanges,
    Failed(FailureKind),
}

/// Outcome of one attempted operation, as handed to whoever presents it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationReport {
    pub repository: PathBuf,
    pub operation: OperationKind,
    pub disposition: Disposition,
    pub message: String,
}

impl OperationReport {
    pub fn success(&self) -> bool {
        matches!(self.disposition, Disposition::Completed | Disposition::NoChanges)
    }

    pub fn is_auth_error(&self) -> bool {
        self.disposition == Disposition::Failed(FailureKind::AuthRequired)
    }

    pub fn needs_upstream(&self) -> bool {
        self.disposition == Disposition::Failed(FailureKind::NoUpstream)
    }

    pub fn failure(&self) -> Option<FailureKind> {
        match self.disposition {
            Disposition::Failed(kind) => Some(kind),
            _ => None,
        }
    }
}

pub trait NotificationSink {
    fn notify(&self, report: &OperationReport);
}

/// Writes reports to the log. Used when no UI is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, report: &OperationReport) {
        let name = display_name(&report.repository);
        let operation = report.operation;
        match report.disposition {
            Disposition::Completed => info!("{operation} complete for {name}"),
            Disposition::NoChanges => debug!("{operation} for {name}: {}", report.message),
            Disposition::Failed(FailureKind::AuthRequired) => error!(
                "{operation} failed for {name}: credentials missing or rejected, \
                 check the git credential or SSH key setup. {}",
                report.message
            ),
            Disposition::Failed(FailureKind::NoUpstream) => warn!(
                "{operation} skipped for {name}: {}. \
                 Set an upstream branch to enable automatic pushes.",
                report.message
            ),
            Disposition::Failed(kind) => {
                error!("{operation} failed for {name} ({kind}): {}", report.message)
            }
        }
    }
}

/// Forwards reports to an attached consumer such as a tray or desktop UI.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<OperationReport>,
}

impl ChannelSink {
    pub fn new(sender: mpsc::UnboundedSender<OperationReport>) -> Self {
        Self { sender }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<OperationReport>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&self, report: &OperationReport) {
        if self.sender.send(report.clone()).is_err() {
            debug!("Report receiver dropped, discarding {} report", report.operation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(disposition: Disposition) -> OperationReport {
        OperationReport {
            repository: PathBuf::from("/srv/notes"),
            operation: OperationKind::Push,
            disposition,
            message: String::new(),
        }
    }

    #[test]
    fn no_changes_counts_as_success() {
        assert!(report(Disposition::Completed).success());
        assert!(report(Disposition::NoChanges).success());
        assert!(!report(Disposition::Failed(FailureKind::Timeout)).success());
    }

    #[test]
    fn failure_flags_follow_kind() {
        let auth = report(Disposition::Failed(FailureKind::AuthRequired));
        assert!(auth.is_auth_error());
        assert!(!auth.needs_upstream());
        assert_eq!(auth.failure(), Some(FailureKind::AuthRequired));

        let upstream = report(Disposition::Failed(FailureKind::NoUpstream));
        assert!(upstream.needs_upstream());
        assert!(!upstream.is_auth_error());

        assert_eq!(report(Disposition::Completed).failure(), None);
    }

    #[test]
    fn channel_sink_forwards_reports() {
        let (sink, mut receiver) = ChannelSink::channel();
        sink.notify(&report(Disposition::Completed));

        assert_eq!(receiver.try_recv().expect("report"), report(Disposition::Completed));
    }

    #[test]
    fn channel_sink_tolerates_dropped_receiver() {
        let (sink, receiver) = ChannelSink::channel();
        drop(receiver);
        sink.notify(&report(Disposition::Completed));
    }
}
