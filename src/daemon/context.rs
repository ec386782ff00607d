use std::path::{Path, PathBuf};
use tokio::sync::watch;

/// Everything a tick needs from its surroundings: the shutdown signal and the
/// auxiliary ssh-agent socket handed to git processes.
#[derive(Debug, Clone)]
pub struct SyncContext {
    shutdown: watch::Receiver<bool>,
    ssh_auth_sock: Option<PathBuf>,
}

/// Owner side of [`SyncContext`]'s shutdown signal.
#[derive(Debug)]
pub struct ShutdownHandle {
    sender: watch::Sender<bool>,
}

impl ShutdownHandle {
    pub fn request_shutdown(&self) {
        self.sender.send_replace(true);
    }
}

impl SyncContext {
    pub fn new() -> (Self, ShutdownHandle) {
        let (sender, shutdown) = watch::channel(false);
        let context = Self { shutdown, ssh_auth_sock: None };
        (context, ShutdownHandle { sender })
    }

    pub fn with_ssh_auth_sock(mut self, socket: Option<PathBuf>) -> Self {
        self.ssh_auth_sock = socket;
        self
    }

    pub fn ssh_auth_sock(&self) -> Option<&Path> {
        self.ssh_auth_sock.as_deref()
    }

    /// True once shutdown was requested or the handle was dropped.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.has_changed().is_err() || *self.shutdown.borrow()
    }

    /// Resolves once shutdown was requested or the handle was dropped.
    pub async fn shutdown_requested(&self) {
        let mut shutdown = self.shutdown.clone();
        // Err means the handle is gone, nobody can keep us running.
        let _ = shutdown.wait_for(|requested| *requested).await;
    }
}
