use super::auth::is_auth_error;
use super::context::SyncContext;
use super::errors::FailureKind;
use git2::Repository;
use log::{error, info, warn};
use std::future::Future;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time;

/// Result of one external git invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub succeeded: bool,
    /// stdout on success, stderr (or stdout when stderr is empty) on failure
    pub output: String,
    pub is_auth_error: bool,
    pub failure: Option<FailureKind>,
}

impl CommandOutcome {
    pub fn success(output: impl Into<String>) -> Self {
        Self { succeeded: true, output: output.into(), is_auth_error: false, failure: None }
    }

    pub fn failure(kind: FailureKind, output: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            output: output.into(),
            is_auth_error: kind == FailureKind::AuthRequired,
            failure: Some(kind),
        }
    }

    /// Failure from a process that ran to completion; decides between a plain
    /// failure and an authentication problem from the error text.
    pub fn exited_with_error(output: impl Into<String>) -> Self {
        let output = output.into();
        let kind = if is_auth_error(&output) {
            FailureKind::AuthRequired
        } else {
            FailureKind::CommandFailed
        };
        Self::failure(kind, output)
    }
}

/// Runs git subcommands inside a working directory.
pub trait CommandRunner {
    fn run(
        &self,
        path: &Path,
        args: &[&str],
        timeout: Duration,
        ctx: &SyncContext,
    ) -> impl Future<Output = CommandOutcome> + Send;
}

/// Checks that `path` is a directory holding git metadata.
pub fn validate_target(path: &Path) -> Result<(), String> {
    if !path.is_dir() {
        return Err(format!("Not a directory: {}", path.display()));
    }
    // `.git` is a file in linked worktrees and submodules.
    if !path.join(".git").exists() {
        return Err(format!("Not a Git repository: {} (missing .git)", path.display()));
    }
    Ok(())
}

/// Value for `GIT_SSH_COMMAND` that makes ssh fail instead of prompting.
fn batch_ssh_command(existing: Option<String>) -> String {
    match existing {
        Some(command) if !command.trim().is_empty() => format!("{command} -o BatchMode=yes"),
        _ => "ssh -o BatchMode=yes".to_string(),
    }
}

/// The ssh command git would use in `path`: `GIT_SSH_COMMAND` first, then the
/// repository's `core.sshCommand`.
fn configured_ssh_command(path: &Path) -> Option<String> {
    if let Ok(command) = std::env::var("GIT_SSH_COMMAND") {
        if !command.trim().is_empty() {
            return Some(command);
        }
    }
    Repository::open(path)
        .and_then(|repository| repository.config())
        .and_then(|config| config.get_string("core.sshCommand"))
        .ok()
}

/// [`CommandRunner`] that spawns the real git executable, never interactively.
#[derive(Debug, Clone)]
pub struct GitRunner {
    program: String,
}

impl Default for GitRunner {
    fn default() -> Self {
        Self::new("git")
    }
}

impl GitRunner {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }

    fn command(&self, path: &Path, args: &[&str], ctx: &SyncContext) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(args)
            .current_dir(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("GIT_ASKPASS", "false")
            .env("SSH_ASKPASS", "false")
            .env("SSH_ASKPASS_REQUIRE", "never")
            .env("GCM_INTERACTIVE", "never")
            .env("GIT_SSH_COMMAND", batch_ssh_command(configured_ssh_command(path)));

        if let Some(socket) = ctx.ssh_auth_sock() {
            command.env("SSH_AUTH_SOCK", socket);
        }
        command
    }
}

impl CommandRunner for GitRunner {
    async fn run(
        &self,
        path: &Path,
        args: &[&str],
        timeout: Duration,
        ctx: &SyncContext,
    ) -> CommandOutcome {
        if let Err(message) = validate_target(path) {
            error!("{message}. Cannot run git command.");
            return CommandOutcome::failure(FailureKind::InvalidTarget, message);
        }

        let display = format!("{} {}", self.program, args.join(" "));
        info!("Executing '{display}' in {}", path.display());

        let child = match self.command(path, args, ctx).spawn() {
            Ok(child) => child,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                error!(
                    "{} not found. Please ensure Git is installed and in your PATH.",
                    self.program
                );
                return CommandOutcome::failure(
                    FailureKind::ProcessNotFound,
                    format!("{} command not found", self.program),
                );
            }
            Err(error) => {
                error!("Could not start '{display}' in {}: {error}", path.display());
                return CommandOutcome::failure(FailureKind::CommandFailed, error.to_string());
            }
        };

        // Dropping the child on timeout kills it.
        let output = match time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(error)) => {
                error!("Waiting for '{display}' in {} failed: {error}", path.display());
                return CommandOutcome::failure(FailureKind::CommandFailed, error.to_string());
            }
            Err(_) => {
                error!(
                    "'{display}' in {} timed out after {} seconds.",
                    path.display(),
                    timeout.as_secs()
                );
                return CommandOutcome::failure(
                    FailureKind::Timeout,
                    format!("Command timed out after {} seconds", timeout.as_secs()),
                );
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if output.status.success() {
            info!("Command success for {}: {stdout}", path.display());
            if !stderr.is_empty() {
                warn!("Command for {} had stderr output:\n{stderr}", path.display());
            }
            return CommandOutcome::success(stdout);
        }

        error!("Command '{display}' failed for {} ({})", path.display(), output.status);
        error!("stdout: {stdout}");
        error!("stderr: {stderr}");
        CommandOutcome::exited_with_error(if stderr.is_empty() { stdout } else { stderr })
    }
}
