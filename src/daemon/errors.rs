use thiserror::Error;

pub type Result<T> = std::result::Result<T, SyncError>;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("config error: could not load config file '{path}' - {source}")]
    Config { path: String, source: std::io::Error },
    #[error("config error: malformed config file '{path}' - {source}")]
    ConfigParse { path: String, source: toml::de::Error },
    #[error("config error: no config directory available on this platform")]
    NoConfigDir,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("git error: {0}")]
    Git(#[from] git2::Error),
}

/// Why a single git operation did not go through.
///
/// None of these stop the engine; they are carried in reports so the operator
/// can be pointed in the right direction.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    #[error("not a usable git working directory")]
    InvalidTarget,
    #[error("git executable not found")]
    ProcessNotFound,
    #[error("command timed out")]
    Timeout,
    #[error("command failed")]
    CommandFailed,
    #[error("authentication required")]
    AuthRequired,
    #[error("no upstream branch configured")]
    NoUpstream,
}
