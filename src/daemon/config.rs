use super::errors::{Result, SyncError};
use super::repo_config::{OperationKind, RepositoryConfig, DEFAULT_COMMIT_TEMPLATE};
use log::{debug, warn};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_DIR_NAME: &str = "rustsyncer";
const CONFIG_FILE_NAME: &str = "config.toml";
const LOG_FILE_NAME: &str = "rustsyncer.log";

fn default_poll_interval() -> u64 { 30 }
fn default_command_timeout() -> u64 { 300 }
fn default_status_timeout() -> u64 { 60 }
fn default_git_program() -> String { "git".to_string() }

/// Process-level settings, read once at startup.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DaemonSettings {
    /// Seconds between scheduler ticks
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
    /// Timeout in seconds for pull, stage, commit and push
    #[serde(default = "default_command_timeout")]
    pub command_timeout: u64,
    /// Timeout in seconds for the status query
    #[serde(default = "default_status_timeout")]
    pub status_timeout: u64,
    /// Executable invoked for every git operation
    #[serde(default = "default_git_program")]
    pub git_program: String,
    /// Socket of an already running ssh-agent to hand to git
    pub ssh_auth_sock: Option<PathBuf>,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            command_timeout: default_command_timeout(),
            status_timeout: default_status_timeout(),
            git_program: default_git_program(),
            ssh_auth_sock: None,
        }
    }
}

impl DaemonSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval.max(1))
    }

    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            command: Duration::from_secs(self.command_timeout.max(1)),
            status: Duration::from_secs(self.status_timeout.max(1)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub command: Duration,
    pub status: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        DaemonSettings::default().timeouts()
    }
}

/// Switches that stop an operation for every repository at once.
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GlobalOverrides {
    #[serde(default)]
    pub pause_pull: bool,
    #[serde(default)]
    pub pause_commit: bool,
    #[serde(default)]
    pub pause_push: bool,
}

impl GlobalOverrides {
    pub fn is_paused(&self, kind: OperationKind) -> bool {
        match kind {
            OperationKind::Pull => self.pause_pull,
            OperationKind::Commit => self.pause_commit,
            OperationKind::Push => self.pause_push,
        }
    }
}

/// A repository entry as written by the configuration UI. Intervals are in
/// minutes and kept loosely typed so a bad value only resets that interval.
#[derive(Deserialize, Debug)]
struct RepoEntry {
    path: PathBuf,
    #[serde(default)]
    auto_pull: Option<bool>,
    #[serde(default)]
    pull_interval: Option<toml::Value>,
    #[serde(default)]
    auto_commit: Option<bool>,
    #[serde(default)]
    commit_interval: Option<toml::Value>,
    #[serde(default)]
    commit_message_template: Option<String>,
    #[serde(default)]
    auto_push: Option<bool>,
    #[serde(default)]
    push_interval: Option<toml::Value>,
}

impl RepoEntry {
    fn into_repository(self) -> RepositoryConfig {
        let settings = [
            (OperationKind::Pull, self.auto_pull, self.pull_interval.as_ref()),
            (OperationKind::Commit, self.auto_commit, self.commit_interval.as_ref()),
            (OperationKind::Push, self.auto_push, self.push_interval.as_ref()),
        ];

        let mut repo = RepositoryConfig::new(&self.path);
        for (kind, enabled, interval) in settings {
            let enabled = enabled.unwrap_or(kind.enabled_by_default());
            let interval_secs = interval_secs_from_minutes(&self.path, kind, interval);
            repo = repo.with_operation(kind, enabled, interval_secs);
        }

        repo.with_commit_message_template(
            self.commit_message_template
                .unwrap_or_else(|| DEFAULT_COMMIT_TEMPLATE.to_string()),
        )
    }
}

/// Convert a minutes value to seconds. Returns 0 (meaning "use the default")
/// for anything that is not a positive number.
fn interval_secs_from_minutes(
    path: &Path,
    kind: OperationKind,
    value: Option<&toml::Value>,
) -> i64 {
    let minutes = match value {
        None => return kind.default_interval_secs() as i64,
        Some(toml::Value::Integer(minutes)) => *minutes as f64,
        Some(toml::Value::Float(minutes)) => *minutes,
        Some(other) => {
            warn!("Invalid {kind}_interval {other} for {}. Using default.", path.display());
            return 0;
        }
    };

    if !minutes.is_finite() || minutes <= 0.0 {
        warn!("Invalid {kind}_interval {minutes} for {}. Using default.", path.display());
        return 0;
    }

    (minutes * 60.0).round() as i64
}

/// One snapshot of the persisted configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub daemon: DaemonSettings,
    pub overrides: GlobalOverrides,
    pub repos: Vec<RepositoryConfig>,
}

impl Config {
    pub fn load_config(path: &Path) -> Result<Config> {
        if !path.exists() {
            warn!("Configuration file not found: {}. Using empty configuration.", path.display());
            return Ok(Config::default());
        }

        let file_text = std::fs::read_to_string(path).map_err(|source| SyncError::Config {
            path: path.display().to_string(),
            source,
        })?;

        Self::parse(&file_text).map_err(|source| SyncError::ConfigParse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Parse config text. Only a document that is not TOML at all is an
    /// error; bad sections and entries are skipped with a warning.
    pub fn parse(text: &str) -> std::result::Result<Config, toml::de::Error> {
        let mut table: toml::Table = toml::from_str(text)?;

        let daemon = table
            .remove("daemon")
            .map(|value| section_or_default(value, "daemon"))
            .unwrap_or_default();
        let overrides = table
            .remove("overrides")
            .map(|value| section_or_default(value, "overrides"))
            .unwrap_or_default();

        let entries = match table.remove("repos") {
            None => Vec::new(),
            Some(toml::Value::Array(entries)) => entries,
            Some(_) => {
                warn!("Configuration 'repos' is malformed. Expected a list.");
                Vec::new()
            }
        };

        let mut repos: Vec<RepositoryConfig> = Vec::with_capacity(entries.len());
        for entry in entries {
            let Some(repo) = parse_entry(entry) else { continue };
            if repos.iter().any(|existing| existing.path == repo.path) {
                warn!("Duplicate repository entry for {}. Skipping.", repo.path.display());
                continue;
            }
            repos.push(repo);
        }

        debug!("Loaded {} repository entries", repos.len());
        Ok(Config { daemon, overrides, repos })
    }
}

fn section_or_default<T: Default + for<'de> Deserialize<'de>>(value: toml::Value, name: &str) -> T {
    value.try_into().unwrap_or_else(|error| {
        warn!("Configuration section [{name}] is malformed ({error}). Using defaults.");
        T::default()
    })
}

fn parse_entry(entry: toml::Value) -> Option<RepositoryConfig> {
    let has_path = entry
        .as_table()
        .and_then(|table| table.get("path"))
        .is_some_and(|path| path.as_str().is_some_and(|path| !path.is_empty()));
    if !has_path {
        warn!("Malformed repository entry: {entry}. Skipping.");
        return None;
    }

    let entry = match entry.try_into::<RepoEntry>() {
        Ok(entry) => entry,
        Err(error) => {
            warn!("Malformed repository entry ({error}). Skipping.");
            return None;
        }
    };

    if !entry.path.is_absolute() {
        warn!("Repository path {} is not absolute. Skipping.", entry.path.display());
        return None;
    }
    Some(entry.into_repository())
}

/// Where the daemon looks for its configuration unless told otherwise.
pub fn default_config_path() -> Result<PathBuf> {
    let base = dirs::config_dir().ok_or(SyncError::NoConfigDir)?;
    Ok(base.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// The daemon's log file, next to the default configuration.
pub fn default_log_path() -> Result<PathBuf> {
    let base = dirs::config_dir().ok_or(SyncError::NoConfigDir)?;
    Ok(base.join(CONFIG_DIR_NAME).join(LOG_FILE_NAME))
}

/// Something the engine can re-read its configuration from on every tick.
pub trait ConfigSource {
    fn load(&self) -> Result<Config>;
}

/// The TOML file shared with the configuration UI.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
}

impl ConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigSource for ConfigFile {
    fn load(&self) -> Result<Config> {
        Config::load_config(&self.path)
    }
}
