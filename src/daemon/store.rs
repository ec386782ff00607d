use super::repo_config::{OperationKind, RepositoryConfig};
use log::{info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The engine's view of the configured repositories.
///
/// Settings are replaced wholesale on every reload; the last-success
/// timestamps stay with the path they belong to.
#[derive(Debug, Default)]
pub struct RepositoryStore {
    repos: Vec<RepositoryConfig>,
}

impl RepositoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the settings with `fresh`, carrying timestamps over by path.
    /// Repositories no longer listed are dropped together with their state.
    pub fn merge(&mut self, fresh: Vec<RepositoryConfig>) {
        let mut previous: HashMap<PathBuf, RepositoryConfig> =
            self.repos.drain(..).map(|repo| (repo.path.clone(), repo)).collect();

        let mut merged: Vec<RepositoryConfig> = Vec::with_capacity(fresh.len());
        for mut repo in fresh {
            if merged.iter().any(|existing| existing.path == repo.path) {
                warn!("Duplicate repository entry for {}. Skipping.", repo.path.display());
                continue;
            }

            match previous.remove(&repo.path) {
                Some(old) => {
                    for kind in OperationKind::ALL {
                        repo.operation_mut(kind).carry_last_success(old.operation(kind));
                    }
                }
                None => info!("Tracking new repository {}", repo.path.display()),
            }
            merged.push(repo);
        }

        for path in previous.keys() {
            info!("Repository {} removed from configuration", path.display());
        }
        self.repos = merged;
    }

    pub fn get(&self, path: &Path) -> Option<&RepositoryConfig> {
        self.repos.iter().find(|repo| repo.path == path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RepositoryConfig> {
        self.repos.iter()
    }

    pub(super) fn iter_mut(&mut self) -> impl Iterator<Item = &mut RepositoryConfig> {
        self.repos.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.repos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }
}
