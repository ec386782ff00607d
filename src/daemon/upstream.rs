use super::errors::Result;
use git2::{BranchType, ErrorCode, Repository};
use std::path::Path;

/// What the local repository says about where a push would go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamState {
    /// The checked-out branch tracks `upstream`, e.g. `origin/main`.
    Tracking { branch: String, upstream: String },
    /// The checked-out branch has no upstream. Pushing needs a decision on
    /// which remote and branch to use, which is left to the operator.
    Missing { branch: String },
    /// Detached or unborn HEAD; git itself will explain when pushing.
    Undetermined,
}

impl UpstreamState {
    pub fn needs_decision(&self) -> bool {
        matches!(self, UpstreamState::Missing { .. })
    }
}

/// Inspect the current branch's upstream without touching the network.
pub fn inspect(path: &Path) -> Result<UpstreamState> {
    let repository = Repository::open(path)?;

    let head = match repository.head() {
        Ok(head) => head,
        Err(error)
            if matches!(error.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) =>
        {
            return Ok(UpstreamState::Undetermined);
        }
        Err(error) => return Err(error.into()),
    };

    if !head.is_branch() {
        return Ok(UpstreamState::Undetermined);
    }
    let Some(branch_name) = head.shorthand() else {
        return Ok(UpstreamState::Undetermined);
    };
    let branch_name = branch_name.to_string();

    let branch = repository.find_branch(&branch_name, BranchType::Local)?;
    let state = match branch.upstream() {
        Ok(upstream) => {
            let upstream = upstream.name()?.unwrap_or_default().to_string();
            UpstreamState::Tracking { branch: branch_name, upstream }
        }
        Err(error) if error.code() == ErrorCode::NotFound => {
            UpstreamState::Missing { branch: branch_name }
        }
        Err(error) => return Err(error.into()),
    };
    Ok(state)
}
