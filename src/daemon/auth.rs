//! Best-effort classification of git's free-text error output.
//!
//! git does not report credential problems in a structured way, so these
//! helpers match known phrases. They only feed operator guidance; nothing in
//! the scheduler branches its retry behaviour on them.

/// Phrases git, ssh and common hosting providers print when credentials are
/// missing or rejected. Matched case-insensitively.
const AUTH_FAILURE_PHRASES: &[&str] = &[
    "authentication failed",
    "permission denied (publickey",
    "could not read username",
    "could not read password",
    "no supported authentication methods",
    "terminal prompts disabled",
    "invalid username or password",
    "http basic: access denied",
    "the requested url returned error: 401",
    "the requested url returned error: 403",
    "unable to read askpass response",
];

/// Hosts answer "repository not found" for private repositories when no
/// credentials are presented. Only counted as an auth problem when the
/// remote is a network one.
const NOT_FOUND_PHRASE: &str = "repository not found";
const NETWORK_REMOTE_MARKERS: &[&str] = &["https://", "http://", "ssh://", "git@"];

const NO_UPSTREAM_PHRASES: &[&str] =
    &["has no upstream branch", "no upstream branch", "no upstream configured"];

pub fn is_auth_error(text: &str) -> bool {
    let text = text.to_lowercase();

    if AUTH_FAILURE_PHRASES.iter().any(|phrase| text.contains(phrase)) {
        return true;
    }

    text.contains(NOT_FOUND_PHRASE)
        && NETWORK_REMOTE_MARKERS.iter().any(|marker| text.contains(marker))
}

/// Whether a failed push was rejected because the branch tracks nothing.
pub fn is_missing_upstream(text: &str) -> bool {
    let text = text.to_lowercase();
    NO_UPSTREAM_PHRASES.iter().any(|phrase| text.contains(phrase))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn https_authentication_failure_is_auth() {
        assert!(is_auth_error("fatal: Authentication failed for 'https://example.com/repo.git'"));
    }

    #[test]
    fn merge_conflict_is_not_auth() {
        assert!(!is_auth_error("fatal: conflict, needs merge"));
    }

    #[test]
    fn matching_ignores_case() {
        assert!(is_auth_error(
            "git@github.com: PERMISSION DENIED (PUBLICKEY).\n\
             fatal: Could not read from remote repository."
        ));
        assert!(is_auth_error(
            "fatal: could not read Username for 'https://github.com': terminal prompts disabled"
        ));
    }

    #[test]
    fn repository_not_found_needs_network_remote() {
        assert!(is_auth_error(
            "remote: Repository not found.\n\
             fatal: repository 'https://github.com/acme/private.git/' not found"
        ));
        assert!(!is_auth_error(
            "fatal: repository '/srv/mirrors/gone.git' not found\nRepository not found"
        ));
    }

    #[test]
    fn network_errors_are_not_auth() {
        assert!(!is_auth_error(
            "fatal: unable to access 'https://example.com/repo.git/': \
             Could not resolve host: example.com"
        ));
        assert!(!is_auth_error(""));
    }

    #[test]
    fn detects_missing_upstream() {
        assert!(is_missing_upstream(
            "fatal: The current branch feature has no upstream branch.\n\
             To push the current branch and set the remote as upstream, use"
        ));
        assert!(!is_missing_upstream("! [rejected]        main -> main (fetch first)"));
    }
}
