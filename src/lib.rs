//! Keeps git working directories in sync with their remotes by pulling,
//! committing and pushing each one on its own schedule.

pub mod daemon;
