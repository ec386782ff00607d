pub mod auth;
pub mod config;
pub mod context;
pub mod engine;
pub mod errors;
pub mod git_ops;
pub mod logging;
pub mod notify;
pub mod repo_config;
pub mod store;
pub mod upstream;
pub mod watcher;
