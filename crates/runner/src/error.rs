//! Error types for the session orchestrator

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("tunnel error: {0}")]
    Tunnel(String),

    #[error("invalid tunnel transition: {from} -> {to}")]
    TunnelTransition {
        from: &'static str,
        to: &'static str,
    },

    #[error("driver install failed: {0}")]
    Install(String),

    #[error("driver server failed to start: {0}")]
    ServerStartup(String),

    #[error("driver server health check failed after {0} attempts")]
    ServerHealthCheck(usize),

    #[error("session spawn failed: {0}")]
    Spawn(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Common(#[from] gridrun_common::Error),
}

pub type RunnerResult<T> = Result<T, RunnerError>;
