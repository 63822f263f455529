//! Child test-runner processes
//!
//! One OS process per session descriptor. Each child gets the driver
//! configuration path, inherited stdio, and an explicit per-child
//! environment map layered over the parent environment: the serialized
//! descriptor and the `{"local": bool}` payload. Waiting is single-shot
//! by ownership: `wait_for_exit` consumes the handle.

use std::path::{Path, PathBuf};

use colored::Colorize;
use tokio::process::{Child, Command};
use tracing::{error, info};

use gridrun_common::{RunnerOptions, SessionDescriptor, SESSION_ENV_VAR, TEST_ENV_VAR};

use crate::error::{RunnerError, RunnerResult};

/// A spawned child runner paired with the descriptor it serves.
pub struct SpawnedSession {
    child: Child,
    pub descriptor: SessionDescriptor,
}

/// The two JSON payloads injected into a child's environment.
pub fn session_env(
    descriptor: &SessionDescriptor,
    local: bool,
) -> RunnerResult<Vec<(String, String)>> {
    Ok(vec![
        (
            SESSION_ENV_VAR.to_string(),
            serde_json::to_string(descriptor)?,
        ),
        (
            TEST_ENV_VAR.to_string(),
            serde_json::to_string(&serde_json::json!({ "local": local }))?,
        ),
    ])
}

fn resolve_against(root: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

impl SpawnedSession {
    /// Launch one runner process for `descriptor`. Setup failures are a
    /// distinct error path; they never affect sibling sessions.
    pub fn launch(
        descriptor: &SessionDescriptor,
        options: &RunnerOptions,
        root: &Path,
        local: bool,
        concurrent: bool,
    ) -> RunnerResult<Self> {
        let runner = &options.runner;
        let bin = resolve_against(root, &runner.bin);
        let driver_config = resolve_against(root, &runner.driver_config);

        let mode = if concurrent { "concurrent" } else { "sequential" };
        info!(
            "starting {mode} tests for [{}]",
            descriptor.base_url.magenta()
        );

        let mut cmd = Command::new(&bin);
        cmd.arg(&driver_config)
            .args(&runner.args)
            // inherited stdio; the child owns the terminal for its run
            .envs(session_env(descriptor, local)?);

        let child = cmd.spawn().map_err(|err| {
            RunnerError::Spawn(format!("failed to launch {}: {}", bin.display(), err))
        })?;

        Ok(Self {
            child,
            descriptor: descriptor.clone(),
        })
    }

    /// Resolve with the child's exit code, exactly once. A child torn
    /// down by a signal reads as failure code 1.
    pub async fn wait_for_exit(mut self) -> RunnerResult<i32> {
        let status = self.child.wait().await?;
        Ok(status.code().unwrap_or(1))
    }
}

/// Run every descriptor through the external runner and aggregate.
///
/// Without the CI branch marker the descriptors run strictly one at a
/// time and the aggregate is the last observed code. With the marker
/// every child is spawned up front (they run concurrently), closes are
/// awaited in descriptor order, and the aggregate is the first non-zero
/// code. Spawn failures are logged and never fatal to siblings.
pub async fn run_sessions(
    descriptors: &[SessionDescriptor],
    options: &RunnerOptions,
    root: &Path,
    local: bool,
    ci_branch: Option<&str>,
) -> i32 {
    if ci_branch.is_none() {
        let mut code = 0;

        for descriptor in descriptors {
            match SpawnedSession::launch(descriptor, options, root, local, false) {
                Ok(session) => match session.wait_for_exit().await {
                    Ok(exit) => {
                        info!(
                            "child process for {} closed with status: {exit}",
                            descriptor.label()
                        );
                        code = exit;
                    }
                    Err(err) => error!("[session spawn] {err}"),
                },
                Err(err) => error!("[session spawn] {err}"),
            }
        }

        code
    } else {
        let mut sessions = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            match SpawnedSession::launch(descriptor, options, root, local, true) {
                Ok(session) => sessions.push(session),
                Err(err) => error!("[session spawn] {err}"),
            }
        }

        let mut codes = Vec::with_capacity(sessions.len());
        for session in sessions {
            let label = session.descriptor.label();
            match session.wait_for_exit().await {
                Ok(exit) => {
                    info!("child process for {label} closed with status: {exit}");
                    codes.push(exit);
                }
                Err(err) => error!("[session spawn] {err}"),
            }
        }

        codes.into_iter().find(|code| *code != 0).unwrap_or(0)
    }
}
