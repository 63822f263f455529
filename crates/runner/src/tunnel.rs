//! Remote tunnel lifecycle
//!
//! Owns the single persistent tunnel to the remote browser farm. The
//! state machine is `Idle -> Starting -> Running -> Stopping -> Idle`;
//! stopping from `Idle` is a guarded no-op so the coordinator can always
//! tear down after a failed start. Start and stop failures are returned
//! to the caller, which logs them and continues.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use gridrun_common::TunnelOptions;

use crate::error::{RunnerError, RunnerResult};

/// Opaque handle to the running tunnel client. Never leaves this module.
struct TunnelHandle {
    child: Child,
}

enum TunnelState {
    Idle,
    Starting,
    Running(TunnelHandle),
    Stopping,
}

impl TunnelState {
    fn name(&self) -> &'static str {
        match self {
            TunnelState::Idle => "idle",
            TunnelState::Starting => "starting",
            TunnelState::Running(_) => "running",
            TunnelState::Stopping => "stopping",
        }
    }
}

pub struct TunnelManager {
    options: TunnelOptions,
    state: Mutex<TunnelState>,
}

impl TunnelManager {
    pub fn new(options: TunnelOptions) -> Self {
        Self {
            options,
            state: Mutex::new(TunnelState::Idle),
        }
    }

    /// Establish the tunnel. Scans the client's stdout until the ready
    /// marker appears and surfaces that line for observability. On any
    /// failure the manager returns to `Idle` and the error is handed to
    /// the caller.
    pub async fn start(&self) -> RunnerResult<()> {
        // The guard is held across the whole establishment, which is
        // what makes start a single in-flight operation.
        let mut state = self.state.lock().await;
        if !matches!(*state, TunnelState::Idle) {
            return Err(RunnerError::TunnelTransition {
                from: state.name(),
                to: "starting",
            });
        }
        *state = TunnelState::Starting;

        match self.establish().await {
            Ok(handle) => {
                *state = TunnelState::Running(handle);
                Ok(())
            }
            Err(err) => {
                *state = TunnelState::Idle;
                Err(err)
            }
        }
    }

    async fn establish(&self) -> RunnerResult<TunnelHandle> {
        let mut cmd = Command::new(&self.options.bin);
        if let Some(key) = &self.options.key {
            cmd.arg("--key").arg(key);
        }
        // One identifier per invocation keeps concurrent builds apart
        // on the farm side.
        cmd.arg("--local-identifier")
            .arg(Uuid::new_v4().to_string());
        cmd.args(&self.options.args);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|err| {
            RunnerError::Tunnel(format!("failed to spawn {}: {}", self.options.bin, err))
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RunnerError::Tunnel("tunnel client stdout unavailable".to_string()))?;
        let mut lines = BufReader::new(stdout).lines();

        while let Some(line) = lines.next_line().await? {
            if line.contains(&self.options.ready_marker) {
                // The connection-time diagnostic the farm client prints.
                info!("{line}");

                // Keep draining so the client never blocks on a full pipe.
                tokio::spawn(async move {
                    while let Ok(Some(line)) = lines.next_line().await {
                        debug!(target: "tunnel", "{line}");
                    }
                });

                return Ok(TunnelHandle { child });
            }
            debug!(target: "tunnel", "{line}");
        }

        let _ = child.start_kill();
        let _ = child.wait().await;
        Err(RunnerError::Tunnel(
            "tunnel client exited before signalling readiness".to_string(),
        ))
    }

    /// Tear the tunnel down. A no-op when nothing is running, so the
    /// coordinator may call it unconditionally after the test run.
    pub async fn stop(&self) -> RunnerResult<()> {
        let mut state = self.state.lock().await;
        let handle = match std::mem::replace(&mut *state, TunnelState::Stopping) {
            TunnelState::Running(handle) => handle,
            TunnelState::Idle => {
                *state = TunnelState::Idle;
                return Ok(());
            }
            other => {
                let from = other.name();
                *state = other;
                return Err(RunnerError::TunnelTransition {
                    from,
                    to: "stopping",
                });
            }
        };

        let result = Self::shutdown(handle).await;
        *state = TunnelState::Idle;
        result
    }

    async fn shutdown(mut handle: TunnelHandle) -> RunnerResult<()> {
        // Graceful first, then force.
        #[cfg(unix)]
        if let Some(pid) = handle.child.id() {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok() {
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
        }

        let _ = handle.child.start_kill();
        handle
            .child
            .wait()
            .await
            .map_err(|err| RunnerError::Tunnel(format!("tunnel teardown: {err}")))?;
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        matches!(*self.state.lock().await, TunnelState::Running(_))
    }
}
