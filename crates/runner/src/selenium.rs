//! Local driver server management
//!
//! Installs and runs the standalone driver server for the `local`
//! branch. Every operation here is recoverable: the coordinator logs
//! failures and keeps going, including the documented case where the
//! runner is spawned against a server that never came up.

use std::process::{Child, Command, Stdio};
use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use gridrun_common::DriverOptions;

use crate::error::{RunnerError, RunnerResult};

fn split_cmd(cmd: &[String], what: &str) -> RunnerResult<(String, Vec<String>)> {
    match cmd.split_first() {
        Some((bin, args)) => Ok((bin.clone(), args.to_vec())),
        None => Err(RunnerError::Install(format!("empty {what} command"))),
    }
}

/// Run the driver install step, inheriting stdio so download progress
/// stays visible.
pub async fn install(options: &DriverOptions) -> RunnerResult<()> {
    let (bin, args) = split_cmd(&options.install_cmd, "install")?;

    let status = tokio::process::Command::new(&bin)
        .args(&args)
        .status()
        .await
        .map_err(|err| RunnerError::Install(format!("failed to run {bin}: {err}")))?;

    if status.success() {
        Ok(())
    } else {
        Err(RunnerError::Install(format!(
            "install exited with status {status}"
        )))
    }
}

/// Handle to a running local driver server process.
pub struct LocalServer {
    child: Child,
    status_url: String,
}

impl LocalServer {
    /// Spawn the server and poll its status endpoint until it reports
    /// healthy or the startup deadline passes.
    pub async fn start(options: &DriverOptions) -> RunnerResult<Self> {
        let (bin, args) = split_cmd(&options.start_cmd, "start")?;

        info!("starting local driver server: {bin}");

        let child = Command::new(&bin)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| {
                RunnerError::ServerStartup(format!("failed to spawn {bin}: {err}"))
            })?;

        let server = Self {
            child,
            status_url: options.status_url.clone(),
        };

        server.wait_for_healthy(options.startup_timeout()).await?;

        info!("driver server is up at {}", server.status_url);
        Ok(server)
    }

    async fn wait_for_healthy(&self, deadline: Duration) -> RunnerResult<()> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;

        let start = std::time::Instant::now();
        let mut attempts = 0;

        while start.elapsed() < deadline {
            attempts += 1;

            match client.get(&self.status_url).send().await {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                Ok(resp) => {
                    warn!("driver status check returned {}", resp.status());
                }
                Err(err) => {
                    if attempts == 1 {
                        info!("waiting for driver server to start...");
                    }
                    // connection refused is expected while it boots
                    if !err.is_connect() {
                        warn!("driver status check error: {err}");
                    }
                }
            }

            sleep(Duration::from_millis(100)).await;
        }

        Err(RunnerError::ServerHealthCheck(attempts))
    }

    /// Terminate the server. Guarded by the caller; a failure here is
    /// logged and swallowed.
    pub fn stop(&mut self) -> RunnerResult<()> {
        info!("stopping driver server (pid: {})", self.child.id());

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(self.child.id() as i32);
            if kill(pid, Signal::SIGTERM).is_ok() {
                std::thread::sleep(Duration::from_millis(500));
            }
        }

        let _ = self.child.kill();
        self.child
            .wait()
            .map_err(|err| RunnerError::ServerStartup(format!("driver server wait: {err}")))?;
        Ok(())
    }
}

impl Drop for LocalServer {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
