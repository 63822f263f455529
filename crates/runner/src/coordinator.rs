//! Session coordination
//!
//! Sequences resolver output through the tunnel manager, the local
//! driver server, and the process spawner, then decides what happens to
//! the host process. Ancillary infrastructure failures degrade and
//! continue; only the children's exit codes decide the aggregate.

use std::path::PathBuf;
use std::process;

use tracing::{error, info};

use gridrun_common::{ExecutionEnvironment, RunnerOptions};

use crate::capabilities::Plan;
use crate::selenium::{self, LocalServer};
use crate::spawn;
use crate::tunnel::TunnelManager;

/// What an invocation decided to do with the host process.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Terminate with the aggregate exit code.
    Exit(i32),
    /// Live preview: the tunnel stays up and no exit is performed.
    KeepAlive,
    /// Misconfigured invocation: reported, nothing launched, no exit
    /// call; the host keeps its default disposition.
    ConfigError,
}

/// Invoked before the host process terminates so an upstream task
/// sequencer observes completion first.
pub type CompletionCallback = Box<dyn FnOnce() + Send>;

pub struct Coordinator {
    options: RunnerOptions,
    root: PathBuf,
    tunnel: TunnelManager,
}

impl Coordinator {
    pub fn new(options: RunnerOptions, root: PathBuf) -> Self {
        let tunnel = TunnelManager::new(options.tunnel.clone());
        Self {
            options,
            root,
            tunnel,
        }
    }

    /// Drive one invocation to its outcome without touching the host
    /// process. [`Coordinator::run`] applies the outcome.
    pub async fn execute(&self, plan: &Plan, ci_branch: Option<&str>) -> Outcome {
        match plan.environment {
            ExecutionEnvironment::Tunnel => self.run_tunnel(plan, ci_branch).await,
            ExecutionEnvironment::Local => self.run_local(plan, ci_branch).await,
            ExecutionEnvironment::Ci => {
                let code = spawn::run_sessions(
                    &plan.descriptors,
                    &self.options,
                    &self.root,
                    false,
                    ci_branch,
                )
                .await;
                Outcome::Exit(code)
            }
            ExecutionEnvironment::Unknown => {
                error!("[run] test environment was not defined");
                Outcome::ConfigError
            }
        }
    }

    async fn run_tunnel(&self, plan: &Plan, ci_branch: Option<&str>) -> Outcome {
        if let Err(err) = self.tunnel.start().await {
            error!("[tunnel start] {err}");
        }

        if plan.descriptors.is_empty() {
            // live-preview-only invocation: nothing to run, no exit
            info!("tunnel is up; visit the remote farm's live console to QA");
            return Outcome::KeepAlive;
        }

        let code = spawn::run_sessions(
            &plan.descriptors,
            &self.options,
            &self.root,
            false,
            ci_branch,
        )
        .await;

        if let Err(err) = self.tunnel.stop().await {
            error!("[tunnel stop] {err}");
        }

        Outcome::Exit(code)
    }

    async fn run_local(&self, plan: &Plan, ci_branch: Option<&str>) -> Outcome {
        if let Err(err) = selenium::install(&self.options.selenium).await {
            error!("[selenium install] {err}");
        }

        let mut server = match LocalServer::start(&self.options.selenium).await {
            Ok(server) => Some(server),
            Err(err) => {
                error!("[selenium start] {err} => pkill java");
                None
            }
        };

        // The run proceeds whether or not the server came up; a dead
        // server surfaces through the children's own failures.
        let code = spawn::run_sessions(
            &plan.descriptors,
            &self.options,
            &self.root,
            true,
            ci_branch,
        )
        .await;

        if let Some(server) = server.as_mut() {
            if let Err(err) = server.stop() {
                error!("[selenium: local server kill] {err}");
            }
        }

        Outcome::Exit(code)
    }

    /// Apply the outcome to the host process: completion callback, then
    /// exit; pend forever for a live preview; plain return on a
    /// configuration error.
    pub async fn run(
        self,
        plan: &Plan,
        ci_branch: Option<&str>,
        on_complete: Option<CompletionCallback>,
    ) {
        match self.execute(plan, ci_branch).await {
            Outcome::Exit(code) => {
                if let Some(callback) = on_complete {
                    callback();
                }
                process::exit(code);
            }
            Outcome::KeepAlive => {
                // the tunnel child keeps serving until the user kills us
                std::future::pending::<()>().await;
            }
            Outcome::ConfigError => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_environment_reports_and_does_not_exit() {
        let coordinator = Coordinator::new(RunnerOptions::default(), PathBuf::from("."));
        let plan = Plan {
            environment: ExecutionEnvironment::Unknown,
            descriptors: Vec::new(),
        };

        // Reaching this assertion at all proves no exit call was made.
        let outcome = coordinator.execute(&plan, None).await;
        assert_eq!(outcome, Outcome::ConfigError);
    }
}
