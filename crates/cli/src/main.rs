//! gridrun - remote browser-test session orchestrator entry point

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use gridrun_common::{RunnerOptions, TaskRegistry, CI_BRANCH_VAR};
use gridrun_runner::{resolve, Coordinator, SessionFlags};

/// Task name that turns an invocation into a live preview tunnel.
const TUNNEL_TASK: &str = "tunnel";

#[derive(Parser, Debug)]
#[command(name = "gridrun")]
#[command(version, about = "Remote browser-test session orchestrator")]
struct Args {
    /// Task to run; `tunnel` opens a live preview tunnel
    #[arg(default_value = "test")]
    task: String,

    /// Select the desktop capability sets
    #[arg(long)]
    desktop: bool,

    /// Select the mobile capability sets
    #[arg(long)]
    mobile: bool,

    /// Explicit options file, bypassing task lookup
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Parent project task directory
    #[arg(long, default_value = "tasks")]
    tasks_dir: PathBuf,

    /// Bundled task defaults directory
    #[arg(long, default_value = "defaults")]
    defaults_dir: PathBuf,

    /// Module root against which runner paths resolve
    #[arg(long, default_value = ".")]
    root: PathBuf,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    let args = Args::parse();

    let rt = tokio::runtime::Runtime::new().expect("failed to create tokio runtime");
    if let Err(err) = rt.block_on(async_main(args)) {
        eprintln!("Error: {err:#}");
        std::process::exit(2);
    }
}

async fn async_main(args: Args) -> anyhow::Result<()> {
    let options = load_options(&args)?;

    let flags = SessionFlags {
        desktop: args.desktop.then_some(true),
        mobile: args.mobile.then_some(true),
        force_tunnel: args.task == TUNNEL_TASK,
    };

    let ci_branch = std::env::var(CI_BRANCH_VAR).ok();
    let plan = resolve(&flags, &options, ci_branch.as_deref());
    info!(
        "resolved {} session(s) for the {} environment",
        plan.descriptors.len(),
        plan.environment
    );

    let root = args
        .root
        .canonicalize()
        .unwrap_or_else(|_| args.root.clone());
    let coordinator = Coordinator::new(options, root);
    coordinator.run(&plan, ci_branch.as_deref(), None).await;

    Ok(())
}

/// An explicit `--config` wins; otherwise the task registry decides
/// which documents back the task and the parent overlays the bundled
/// base.
fn load_options(args: &Args) -> anyhow::Result<RunnerOptions> {
    let options = match &args.config {
        Some(path) => RunnerOptions::load(path)?,
        None => {
            let parent_dir = args.tasks_dir.is_dir().then(|| args.tasks_dir.clone());
            let registry = TaskRegistry::new(parent_dir, args.defaults_dir.clone());
            let (base, overlay) = registry.merge_pair(&args.task)?;
            RunnerOptions::load_merged(&base, overlay.as_deref())?
        }
    };

    Ok(options)
}
