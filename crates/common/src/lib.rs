//! Gridrun Common Library
//!
//! Shared types, configuration, and the task-provider registry for the
//! gridrun orchestrator.

pub mod config;
pub mod error;
pub mod registry;
pub mod types;

// Re-export commonly used types
pub use config::{merge_values, DriverOptions, RunnerBinary, RunnerOptions, TunnelOptions};
pub use error::{Error, Result};
pub use registry::{ResolvedTask, TaskOrigin, TaskRegistry};
pub use types::{
    ExecutionEnvironment, SessionDescriptor, CI_BRANCH_VAR, SESSION_ENV_VAR, TEST_ENV_VAR,
};

/// Gridrun version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
