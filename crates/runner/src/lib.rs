//! Gridrun session orchestrator
//!
//! Runs browser test sessions against a remote farm (through a secure
//! tunnel), a locally managed driver server, or plain CI workers:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     Coordinator                          │
//! │   resolve(flags, options) -> Plan                        │
//! │     ├── tunnel: TunnelManager start/stop (guarded)       │
//! │     ├── local:  install + LocalServer (guarded)          │
//! │     └── spawn:  one child per descriptor                 │
//! │                   sequential: last exit code wins        │
//! │                   ci:         first non-zero wins        │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Infrastructure failures are logged and degrade; the aggregate exit
//! code reflects only the children.

pub mod capabilities;
pub mod coordinator;
pub mod error;
pub mod selenium;
pub mod spawn;
pub mod tunnel;

pub use capabilities::{resolve, Plan, SessionFlags};
pub use coordinator::{Coordinator, Outcome};
pub use error::{RunnerError, RunnerResult};
pub use tunnel::TunnelManager;
