//! Shared types for session orchestration

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Environment variable carrying the JSON-encoded session descriptor for a child runner.
pub const SESSION_ENV_VAR: &str = "GRIDRUN_SESSION";

/// Environment variable carrying the JSON-encoded `{"local": bool}` payload.
pub const TEST_ENV_VAR: &str = "GRIDRUN_TEST_ENV";

/// CI branch marker. Presence alone selects CI aggregation semantics;
/// the value is never interpreted.
pub const CI_BRANCH_VAR: &str = "GRIDRUN_CI_BRANCH";

/// Which orchestration branch governs an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionEnvironment {
    /// Run against a locally managed driver server.
    Local,
    /// Unattended run, concurrent children, first-failure aggregation.
    Ci,
    /// Run through the secure tunnel to the remote browser farm.
    Tunnel,
    /// Anything unrecognized from the options file. Reaches the
    /// coordinator's configuration-error branch instead of failing
    /// deserialization.
    #[serde(other)]
    Unknown,
}

impl Default for ExecutionEnvironment {
    fn default() -> Self {
        ExecutionEnvironment::Tunnel
    }
}

impl std::fmt::Display for ExecutionEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExecutionEnvironment::Local => "local",
            ExecutionEnvironment::Ci => "ci",
            ExecutionEnvironment::Tunnel => "tunnel",
            ExecutionEnvironment::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// One browser/device/base-URL test target. Immutable once produced by
/// the capability resolver; consumed by the process spawner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDescriptor {
    /// Base URL the child runner points its browser at.
    pub base_url: String,

    /// Browser or device capability fields, passed through verbatim.
    #[serde(default)]
    pub capabilities: Map<String, Value>,

    /// Whether this session targets the local driver server.
    #[serde(default)]
    pub local: bool,
}

impl SessionDescriptor {
    pub fn new(base_url: impl Into<String>, capabilities: Map<String, Value>, local: bool) -> Self {
        Self {
            base_url: base_url.into(),
            capabilities,
            local,
        }
    }

    /// Short label for log attribution, preferring the browser name if
    /// the capability set carries one.
    pub fn label(&self) -> String {
        self.capabilities
            .get("browserName")
            .or_else(|| self.capabilities.get("device"))
            .and_then(Value::as_str)
            .map(|name| format!("{} @ {}", name, self.base_url))
            .unwrap_or_else(|| self.base_url.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_parses_known_values() {
        let env: ExecutionEnvironment = serde_json::from_str("\"local\"").unwrap();
        assert_eq!(env, ExecutionEnvironment::Local);
        let env: ExecutionEnvironment = serde_json::from_str("\"tunnel\"").unwrap();
        assert_eq!(env, ExecutionEnvironment::Tunnel);
    }

    #[test]
    fn environment_falls_back_to_unknown() {
        let env: ExecutionEnvironment = serde_json::from_str("\"staging\"").unwrap();
        assert_eq!(env, ExecutionEnvironment::Unknown);
    }

    #[test]
    fn descriptor_label_prefers_browser_name() {
        let mut caps = Map::new();
        caps.insert("browserName".into(), Value::String("firefox".into()));
        let desc = SessionDescriptor::new("http://localhost:3000", caps, false);
        assert_eq!(desc.label(), "firefox @ http://localhost:3000");

        let desc = SessionDescriptor::new("http://localhost:3000", Map::new(), false);
        assert_eq!(desc.label(), "http://localhost:3000");
    }
}
