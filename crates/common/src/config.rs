//! Runner options: loading, defaults, and parent-over-base merging

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::error::{Error, Result};
use crate::types::ExecutionEnvironment;

/// Options document consumed by the capability resolver and the
/// orchestrator. A parent project's document is deep-merged over the
/// bundled one, so a parent only states what it changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerOptions {
    /// Execution environment when neither the invoked task nor the CI
    /// marker decides it.
    #[serde(default)]
    pub environment: ExecutionEnvironment,

    /// Target base URLs; descriptors are produced per URL.
    #[serde(default = "default_base_urls")]
    pub base_urls: Vec<String>,

    /// Desktop browser capability sets.
    #[serde(default)]
    pub desktop: Vec<Map<String, Value>>,

    /// Mobile device capability sets.
    #[serde(default)]
    pub mobile: Vec<Map<String, Value>>,

    /// External test-runner invocation.
    #[serde(default)]
    pub runner: RunnerBinary,

    /// Remote tunnel client.
    #[serde(default)]
    pub tunnel: TunnelOptions,

    /// Local driver server management.
    #[serde(default)]
    pub selenium: DriverOptions,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        // An empty document deserializes to the same defaults.
        Self {
            environment: ExecutionEnvironment::default(),
            base_urls: default_base_urls(),
            desktop: Vec::new(),
            mobile: Vec::new(),
            runner: RunnerBinary::default(),
            tunnel: TunnelOptions::default(),
            selenium: DriverOptions::default(),
        }
    }
}

fn default_base_urls() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

/// How to launch one child test-runner process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerBinary {
    /// Runner executable, resolved against the module root when relative.
    #[serde(default = "default_runner_bin")]
    pub bin: String,

    /// Driver configuration file handed to the runner as its first
    /// argument, resolved against the module root.
    #[serde(default = "default_driver_config")]
    pub driver_config: String,

    /// Extra runtime flags appended after the config path.
    #[serde(default = "default_runner_args")]
    pub args: Vec<String>,
}

impl Default for RunnerBinary {
    fn default() -> Self {
        Self {
            bin: default_runner_bin(),
            driver_config: default_driver_config(),
            args: default_runner_args(),
        }
    }
}

fn default_runner_bin() -> String {
    "node_modules/.bin/wdio".to_string()
}

fn default_driver_config() -> String {
    "driver.conf.js".to_string()
}

fn default_runner_args() -> Vec<String> {
    vec!["--harmony".to_string()]
}

/// Tunnel client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TunnelOptions {
    /// Tunnel client executable.
    #[serde(default = "default_tunnel_bin")]
    pub bin: String,

    /// Extra arguments for the client.
    #[serde(default)]
    pub args: Vec<String>,

    /// Farm access key, appended as `--key <value>` when present.
    #[serde(default)]
    pub key: Option<String>,

    /// Stdout line marking a fully established tunnel.
    #[serde(default = "default_ready_marker")]
    pub ready_marker: String,
}

impl Default for TunnelOptions {
    fn default() -> Self {
        Self {
            bin: default_tunnel_bin(),
            args: Vec::new(),
            key: None,
            ready_marker: default_ready_marker(),
        }
    }
}

fn default_tunnel_bin() -> String {
    "tunnel-client".to_string()
}

fn default_ready_marker() -> String {
    "You can now access your local server".to_string()
}

/// Local driver server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverOptions {
    /// Install command, argv style.
    #[serde(default = "default_install_cmd")]
    pub install_cmd: Vec<String>,

    /// Start command, argv style.
    #[serde(default = "default_start_cmd")]
    pub start_cmd: Vec<String>,

    /// Status endpoint polled until the server reports healthy.
    #[serde(default = "default_status_url")]
    pub status_url: String,

    /// Startup deadline in seconds.
    #[serde(default = "default_startup_timeout")]
    pub startup_timeout_secs: u64,
}

impl DriverOptions {
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            install_cmd: default_install_cmd(),
            start_cmd: default_start_cmd(),
            status_url: default_status_url(),
            startup_timeout_secs: default_startup_timeout(),
        }
    }
}

fn default_install_cmd() -> Vec<String> {
    vec!["selenium-standalone".to_string(), "install".to_string()]
}

fn default_start_cmd() -> Vec<String> {
    vec!["selenium-standalone".to_string(), "start".to_string()]
}

fn default_status_url() -> String {
    "http://127.0.0.1:4444/wd/hub/status".to_string()
}

fn default_startup_timeout() -> u64 {
    30
}

impl RunnerOptions {
    /// Load a single options document. A missing or unparseable file is
    /// fatal; this is the one synchronous failure allowed to propagate
    /// out of resolution.
    pub fn load(path: &Path) -> Result<Self> {
        let value = load_value(path)?;
        serde_json::from_value(value).map_err(Error::from)
    }

    /// Load the bundled document and, when the parent project supplies
    /// its own, deep-merge the parent over it. A parent file that exists
    /// but fails to parse is fatal.
    pub fn load_merged(base: &Path, parent: Option<&Path>) -> Result<Self> {
        let mut doc = load_value(base)?;

        if let Some(parent) = parent {
            let overlay = load_value(parent)?;
            info!("merging parent {} with base options", parent.display());
            merge_values(&mut doc, overlay);
        }

        serde_json::from_value(doc).map_err(Error::from)
    }
}

fn load_value(path: &Path) -> Result<Value> {
    let raw = fs::read_to_string(path).map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            Error::OptionsNotFound {
                path: path.to_path_buf(),
            }
        } else {
            Error::Io(err)
        }
    })?;

    serde_yaml::from_str(&raw).map_err(|source| Error::OptionsParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Deep merge `overlay` into `base`. Mappings recurse key by key,
/// everything else is replaced by the overlay value.
pub fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base_slot, overlay) => *base_slot = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn empty_document_yields_defaults() {
        let options: RunnerOptions = serde_yaml::from_str("{}").unwrap();
        assert_eq!(options.environment, ExecutionEnvironment::Tunnel);
        assert_eq!(options.base_urls, vec!["http://localhost:3000"]);
        assert_eq!(options.runner.args, vec!["--harmony"]);
        assert!(options.desktop.is_empty());
    }

    #[test]
    fn merge_replaces_scalars_and_recurses_maps() {
        let mut base = json!({
            "environment": "tunnel",
            "runner": {"bin": "a", "args": ["--harmony"]},
            "base_urls": ["http://one"],
        });
        let overlay = json!({
            "environment": "ci",
            "runner": {"bin": "b"},
            "extra": true,
        });

        merge_values(&mut base, overlay);

        assert_eq!(base["environment"], "ci");
        // untouched nested keys survive
        assert_eq!(base["runner"]["args"], json!(["--harmony"]));
        assert_eq!(base["runner"]["bin"], "b");
        // sequences are replaced wholesale, not merged
        assert_eq!(base["base_urls"], json!(["http://one"]));
        assert_eq!(base["extra"], true);
    }

    #[test]
    fn load_merged_prefers_parent_values() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base.yaml");
        let parent = dir.path().join("parent.yaml");

        let mut f = std::fs::File::create(&base).unwrap();
        writeln!(f, "environment: local\nbase_urls: [\"http://a\"]").unwrap();
        let mut f = std::fs::File::create(&parent).unwrap();
        writeln!(f, "environment: ci").unwrap();

        let options = RunnerOptions::load_merged(&base, Some(&parent)).unwrap();
        assert_eq!(options.environment, ExecutionEnvironment::Ci);
        assert_eq!(options.base_urls, vec!["http://a"]);
    }

    #[test]
    fn missing_options_file_is_fatal() {
        let err = RunnerOptions::load(Path::new("/nonexistent/options.yaml")).unwrap_err();
        assert!(matches!(err, Error::OptionsNotFound { .. }));
    }

    #[test]
    fn malformed_parent_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base.yaml");
        let parent = dir.path().join("parent.yaml");
        std::fs::write(&base, "environment: local\n").unwrap();
        std::fs::write(&parent, "environment: [unclosed\n").unwrap();

        let err = RunnerOptions::load_merged(&base, Some(&parent)).unwrap_err();
        assert!(matches!(err, Error::OptionsParse { .. }));
    }
}
