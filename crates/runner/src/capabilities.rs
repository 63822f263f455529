//! Capability resolution
//!
//! Turns the parsed invocation flags and the loaded runner options into
//! an execution plan: which orchestration branch runs, and the list of
//! session descriptors to feed the spawner. Detailed capability fields
//! are the options file's concern and pass through untouched.

use gridrun_common::{ExecutionEnvironment, RunnerOptions, SessionDescriptor};

/// Already-parsed invocation flags.
#[derive(Debug, Clone, Default)]
pub struct SessionFlags {
    /// Desktop selector; `None` means the flag was not given.
    pub desktop: Option<bool>,

    /// Mobile selector; `None` means the flag was not given.
    pub mobile: Option<bool>,

    /// Set when the invoked task name forces the tunnel branch.
    pub force_tunnel: bool,
}

impl SessionFlags {
    fn no_devices(&self) -> bool {
        self.desktop.is_none() && self.mobile.is_none()
    }
}

/// Resolver output: one environment decision and the descriptor list,
/// both fixed for the rest of the invocation.
#[derive(Debug, Clone)]
pub struct Plan {
    pub environment: ExecutionEnvironment,
    pub descriptors: Vec<SessionDescriptor>,
}

impl Plan {
    /// Live-preview-only invocation: tunnel up, nothing to run.
    pub fn is_tunnel_only(&self) -> bool {
        self.environment == ExecutionEnvironment::Tunnel && self.descriptors.is_empty()
    }
}

/// Decide the execution environment and produce the descriptor list.
///
/// A forced tunnel wins; otherwise the CI branch marker selects `ci`;
/// otherwise the options document decides. Running with no selector at
/// all means "run everything", except when the tunnel was forced, which
/// turns the invocation into a live preview with zero descriptors.
pub fn resolve(
    flags: &SessionFlags,
    options: &RunnerOptions,
    ci_branch: Option<&str>,
) -> Plan {
    let tunnel_only = flags.force_tunnel && flags.no_devices();

    if tunnel_only {
        return Plan {
            environment: ExecutionEnvironment::Tunnel,
            descriptors: Vec::new(),
        };
    }

    let environment = if flags.force_tunnel {
        ExecutionEnvironment::Tunnel
    } else if ci_branch.is_some() {
        ExecutionEnvironment::Ci
    } else {
        options.environment
    };

    // No selector defaults to running everything.
    let (desktop, mobile) = if flags.no_devices() {
        (true, true)
    } else {
        (
            flags.desktop.unwrap_or(false),
            flags.mobile.unwrap_or(false),
        )
    };

    let local = environment == ExecutionEnvironment::Local;
    let mut descriptors = Vec::new();

    for base_url in &options.base_urls {
        if desktop {
            for caps in &options.desktop {
                descriptors.push(SessionDescriptor::new(base_url.clone(), caps.clone(), local));
            }
        }
        if mobile {
            for caps in &options.mobile {
                descriptors.push(SessionDescriptor::new(base_url.clone(), caps.clone(), local));
            }
        }
    }

    Plan {
        environment,
        descriptors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Map, Value};

    fn caps(name: &str) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("browserName".into(), Value::String(name.into()));
        map
    }

    fn options() -> RunnerOptions {
        RunnerOptions {
            desktop: vec![caps("chrome"), caps("firefox")],
            mobile: vec![caps("iphone")],
            base_urls: vec!["http://a".into(), "http://b".into()],
            ..RunnerOptions::default()
        }
    }

    #[test]
    fn no_flags_selects_both_groups() {
        let plan = resolve(&SessionFlags::default(), &options(), None);
        // 2 base urls x (2 desktop + 1 mobile)
        assert_eq!(plan.descriptors.len(), 6);
        assert_eq!(plan.environment, ExecutionEnvironment::Tunnel);
    }

    #[test]
    fn tunnel_only_yields_empty_plan() {
        let flags = SessionFlags {
            force_tunnel: true,
            ..SessionFlags::default()
        };
        let plan = resolve(&flags, &options(), None);
        assert!(plan.is_tunnel_only());
        assert_eq!(plan.environment, ExecutionEnvironment::Tunnel);
        assert!(plan.descriptors.is_empty());
    }

    #[test]
    fn forced_tunnel_with_selector_still_runs_tests() {
        let flags = SessionFlags {
            desktop: Some(true),
            force_tunnel: true,
            ..SessionFlags::default()
        };
        let plan = resolve(&flags, &options(), None);
        assert_eq!(plan.environment, ExecutionEnvironment::Tunnel);
        assert_eq!(plan.descriptors.len(), 4);
        assert!(!plan.is_tunnel_only());
    }

    #[test]
    fn ci_marker_selects_ci() {
        let plan = resolve(&SessionFlags::default(), &options(), Some("main"));
        assert_eq!(plan.environment, ExecutionEnvironment::Ci);
    }

    #[test]
    fn desktop_flag_excludes_mobile() {
        let flags = SessionFlags {
            desktop: Some(true),
            ..SessionFlags::default()
        };
        let plan = resolve(&flags, &options(), None);
        assert_eq!(plan.descriptors.len(), 4);
        assert!(plan
            .descriptors
            .iter()
            .all(|d| d.capabilities["browserName"] != "iphone"));
    }

    #[test]
    fn local_environment_marks_descriptors_local() {
        let mut opts = options();
        opts.environment = ExecutionEnvironment::Local;
        let plan = resolve(&SessionFlags::default(), &opts, None);
        assert_eq!(plan.environment, ExecutionEnvironment::Local);
        assert!(plan.descriptors.iter().all(|d| d.local));
    }

    #[test]
    fn descriptor_order_follows_base_url_then_group() {
        let plan = resolve(&SessionFlags::default(), &options(), None);
        let labels: Vec<String> = plan.descriptors.iter().map(|d| d.label()).collect();
        assert_eq!(labels[0], "chrome @ http://a");
        assert_eq!(labels[2], "iphone @ http://a");
        assert_eq!(labels[3], "chrome @ http://b");
    }
}
