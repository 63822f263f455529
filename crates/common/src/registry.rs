//! Task provider registry
//!
//! Named tasks are backed by option documents. Two providers are
//! registered at startup and queried in fixed priority order: the parent
//! project's task directory first, then the bundled defaults. The first
//! provider with a matching document wins.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Error, Result};

/// Where a resolved task document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOrigin {
    Parent,
    Builtin,
}

impl std::fmt::Display for TaskOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskOrigin::Parent => f.write_str("parent"),
            TaskOrigin::Builtin => f.write_str("builtin"),
        }
    }
}

/// A task document located by a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTask {
    pub path: PathBuf,
    pub origin: TaskOrigin,
}

#[derive(Debug)]
struct Provider {
    origin: TaskOrigin,
    dir: PathBuf,
}

impl Provider {
    /// Probe `<dir>/<task>.yaml`, then `<dir>/<task>/task.yaml`.
    fn locate(&self, task: &str) -> Option<PathBuf> {
        let file = self.dir.join(format!("{task}.yaml"));
        if file.is_file() {
            return Some(file);
        }

        let nested = self.dir.join(task).join("task.yaml");
        if nested.is_file() {
            return Some(nested);
        }

        None
    }
}

/// Ordered provider list, populated once at startup.
#[derive(Debug)]
pub struct TaskRegistry {
    providers: Vec<Provider>,
}

impl TaskRegistry {
    pub fn new(parent_dir: Option<PathBuf>, builtin_dir: PathBuf) -> Self {
        let mut providers = Vec::with_capacity(2);
        if let Some(dir) = parent_dir {
            providers.push(Provider {
                origin: TaskOrigin::Parent,
                dir,
            });
        }
        providers.push(Provider {
            origin: TaskOrigin::Builtin,
            dir: builtin_dir,
        });

        Self { providers }
    }

    /// Every matching document in priority order. The last entry serves
    /// as the merge base, earlier entries overlay it.
    pub fn candidates(&self, task: &str) -> Vec<ResolvedTask> {
        self.providers
            .iter()
            .filter_map(|provider| {
                provider.locate(task).map(|path| {
                    debug!("{} task found at {}", provider.origin, path.display());
                    ResolvedTask {
                        path,
                        origin: provider.origin,
                    }
                })
            })
            .collect()
    }

    /// Highest-priority document for `task`.
    pub fn resolve(&self, task: &str) -> Result<ResolvedTask> {
        self.candidates(task)
            .into_iter()
            .next()
            .ok_or_else(|| Error::TaskNotFound(task.to_string()))
    }

    /// The bundled document and the parent overlay (if any) for `task`,
    /// in the order the options loader wants them.
    pub fn merge_pair(&self, task: &str) -> Result<(PathBuf, Option<PathBuf>)> {
        let candidates = self.candidates(task);
        let builtin = candidates.iter().find(|c| c.origin == TaskOrigin::Builtin);
        let parent = candidates.iter().find(|c| c.origin == TaskOrigin::Parent);

        match (builtin, parent) {
            (Some(base), overlay) => Ok((base.path.clone(), overlay.map(|c| c.path.clone()))),
            (None, Some(base)) => Ok((base.path.clone(), None)),
            (None, None) => Err(Error::TaskNotFound(task.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "environment: tunnel\n").unwrap();
    }

    #[test]
    fn parent_provider_wins() {
        let dir = tempfile::tempdir().unwrap();
        let parent = dir.path().join("tasks");
        let builtin = dir.path().join("defaults");
        touch(&parent.join("test.yaml"));
        touch(&builtin.join("test.yaml"));

        let registry = TaskRegistry::new(Some(parent.clone()), builtin);
        let resolved = registry.resolve("test").unwrap();
        assert_eq!(resolved.origin, TaskOrigin::Parent);
        assert_eq!(resolved.path, parent.join("test.yaml"));
    }

    #[test]
    fn builtin_fallback_and_nested_probe() {
        let dir = tempfile::tempdir().unwrap();
        let builtin = dir.path().join("defaults");
        touch(&builtin.join("tunnel").join("task.yaml"));

        let registry = TaskRegistry::new(None, builtin.clone());
        let resolved = registry.resolve("tunnel").unwrap();
        assert_eq!(resolved.origin, TaskOrigin::Builtin);
        assert_eq!(resolved.path, builtin.join("tunnel").join("task.yaml"));
    }

    #[test]
    fn unknown_task_errors() {
        let dir = tempfile::tempdir().unwrap();
        let registry = TaskRegistry::new(None, dir.path().to_path_buf());
        assert!(registry.resolve("nope").is_err());
    }

    #[test]
    fn merge_pair_orders_base_then_overlay() {
        let dir = tempfile::tempdir().unwrap();
        let parent = dir.path().join("tasks");
        let builtin = dir.path().join("defaults");
        touch(&parent.join("test.yaml"));
        touch(&builtin.join("test.yaml"));

        let registry = TaskRegistry::new(Some(parent.clone()), builtin.clone());
        let (base, overlay) = registry.merge_pair("test").unwrap();
        assert_eq!(base, builtin.join("test.yaml"));
        assert_eq!(overlay, Some(parent.join("test.yaml")));

        // parent-only task: the parent document is the base
        touch(&parent.join("custom.yaml"));
        let (base, overlay) = registry.merge_pair("custom").unwrap();
        assert_eq!(base, parent.join("custom.yaml"));
        assert_eq!(overlay, None);
    }
}
