//! Workspace boundary checks for filesystem commands.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// How a resolved path is compared against the workspace root.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PathContainment {
    /// Root components must be a prefix of the candidate's components.
    #[default]
    Component,
    /// Plain string prefix of the rendered paths. Accepts siblings such as
    /// `/data/sandbox-evil` for a root of `/data/sandbox`.
    StringPrefix,
}

/// Decides whether a relative path stays inside the workspace root.
#[derive(Debug, Clone)]
pub struct PathGuard {
    root: PathBuf,
    containment: PathContainment,
}

impl PathGuard {
    /// `root` must already be canonical.
    pub fn new(root: PathBuf, containment: PathContainment) -> Self {
        Self { root, containment }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn containment(&self) -> PathContainment {
        self.containment
    }

    pub fn is_safe(&self, candidate: &str) -> bool {
        self.resolve(candidate).is_some()
    }

    /// Resolve `candidate` against the root and return the canonical path
    /// if it passes the containment check. Any resolution failure counts as
    /// unsafe.
    pub fn resolve(&self, candidate: &str) -> Option<PathBuf> {
        let resolved = match resolve_lenient(&self.root.join(candidate)) {
            Ok(p) => p,
            Err(e) => {
                tracing::debug!("Path resolution failed for {:?}: {}", candidate, e);
                return None;
            }
        };

        let contained = match self.containment {
            PathContainment::Component => resolved.starts_with(&self.root),
            PathContainment::StringPrefix => resolved
                .to_string_lossy()
                .starts_with(self.root.to_string_lossy().as_ref()),
        };

        contained.then_some(resolved)
    }

    /// Render `path` relative to the root, falling back to `fallback` when
    /// it is not underneath it.
    pub fn display_relative(&self, path: &Path, fallback: &str) -> String {
        match path.strip_prefix(&self.root) {
            Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
            Ok(rel) => rel.display().to_string(),
            Err(_) => fallback.to_string(),
        }
    }
}

/// Resolve `path` one component at a time, like a non-strict `realpath`.
/// Every prefix that exists is canonicalized before the next component is
/// applied, so symlinks are followed wherever they appear and `..` always
/// pops from a real directory. Components past the last existing one are
/// joined lexically. Unlike `fs::canonicalize` this accepts paths that do
/// not exist yet.
pub fn resolve_lenient(path: &Path) -> io::Result<PathBuf> {
    if path.as_os_str().to_string_lossy().contains('\0') {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "path contains a NUL byte",
        ));
    }

    let mut resolved = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => resolved.push(component),
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            Component::Normal(part) => {
                resolved.push(part);
                // A dangling symlink has metadata but no canonical form
                if fs::symlink_metadata(&resolved).is_ok() {
                    resolved = resolved.canonicalize()?;
                }
            }
        }
    }

    if resolved.as_os_str().is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("cannot resolve {}", path.display()),
        ));
    }
    Ok(resolved)
}
