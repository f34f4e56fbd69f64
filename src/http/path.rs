//! Request target to filesystem path mapping.
//!
//! Every target is checked against the document root before the filesystem is
//! touched. `..` segments are resolved lexically first, so an attempt to climb
//! above the root is rejected without any syscall; the path, or its deepest
//! existing ancestor when the file is missing, is then canonicalized to catch
//! symlinks that lead outside the root.

use std::io;
use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("invalid request target {0:?}")]
    InvalidTarget(String),
    #[error("request target {0:?} escapes the document root")]
    PathEscape(String),
}

/// Resolves request targets beneath a canonical document root.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    /// Creates a resolver for `root`, which must exist.
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref().canonicalize()?;
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("document root {} is not a directory", root.display()),
            ));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps `target` to an absolute path under the root.
    ///
    /// The returned path need not exist. If it does, it is the canonical path.
    pub fn resolve(&self, target: &str) -> Result<PathBuf, ResolveError> {
        let raw_path = target_path(target)?;

        let decoded = percent_decode_str(&raw_path)
            .decode_utf8()
            .map_err(|_| ResolveError::InvalidTarget(target.to_string()))?;
        if decoded.contains('\0') {
            return Err(ResolveError::InvalidTarget(target.to_string()));
        }

        let mut segments: Vec<&str> = Vec::new();
        for segment in decoded.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        tracing::warn!(request_target = %target, "Suspicious request target rejected");
                        return Err(ResolveError::PathEscape(target.to_string()));
                    }
                }
                other => segments.push(other),
            }
        }

        let mut path = self.root.clone();
        path.extend(segments);

        let (canonical, exists) = match path.canonicalize() {
            Ok(canonical) => (canonical, true),
            // Missing files are reported by the caller when it opens the path,
            // but the part of it that does exist must still stay in the root.
            Err(_) => match deepest_existing_ancestor(&path) {
                Some(ancestor) => (ancestor, false),
                None => return Err(ResolveError::PathEscape(target.to_string())),
            },
        };

        if !canonical.starts_with(&self.root) {
            tracing::warn!(
                request_target = %target,
                resolved = %canonical.display(),
                "Request target resolves outside the document root"
            );
            return Err(ResolveError::PathEscape(target.to_string()));
        }

        Ok(if exists { canonical } else { path })
    }
}

/// Canonical form of the closest ancestor of `path` that exists.
fn deepest_existing_ancestor(path: &Path) -> Option<PathBuf> {
    path.ancestors().skip(1).find_map(|p| p.canonicalize().ok())
}

/// Extracts the still percent-encoded path component of a request target.
fn target_path(target: &str) -> Result<String, ResolveError> {
    let invalid = || ResolveError::InvalidTarget(target.to_string());

    if target.is_empty() || target.bytes().any(|b| b.is_ascii_control() || b == b' ') {
        return Err(invalid());
    }

    if target.starts_with('/') {
        let end = target.find(['?', '#']).unwrap_or(target.len());
        return Ok(target[..end].to_string());
    }

    // absolute-form, e.g. from a client talking to a proxy
    let url = Url::parse(target).map_err(|_| invalid())?;
    match url.scheme() {
        "http" | "https" => Ok(url.path().to_string()),
        _ => Err(invalid()),
    }
}
