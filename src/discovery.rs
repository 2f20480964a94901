//! Vault discovery: target resolution, extension filtering, and the walk.
//!
//! [`find_relevant_files`] enumerates every entry below the vault root,
//! keeps the regular files that pass the [`PathFilter`], and (when targets
//! are active) only those that equal a target or sit below a target
//! directory. The result is sorted by full path string so everything
//! downstream (tree, content, prompt) is deterministic regardless of the
//! order the filesystem hands entries back.
//!
//! Nothing short of an unusable vault root fails the call. Bad targets,
//! unreadable subtrees, and dangling symlinks become [`DiscoveryWarning`]s on
//! the returned [`Discovery`].

use std::fmt;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{Result, VaultError};
use crate::models::ExtensionFilter;

/// Extension rules plus optional relative-path ignore globs.
#[derive(Debug, Clone)]
pub struct PathFilter {
    extensions: ExtensionFilter,
    ignore: GlobSet,
}

impl PathFilter {
    pub fn new(extensions: ExtensionFilter) -> Self {
        Self {
            extensions,
            ignore: GlobSet::empty(),
        }
    }

    /// Skip every entry whose vault-relative path matches one of `patterns`.
    pub fn with_ignore_globs(mut self, patterns: &[String]) -> Result<Self> {
        self.ignore = build_globset(patterns)?;
        Ok(self)
    }

    pub fn extensions(&self) -> &ExtensionFilter {
        &self.extensions
    }

    fn is_ignored(&self, root: &Path, path: &Path) -> bool {
        if self.ignore.is_empty() {
            return false;
        }
        match path.strip_prefix(root) {
            Ok(rel) if !rel.as_os_str().is_empty() => self.ignore.is_match(to_posix(rel)),
            _ => false,
        }
    }
}

/// Where discovery looked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchScope {
    /// No targets were requested.
    WholeVault,
    /// Canonical target paths inside the vault.
    Targets(Vec<PathBuf>),
    /// Targets were requested but none of them was usable.
    WholeVaultFallback,
}

impl SearchScope {
    pub fn is_fallback(&self) -> bool {
        matches!(self, SearchScope::WholeVaultFallback)
    }
}

/// A recoverable problem met during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryWarning {
    InvalidTarget { target: String, reason: String },
    AllTargetsInvalid,
    PermissionDenied { path: PathBuf },
    Unresolvable { path: PathBuf, reason: String },
    Aborted { reason: String },
}

impl fmt::Display for DiscoveryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryWarning::InvalidTarget { target, reason } => {
                write!(f, "ignoring target '{}': {}", target, reason)
            }
            DiscoveryWarning::AllTargetsInvalid => {
                write!(f, "no valid target path found; searching the whole vault")
            }
            DiscoveryWarning::PermissionDenied { path } => {
                write!(f, "permission denied: {}", path.display())
            }
            DiscoveryWarning::Unresolvable { path, reason } => {
                write!(f, "cannot resolve {}: {}", path.display(), reason)
            }
            DiscoveryWarning::Aborted { reason } => {
                write!(f, "discovery stopped early: {}", reason)
            }
        }
    }
}

/// Outcome of one discovery pass.
#[derive(Debug, Clone)]
pub struct Discovery {
    /// Canonical vault root every file path starts with.
    pub root: PathBuf,
    /// Relevant files, sorted by path string, no duplicates.
    pub files: Vec<PathBuf>,
    pub scope: SearchScope,
    pub warnings: Vec<DiscoveryWarning>,
    /// Regular files visited, relevant or not.
    pub files_seen: usize,
}

pub fn find_relevant_files(
    vault_root: &Path,
    targets: &[String],
    filter: &PathFilter,
) -> Result<Discovery> {
    if !vault_root.is_dir() {
        return Err(VaultError::Configuration(format!(
            "vault root does not exist or is not a directory: {}",
            vault_root.display()
        )));
    }
    let root = vault_root.canonicalize().map_err(|e| {
        VaultError::Configuration(format!(
            "cannot resolve vault root {}: {}",
            vault_root.display(),
            e
        ))
    })?;

    let mut warnings = Vec::new();
    let scope = resolve_targets(&root, targets, &mut warnings);

    match &scope {
        SearchScope::Targets(resolved) => info!(
            filter = %filter.extensions(),
            targets = resolved.len(),
            "searching targets in {}",
            root.display()
        ),
        _ => info!(filter = %filter.extensions(), "searching whole vault {}", root.display()),
    }

    let mut files = Vec::new();
    let mut files_seen = 0usize;

    let walker = WalkDir::new(&root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !filter.is_ignored(&root, entry.path()));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
                if is_permission_denied(&err) {
                    warn!("permission denied, skipping {}", path.display());
                    warnings.push(DiscoveryWarning::PermissionDenied { path });
                    continue;
                }
                warn!("unexpected error while walking the vault: {}", err);
                warnings.push(DiscoveryWarning::Aborted {
                    reason: err.to_string(),
                });
                break;
            }
        };

        let path = entry.path();
        if entry.file_type().is_symlink() {
            // Symlinked files count when their target is a regular file;
            // symlinked directories are not descended into.
            match std::fs::metadata(path) {
                Ok(meta) if meta.is_file() => {}
                Ok(_) => continue,
                Err(e) => {
                    warn!("dangling symlink {}: {}", path.display(), e);
                    warnings.push(DiscoveryWarning::Unresolvable {
                        path: path.to_path_buf(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            }
        } else if !entry.file_type().is_file() {
            continue;
        }

        files_seen += 1;

        if !filter.extensions().accepts(path) {
            continue;
        }

        if let SearchScope::Targets(resolved_targets) = &scope {
            let resolved = match path.canonicalize() {
                Ok(p) => p,
                Err(e) => {
                    warn!("cannot resolve {}: {}", path.display(), e);
                    warnings.push(DiscoveryWarning::Unresolvable {
                        path: path.to_path_buf(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            if !resolved_targets.iter().any(|t| resolved.starts_with(t)) {
                continue;
            }
        }

        files.push(path.to_path_buf());
    }

    // Byte order of the full path string, not component order.
    files.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
    files.dedup();

    debug!(files_seen, relevant = files.len(), "discovery finished");

    Ok(Discovery {
        root,
        files,
        scope,
        warnings,
        files_seen,
    })
}

/// Resolve target strings against the canonical vault root.
fn resolve_targets(
    root: &Path,
    targets: &[String],
    warnings: &mut Vec<DiscoveryWarning>,
) -> SearchScope {
    if targets.is_empty() {
        return SearchScope::WholeVault;
    }

    let mut resolved: Vec<PathBuf> = Vec::new();
    for target in targets {
        let candidate = if Path::new(target).is_absolute() {
            PathBuf::from(target)
        } else {
            root.join(target)
        };

        let canonical = match candidate.canonicalize() {
            Ok(p) => p,
            Err(e) => {
                warn!("target '{}' does not exist: {}", target, e);
                warnings.push(DiscoveryWarning::InvalidTarget {
                    target: target.clone(),
                    reason: format!("does not exist ({})", e),
                });
                continue;
            }
        };

        if !canonical.starts_with(root) {
            warn!("target '{}' lies outside the vault", target);
            warnings.push(DiscoveryWarning::InvalidTarget {
                target: target.clone(),
                reason: format!("outside the vault {}", root.display()),
            });
            continue;
        }

        if !resolved.contains(&canonical) {
            resolved.push(canonical);
        }
    }

    if resolved.is_empty() {
        warn!("no valid target path found; falling back to the whole vault");
        warnings.push(DiscoveryWarning::AllTargetsInvalid);
        return SearchScope::WholeVaultFallback;
    }

    resolved.sort();
    SearchScope::Targets(resolved)
}

fn is_permission_denied(err: &walkdir::Error) -> bool {
    err.io_error()
        .map(|e| e.kind() == std::io::ErrorKind::PermissionDenied)
        .unwrap_or(false)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| {
            VaultError::Configuration(format!("invalid ignore glob '{}': {}", pattern, e))
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| VaultError::Configuration(format!("invalid ignore globs: {}", e)))
}

/// Render a relative path with `/` separators on every platform.
pub fn to_posix(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
