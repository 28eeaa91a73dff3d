//! Directory scanning via the `ignore` crate

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use ignore::WalkBuilder;
use tracing::warn;

use crate::repo::DB_DIR_NAME;

/// Metadata for a single regular file found under the scan root
#[derive(Debug, Clone)]
pub struct ScanEntry {
    /// Absolute path, for I/O
    pub abs_path: PathBuf,
    /// Path relative to the scan root, `/`-separated on every OS
    pub rel_path: String,
    /// File size in bytes
    pub size: u64,
    /// Modification time
    pub modified: DateTime<Utc>,
}

/// Scanner for a repository's base directory.
///
/// Prunes the metadata directory and any dot-directory; dot files are
/// included. Gitignore semantics are deliberately disabled: the repository
/// tracks everything it can see.
pub struct Scanner {
    root: PathBuf,
}

impl Scanner {
    /// Create a new scanner for the given root directory
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn walk_builder(&self) -> WalkBuilder {
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .ignore(false)
            .parents(false)
            .require_git(false)
            .filter_entry(|entry| {
                if entry.depth() == 0 {
                    return true;
                }
                if !entry.file_type().is_some_and(|t| t.is_dir()) {
                    return true;
                }
                let name = entry.file_name().to_string_lossy();
                name != DB_DIR_NAME && !name.starts_with('.')
            });
        builder
    }

    /// Scan the tree and return all regular files, sorted by relative path.
    ///
    /// Permission-denied entries are logged and skipped; any other
    /// traversal error is fatal.
    ///
    /// # Errors
    /// Returns an error if directory traversal fails for a reason other
    /// than permissions.
    pub fn scan(&self) -> Result<Vec<ScanEntry>> {
        let mut entries = Vec::new();

        for result in self.walk_builder().build() {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    if is_permission_denied(&err) {
                        warn!("{err}: permission denied");
                        continue;
                    }
                    return Err(eyre!("scan of '{}' failed: {err}", self.root.display()));
                }
            };

            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(err) => {
                    if is_permission_denied(&err) {
                        warn!("{}: permission denied", entry.path().display());
                        continue;
                    }
                    return Err(eyre!("{}: stat failed: {err}", entry.path().display()));
                }
            };

            let rel_path = entry
                .path()
                .strip_prefix(&self.root)
                .map_err(|_| {
                    eyre!(
                        "unexpected error; '{}' is not under '{}'",
                        entry.path().display(),
                        self.root.display()
                    )
                })
                .map(rel_path_string)?;

            let modified = metadata
                .modified()
                .map_err(|err| eyre!("{}: no modification time: {err}", entry.path().display()))?;

            entries.push(ScanEntry {
                abs_path: entry.path().to_path_buf(),
                rel_path,
                size: metadata.len(),
                modified: DateTime::<Utc>::from(modified),
            });
        }

        // deterministic order for everything downstream
        entries.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));

        Ok(entries)
    }
}

/// Render a relative path with `/` separators regardless of host OS.
fn rel_path_string(path: &Path) -> String {
    let parts: Vec<_> = path
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    parts.join("/")
}

fn is_permission_denied(err: &ignore::Error) -> bool {
    err.io_error()
        .is_some_and(|io| io.kind() == std::io::ErrorKind::PermissionDenied)
}
