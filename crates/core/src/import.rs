//! Importing remote changes into the local repository
//!
//! Remote additions land under the local import directory; remote content
//! changes overwrite the matching local file. Renames and deletions are
//! only mirrored when explicitly requested. Side-effect failures are
//! counted and reported but never abort the remaining stream.

use std::path::{Path, PathBuf};

use color_eyre::eyre::eyre;
use color_eyre::Result;
use tracing::{debug, error, info, warn};

use crate::copy::copy_file;
use crate::diff::{diff, DiffOutcome};
use crate::repo::Repository;

/// Knobs for [`import`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Mirror remote renames by renaming local files on disk
    pub move_files: bool,
    /// Mirror remote deletions by deleting local files
    pub delete_files: bool,
    /// Skip every disk mutation
    pub dry_run: bool,
}

/// What happened during an import
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportReport {
    /// Files copied or replaced
    pub copied: usize,
    /// Files renamed on disk
    pub moved: usize,
    /// Files deleted on disk
    pub deleted: usize,
    /// Conflicts left untouched
    pub conflicts: usize,
    /// Side-effect failures
    pub errors: usize,
}

/// Bring remote additions and changes into the local repository.
///
/// The local history is extended in memory; the caller saves it. Disk
/// failures are accumulated in the report rather than propagated.
///
/// # Errors
/// Returns an error only for structural problems (an import directory that
/// cannot be expressed inside the base directory).
pub fn import(
    local: &mut Repository,
    remote: &Repository,
    options: &ImportOptions,
) -> Result<ImportReport> {
    let import_rel = local
        .import_dir()
        .strip_prefix(local.base_dir())
        .map(Path::to_path_buf)
        .map_err(|_| {
            eyre!(
                "import directory '{}' is not under base directory '{}'",
                local.import_dir().display(),
                local.base_dir().display()
            )
        })?;

    let outcomes = diff(local.files(), remote.files());
    let mut report = ImportReport::default();

    for outcome in outcomes {
        match outcome {
            DiffOutcome::Unchanged { .. }
            | DiffOutcome::MetaDataChanged { .. }
            | DiffOutcome::LocalOnly { .. }
            | DiffOutcome::LocalOld { .. }
            | DiffOutcome::RemoteOld { .. }
            | DiffOutcome::LocalDeleted { .. } => {}
            DiffOutcome::LocalChanged { local: l, .. } => {
                debug!(">> {}: local is newer, nothing to import", path_of(local, l));
            }
            DiffOutcome::RemoteOnly { remote: r } => {
                import_addition(local, remote, r, &import_rel, options, &mut report);
            }
            DiffOutcome::RemoteChanged { local: l, remote: r } => {
                import_change(local, remote, l, r, options, &mut report);
            }
            DiffOutcome::Moved { local: l, remote: r } => {
                import_move(local, remote, l, r, options, &mut report);
            }
            DiffOutcome::RemoteDeleted { local: l, .. } => {
                import_deletion(local, l, options, &mut report);
            }
            DiffOutcome::ConflictPath { local: l, remote: r } => {
                warn!(
                    "!! {} ! {}: conflicting histories, not importing",
                    path_of(local, l),
                    remote.files()[r].current_path()
                );
                report.conflicts += 1;
            }
            DiffOutcome::ConflictHash { locals, remotes } => {
                for &l in &locals {
                    warn!("!! {}: conflicting history, not importing", path_of(local, l));
                }
                for &r in &remotes {
                    warn!(
                        "!! {}: conflicting history, not importing",
                        remote.files()[r].current_path()
                    );
                }
                report.conflicts += 1;
            }
        }
    }

    Ok(report)
}

fn path_of(repo: &Repository, idx: usize) -> String {
    repo.files()[idx].current_path().to_string()
}

fn native(base: &Path, rel: &str) -> PathBuf {
    let mut path = base.to_path_buf();
    path.extend(rel.split('/'));
    path
}

fn import_addition(
    local: &mut Repository,
    remote: &Repository,
    r: usize,
    import_rel: &Path,
    options: &ImportOptions,
    report: &mut ImportReport,
) {
    let remote_file = &remote.files()[r];
    let rel = remote_file.current_path();
    let src = native(remote.base_dir(), rel);
    let import_prefix = import_rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    let dest_rel = format!("{import_prefix}/{rel}");
    let dest = native(local.base_dir(), &dest_rel);

    info!("R+ {} => {}", rel, dest_rel);
    if !options.dry_run {
        if let Err(err) = copy_file(&src, &dest) {
            error!("{rel}: import failed: {err}");
            report.errors += 1;
            return;
        }
    }
    report.copied += 1;

    let current = remote_file.current().cloned();
    let mut tracked = remote_file.clone();
    if let Some(event) = current {
        if let Some(checksum) = event.checksum {
            tracked.append_change(dest_rel, event.size, event.time, checksum);
        }
    }
    local.add_file(tracked);
}

fn import_change(
    local: &mut Repository,
    remote: &Repository,
    l: usize,
    r: usize,
    options: &ImportOptions,
    report: &mut ImportReport,
) {
    let remote_file = &remote.files()[r];
    let local_rel = local.files()[l].current_path().to_string();
    let src = native(remote.base_dir(), remote_file.current_path());
    let dest = native(local.base_dir(), &local_rel);

    info!("<< {} => {}", remote_file.current_path(), local_rel);
    if !options.dry_run {
        if let Err(err) = copy_file(&src, &dest) {
            error!("{local_rel}: import failed: {err}");
            report.errors += 1;
            return;
        }
    }
    report.copied += 1;

    if let Some(current) = remote_file.current() {
        if let Some(checksum) = current.checksum.clone() {
            local.files_mut()[l].append_change(local_rel, current.size, current.time, checksum);
        }
    }
}

fn import_move(
    local: &mut Repository,
    remote: &Repository,
    l: usize,
    r: usize,
    options: &ImportOptions,
    report: &mut ImportReport,
) {
    let remote_file = &remote.files()[r];
    let local_rel = local.files()[l].current_path().to_string();
    let remote_rel = remote_file.current_path().to_string();

    if !options.move_files {
        debug!("=> {local_rel} => {remote_rel}: rename not requested");
        return;
    }

    info!("=> {local_rel} => {remote_rel}");
    if !options.dry_run {
        let from = native(local.base_dir(), &local_rel);
        let to = native(local.base_dir(), &remote_rel);
        if let Some(parent) = to.parent() {
            if let Err(err) = std::fs::create_dir_all(parent) {
                error!("{remote_rel}: rename failed: {err}");
                report.errors += 1;
                return;
            }
        }
        if let Err(err) = std::fs::rename(&from, &to) {
            error!("{local_rel} => {remote_rel}: rename failed: {err}");
            report.errors += 1;
            return;
        }
    }
    report.moved += 1;

    if let Some(current) = remote_file.current() {
        if let Some(checksum) = current.checksum.clone() {
            local.files_mut()[l].append_change(remote_rel, current.size, current.time, checksum);
        }
    }
}

fn import_deletion(
    local: &mut Repository,
    l: usize,
    options: &ImportOptions,
    report: &mut ImportReport,
) {
    let local_rel = local.files()[l].current_path().to_string();

    if !options.delete_files {
        debug!("R- {local_rel}: deletion not requested");
        return;
    }

    info!("R- {local_rel}");
    if !options.dry_run {
        let path = native(local.base_dir(), &local_rel);
        if let Err(err) = std::fs::remove_file(&path) {
            error!("{local_rel}: delete failed: {err}");
            report.errors += 1;
            return;
        }
    }
    report.deleted += 1;
    local.files_mut()[l].mark_deleted(chrono::Utc::now());
}
