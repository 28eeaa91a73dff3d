//! Repository scan and reconciliation
//!
//! Update walks the base directory, hashes whatever the filter selects, and
//! feeds the observed state through the diff engine against the stored
//! history. The diff outcomes drive the history mutations.

use std::collections::HashMap;

use chrono::Utc;
use color_eyre::eyre::bail;
use color_eyre::Result;
use tracing::{debug, info, warn};

use crate::diff::{diff, DiffOutcome};
use crate::hash::Checksum;
use crate::history::{FileEvent, FileInfo};
use crate::repo::Repository;
use crate::scan::{ScanEntry, Scanner};

/// Decides whether an on-disk file needs to be hashed. Return `true` to
/// check the file, `false` to trust the stored state.
pub type Filter = fn(&ScanEntry, Option<&FileInfo>) -> bool;

/// Default filter: check the file if it is not tracked, is tracked as
/// deleted, or its size or modification time disagree with the store.
#[must_use]
pub fn meta_changed(entry: &ScanEntry, stored: Option<&FileInfo>) -> bool {
    let Some(stored) = stored else {
        return true;
    };
    stored.is_deleted()
        || entry.size != stored.current_size()
        || Some(entry.modified) != stored.current_time()
}

/// Filter that hashes every file regardless of stored metadata.
#[must_use]
pub fn force(_entry: &ScanEntry, _stored: Option<&FileInfo>) -> bool {
    true
}

/// Reconcile the on-disk tree with the history store.
///
/// Mutations happen in memory only; the caller decides whether to save.
///
/// # Errors
/// Returns an error if the base directory is missing, the scan or hashing
/// fails, or the diff produces an outcome that cannot arise from observing
/// a single repository.
pub fn update(repo: &mut Repository, filter: Filter) -> Result<()> {
    if !repo.base_dir().is_dir() {
        bail!(
            "base directory '{}' does not exist",
            repo.base_dir().display()
        );
    }

    let entries = Scanner::new(repo.base_dir()).scan()?;

    let mut by_path: HashMap<String, usize> = HashMap::new();
    for (idx, file) in repo.files().iter().enumerate() {
        if !file.is_deleted() {
            by_path.insert(file.current_path().to_string(), idx);
        }
    }

    let mut observed: Vec<FileInfo> = Vec::with_capacity(entries.len());
    for entry in &entries {
        let stored_idx = by_path.remove(&entry.rel_path);
        let stored = stored_idx.map(|idx| &repo.files()[idx]);

        if filter(entry, stored) {
            let checksum = Checksum::from_file(&entry.abs_path)?;
            info!("{checksum}: {}", entry.rel_path);
            observed.push(FileInfo::new(FileEvent::changed(
                entry.rel_path.clone(),
                entry.size,
                entry.modified,
                checksum,
            )));
        } else if let Some(idx) = stored_idx {
            // metadata matches the store, trust it without re-hashing
            observed.push(repo.files()[idx].clone());
        }
    }

    let outcomes = diff(repo.files(), &observed);
    apply(repo, observed, outcomes)
}

/// Apply diff outcomes to the repository. The `observed` side is consumed;
/// entries promoted to new tracked files are moved out of it.
fn apply(repo: &mut Repository, observed: Vec<FileInfo>, outcomes: Vec<DiffOutcome>) -> Result<()> {
    let mut observed: Vec<Option<FileInfo>> = observed.into_iter().map(Some).collect();
    let now = Utc::now();

    for outcome in outcomes {
        match outcome {
            DiffOutcome::Unchanged { .. } => {}
            DiffOutcome::MetaDataChanged { local, .. } => {
                // content is intact; leave the history alone
                debug!("M {}", repo.files()[local].current_path());
            }
            DiffOutcome::Moved { local, remote } => {
                let events = take(&mut observed, remote).history;
                let file = &mut repo.files_mut()[local];
                info!("@ {} => {}", file.current_path(), events[0].path);
                file.history.extend(events);
            }
            DiffOutcome::LocalOnly { local } => {
                let file = &mut repo.files_mut()[local];
                info!("- {}", file.current_path());
                file.mark_deleted(now);
            }
            DiffOutcome::LocalOld { .. } | DiffOutcome::RemoteOld { .. } => {}
            DiffOutcome::RemoteOnly { remote } => {
                let file = take(&mut observed, remote);
                info!("+ {}", file.current_path());
                repo.add_file(file);
            }
            DiffOutcome::RemoteChanged { local, remote } => {
                let event = current_event(&observed, remote);
                let file = &mut repo.files_mut()[local];
                info!("~ {} => {}", file.current_path(), event.path);
                file.append_change(
                    event.path,
                    event.size,
                    event.time,
                    event.checksum.unwrap_or_else(|| unreachable!("current event always has a checksum")),
                );
            }
            DiffOutcome::ConflictPath { local, remote } => {
                // a tracked path holds content with no recorded ancestry;
                // record it as the file's next version
                let event = current_event(&observed, remote);
                let file = &mut repo.files_mut()[local];
                info!("~ {} => {}", file.current_path(), event.path);
                file.append_change(
                    event.path,
                    event.size,
                    event.time,
                    event.checksum.unwrap_or_else(|| unreachable!("current event always has a checksum")),
                );
            }
            DiffOutcome::ConflictHash { locals, remotes } => {
                if locals.len() == 1 {
                    // one known ancestor, several on-disk descendants:
                    // track each descendant as its own file
                    for remote in remotes {
                        let file = take(&mut observed, remote);
                        warn!("! {}: tracking as new file", file.current_path());
                        repo.add_file(file);
                    }
                } else {
                    let paths: Vec<&str> = locals
                        .iter()
                        .map(|&i| repo.files()[i].current_path())
                        .collect();
                    bail!(
                        "unresolvable hash conflict while updating: {}",
                        paths.join(", ")
                    );
                }
            }
            DiffOutcome::LocalChanged { local, .. } => {
                bail!(
                    "'{}': store is ahead of the file on disk; diverging \
                     history cannot come from a scan",
                    repo.files()[local].current_path()
                );
            }
            DiffOutcome::LocalDeleted { local, .. } => {
                bail!(
                    "'{}': deleted file matched during update",
                    repo.files()[local].current_path()
                );
            }
            DiffOutcome::RemoteDeleted { local, .. } => {
                bail!(
                    "'{}': observed deletion event during update",
                    repo.files()[local].current_path()
                );
            }
        }
    }

    Ok(())
}

fn take(observed: &mut [Option<FileInfo>], idx: usize) -> FileInfo {
    observed[idx]
        .take()
        .unwrap_or_else(|| unreachable!("observed file {idx} consumed twice"))
}

fn current_event(observed: &[Option<FileInfo>], idx: usize) -> FileEvent {
    let file = observed[idx]
        .as_ref()
        .unwrap_or_else(|| unreachable!("observed file {idx} consumed twice"));
    let event = file
        .current()
        .unwrap_or_else(|| unreachable!("observed file {idx} has no content event"));
    event.clone()
}
