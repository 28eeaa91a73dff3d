//! Printing a diff stream
//!
//! One line per outcome with a stable two-character prefix, so the output
//! stays grep- and script-friendly.

use boffin_core::{DiffOutcome, FileInfo};
use clap::Args;

/// Per-outcome suppression flags for `boffin diff`
#[derive(Debug, Default, Clone, Copy, Args)]
pub struct HideFlags {
    /// hide files that have not changed
    #[arg(long)]
    pub hide_unchanged: bool,

    /// hide files where only metadata has changed, but are otherwise same
    #[arg(long)]
    pub hide_metadata_change: bool,

    /// hide files that have moved
    #[arg(long)]
    pub hide_moved: bool,

    /// hide files that only exist in local repo
    #[arg(long)]
    pub hide_local_only: bool,

    /// hide files that only exist in remote repo
    #[arg(long)]
    pub hide_remote_only: bool,

    /// hide files that were locally deleted, but still exist in remote repo
    #[arg(long)]
    pub hide_local_deleted: bool,

    /// hide files that were remotely deleted, but still exist in local repo
    #[arg(long)]
    pub hide_remote_deleted: bool,

    /// hide changed files which local version is newest
    #[arg(long)]
    pub hide_local_changed: bool,

    /// hide changed files which remote version is newest
    #[arg(long)]
    pub hide_remote_changed: bool,

    /// hide files which have conflicting changes in both local and remote repo
    #[arg(long)]
    pub hide_conflict: bool,
}

/// Print the outcome stream; returns the number of conflicts seen
/// (including suppressed ones).
pub fn report(local: &[FileInfo], remote: &[FileInfo], outcomes: &[DiffOutcome], hide: &HideFlags) -> usize {
    let lp = |i: usize| local[i].current_path();
    let rp = |j: usize| remote[j].current_path();
    let mut conflicts = 0;

    for outcome in outcomes {
        match *outcome {
            DiffOutcome::Unchanged { local, .. } => {
                if !hide.hide_unchanged {
                    println!("==:{}", lp(local));
                }
            }
            DiffOutcome::MetaDataChanged { local, .. } => {
                if !hide.hide_metadata_change {
                    println!("MD:{}", lp(local));
                }
            }
            DiffOutcome::Moved { local, remote } => {
                if !hide.hide_moved {
                    println!("=>:{} => {}", lp(local), rp(remote));
                }
            }
            DiffOutcome::LocalOnly { local } => {
                if !hide.hide_local_only {
                    println!("L+:{}", lp(local));
                }
            }
            DiffOutcome::RemoteOnly { remote } => {
                if !hide.hide_remote_only {
                    println!("R+:{}", rp(remote));
                }
            }
            // historically known on one side only; not worth a line
            DiffOutcome::LocalOld { .. } | DiffOutcome::RemoteOld { .. } => {}
            DiffOutcome::LocalDeleted { local, .. } => {
                if !hide.hide_local_deleted {
                    println!("L-:{}", lp(local));
                }
            }
            DiffOutcome::RemoteDeleted { remote, .. } => {
                if !hide.hide_remote_deleted {
                    println!("R-:{}", rp(remote));
                }
            }
            DiffOutcome::LocalChanged { local, .. } => {
                if !hide.hide_local_changed {
                    println!(">>:{}", lp(local));
                }
            }
            DiffOutcome::RemoteChanged { remote, .. } => {
                if !hide.hide_remote_changed {
                    println!("<<:{}", rp(remote));
                }
            }
            DiffOutcome::ConflictPath { local, remote } => {
                conflicts += 1;
                if !hide.hide_conflict {
                    println!("!!:{} ! {}", lp(local), rp(remote));
                }
            }
            DiffOutcome::ConflictHash {
                ref locals,
                ref remotes,
            } => {
                conflicts += 1;
                if !hide.hide_conflict {
                    for &i in locals {
                        println!("!!:{}", lp(i));
                    }
                    for &j in remotes {
                        println!("!!:{}", rp(j));
                    }
                }
            }
        }
    }

    conflicts
}
