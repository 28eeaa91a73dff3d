//! Repository comparison
//!
//! Classifies every file on both sides of a local/remote pair into exactly
//! one outcome. Matching runs as a sequence of passes, each consuming the
//! pairs it can explain and handing the residue to the next:
//!
//! 1. identical current path and current hash
//! 2. identical current hash, any path (renames)
//! 3. remote current hash found in local history (local is newer)
//! 4. local current hash found in remote history (remote is newer)
//! 5. any shared historical hash (conflicts, matched dead files)
//! 6. identical current path with unrelated histories
//!
//! Anything left after pass 6 is a singleton. Deleted files sit out passes
//! 1-4; they can only be matched through shared history in pass 5.

use std::collections::{BTreeMap, BTreeSet};

use crate::hash::Checksum;
use crate::history::FileInfo;

/// One classified result. Indices refer into the `local` and `remote`
/// slices given to [`diff`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffOutcome {
    /// Same path, same content, same time
    Unchanged { local: usize, remote: usize },
    /// Same path and content, modification time drifted
    MetaDataChanged { local: usize, remote: usize },
    /// Same content under a different path
    Moved { local: usize, remote: usize },
    /// Local file with no remote counterpart
    LocalOnly { local: usize },
    /// Deleted local file with no remote counterpart
    LocalOld { local: usize },
    /// Remote file with no local counterpart
    RemoteOnly { remote: usize },
    /// Deleted remote file with no local counterpart
    RemoteOld { remote: usize },
    /// File deleted locally, still present remotely
    LocalDeleted { local: usize, remote: usize },
    /// File deleted remotely, still present locally
    RemoteDeleted { local: usize, remote: usize },
    /// Local history has advanced past the version remote still holds
    LocalChanged { local: usize, remote: usize },
    /// Remote history has advanced past the version local still holds
    RemoteChanged { local: usize, remote: usize },
    /// Files sharing hashes that cannot be linearized one-to-one
    ConflictHash {
        locals: Vec<usize>,
        remotes: Vec<usize>,
    },
    /// Same current path, no shared history
    ConflictPath { local: usize, remote: usize },
}

/// Compare two repositories' file lists.
///
/// Every index on each side appears in exactly one emitted outcome.
#[must_use]
pub fn diff(local: &[FileInfo], remote: &[FileInfo]) -> Vec<DiffOutcome> {
    let mut out = Vec::with_capacity(local.len() + remote.len());

    let l: Vec<usize> = (0..local.len()).collect();
    let r: Vec<usize> = (0..remote.len()).collect();

    let (l, r) = match_by_path_and_current_hash(local, remote, l, r, &mut out);
    let (l, r) = match_by_current_hash(local, remote, l, r, &mut out);
    let (l, r) = match_remote_current_to_local_history(local, remote, l, r, &mut out);
    let (l, r) = match_local_current_to_remote_history(local, remote, l, r, &mut out);
    let (l, r) = match_by_historical_hash(local, remote, l, r, &mut out);
    let (l, r) = match_by_path(local, remote, l, r, &mut out);

    for i in l {
        out.push(if local[i].is_deleted() {
            DiffOutcome::LocalOld { local: i }
        } else {
            DiffOutcome::LocalOnly { local: i }
        });
    }
    for j in r {
        out.push(if remote[j].is_deleted() {
            DiffOutcome::RemoteOld { remote: j }
        } else {
            DiffOutcome::RemoteOnly { remote: j }
        });
    }

    out
}

/// Pass 1: merge both sides sorted by current path; equal non-deleted pairs
/// with equal current hashes are unchanged (or metadata-changed when the
/// times disagree).
fn match_by_path_and_current_hash(
    local: &[FileInfo],
    remote: &[FileInfo],
    mut l: Vec<usize>,
    mut r: Vec<usize>,
    out: &mut Vec<DiffOutcome>,
) -> (Vec<usize>, Vec<usize>) {
    l.sort_by(|&a, &b| local[a].current_path().cmp(local[b].current_path()));
    r.sort_by(|&a, &b| remote[a].current_path().cmp(remote[b].current_path()));

    let mut new_l = Vec::with_capacity(l.len());
    let mut new_r = Vec::with_capacity(r.len());

    let mut i = 0;
    let mut j = 0;
    while i < l.len() && j < r.len() {
        let lf = &local[l[i]];
        let rf = &remote[r[j]];
        match lf.current_path().cmp(rf.current_path()) {
            std::cmp::Ordering::Less => {
                new_l.push(l[i]);
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                new_r.push(r[j]);
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                let matched = !lf.is_deleted()
                    && !rf.is_deleted()
                    && lf.checksum().is_some()
                    && lf.checksum() == rf.checksum();
                if matched {
                    if lf.current_time() == rf.current_time() {
                        out.push(DiffOutcome::Unchanged {
                            local: l[i],
                            remote: r[j],
                        });
                    } else {
                        out.push(DiffOutcome::MetaDataChanged {
                            local: l[i],
                            remote: r[j],
                        });
                    }
                } else {
                    new_l.push(l[i]);
                    new_r.push(r[j]);
                }
                i += 1;
                j += 1;
            }
        }
    }
    // drain both residuals
    new_l.extend_from_slice(&l[i..]);
    new_r.extend_from_slice(&r[j..]);

    (new_l, new_r)
}

/// Map non-deleted survivors by their current checksum.
fn current_hash_map<'a>(
    files: &'a [FileInfo],
    survivors: &[usize],
) -> BTreeMap<&'a Checksum, Vec<usize>> {
    let mut map: BTreeMap<&Checksum, Vec<usize>> = BTreeMap::new();
    for &idx in survivors {
        if files[idx].is_deleted() {
            continue;
        }
        if let Some(checksum) = files[idx].checksum() {
            map.entry(checksum).or_default().push(idx);
        }
    }
    map
}

/// Map survivors by every historical checksum; each file listed at most
/// once per checksum. `include_deleted` controls whether dead files join.
fn historical_hash_map<'a>(
    files: &'a [FileInfo],
    survivors: &[usize],
    include_deleted: bool,
) -> BTreeMap<&'a Checksum, Vec<usize>> {
    let mut map: BTreeMap<&Checksum, Vec<usize>> = BTreeMap::new();
    for &idx in survivors {
        if !include_deleted && files[idx].is_deleted() {
            continue;
        }
        let mut seen: BTreeSet<&Checksum> = BTreeSet::new();
        for checksum in files[idx].historical_checksums() {
            if seen.insert(checksum) {
                map.entry(checksum).or_default().push(idx);
            }
        }
    }
    map
}

/// Pass 2: files with identical current hashes under different paths are
/// renames, but only when the match is one-to-one. Any ambiguity carries
/// the whole group forward.
fn match_by_current_hash(
    local: &[FileInfo],
    remote: &[FileInfo],
    l: Vec<usize>,
    r: Vec<usize>,
    out: &mut Vec<DiffOutcome>,
) -> (Vec<usize>, Vec<usize>) {
    let mut new_l: Vec<usize> = l.iter().copied().filter(|&i| local[i].is_deleted()).collect();
    let mut new_r: Vec<usize> = r
        .iter()
        .copied()
        .filter(|&j| remote[j].is_deleted())
        .collect();

    let local_by_hash = current_hash_map(local, &l);
    let mut remote_by_hash = current_hash_map(remote, &r);

    for (hash, locals) in local_by_hash {
        if let Some(remotes) = remote_by_hash.remove(hash) {
            if locals.len() == 1 && remotes.len() == 1 {
                out.push(DiffOutcome::Moved {
                    local: locals[0],
                    remote: remotes[0],
                });
            } else {
                new_l.extend_from_slice(&locals);
                new_r.extend_from_slice(&remotes);
            }
        } else {
            new_l.extend_from_slice(&locals);
        }
    }
    for (_, remotes) in remote_by_hash {
        new_r.extend_from_slice(&remotes);
    }

    (new_l, new_r)
}

/// Pass 3: a remote current hash appearing in a local file's history means
/// the local side kept going after the version remote still holds. A clean
/// one-to-one match is "local changed"; anything else is a hash conflict.
fn match_remote_current_to_local_history(
    local: &[FileInfo],
    remote: &[FileInfo],
    l: Vec<usize>,
    r: Vec<usize>,
    out: &mut Vec<DiffOutcome>,
) -> (Vec<usize>, Vec<usize>) {
    let mut new_r: Vec<usize> = r
        .iter()
        .copied()
        .filter(|&j| remote[j].is_deleted())
        .collect();

    let local_by_history = historical_hash_map(local, &l, false);
    let remote_by_hash = current_hash_map(remote, &r);

    let mut taken_l: BTreeSet<usize> = BTreeSet::new();

    for (hash, remotes) in remote_by_hash {
        let locals: Vec<usize> = match local_by_history.get(hash) {
            Some(indices) => indices
                .iter()
                .copied()
                .filter(|i| !taken_l.contains(i))
                .collect(),
            None => Vec::new(),
        };
        if locals.is_empty() {
            new_r.extend_from_slice(&remotes);
            continue;
        }
        taken_l.extend(&locals);
        if locals.len() == 1 && remotes.len() == 1 {
            out.push(DiffOutcome::LocalChanged {
                local: locals[0],
                remote: remotes[0],
            });
        } else {
            out.push(DiffOutcome::ConflictHash { locals, remotes });
        }
    }

    let new_l: Vec<usize> = l.into_iter().filter(|i| !taken_l.contains(i)).collect();

    (new_l, new_r)
}

/// Pass 4: mirror of pass 3 with the sides swapped; a clean match is
/// "remote changed".
fn match_local_current_to_remote_history(
    local: &[FileInfo],
    remote: &[FileInfo],
    l: Vec<usize>,
    r: Vec<usize>,
    out: &mut Vec<DiffOutcome>,
) -> (Vec<usize>, Vec<usize>) {
    let mut new_l: Vec<usize> = l.iter().copied().filter(|&i| local[i].is_deleted()).collect();

    let local_by_hash = current_hash_map(local, &l);
    let remote_by_history = historical_hash_map(remote, &r, false);

    let mut taken_r: BTreeSet<usize> = BTreeSet::new();

    for (hash, locals) in local_by_hash {
        let remotes: Vec<usize> = match remote_by_history.get(hash) {
            Some(indices) => indices
                .iter()
                .copied()
                .filter(|j| !taken_r.contains(j))
                .collect(),
            None => Vec::new(),
        };
        if remotes.is_empty() {
            new_l.extend_from_slice(&locals);
            continue;
        }
        taken_r.extend(&remotes);
        if locals.len() == 1 && remotes.len() == 1 {
            out.push(DiffOutcome::RemoteChanged {
                local: locals[0],
                remote: remotes[0],
            });
        } else {
            out.push(DiffOutcome::ConflictHash { locals, remotes });
        }
    }

    let new_r: Vec<usize> = r.into_iter().filter(|j| !taken_r.contains(j)).collect();

    (new_l, new_r)
}

/// Pass 5: any remaining files sharing any historical hash. Two matched
/// dead files are the same file, fully reconciled; every other shape is a
/// conflict. Deleted files participate here.
fn match_by_historical_hash(
    local: &[FileInfo],
    remote: &[FileInfo],
    l: Vec<usize>,
    r: Vec<usize>,
    out: &mut Vec<DiffOutcome>,
) -> (Vec<usize>, Vec<usize>) {
    let local_by_history = historical_hash_map(local, &l, true);
    let remote_by_history = historical_hash_map(remote, &r, true);

    let mut taken_l: BTreeSet<usize> = BTreeSet::new();
    let mut taken_r: BTreeSet<usize> = BTreeSet::new();

    for (hash, local_indices) in &local_by_history {
        let Some(remote_indices) = remote_by_history.get(hash) else {
            continue;
        };
        let locals: Vec<usize> = local_indices
            .iter()
            .copied()
            .filter(|i| !taken_l.contains(i))
            .collect();
        let remotes: Vec<usize> = remote_indices
            .iter()
            .copied()
            .filter(|j| !taken_r.contains(j))
            .collect();
        // a group emptied by earlier groups passes through
        if locals.is_empty() || remotes.is_empty() {
            continue;
        }
        taken_l.extend(&locals);
        taken_r.extend(&remotes);

        if locals.len() == 1
            && remotes.len() == 1
            && local[locals[0]].is_deleted()
            && remote[remotes[0]].is_deleted()
        {
            out.push(DiffOutcome::Unchanged {
                local: locals[0],
                remote: remotes[0],
            });
        } else {
            out.push(DiffOutcome::ConflictHash { locals, remotes });
        }
    }

    let new_l: Vec<usize> = l.into_iter().filter(|i| !taken_l.contains(i)).collect();
    let new_r: Vec<usize> = r.into_iter().filter(|j| !taken_r.contains(j)).collect();

    (new_l, new_r)
}

/// Pass 6: same current path on both sides with no shared history at all.
fn match_by_path(
    local: &[FileInfo],
    remote: &[FileInfo],
    l: Vec<usize>,
    r: Vec<usize>,
    out: &mut Vec<DiffOutcome>,
) -> (Vec<usize>, Vec<usize>) {
    let mut new_l: Vec<usize> = l.iter().copied().filter(|&i| local[i].is_deleted()).collect();
    let mut new_r: Vec<usize> = r
        .iter()
        .copied()
        .filter(|&j| remote[j].is_deleted())
        .collect();

    let mut remote_by_path: BTreeMap<&str, usize> = BTreeMap::new();
    for &j in &r {
        if !remote[j].is_deleted() {
            remote_by_path.insert(remote[j].current_path(), j);
        }
    }

    for &i in &l {
        if local[i].is_deleted() {
            continue;
        }
        match remote_by_path.remove(local[i].current_path()) {
            Some(j) => out.push(DiffOutcome::ConflictPath {
                local: i,
                remote: j,
            }),
            None => new_l.push(i),
        }
    }
    for (_, j) in remote_by_path {
        new_r.push(j);
    }

    (new_l, new_r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::FileEvent;
    use chrono::{DateTime, Utc};

    fn t(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn sum(s: &str) -> Checksum {
        Checksum::from_encoded(s)
    }

    /// Build a FileInfo from (path, time, checksum) triples; an empty
    /// checksum marks a deletion event.
    fn fi(events: &[(&str, &str, &str)]) -> FileInfo {
        let history = events
            .iter()
            .map(|&(path, time, checksum)| {
                if checksum.is_empty() {
                    FileEvent::deleted(path, t(time))
                } else {
                    FileEvent::changed(path, 10, t(time), sum(checksum))
                }
            })
            .collect();
        FileInfo { history }
    }

    /// Flatten outcomes into comparable (kind, local paths, remote paths)
    /// rows, sorted the same way regardless of emission order.
    fn rows(
        local: &[FileInfo],
        remote: &[FileInfo],
        outcomes: &[DiffOutcome],
    ) -> Vec<(String, Vec<String>, Vec<String>)> {
        let lp = |i: &usize| local[*i].current_path().to_string();
        let rp = |j: &usize| remote[*j].current_path().to_string();
        let mut rows: Vec<(String, Vec<String>, Vec<String>)> = outcomes
            .iter()
            .map(|outcome| match outcome {
                DiffOutcome::Unchanged { local, remote } => {
                    ("unchanged".into(), vec![lp(local)], vec![rp(remote)])
                }
                DiffOutcome::MetaDataChanged { local, remote } => {
                    ("metadata".into(), vec![lp(local)], vec![rp(remote)])
                }
                DiffOutcome::Moved { local, remote } => {
                    ("moved".into(), vec![lp(local)], vec![rp(remote)])
                }
                DiffOutcome::LocalOnly { local } => ("local-only".into(), vec![lp(local)], vec![]),
                DiffOutcome::LocalOld { local } => ("local-old".into(), vec![lp(local)], vec![]),
                DiffOutcome::RemoteOnly { remote } => {
                    ("remote-only".into(), vec![], vec![rp(remote)])
                }
                DiffOutcome::RemoteOld { remote } => ("remote-old".into(), vec![], vec![rp(remote)]),
                DiffOutcome::LocalDeleted { local, remote } => {
                    ("local-deleted".into(), vec![lp(local)], vec![rp(remote)])
                }
                DiffOutcome::RemoteDeleted { local, remote } => {
                    ("remote-deleted".into(), vec![lp(local)], vec![rp(remote)])
                }
                DiffOutcome::LocalChanged { local, remote } => {
                    ("local-changed".into(), vec![lp(local)], vec![rp(remote)])
                }
                DiffOutcome::RemoteChanged { local, remote } => {
                    ("remote-changed".into(), vec![lp(local)], vec![rp(remote)])
                }
                DiffOutcome::ConflictHash { locals, remotes } => {
                    let mut ls: Vec<String> = locals.iter().map(lp).collect();
                    let mut rs: Vec<String> = remotes.iter().map(rp).collect();
                    ls.sort();
                    rs.sort();
                    ("conflict".into(), ls, rs)
                }
                DiffOutcome::ConflictPath { local, remote } => {
                    ("conflict".into(), vec![lp(local)], vec![rp(remote)])
                }
            })
            .collect();
        rows.sort();
        rows
    }

    fn row(
        kind: &str,
        locals: &[&str],
        remotes: &[&str],
    ) -> (String, Vec<String>, Vec<String>) {
        (
            kind.to_string(),
            locals.iter().map(|s| s.to_string()).collect(),
            remotes.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn test_full_matrix() {
        let local = vec![
            fi(&[("equal", "2020-01-01T12:34:56Z", "equal-hash-1")]),
            fi(&[
                ("equal2", "2020-01-01T12:34:56Z", "equal2-hash-1"),
                ("equal2", "2020-01-02T12:34:56Z", "equal2-hash-2"),
            ]),
            fi(&[
                ("equal3", "2020-01-01T12:34:56Z", "equal3-hash-1"),
                ("equal3", "2020-01-02T12:34:56Z", "equal3-hash-2"),
                ("equal3", "2020-01-03T12:34:56Z", "equal3-hash-3"),
            ]),
            fi(&[("renamed-local", "2020-01-01T12:34:56Z", "renamed-hash-1")]),
            fi(&[("added-local", "2020-01-01T12:34:56Z", "added-local-hash-1")]),
            fi(&[
                ("added-local2", "2020-01-01T12:34:56Z", "added-local2-hash-1"),
                ("added-local2", "2020-01-02T12:34:56Z", "added-local2-hash-2"),
            ]),
            fi(&[
                ("hanging-delete-local", "2020-01-01T12:34:56Z", "hdl-hash-1"),
                ("hanging-delete-local", "2020-01-02T12:34:56Z", ""),
            ]),
            fi(&[
                ("local-changed-l-1-1", "2020-01-01T12:34:56Z", "lc-hash-1-1"),
                ("local-changed-l-1-2", "2020-01-02T12:34:56Z", "lc-hash-1-2"),
                ("local-changed-l-1-3", "2020-01-03T12:34:56Z", "lc-hash-1-3"),
            ]),
            fi(&[
                ("local-changed-l-2-1", "2020-01-01T12:34:56Z", "lc-hash-2-1"),
                ("local-changed-l-2-2", "2020-01-02T12:34:56Z", "lc-hash-2-2"),
                ("local-changed-l-2-3", "2020-01-03T12:34:56Z", "lc-hash-2-3"),
            ]),
            fi(&[
                ("remote-changed-l-1-1", "2020-01-01T12:34:56Z", "rc-hash-1-1"),
                ("remote-changed-l-1-2", "2020-01-02T12:34:56Z", "rc-hash-1-2"),
            ]),
            fi(&[("remote-changed-l-2-1", "2020-01-01T12:34:56Z", "rc-hash-2-1")]),
            fi(&[
                ("lc-conflict-l-1-1", "2020-01-01T12:34:56Z", "lc-conflict-hash-1"),
                ("lc-conflict-l-1-1", "2020-01-02T12:34:56Z", "lc-conflict-hash-2"),
            ]),
            fi(&[("rc-conflict-l-1-1", "2020-01-01T12:34:56Z", "rc-conflict-hash-1")]),
            fi(&[("rc-conflict-l-1-2", "2020-01-01T12:34:56Z", "rc-conflict-hash-1")]),
            fi(&[
                ("both-conflict-1-l", "2020-01-01T12:34:56Z", "bc-hash-1"),
                ("both-conflict-1-l", "2020-01-02T12:34:56Z", "bc-hash-1-l"),
            ]),
            fi(&[
                ("both-conflict-2-1-l", "2020-01-01T12:34:56Z", "bc-hash-2"),
                ("both-conflict-2-1-l", "2020-01-02T12:34:56Z", "bc-hash-2-1-l"),
            ]),
            fi(&[
                ("both-conflict-2-2-l", "2020-01-01T12:34:56Z", "bc-hash-2"),
                ("both-conflict-2-2-l", "2020-01-02T12:34:56Z", "bc-hash-2-2-l"),
            ]),
            fi(&[("same-name-conflict", "2020-01-01T12:34:56Z", "snc-hash-l")]),
        ];
        let remote = vec![
            fi(&[("equal", "2020-01-01T12:34:56Z", "equal-hash-1")]),
            fi(&[
                ("equal2", "2020-01-01T12:34:56Z", "equal2-hash-1"),
                ("equal2", "2020-01-02T12:34:56Z", "equal2-hash-2"),
            ]),
            fi(&[("equal3", "2020-01-03T12:34:56Z", "equal3-hash-3")]),
            fi(&[("renamed-remote", "2020-01-01T12:34:56Z", "renamed-hash-1")]),
            fi(&[("added-remote", "2020-01-01T12:34:56Z", "added-remote-hash-1")]),
            fi(&[
                ("added-remote2", "2020-01-01T12:34:56Z", "added-remote2-hash-1"),
                ("added-remote2", "2020-01-02T12:34:56Z", "added-remote2-hash-2"),
            ]),
            fi(&[
                ("hanging-delete-remote", "2020-01-01T12:34:56Z", "hdr-hash-1"),
                ("hanging-delete-remote", "2020-01-02T12:34:56Z", ""),
            ]),
            fi(&[
                ("local-changed-r-1-1", "2020-01-01T12:34:56Z", "lc-hash-1-1"),
                ("local-changed-r-1-2", "2020-01-02T12:34:56Z", "lc-hash-1-2"),
            ]),
            fi(&[("local-changed-r-2-1", "2020-01-01T12:34:56Z", "lc-hash-2-1")]),
            fi(&[
                ("remote-changed-r-1-1", "2020-01-01T12:34:56Z", "rc-hash-1-1"),
                ("remote-changed-r-1-2", "2020-01-02T12:34:56Z", "rc-hash-1-2"),
                ("remote-changed-r-1-3", "2020-01-03T12:34:56Z", "rc-hash-1-3"),
            ]),
            fi(&[
                ("remote-changed-r-2-1", "2020-01-01T12:34:56Z", "rc-hash-2-1"),
                ("remote-changed-r-2-2", "2020-01-02T12:34:56Z", "rc-hash-2-2"),
                ("remote-changed-r-2-3", "2020-01-03T12:34:56Z", "rc-hash-2-3"),
            ]),
            fi(&[("lc-conflict-r-1-1", "2020-01-01T12:34:56Z", "lc-conflict-hash-1")]),
            fi(&[("lc-conflict-r-1-2", "2020-01-01T12:34:56Z", "lc-conflict-hash-1")]),
            fi(&[
                ("rc-conflict-r-1-1", "2020-01-01T12:34:56Z", "rc-conflict-hash-1"),
                ("rc-conflict-r-1-1", "2020-01-02T12:34:56Z", "rc-conflict-hash-2"),
            ]),
            fi(&[
                ("both-conflict-1-r", "2020-01-01T12:34:56Z", "bc-hash-1"),
                ("both-conflict-1-r", "2020-01-02T12:34:56Z", "bc-hash-1-r"),
            ]),
            fi(&[
                ("both-conflict-2-1-r", "2020-01-01T12:34:56Z", "bc-hash-2"),
                ("both-conflict-2-1-r", "2020-01-02T12:34:56Z", "bc-hash-2-1-r"),
            ]),
            fi(&[
                ("both-conflict-2-2-r", "2020-01-01T12:34:56Z", "bc-hash-2"),
                ("both-conflict-2-2-r", "2020-01-02T12:34:56Z", "bc-hash-2-2-r"),
            ]),
            fi(&[("same-name-conflict", "2020-01-01T12:34:56Z", "snc-hash-r")]),
        ];

        let outcomes = diff(&local, &remote);

        let expected = vec![
            row("conflict", &["both-conflict-1-l"], &["both-conflict-1-r"]),
            row(
                "conflict",
                &["both-conflict-2-1-l", "both-conflict-2-2-l"],
                &["both-conflict-2-1-r", "both-conflict-2-2-r"],
            ),
            row(
                "conflict",
                &["lc-conflict-l-1-1"],
                &["lc-conflict-r-1-1", "lc-conflict-r-1-2"],
            ),
            row(
                "conflict",
                &["rc-conflict-l-1-1", "rc-conflict-l-1-2"],
                &["rc-conflict-r-1-1"],
            ),
            row("conflict", &["same-name-conflict"], &["same-name-conflict"]),
            row(
                "local-changed",
                &["local-changed-l-1-3"],
                &["local-changed-r-1-2"],
            ),
            row(
                "local-changed",
                &["local-changed-l-2-3"],
                &["local-changed-r-2-1"],
            ),
            row("local-old", &["hanging-delete-local"], &[]),
            row("local-only", &["added-local"], &[]),
            row("local-only", &["added-local2"], &[]),
            row("moved", &["renamed-local"], &["renamed-remote"]),
            row(
                "remote-changed",
                &["remote-changed-l-1-2"],
                &["remote-changed-r-1-3"],
            ),
            row(
                "remote-changed",
                &["remote-changed-l-2-1"],
                &["remote-changed-r-2-3"],
            ),
            row("remote-old", &[], &["hanging-delete-remote"]),
            row("remote-only", &[], &["added-remote"]),
            row("remote-only", &[], &["added-remote2"]),
            row("unchanged", &["equal"], &["equal"]),
            row("unchanged", &["equal2"], &["equal2"]),
            row("unchanged", &["equal3"], &["equal3"]),
        ];

        assert_eq!(rows(&local, &remote, &outcomes), expected);
    }

    #[test]
    fn test_unchanged_with_history() {
        let local = vec![fi(&[
            ("equal", "2020-01-01T12:34:56Z", "h1"),
            ("equal", "2020-01-02T12:34:56Z", "h2"),
        ])];
        let remote = local.clone();

        let outcomes = diff(&local, &remote);
        assert_eq!(
            outcomes,
            vec![DiffOutcome::Unchanged {
                local: 0,
                remote: 0
            }]
        );
    }

    #[test]
    fn test_metadata_changed() {
        let local = vec![fi(&[("a", "2020-01-01T12:34:56Z", "h")])];
        let remote = vec![fi(&[("a", "2020-01-02T12:34:56Z", "h")])];

        let outcomes = diff(&local, &remote);
        assert_eq!(
            outcomes,
            vec![DiffOutcome::MetaDataChanged {
                local: 0,
                remote: 0
            }]
        );
    }

    #[test]
    fn test_moved() {
        let local = vec![fi(&[("a.ext", "2020-01-01T12:34:56Z", "h")])];
        let remote = vec![fi(&[("b.ext", "2020-01-01T12:34:56Z", "h")])];

        let outcomes = diff(&local, &remote);
        assert_eq!(
            outcomes,
            vec![DiffOutcome::Moved {
                local: 0,
                remote: 0
            }]
        );
    }

    #[test]
    fn test_local_changed() {
        let local = vec![fi(&[
            ("x", "2020-01-01T12:34:56Z", "h1"),
            ("x", "2020-01-02T12:34:56Z", "h2"),
        ])];
        let remote = vec![fi(&[("x", "2020-01-01T12:34:56Z", "h1")])];

        let outcomes = diff(&local, &remote);
        assert_eq!(
            outcomes,
            vec![DiffOutcome::LocalChanged {
                local: 0,
                remote: 0
            }]
        );
    }

    #[test]
    fn test_remote_changed() {
        let local = vec![fi(&[("x", "2020-01-01T12:34:56Z", "h1")])];
        let remote = vec![fi(&[
            ("x", "2020-01-01T12:34:56Z", "h1"),
            ("x", "2020-01-02T12:34:56Z", "h2"),
        ])];

        let outcomes = diff(&local, &remote);
        assert_eq!(
            outcomes,
            vec![DiffOutcome::RemoteChanged {
                local: 0,
                remote: 0
            }]
        );
    }

    #[test]
    fn test_conflict_from_shared_ancestor() {
        let local = vec![fi(&[
            ("f", "2020-01-01T12:34:56Z", "common"),
            ("f", "2020-01-02T12:34:56Z", "left"),
        ])];
        let remote = vec![fi(&[
            ("f", "2020-01-01T12:34:56Z", "common"),
            ("f", "2020-01-02T12:34:56Z", "right"),
        ])];

        let outcomes = diff(&local, &remote);
        assert_eq!(
            outcomes,
            vec![DiffOutcome::ConflictHash {
                locals: vec![0],
                remotes: vec![0],
            }]
        );
    }

    #[test]
    fn test_both_deleted_is_unchanged() {
        let local = vec![fi(&[
            ("gone", "2020-01-01T12:34:56Z", "h"),
            ("gone", "2020-01-02T12:34:56Z", ""),
        ])];
        let remote = local.clone();

        let outcomes = diff(&local, &remote);
        assert_eq!(
            outcomes,
            vec![DiffOutcome::Unchanged {
                local: 0,
                remote: 0
            }]
        );
    }

    #[test]
    fn test_deleted_vs_alive_same_hash_is_conflict() {
        // deleted files sit out passes 1-4, so a dead local sharing a hash
        // with a live remote is only matched through shared history
        let local = vec![fi(&[
            ("gone", "2020-01-01T12:34:56Z", "h"),
            ("gone", "2020-01-02T12:34:56Z", ""),
        ])];
        let remote = vec![fi(&[("still-here", "2020-01-01T12:34:56Z", "h")])];

        let outcomes = diff(&local, &remote);
        assert_eq!(
            outcomes,
            vec![DiffOutcome::ConflictHash {
                locals: vec![0],
                remotes: vec![0],
            }]
        );
    }

    #[test]
    fn test_diff_of_identical_repos_is_all_unchanged() {
        let local = vec![
            fi(&[("a", "2020-01-01T12:34:56Z", "ha")]),
            fi(&[
                ("b", "2020-01-01T12:34:56Z", "hb1"),
                ("b", "2020-01-02T12:34:56Z", "hb2"),
            ]),
            fi(&[
                ("c", "2020-01-01T12:34:56Z", "hc"),
                ("c", "2020-01-02T12:34:56Z", ""),
            ]),
        ];
        let remote = local.clone();

        let outcomes = diff(&local, &remote);
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes
            .iter()
            .all(|o| matches!(o, DiffOutcome::Unchanged { .. })));
    }

    #[test]
    fn test_outcomes_partition_both_sides() {
        let local = vec![
            fi(&[("a", "2020-01-01T12:34:56Z", "ha")]),
            fi(&[("b", "2020-01-01T12:34:56Z", "hb")]),
            fi(&[
                ("c", "2020-01-01T12:34:56Z", "hc"),
                ("c", "2020-01-02T12:34:56Z", ""),
            ]),
            fi(&[("dup1", "2020-01-01T12:34:56Z", "dup")]),
            fi(&[("dup2", "2020-01-01T12:34:56Z", "dup")]),
        ];
        let remote = vec![
            fi(&[("a", "2020-01-01T12:34:56Z", "ha")]),
            fi(&[("b-renamed", "2020-01-01T12:34:56Z", "hb")]),
            fi(&[("new", "2020-01-01T12:34:56Z", "hn")]),
            fi(&[("dup3", "2020-01-01T12:34:56Z", "dup")]),
        ];

        let outcomes = diff(&local, &remote);

        let mut seen_l = vec![0usize; local.len()];
        let mut seen_r = vec![0usize; remote.len()];
        for outcome in &outcomes {
            match outcome {
                DiffOutcome::Unchanged { local, remote }
                | DiffOutcome::MetaDataChanged { local, remote }
                | DiffOutcome::Moved { local, remote }
                | DiffOutcome::LocalDeleted { local, remote }
                | DiffOutcome::RemoteDeleted { local, remote }
                | DiffOutcome::LocalChanged { local, remote }
                | DiffOutcome::RemoteChanged { local, remote }
                | DiffOutcome::ConflictPath { local, remote } => {
                    seen_l[*local] += 1;
                    seen_r[*remote] += 1;
                }
                DiffOutcome::LocalOnly { local } | DiffOutcome::LocalOld { local } => {
                    seen_l[*local] += 1;
                }
                DiffOutcome::RemoteOnly { remote } | DiffOutcome::RemoteOld { remote } => {
                    seen_r[*remote] += 1;
                }
                DiffOutcome::ConflictHash { locals, remotes } => {
                    for &i in locals {
                        seen_l[i] += 1;
                    }
                    for &j in remotes {
                        seen_r[j] += 1;
                    }
                }
            }
        }
        assert!(seen_l.iter().all(|&n| n == 1), "local: {seen_l:?}");
        assert!(seen_r.iter().all(|&n| n == 1), "remote: {seen_r:?}");
    }

    #[test]
    fn test_duplicate_hashes_do_not_cross_assign_as_moved() {
        let local = vec![
            fi(&[("one", "2020-01-01T12:34:56Z", "dup")]),
            fi(&[("two", "2020-01-01T12:34:56Z", "dup")]),
        ];
        let remote = vec![
            fi(&[("three", "2020-01-01T12:34:56Z", "dup")]),
            fi(&[("four", "2020-01-01T12:34:56Z", "dup")]),
        ];

        let outcomes = diff(&local, &remote);
        assert_eq!(outcomes.len(), 1);
        assert!(matches!(
            &outcomes[0],
            DiffOutcome::ConflictHash { locals, remotes }
                if locals.len() == 2 && remotes.len() == 2
        ));
    }

    #[test]
    fn test_pass1_drains_longer_remote() {
        let local = vec![fi(&[("a", "2020-01-01T12:34:56Z", "ha")])];
        let remote = vec![
            fi(&[("a", "2020-01-01T12:34:56Z", "ha")]),
            fi(&[("y", "2020-01-01T12:34:56Z", "hy")]),
            fi(&[("z", "2020-01-01T12:34:56Z", "hz")]),
        ];

        let outcomes = diff(&local, &remote);
        let r = rows(&local, &remote, &outcomes);
        assert_eq!(
            r,
            vec![
                row("remote-only", &[], &["y"]),
                row("remote-only", &[], &["z"]),
                row("unchanged", &["a"], &["a"]),
            ]
        );
    }
}
