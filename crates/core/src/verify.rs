//! Integrity checking
//!
//! Re-hashes every non-deleted tracked file and compares against the
//! recorded checksum. Nothing is mutated; per-file failures are collected,
//! not propagated.

use crate::hash::Checksum;
use crate::repo::Repository;

/// Outcome of checking one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyStatus {
    Ok,
    Mismatch,
    /// The file could not be read; carries the error text
    Error(String),
}

/// Per-file verification result
#[derive(Debug, Clone)]
pub struct VerifyResult {
    pub path: String,
    pub status: VerifyStatus,
}

/// Check every non-deleted file in the repository.
#[must_use]
pub fn verify(repo: &Repository) -> Vec<VerifyResult> {
    let mut results = Vec::new();

    for file in repo.files() {
        if file.is_deleted() {
            continue;
        }
        let rel = file.current_path();
        let mut abs = repo.base_dir().to_path_buf();
        abs.extend(rel.split('/'));

        let status = match Checksum::from_file(&abs) {
            Ok(checksum) => {
                if Some(&checksum) == file.checksum() {
                    VerifyStatus::Ok
                } else {
                    VerifyStatus::Mismatch
                }
            }
            Err(err) => VerifyStatus::Error(err.to_string()),
        };
        results.push(VerifyResult {
            path: rel.to_string(),
            status,
        });
    }

    results
}
