//! File installation with backup semantics
//!
//! Copies never write over a destination directly: the bytes land in a
//! scratch file next to the target, any existing target is set aside as a
//! backup, and only then is the scratch renamed into place. A failure at
//! any step puts the backup back.

use std::path::{Path, PathBuf};

use color_eyre::eyre::{eyre, WrapErr as _};
use color_eyre::Result;
use filetime::FileTime;

const TMP_SUFFIX: &str = ".boffin-tmp";
const BACKUP_SUFFIX: &str = ".boffin-old";

/// Copy `src` to `dest`, preserving mode and mtime.
///
/// Parent directories are created as needed.
///
/// # Errors
/// Returns an error if any filesystem step fails; an existing destination
/// is restored from its backup before the error is returned.
pub fn copy_file(src: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)
            .wrap_err_with(|| format!("failed to create '{}'", parent.display()))?;
    }

    let tmp = with_suffix(dest, TMP_SUFFIX)?;
    let backup = with_suffix(dest, BACKUP_SUFFIX)?;

    // fs::copy carries the permission bits; the mtime needs a second step
    std::fs::copy(src, &tmp)
        .wrap_err_with(|| format!("{} => {}: copy failed", src.display(), tmp.display()))?;
    let result = (|| -> Result<()> {
        let mtime = FileTime::from_last_modification_time(&std::fs::metadata(src)?);
        filetime::set_file_mtime(&tmp, mtime)?;

        let had_backup = match std::fs::rename(dest, &backup) {
            Ok(()) => true,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => false,
            Err(err) => {
                return Err(err)
                    .wrap_err_with(|| format!("failed to back up '{}'", dest.display()));
            }
        };

        if let Err(err) = std::fs::rename(&tmp, dest) {
            if had_backup {
                let _ = std::fs::rename(&backup, dest);
            }
            return Err(err)
                .wrap_err_with(|| format!("failed to install '{}'", dest.display()));
        }

        if had_backup {
            let _ = std::fs::remove_file(&backup);
        }
        Ok(())
    })();

    if result.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    result
}

fn with_suffix(path: &Path, suffix: &str) -> Result<PathBuf> {
    let name = path
        .file_name()
        .ok_or_else(|| eyre!("'{}' has no file name", path.display()))?;
    let mut name = name.to_os_string();
    name.push(suffix);
    Ok(path.with_file_name(name))
}
