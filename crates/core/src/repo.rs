//! Repository: a tracked base directory plus its history store
//!
//! The history lives in `.boffin/files.json`. It only ever grows: a file is
//! never removed from the store, a deletion is just another event.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use color_eyre::eyre::{bail, eyre, WrapErr as _};
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::hash::Checksum;
use crate::history::FileInfo;

/// Name of the metadata directory
pub const DB_DIR_NAME: &str = ".boffin";
/// History store file inside the metadata directory
pub const FILES_NAME: &str = "files.json";
/// Scratch file used during an atomic save
pub const FILES_TMP_NAME: &str = "files.json.tmp";

const DEFAULT_IMPORT_DIR: &str = "import";

/// A loaded repository
#[derive(Debug)]
pub struct Repository {
    db_dir: PathBuf,
    base_dir: PathBuf,
    import_dir: PathBuf,

    // kept in their stored (possibly relative) form for saving
    stored_base_dir: String,
    stored_import_dir: String,

    files: Vec<FileInfo>,
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    v1: Option<V1>,
}

#[derive(Serialize, Deserialize)]
struct V1 {
    #[serde(rename = "base-dir")]
    base_dir: String,
    #[serde(rename = "import-dir", default)]
    import_dir: String,
    files: Vec<FileInfo>,
}

impl Repository {
    /// Create a new repository.
    ///
    /// Refuses to proceed if the metadata directory already exists or the
    /// base directory is missing or not a directory. The base dir is stored
    /// relative to the metadata directory when possible, so the repository
    /// survives being moved as a whole.
    ///
    /// # Errors
    /// Returns an error on any of the refusals above, or if the initial
    /// save fails.
    pub fn init(db_dir: &Path, base_dir: &Path) -> Result<Self> {
        let base_dir = clean_path(base_dir)?;
        if !base_dir.is_dir() {
            bail!("'{}' does not exist or is not a directory", base_dir.display());
        }

        let db_dir = clean_path(db_dir)?;
        if db_dir.exists() {
            bail!("'{}' already exists", db_dir.display());
        }
        std::fs::create_dir(&db_dir)
            .wrap_err_with(|| format!("failed to create '{}'", db_dir.display()))?;

        let stored_base_dir = match relative_to(&db_dir, &base_dir) {
            Some(rel) => rel,
            None => path_string(&base_dir),
        };

        let import_dir = base_dir.join(DEFAULT_IMPORT_DIR);
        let repo = Self {
            db_dir,
            base_dir,
            import_dir,
            stored_base_dir,
            stored_import_dir: String::new(),
            files: Vec::new(),
        };
        repo.save()?;
        Ok(repo)
    }

    /// Load a repository from its metadata directory.
    ///
    /// # Errors
    /// Returns an error if `files.json` is missing, is not exactly one JSON
    /// object, or has no `v1` section.
    pub fn load(db_dir: &Path) -> Result<Self> {
        let db_dir = clean_path(db_dir)?;
        let path = db_dir.join(FILES_NAME);
        let text = std::fs::read_to_string(&path)
            .wrap_err_with(|| format!("failed to read '{}'", path.display()))?;

        let mut de = serde_json::Deserializer::from_str(&text);
        let envelope = Envelope::deserialize(&mut de)
            .wrap_err_with(|| format!("invalid JSON in '{}'", path.display()))?;
        de.end()
            .map_err(|_| eyre!("unexpected contents at the end of config file"))?;

        let v1 = envelope.v1.ok_or_else(|| eyre!("config file is empty"))?;

        let base_dir = if Path::new(&v1.base_dir).is_absolute() {
            clean_path(Path::new(&v1.base_dir))?
        } else {
            clean_path(&db_dir.join(&v1.base_dir))?
        };

        let import_dir = if v1.import_dir.is_empty() {
            base_dir.join(DEFAULT_IMPORT_DIR)
        } else if Path::new(&v1.import_dir).is_absolute() {
            clean_path(Path::new(&v1.import_dir))?
        } else {
            clean_path(&base_dir.join(&v1.import_dir))?
        };

        Ok(Self {
            db_dir,
            base_dir,
            import_dir,
            stored_base_dir: v1.base_dir,
            stored_import_dir: v1.import_dir,
            files: v1.files,
        })
    }

    /// Atomically persist the history store.
    ///
    /// Writes `files.json.tmp`, removes the old `files.json`, renames the
    /// temp into place and best-effort marks the result read-only. The temp
    /// file never survives this call.
    ///
    /// # Errors
    /// Returns an error if the temp cannot be written or the swap fails; a
    /// rename failure after the old file was removed is reported as
    /// critical (the new content is still intact in the temp's place).
    pub fn save(&self) -> Result<()> {
        let tmp = self.db_dir.join(FILES_TMP_NAME);
        let result = self.save_via(&tmp);
        if result.is_err() {
            let _ = std::fs::remove_file(&tmp);
        }
        result
    }

    fn save_via(&self, tmp: &Path) -> Result<()> {
        let envelope = Envelope {
            v1: Some(V1 {
                base_dir: self.stored_base_dir.clone(),
                import_dir: self.stored_import_dir.clone(),
                files: self.files.clone(),
            }),
        };

        let mut json = serde_json::to_string_pretty(&envelope)?;
        json.push('\n');
        std::fs::write(tmp, json)
            .wrap_err_with(|| format!("failed to write '{}'", tmp.display()))?;

        let path = self.db_dir.join(FILES_NAME);
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(_) => bail!("failed to overwrite '{}'", path.display()),
        }
        std::fs::rename(tmp, &path).map_err(|_| {
            eyre!(
                "critical error; failed to rename '{}' to '{}'",
                tmp.display(),
                path.display()
            )
        })?;

        match std::fs::metadata(&path) {
            Ok(meta) => {
                let mut perms = meta.permissions();
                perms.set_readonly(true);
                if std::fs::set_permissions(&path, perms).is_err() {
                    warn!("failed to make repo file read only");
                }
            }
            Err(_) => warn!("failed to make repo file read only"),
        }

        Ok(())
    }

    /// Locate the metadata directory for `start` (default: the current
    /// directory) by walking toward the filesystem root.
    ///
    /// # Errors
    /// Returns "could not find .boffin dir" if no ancestor contains one.
    pub fn find_db_dir(start: Option<&Path>) -> Result<PathBuf> {
        let start = match start {
            Some(dir) => clean_path(dir)?,
            None => std::env::current_dir()?,
        };

        let mut dir = start.as_path();
        loop {
            let candidate = dir.join(DB_DIR_NAME);
            if candidate.is_dir() {
                return Ok(candidate);
            }
            match dir.parent() {
                Some(parent) => dir = parent,
                None => bail!("could not find {DB_DIR_NAME} dir"),
            }
        }
    }

    /// The metadata directory
    #[must_use]
    pub fn db_dir(&self) -> &Path {
        &self.db_dir
    }

    /// Absolute path of the tracked tree
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Absolute path of the import landing directory
    #[must_use]
    pub fn import_dir(&self) -> &Path {
        &self.import_dir
    }

    /// All tracked files, deleted ones included
    #[must_use]
    pub fn files(&self) -> &[FileInfo] {
        &self.files
    }

    /// Mutable access for the update and import actions
    pub fn files_mut(&mut self) -> &mut [FileInfo] {
        &mut self.files
    }

    /// Track a new file
    pub fn add_file(&mut self, file: FileInfo) {
        self.files.push(file);
    }

    /// Order the store by current path; purely cosmetic for `files.json`
    pub fn sort(&mut self) {
        self.files
            .sort_by(|a, b| a.current_path().cmp(b.current_path()));
    }

    /// Groups of non-deleted files sharing a current checksum.
    ///
    /// Only groups with more than one member are returned, keyed and
    /// ordered by checksum.
    #[must_use]
    pub fn duplicate_groups(&self) -> Vec<(Checksum, Vec<&FileInfo>)> {
        let mut by_hash: BTreeMap<&Checksum, Vec<&FileInfo>> = BTreeMap::new();
        for file in &self.files {
            if file.is_deleted() {
                continue;
            }
            if let Some(checksum) = file.checksum() {
                by_hash.entry(checksum).or_default().push(file);
            }
        }
        by_hash
            .into_iter()
            .filter(|(_, files)| files.len() > 1)
            .map(|(checksum, files)| (checksum.clone(), files))
            .collect()
    }
}

/// Absolutize and lexically normalize a path without touching the
/// filesystem beyond resolving the current directory.
fn clean_path(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path)
        .wrap_err_with(|| format!("cannot resolve '{}'", path.display()))?;
    let mut cleaned = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !cleaned.pop() {
                    cleaned.push(component.as_os_str());
                }
            }
            _ => cleaned.push(component.as_os_str()),
        }
    }
    Ok(cleaned)
}

/// Lexical relative path from `from` to `to`; both must be absolute.
fn relative_to(from: &Path, to: &Path) -> Option<String> {
    let mut from_parts = from.components().peekable();
    let mut to_parts = to.components().peekable();

    while let (Some(a), Some(b)) = (from_parts.peek(), to_parts.peek()) {
        if a != b {
            break;
        }
        from_parts.next();
        to_parts.next();
    }

    let mut rel = PathBuf::new();
    for part in from_parts {
        match part {
            Component::RootDir | Component::Prefix(_) => return None,
            _ => rel.push(".."),
        }
    }
    for part in to_parts {
        rel.push(part.as_os_str());
    }
    if rel.as_os_str().is_empty() {
        rel.push(".");
    }
    Some(path_string(&rel))
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
