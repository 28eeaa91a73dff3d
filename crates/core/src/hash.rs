//! Content hashing: SHA-256, base64-encoded

use std::fmt;
use std::io::Read;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use color_eyre::eyre::WrapErr as _;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A content checksum: the standard-base64 encoding of a SHA-256 digest.
///
/// Stored as the encoded string so it can round-trip through `files.json`
/// unchanged.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checksum(String);

impl Checksum {
    /// Hash arbitrary bytes
    #[must_use]
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(STANDARD.encode(Sha256::digest(data)))
    }

    /// Hash a file by path
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or read.
    pub fn from_file(path: &Path) -> color_eyre::Result<Self> {
        let mut file = std::fs::File::open(path)
            .wrap_err_with(|| format!("{}: cannot open for hashing", path.display()))?;
        let mut hasher = Sha256::new();
        let mut buffer = [0u8; 64 * 1024]; // 64KB buffer

        loop {
            let bytes_read = file
                .read(&mut buffer)
                .wrap_err_with(|| format!("{}: read failed", path.display()))?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(Self(STANDARD.encode(hasher.finalize())))
    }

    /// Wrap an already-encoded checksum string
    #[must_use]
    pub fn from_encoded(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// The base64 string form
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Checksum({})", self.0.get(..12).unwrap_or(&self.0))
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_deterministic() {
        let data = b"hello world";
        let h1 = Checksum::from_bytes(data);
        let h2 = Checksum::from_bytes(data);
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_checksum_different_data() {
        let h1 = Checksum::from_bytes(b"hello");
        let h2 = Checksum::from_bytes(b"world");
        assert_ne!(h1, h2);
    }

    #[test]
    fn test_empty_input_well_known_digest() {
        // SHA-256 of the empty string, base64 encoded
        let h = Checksum::from_bytes(b"");
        assert_eq!(h.as_str(), "47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=");
    }

    #[test]
    fn test_file_matches_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, b"some file contents").unwrap();

        let from_file = Checksum::from_file(&path).unwrap();
        let from_bytes = Checksum::from_bytes(b"some file contents");
        assert_eq!(from_file, from_bytes);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = Checksum::from_file(Path::new("/no/such/file")).unwrap_err();
        assert!(err.to_string().contains("/no/such/file"));
    }
}
