//! Content fingerprints for the applied-change audit trail.
//!
//! A fingerprint is the first 16 hex characters of the SHA-256 of the file's
//! bytes.  Fingerprinting never fails: a missing file and an unreadable file
//! each map to a fixed sentinel so that recording an application is not
//! blocked by the audit step.

use std::fmt;
use std::path::Path;

use sha2::{Digest, Sha256};

/// Sentinel stored when the file does not exist.
pub const FILE_NOT_FOUND: &str = "file_not_found";
/// Sentinel stored when the file exists but cannot be read.
pub const HASH_ERROR: &str = "hash_error";

const DIGEST_CHARS: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fingerprint {
    Digest(String),
    NotFound,
    Unreadable,
}

impl Fingerprint {
    pub fn of_file(path: &Path) -> Self {
        if !path.exists() {
            return Self::NotFound;
        }
        match std::fs::read(path) {
            Ok(bytes) => Self::of_bytes(&bytes),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot fingerprint file");
                Self::Unreadable
            }
        }
    }

    pub fn of_bytes(bytes: &[u8]) -> Self {
        let mut digest = hex::encode(Sha256::digest(bytes));
        digest.truncate(DIGEST_CHARS);
        Self::Digest(digest)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Digest(d) => d,
            Self::NotFound => FILE_NOT_FOUND,
            Self::Unreadable => HASH_ERROR,
        }
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_truncated_sha256() {
        assert_eq!(Fingerprint::of_bytes(b"hello").as_str(), "2cf24dba5fb0a30e");
    }

    #[test]
    fn missing_file_yields_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let fp = Fingerprint::of_file(&dir.path().join("nope.md"));
        assert_eq!(fp, Fingerprint::NotFound);
        assert_eq!(fp.to_string(), "file_not_found");
    }

    #[test]
    fn unreadable_path_yields_hash_error() {
        // A directory exists but cannot be read as a file.
        let dir = tempfile::tempdir().unwrap();
        let fp = Fingerprint::of_file(dir.path());
        assert_eq!(fp.as_str(), "hash_error");
    }

    #[test]
    fn file_content_is_hashed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("WORKFLOW.md");
        std::fs::write(&path, "hello").unwrap();
        assert_eq!(Fingerprint::of_file(&path), Fingerprint::of_bytes(b"hello"));
    }
}
