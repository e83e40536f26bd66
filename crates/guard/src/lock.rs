//! Advisory lock serializing writers of the state directory.
//!
//! `claim` and `record` hold an `fs2` exclusive lock on
//! `<state_dir>/tierguard.lock` for the whole load → check → record → save
//! sequence.  The lock file carries the holder's PID for diagnostics.  The
//! lock is released when the [`StateLock`] is dropped.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;

use fs2::FileExt;

use tg_domain::error::{Error, Result};

pub struct StateLock {
    _file: File,
}

impl StateLock {
    /// Block until the lock is ours.
    pub fn acquire(path: &Path) -> Result<Self> {
        let file = open(path)?;
        file.lock_exclusive()
            .map_err(|e| Error::Lock(format!("locking {}: {e}", path.display())))?;
        Self::stamp(path, file)
    }

    fn stamp(path: &Path, file: File) -> Result<Self> {
        let pid = std::process::id();
        {
            let mut f = &file;
            f.set_len(0)?;
            writeln!(f, "{pid}")?;
            f.flush()?;
        }
        tracing::debug!(path = %path.display(), pid, "state lock acquired");
        Ok(Self { _file: file })
    }
}

fn open(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    // Not truncated on open: only the holder rewrites the PID.
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .read(true)
        .open(path)
        .map_err(|e| Error::Lock(format!("opening {}: {e}", path.display())))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    /// Non-blocking attempt from a second handle.
    fn try_acquire(path: &Path) -> Result<StateLock> {
        let file = open(path)?;
        file.try_lock_exclusive()
            .map_err(|e| Error::Lock(format!("{}: {e}", path.display())))?;
        StateLock::stamp(path, file)
    }

    #[test]
    fn second_holder_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tierguard.lock");

        let held = StateLock::acquire(&path).unwrap();
        let stored: u32 = fs::read_to_string(&path).unwrap().trim().parse().unwrap();
        assert_eq!(stored, std::process::id());

        let second = try_acquire(&path);
        assert!(matches!(second, Err(Error::Lock(_))));

        drop(held);
        assert!(try_acquire(&path).is_ok());
    }

    #[test]
    fn creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state").join("tierguard.lock");
        let _lock = StateLock::acquire(&path).unwrap();
        assert!(path.exists());
    }
}
