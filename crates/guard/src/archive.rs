//! Session-log archival.
//!
//! Session logs whose mtime is older than the retention window are gzipped
//! into `<logs>/archive/<relative path>.gz` and removed.  Directories left
//! empty afterwards are pruned; the archive tree itself is never touched.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;

use tg_domain::error::{Error, Result};

pub const ARCHIVE_DIR: &str = "archive";

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveOutcome {
    pub files_archived: u32,
    pub archive_size_mb: f64,
}

pub fn archive_old_logs(
    logs_dir: &Path,
    retention_days: u32,
    now: DateTime<Utc>,
) -> Result<ArchiveOutcome> {
    let archive_root = logs_dir.join(ARCHIVE_DIR);
    fs::create_dir_all(&archive_root)?;
    let cutoff = Duration::try_days(i64::from(retention_days))
        .and_then(|window| now.checked_sub_signed(window))
        .ok_or_else(|| {
            Error::Config(format!("retention of {retention_days} days is out of range"))
        })?;

    let pattern = format!(
        "{}/**/*.json",
        glob::Pattern::escape(&logs_dir.to_string_lossy())
    );
    let candidates = glob::glob(&pattern)
        .map_err(|e| Error::Other(format!("bad archive pattern: {e}")))?;

    let mut files_archived = 0u32;
    let mut archive_bytes = 0u64;

    for path in candidates.filter_map(|p| p.ok()) {
        if path.starts_with(&archive_root) || !path.is_file() {
            continue;
        }
        let modified: DateTime<Utc> = fs::metadata(&path)?.modified()?.into();
        if modified >= cutoff {
            continue;
        }

        let rel = path
            .strip_prefix(logs_dir)
            .map_err(|e| Error::Other(format!("{}: {e}", path.display())))?;
        let target = gz_target(&archive_root, rel);
        archive_bytes += compress(&path, &target)?;
        fs::remove_file(&path)?;
        files_archived += 1;
        tracing::debug!(from = %path.display(), to = %target.display(), "archived session log");
    }

    prune_empty_dirs(logs_dir, &archive_root)?;

    Ok(ArchiveOutcome {
        files_archived,
        archive_size_mb: (archive_bytes as f64 / 1024.0 / 1024.0 * 10.0).round() / 10.0,
    })
}

fn gz_target(archive_root: &Path, rel: &Path) -> PathBuf {
    let mut name = rel.as_os_str().to_os_string();
    name.push(".gz");
    archive_root.join(name)
}

/// Gzip `src` into `dst`; returns the compressed size.
fn compress(src: &Path, dst: &Path) -> Result<u64> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut input = BufReader::new(File::open(src)?);
    let mut encoder = GzEncoder::new(BufWriter::new(File::create(dst)?), Compression::default());
    io::copy(&mut input, &mut encoder)?;
    encoder.finish()?.into_inner().map_err(|e| e.into_error())?;
    Ok(fs::metadata(dst)?.len())
}

/// Remove empty directories below `dir`, bottom-up, skipping `keep`.
fn prune_empty_dirs(dir: &Path, keep: &Path) -> Result<bool> {
    let mut empty = true;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path == keep {
            empty = false;
            continue;
        }
        if path.is_dir() {
            if prune_empty_dirs(&path, keep)? {
                fs::remove_dir(&path)?;
            } else {
                empty = false;
            }
        } else {
            empty = false;
        }
    }
    Ok(empty)
}
