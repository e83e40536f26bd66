use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Append-only, timestamped job log (`<state_dir>/cron_log.txt`).
///
/// Every line also goes to `tracing`.  Failing to write the file is logged
/// and otherwise ignored so a job never fails because of its own log.
pub struct JobLog {
    path: PathBuf,
    tz: Tz,
}

impl JobLog {
    pub fn new(path: impl Into<PathBuf>, tz: Tz) -> Self {
        Self {
            path: path.into(),
            tz,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn line(&self, now: DateTime<Utc>, message: &str) {
        tracing::info!(job_log = %self.path.display(), "{message}");
        let stamp = now.with_timezone(&self.tz).format("%Y-%m-%d %H:%M:%S");
        if let Err(e) = self.append(&format!("[{stamp}] {message}\n")) {
            tracing::warn!(path = %self.path.display(), error = %e, "cannot write job log");
        }
    }

    fn append(&self, entry: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(entry.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn lines_are_appended_with_local_stamp() {
        let dir = tempfile::tempdir().unwrap();
        let log = JobLog::new(dir.path().join("state/cron_log.txt"), chrono_tz::Europe::Paris);
        let now = Utc.with_ymd_and_hms(2026, 3, 3, 22, 15, 0).unwrap();

        log.line(now, "first");
        log.line(now, "second");

        let text = fs::read_to_string(log.path()).unwrap();
        assert_eq!(
            text,
            "[2026-03-03 23:15:00] first\n[2026-03-03 23:15:00] second\n"
        );
    }
}
