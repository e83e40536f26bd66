use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fingerprint::Fingerprint;

/// One applied change, kept in the daily and weekly audit lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub change_id: String,
    pub tier: String,
    pub operation: String,
    /// Base name of the changed file.
    pub file: String,
    pub at: DateTime<Utc>,
    /// Content fingerprint at application time, or a sentinel.
    pub hash: String,
}

impl ChangeRecord {
    pub fn capture(
        tier: &str,
        operation: &str,
        file: &Path,
        change_id: &str,
        at: DateTime<Utc>,
    ) -> Self {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.display().to_string());
        Self {
            change_id: change_id.to_owned(),
            tier: tier.to_owned(),
            operation: operation.to_owned(),
            file: name,
            at,
            hash: Fingerprint::of_file(file).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn keeps_only_the_base_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes").join("MEMORY.md");
        let at = Utc.with_ymd_and_hms(2026, 3, 3, 10, 0, 0).unwrap();

        let record = ChangeRecord::capture("tier1", "append", &path, "c-1", at);
        assert_eq!(record.file, "MEMORY.md");
        assert_eq!(record.hash, "file_not_found");
        assert_eq!(record.at, at);
    }
}
