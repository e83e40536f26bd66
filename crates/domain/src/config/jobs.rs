use serde::{Deserialize, Serialize};

/// Upper bound accepted for `reports.weekly_lookback_days`.
pub const MAX_WEEKLY_LOOKBACK_DAYS: u32 = 366;
/// Upper bound accepted for `archive.retention_days`.
pub const MAX_RETENTION_DAYS: u32 = 36_500;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Reports
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportsConfig {
    /// How many tools the weekly report lists under `most_used_tools`.
    #[serde(default = "d_top_tools")]
    pub top_tools: usize,
    /// How many daily insight files (ending today) feed the weekly report.
    #[serde(default = "d_lookback")]
    pub weekly_lookback_days: u32,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            top_tools: d_top_tools(),
            weekly_lookback_days: d_lookback(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Archive
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Session logs last modified more than this many days ago are archived.
    #[serde(default = "d_retention_days")]
    pub retention_days: u32,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            retention_days: d_retention_days(),
        }
    }
}

fn d_top_tools() -> usize {
    5
}
fn d_lookback() -> u32 {
    7
}
fn d_retention_days() -> u32 {
    30
}
