mod interlock;
mod jobs;
mod observability;
mod quota;
mod workspace;

pub use interlock::*;
pub use jobs::*;
pub use observability::*;
pub use quota::*;
pub use workspace::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub quota: QuotaConfig,
    #[serde(default)]
    pub interlock: InterlockConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub reports: ReportsConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        for (field, path) in [
            ("workspace.root", &self.workspace.root),
            ("workspace.state_dir", &self.workspace.state_dir),
            ("workspace.session_logs_dir", &self.workspace.session_logs_dir),
            ("workspace.insights_dir", &self.workspace.insights_dir),
        ] {
            if path.as_os_str().is_empty() {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: field.into(),
                    message: "path must not be empty".into(),
                });
            }
        }

        // An unknown timezone silently means UTC at runtime; say so here.
        if !self.quota.timezone_is_valid() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "quota.timezone".into(),
                message: format!("unknown IANA timezone \"{}\"", self.quota.timezone),
            });
        }

        if self.archive.retention_days == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "archive.retention_days".into(),
                message: "retention must be at least one day".into(),
            });
        } else if self.archive.retention_days > MAX_RETENTION_DAYS {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "archive.retention_days".into(),
                message: format!("retention must be at most {MAX_RETENTION_DAYS} days"),
            });
        }

        if self.reports.weekly_lookback_days == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "reports.weekly_lookback_days".into(),
                message: "lookback must be at least one day".into(),
            });
        } else if self.reports.weekly_lookback_days > MAX_WEEKLY_LOOKBACK_DAYS {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "reports.weekly_lookback_days".into(),
                message: format!("lookback must be at most {MAX_WEEKLY_LOOKBACK_DAYS} days"),
            });
        }

        if self.reports.top_tools == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "reports.top_tools".into(),
                message: "weekly reports will list no tools".into(),
            });
        }

        if self.storage.on_corrupt == CorruptStatePolicy::Reinitialize {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "storage.on_corrupt".into(),
                message: "corrupt state files will be replaced with defaults".into(),
            });
        }

        errors
    }
}
