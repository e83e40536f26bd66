//! Scheduled maintenance jobs: daily insights, weekly report, monthly
//! archive, and a manual analysis trigger.
//!
//! Every job is skipped while the master switch is off.  Failures are
//! reported in the outcome instead of aborting the process.

pub mod log;

pub use log::JobLog;

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use tg_domain::config::Config;
use tg_domain::error::Result;
use tg_domain::trace::TraceEvent;
use tg_interlock::SwitchName;

use crate::archive::{self, ArchiveOutcome};
use crate::gate::{open_interlock, open_quota};
use crate::reports::daily::{self, DailySummary};
use crate::reports::weekly::{self, WeeklyOutcome, WeeklyParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    Daily,
    Weekly,
    Monthly,
    Analyze,
}

impl Job {
    fn label(self) -> &'static str {
        match self {
            Self::Daily => "daily analysis",
            Self::Weekly => "weekly report",
            Self::Monthly => "monthly archive",
            Self::Analyze => "manual analysis",
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Analyze => "analyze",
        })
    }
}

/// Result of one job, tagged by `status`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome<T> {
    Success(T),
    Skipped { reason: String },
    Error { error: String },
}

impl<T> JobOutcome<T> {
    fn status(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Skipped { .. } => "skipped",
            Self::Error { .. } => "error",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ManualAnalysis {
    pub trigger_type: &'static str,
    pub timestamp: DateTime<Utc>,
    pub daily_analysis: JobOutcome<DailySummary>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Runner
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct JobRunner<'a> {
    config: &'a Config,
    log: JobLog,
}

impl<'a> JobRunner<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            log: JobLog::new(config.workspace.job_log_path(), config.quota.tz()),
        }
    }

    /// Run `job` and render its outcome as JSON.
    pub fn run(&self, job: Job, now: DateTime<Utc>) -> serde_json::Value {
        let value = match job {
            Job::Daily => serde_json::to_value(self.daily(now)),
            Job::Weekly => serde_json::to_value(self.weekly(now)),
            Job::Monthly => serde_json::to_value(self.monthly(now)),
            Job::Analyze => serde_json::to_value(self.analyze(now)),
        };
        value.unwrap_or_else(|e| serde_json::json!({ "status": "error", "error": e.to_string() }))
    }

    pub fn daily(&self, now: DateTime<Utc>) -> JobOutcome<DailySummary> {
        self.guarded(Job::Daily, now, |runner| {
            let summary = daily::run(
                &runner.config.workspace.session_logs_dir(),
                &runner.config.workspace.insights_dir(),
                runner.today(now),
                now,
            )?;
            let msg = format!("{} sessions analyzed", summary.sessions_analyzed);
            Ok((summary, msg))
        })
    }

    pub fn weekly(&self, now: DateTime<Utc>) -> JobOutcome<WeeklyOutcome> {
        self.guarded(Job::Weekly, now, |runner| {
            let config = runner.config;
            let applied = open_quota(config, now)?.applied_this_week().to_vec();
            let params = WeeklyParams {
                lookback_days: config.reports.weekly_lookback_days,
                top_tools: config.reports.top_tools,
            };
            let outcome = weekly::run(
                &config.workspace.insights_dir(),
                applied,
                runner.today(now),
                now,
                params,
            )?;
            let msg = format!("week {} written to {}", outcome.week_number, outcome.report_file.display());
            Ok((outcome, msg))
        })
    }

    pub fn monthly(&self, now: DateTime<Utc>) -> JobOutcome<ArchiveOutcome> {
        self.guarded(Job::Monthly, now, |runner| {
            let outcome = archive::archive_old_logs(
                &runner.config.workspace.session_logs_dir(),
                runner.config.archive.retention_days,
                now,
            )?;
            let msg = format!(
                "{} files archived ({:.1} MB)",
                outcome.files_archived, outcome.archive_size_mb
            );
            Ok((outcome, msg))
        })
    }

    pub fn analyze(&self, now: DateTime<Utc>) -> ManualAnalysis {
        self.log.line(now, "Manual analysis triggered");
        let daily_analysis = self.daily(now);
        TraceEvent::JobCompleted {
            job: Job::Analyze.to_string(),
            status: daily_analysis.status().to_owned(),
        }
        .emit();
        ManualAnalysis {
            trigger_type: "manual",
            timestamp: now,
            daily_analysis,
        }
    }

    fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.config.quota.tz()).date_naive()
    }

    /// Only the master switch matters here; an emergency stop turns it off too.
    fn system_enabled(&self, now: DateTime<Utc>) -> Result<bool> {
        let mut registry = open_interlock(self.config, now)?;
        if self.config.interlock.auto_resume {
            registry.resume_if_due(now)?;
        }
        Ok(registry.switch_enabled(SwitchName::AiSelfImprovement))
    }

    fn guarded<T>(
        &self,
        job: Job,
        now: DateTime<Utc>,
        body: impl FnOnce(&Self) -> Result<(T, String)>,
    ) -> JobOutcome<T> {
        let label = job.label();
        self.log.line(now, &format!("Starting {label}"));

        let outcome = match self.system_enabled(now) {
            Ok(false) => {
                self.log.line(now, &format!("System disabled - skipping {label}"));
                JobOutcome::Skipped {
                    reason: "system_disabled".into(),
                }
            }
            Ok(true) => match body(self) {
                Ok((value, summary)) => {
                    self.log.line(now, &format!("Completed {label}: {summary}"));
                    JobOutcome::Success(value)
                }
                Err(e) => {
                    self.log.line(now, &format!("Error in {label}: {e}"));
                    JobOutcome::Error {
                        error: e.to_string(),
                    }
                }
            },
            Err(e) => {
                self.log.line(now, &format!("Error in {label}: {e}"));
                JobOutcome::Error {
                    error: e.to_string(),
                }
            }
        };

        TraceEvent::JobCompleted {
            job: job.to_string(),
            status: outcome.status().to_owned(),
        }
        .emit();
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Payload {
        files_archived: u32,
    }

    #[test]
    fn outcome_is_tagged_by_status() {
        let ok = serde_json::to_value(JobOutcome::Success(Payload { files_archived: 3 })).unwrap();
        assert_eq!(ok, serde_json::json!({ "status": "success", "files_archived": 3 }));

        let skipped: JobOutcome<Payload> = JobOutcome::Skipped {
            reason: "system_disabled".into(),
        };
        assert_eq!(
            serde_json::to_value(skipped).unwrap(),
            serde_json::json!({ "status": "skipped", "reason": "system_disabled" })
        );
    }
}
