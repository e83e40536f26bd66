//! Daily insights: aggregate one day of session logs.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use tg_domain::error::{Error, Result};

use super::write_json;

/// The subset of a session log the aggregator reads.  Other fields are
/// ignored.
#[derive(Debug, Default, Deserialize)]
struct SessionLog {
    #[serde(default)]
    duration_seconds: u64,
    #[serde(default)]
    messages: Vec<SessionMessage>,
}

#[derive(Debug, Default, Deserialize)]
struct SessionMessage {
    #[serde(default)]
    role: String,
    #[serde(default)]
    tools_used: Vec<String>,
}

/// Contents of `insights/daily/<date>.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyInsights {
    pub analysis_date: NaiveDate,
    pub generated_at: DateTime<Utc>,
    pub sessions_analyzed: u32,
    pub total_duration_minutes: u64,
    pub tools_used: BTreeMap<String, u64>,
}

#[derive(Debug, Default)]
pub struct SessionTotals {
    pub sessions: u32,
    pub minutes: u64,
    pub tools: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailySummary {
    pub sessions_analyzed: u32,
    pub insights_file: PathBuf,
}

/// `<logs>/<YYYY-MM>/<YYYY-MM-DD>`
pub fn day_dir(logs_dir: &Path, day: NaiveDate) -> PathBuf {
    logs_dir
        .join(day.format("%Y-%m").to_string())
        .join(day.format("%Y-%m-%d").to_string())
}

/// Aggregate every `session_*.json` under the directory for `day`.
///
/// Files that fail to parse are logged and left out of every total.
pub fn aggregate_sessions(logs_dir: &Path, day: NaiveDate) -> Result<SessionTotals> {
    let dir = day_dir(logs_dir, day);
    let pattern = format!(
        "{}/session_*.json",
        glob::Pattern::escape(&dir.to_string_lossy())
    );
    let paths = glob::glob(&pattern).map_err(|e| Error::Other(format!("bad log pattern: {e}")))?;

    let mut totals = SessionTotals::default();

    let mut files: Vec<PathBuf> = paths.filter_map(|p| p.ok()).collect();
    files.sort();

    for path in files {
        let log: SessionLog = match std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|raw| serde_json::from_str::<SessionLog>(&raw).map_err(|e| e.to_string()))
        {
            Ok(log) => log,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping session log");
                continue;
            }
        };

        totals.sessions += 1;
        totals.minutes += log.duration_seconds / 60;
        for msg in log.messages.iter().filter(|m| m.role == "assistant") {
            for tool in &msg.tools_used {
                *totals.tools.entry(tool.clone()).or_insert(0) += 1;
            }
        }
    }

    Ok(totals)
}

/// Analyze `yesterday`'s logs and write the insights file for `today`.
pub fn run(
    logs_dir: &Path,
    insights_dir: &Path,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<DailySummary> {
    let yesterday = today.pred_opt().unwrap_or(today);
    let totals = aggregate_sessions(logs_dir, yesterday)?;
    let sessions_analyzed = totals.sessions;

    let insights = DailyInsights {
        analysis_date: today,
        generated_at: now,
        sessions_analyzed,
        total_duration_minutes: totals.minutes,
        tools_used: totals.tools,
    };
    let insights_file = daily_file(insights_dir, today);
    write_json(&insights_file, &insights)?;

    Ok(DailySummary {
        sessions_analyzed,
        insights_file,
    })
}

pub fn daily_file(insights_dir: &Path, day: NaiveDate) -> PathBuf {
    insights_dir
        .join("daily")
        .join(format!("{}.json", day.format("%Y-%m-%d")))
}
