//! Weekly report: roll up the daily insight files of the trailing week.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::Serialize;

use tg_domain::config::MAX_WEEKLY_LOOKBACK_DAYS;
use tg_domain::error::{Error, Result};
use tg_quota::ChangeRecord;

use super::daily::{daily_file, DailyInsights};
use super::write_json;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolCount {
    pub tool: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Period {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeeklySummary {
    pub total_sessions: u64,
    pub total_duration_hours: f64,
    pub most_used_tools: Vec<ToolCount>,
}

/// Contents of `insights/weekly/<year>-W<ww>.json`.
#[derive(Debug, Clone, Serialize)]
pub struct WeeklyReport {
    pub report_date: NaiveDate,
    pub week_number: u32,
    pub year: i32,
    pub generated_at: DateTime<Utc>,
    pub period: Period,
    pub summary: WeeklySummary,
    pub improvements_applied: Vec<ChangeRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeeklyOutcome {
    pub week_number: u32,
    pub report_file: PathBuf,
}

/// Settings the weekly job reads from `[reports]`.
#[derive(Debug, Clone, Copy)]
pub struct WeeklyParams {
    pub lookback_days: u32,
    pub top_tools: usize,
}

/// Highest counts first; equal counts in name order.
pub fn top_tools(counts: &BTreeMap<String, u64>, n: usize) -> Vec<ToolCount> {
    let mut ranked: Vec<ToolCount> = counts
        .iter()
        .map(|(tool, count)| ToolCount {
            tool: tool.clone(),
            count: *count,
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tool.cmp(&b.tool)));
    ranked.truncate(n);
    ranked
}

/// Minutes to hours, one decimal.
fn hours(minutes: u64) -> f64 {
    (minutes as f64 / 60.0 * 10.0).round() / 10.0
}

/// Daily insight files for `today` and the preceding days; missing or
/// unreadable ones are skipped.
pub fn collect_daily(insights_dir: &Path, today: NaiveDate, lookback_days: u32) -> Vec<DailyInsights> {
    (0..i64::from(lookback_days))
        .filter_map(|i| Duration::try_days(i).and_then(|d| today.checked_sub_signed(d)))
        .filter_map(|day| {
            let path = daily_file(insights_dir, day);
            if !path.exists() {
                return None;
            }
            match std::fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|raw| serde_json::from_str::<DailyInsights>(&raw).map_err(|e| e.to_string()))
            {
                Ok(insights) => Some(insights),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping daily insights");
                    None
                }
            }
        })
        .collect()
}

pub fn build(
    insights: &[DailyInsights],
    improvements_applied: Vec<ChangeRecord>,
    today: NaiveDate,
    now: DateTime<Utc>,
    params: WeeklyParams,
) -> Result<WeeklyReport> {
    let from = Duration::try_days(i64::from(params.lookback_days))
        .and_then(|window| today.checked_sub_signed(window))
        .ok_or_else(|| {
            Error::Config(format!("lookback of {} days is out of range", params.lookback_days))
        })?;
    let total_sessions: u64 = insights.iter().map(|d| u64::from(d.sessions_analyzed)).sum();
    let total_minutes: u64 = insights.iter().map(|d| d.total_duration_minutes).sum();

    let mut tools: BTreeMap<String, u64> = BTreeMap::new();
    for day in insights {
        for (tool, count) in &day.tools_used {
            *tools.entry(tool.clone()).or_insert(0) += count;
        }
    }

    let iso = today.iso_week();
    Ok(WeeklyReport {
        report_date: today,
        week_number: iso.week(),
        year: iso.year(),
        generated_at: now,
        period: Period { from, to: today },
        summary: WeeklySummary {
            total_sessions,
            total_duration_hours: hours(total_minutes),
            most_used_tools: top_tools(&tools, params.top_tools),
        },
        improvements_applied,
    })
}

pub fn weekly_file(insights_dir: &Path, today: NaiveDate) -> PathBuf {
    let iso = today.iso_week();
    insights_dir
        .join("weekly")
        .join(format!("{}-W{:02}.json", iso.year(), iso.week()))
}

pub fn run(
    insights_dir: &Path,
    improvements_applied: Vec<ChangeRecord>,
    today: NaiveDate,
    now: DateTime<Utc>,
    params: WeeklyParams,
) -> Result<WeeklyOutcome> {
    if params.lookback_days > MAX_WEEKLY_LOOKBACK_DAYS {
        return Err(Error::Config(format!(
            "weekly lookback must be at most {MAX_WEEKLY_LOOKBACK_DAYS} days, got {}",
            params.lookback_days
        )));
    }
    let daily = collect_daily(insights_dir, today, params.lookback_days);
    let report = build(&daily, improvements_applied, today, now, params)?;
    let report_file = weekly_file(insights_dir, today);
    write_json(&report_file, &report)?;
    Ok(WeeklyOutcome {
        week_number: report.week_number,
        report_file,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ties_break_by_name() {
        let counts = BTreeMap::from([
            ("write".to_string(), 3),
            ("exec".to_string(), 3),
            ("read".to_string(), 9),
            ("grep".to_string(), 1),
        ]);
        let top = top_tools(&counts, 3);
        let names: Vec<&str> = top.iter().map(|t| t.tool.as_str()).collect();
        assert_eq!(names, ["read", "exec", "write"]);
    }

    #[test]
    fn hours_round_to_one_decimal() {
        assert_eq!(hours(0), 0.0);
        assert_eq!(hours(90), 1.5);
        assert_eq!(hours(100), 1.7);
    }

    #[test]
    fn oversized_lookback_is_refused_before_scanning() {
        let dir = tempfile::tempdir().unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 3, 3).unwrap();
        let now = chrono::TimeZone::with_ymd_and_hms(&Utc, 2026, 3, 3, 9, 0, 0).unwrap();
        let params = WeeklyParams {
            lookback_days: u32::MAX,
            top_tools: 5,
        };
        let err = run(dir.path(), Vec::new(), today, now, params).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(!dir.path().join("weekly").exists());
    }

    #[test]
    fn iso_week_file_name() {
        // 2027-01-01 falls in ISO week 53 of 2026.
        let day = NaiveDate::from_ymd_opt(2027, 1, 1).unwrap();
        assert_eq!(
            weekly_file(Path::new("insights"), day),
            PathBuf::from("insights/weekly/2026-W53.json")
        );
    }
}
