//! Tiered quota store.
//!
//! Persists counters, limits and the applied-change audit trail in
//! `rate_limits.json` under the state directory.  The whole document is
//! loaded on construction and rewritten on every mutation.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tg_domain::error::{Error, Result};
use tg_domain::state_file::StateFile;
use tg_domain::trace::TraceEvent;

use crate::limits::{counter_key, default_limits, Limit, RemainingQuota};
use crate::record::ChangeRecord;
use crate::reset::{ResetCalendar, Window};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Persisted state
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The on-disk quota document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuotaState {
    pub window_start: DateTime<Utc>,
    pub counters: BTreeMap<String, u32>,
    pub limits: BTreeMap<String, Limit>,
    #[serde(default)]
    pub applied_today: Vec<ChangeRecord>,
    #[serde(default)]
    pub applied_this_week: Vec<ChangeRecord>,
    pub last_reset_daily: DateTime<Utc>,
    pub last_reset_weekly: DateTime<Utc>,
}

impl QuotaState {
    /// Fresh state: every default limit with a zero counter, markers at `now`.
    pub fn initial(now: DateTime<Utc>) -> Self {
        let limits = default_limits();
        let counters = limits.keys().map(|k| (k.clone(), 0)).collect();
        Self {
            window_start: now,
            counters,
            limits,
            applied_today: Vec::new(),
            applied_this_week: Vec::new(),
            last_reset_daily: now,
            last_reset_weekly: now,
        }
    }

    /// Check the counter/limit key sets agree.
    ///
    /// Limits without a counter get one at zero; the returned list names
    /// them.  A counter without a limit cannot be enforced and is rejected.
    pub fn migrate(&mut self, path: &Path) -> Result<Vec<String>> {
        if let Some(orphan) = self.counters.keys().find(|k| !self.limits.contains_key(*k)) {
            return Err(Error::storage(
                path,
                format!("counter \"{orphan}\" has no limit entry"),
            ));
        }

        let mut added = Vec::new();
        for key in self.limits.keys() {
            if !self.counters.contains_key(key) {
                self.counters.insert(key.clone(), 0);
                added.push(key.clone());
            }
        }
        Ok(added)
    }

    fn keys_in(&self, window: Window) -> Vec<String> {
        self.limits
            .iter()
            .filter(|(_, limit)| limit.window() == window)
            .map(|(key, _)| key.clone())
            .collect()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Query results
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Outcome of a limit check.  A denial is a value, never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LimitCheck {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl LimitCheck {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

/// Point-in-time view of the whole store.
#[derive(Debug, Clone, Serialize)]
pub struct QuotaStatus {
    pub window_start: DateTime<Utc>,
    pub counters: BTreeMap<String, u32>,
    pub limits: BTreeMap<String, Limit>,
    pub applied_today: usize,
    pub applied_this_week: usize,
    pub last_reset_daily: DateTime<Utc>,
    pub last_reset_weekly: DateTime<Utc>,
    pub remaining: BTreeMap<String, RemainingQuota>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Quota store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Counters, limits and audit lists backed by a JSON state file.
pub struct QuotaStore {
    file: StateFile,
    calendar: ResetCalendar,
    state: QuotaState,
}

impl QuotaStore {
    /// Load the store, creating and persisting defaults if the file is absent.
    pub fn load(file: StateFile, calendar: ResetCalendar, now: DateTime<Utc>) -> Result<Self> {
        let path = file.path().to_path_buf();
        let mut migrated = Vec::new();
        let state = file.load_or_init(
            now,
            |mut state: QuotaState| {
                migrated = state.migrate(&path)?;
                Ok(state)
            },
            || QuotaState::initial(now),
        )?;

        if !migrated.is_empty() {
            TraceEvent::StateMigrated {
                path: path.display().to_string(),
                detail: format!("added counters: {}", migrated.join(", ")),
            }
            .emit();
            file.save(&state)?;
        }

        tracing::debug!(
            counters = state.counters.len(),
            path = %path.display(),
            "quota store loaded"
        );

        Ok(Self {
            file,
            calendar,
            state,
        })
    }

    pub fn state(&self) -> &QuotaState {
        &self.state
    }

    pub fn calendar(&self) -> &ResetCalendar {
        &self.calendar
    }

    pub fn counter(&self, tier: &str, operation: &str) -> Option<u32> {
        self.state.counters.get(&counter_key(tier, operation)).copied()
    }

    pub fn applied_this_week(&self) -> &[ChangeRecord] {
        &self.state.applied_this_week
    }

    /// Zero daily-scoped counters on the first call of a new calendar date.
    pub fn check_daily_reset(&mut self, now: DateTime<Utc>) -> bool {
        if !self
            .calendar
            .is_due(Window::Daily, self.state.last_reset_daily, now)
        {
            return false;
        }
        let keys = self.state.keys_in(Window::Daily);
        for key in &keys {
            self.state.counters.insert(key.clone(), 0);
        }
        let cleared = std::mem::take(&mut self.state.applied_today).len();
        self.state.last_reset_daily = now;
        self.after_reset(Window::Daily, keys, cleared);
        true
    }

    /// Zero weekly-scoped counters on the first call of a new week.
    pub fn check_weekly_reset(&mut self, now: DateTime<Utc>) -> bool {
        if !self
            .calendar
            .is_due(Window::Weekly, self.state.last_reset_weekly, now)
        {
            return false;
        }
        let keys = self.state.keys_in(Window::Weekly);
        for key in &keys {
            self.state.counters.insert(key.clone(), 0);
        }
        let cleared = std::mem::take(&mut self.state.applied_this_week).len();
        self.state.last_reset_weekly = now;
        self.after_reset(Window::Weekly, keys, cleared);
        true
    }

    /// Whether one more application of `tier`/`operation` fits its caps.
    pub fn check_limit(&mut self, tier: &str, operation: &str, now: DateTime<Utc>) -> LimitCheck {
        self.run_resets(now);

        let key = counter_key(tier, operation);
        let Some(limit) = self.state.limits.get(&key) else {
            return LimitCheck::deny(format!("Unknown tier/operation: {key}"));
        };
        let count = self.state.counters.get(&key).copied().unwrap_or(0);

        match limit.breach(count) {
            Some(reason) => {
                TraceEvent::LimitDenied {
                    counter: key,
                    reason: reason.clone(),
                }
                .emit();
                LimitCheck::deny(reason)
            }
            None => LimitCheck::allow(),
        }
    }

    /// Count one application and append it to the audit lists.
    ///
    /// Caps are not enforced here; callers gate with [`Self::check_limit`].
    /// The in-memory state only changes once the new document is on disk.
    pub fn record_application(
        &mut self,
        tier: &str,
        operation: &str,
        file: &Path,
        change_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ChangeRecord> {
        self.run_resets(now);

        let key = counter_key(tier, operation);
        if !self.state.limits.contains_key(&key) {
            return Err(Error::UnknownCounter(key));
        }

        let record = ChangeRecord::capture(tier, operation, file, change_id, now);
        let mut next = self.state.clone();
        let count = next.counters.entry(key.clone()).or_insert(0);
        *count = count.saturating_add(1);
        let count = *count;
        next.applied_today.push(record.clone());
        next.applied_this_week.push(record.clone());

        self.file.save(&next)?;
        self.state = next;

        TraceEvent::ChangeRecorded {
            change_id: record.change_id.clone(),
            counter: key,
            count,
            hash: record.hash.clone(),
        }
        .emit();

        Ok(record)
    }

    /// Headroom on each configured cap.  Unknown keys report no caps.
    pub fn remaining_quota(
        &mut self,
        tier: &str,
        operation: &str,
        now: DateTime<Utc>,
    ) -> RemainingQuota {
        self.run_resets(now);
        let key = counter_key(tier, operation);
        self.remaining_for(&key)
    }

    pub fn status(&mut self, now: DateTime<Utc>) -> QuotaStatus {
        self.run_resets(now);
        let remaining = self
            .state
            .limits
            .keys()
            .map(|key| (key.clone(), self.remaining_for(key)))
            .collect();
        QuotaStatus {
            window_start: self.state.window_start,
            counters: self.state.counters.clone(),
            limits: self.state.limits.clone(),
            applied_today: self.state.applied_today.len(),
            applied_this_week: self.state.applied_this_week.len(),
            last_reset_daily: self.state.last_reset_daily,
            last_reset_weekly: self.state.last_reset_weekly,
            remaining,
        }
    }

    fn remaining_for(&self, key: &str) -> RemainingQuota {
        let count = self.state.counters.get(key).copied().unwrap_or(0);
        self.state
            .limits
            .get(key)
            .map(|limit| limit.remaining(count))
            .unwrap_or_default()
    }

    fn run_resets(&mut self, now: DateTime<Utc>) {
        self.check_daily_reset(now);
        self.check_weekly_reset(now);
    }

    fn after_reset(&self, window: Window, counters: Vec<String>, cleared_records: usize) {
        TraceEvent::CountersReset {
            window: window.to_string(),
            counters,
            cleared_records,
        }
        .emit();
        // The reset stands in memory; the next mutation rewrites the file.
        if let Err(e) = self.file.save(&self.state) {
            tracing::warn!(error = %e, window = %window, "failed to persist counter reset");
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tg_domain::config::CorruptStatePolicy;

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, d, h, 0, 0).unwrap()
    }

    fn open(dir: &Path, now: DateTime<Utc>) -> QuotaStore {
        let file = StateFile::new(dir.join("rate_limits.json"), CorruptStatePolicy::Fail);
        QuotaStore::load(file, ResetCalendar::default(), now).unwrap()
    }

    #[test]
    fn initial_state_has_a_counter_per_limit() {
        let state = QuotaState::initial(at(3, 9));
        assert_eq!(state.counters.len(), state.limits.len());
        assert!(state.counters.values().all(|c| *c == 0));
        assert_eq!(state.last_reset_daily, at(3, 9));
    }

    #[test]
    fn orphan_counter_is_rejected() {
        let mut state = QuotaState::initial(at(3, 9));
        state.counters.insert("tier9_magic".into(), 1);
        let err = state.migrate(Path::new("x.json")).unwrap_err();
        assert!(err.is_corrupt_state());
        assert!(err.to_string().contains("tier9_magic"));
    }

    #[test]
    fn missing_counter_is_migrated_in() {
        let mut state = QuotaState::initial(at(3, 9));
        state.counters.remove("tier3_content");
        let added = state.migrate(Path::new("x.json")).unwrap();
        assert_eq!(added, vec!["tier3_content".to_string()]);
        assert_eq!(state.counters["tier3_content"], 0);
    }

    #[test]
    fn unknown_key_is_denied_not_errored() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path(), at(3, 9));
        let check = store.check_limit("tier7", "teleport", at(3, 9));
        assert!(!check.allowed);
        assert_eq!(
            check.reason.as_deref(),
            Some("Unknown tier/operation: tier7_teleport")
        );
    }

    #[test]
    fn record_unknown_key_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path(), at(3, 9));
        let err = store
            .record_application("tier7", "teleport", Path::new("a.md"), "c1", at(3, 9))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownCounter(k) if k == "tier7_teleport"));
    }

    #[test]
    fn structural_tier_is_always_blocked() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path(), at(3, 9));
        let check = store.check_limit("tier4", "structural", at(3, 9));
        assert_eq!(check.reason.as_deref(), Some("Daily limit reached: 0/0"));
    }

    #[test]
    fn daily_reset_leaves_weekly_counters_alone() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path(), at(3, 9));
        let f = dir.path().join("f.md");
        store.record_application("tier1", "append", &f, "a", at(3, 10)).unwrap();
        store.record_application("tier2", "parameter", &f, "b", at(3, 11)).unwrap();

        assert!(store.check_daily_reset(at(4, 8)));
        assert_eq!(store.counter("tier1", "append"), Some(0));
        assert_eq!(store.counter("tier2", "parameter"), Some(1));
        assert!(store.state().applied_today.is_empty());
        assert_eq!(store.state().applied_this_week.len(), 2);
    }

    #[test]
    fn remaining_omits_unset_caps() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = open(dir.path(), at(3, 9));
        let r = store.remaining_quota("tier2", "parameter", at(3, 9));
        assert_eq!(r.daily_remaining, None);
        assert_eq!(r.weekly_remaining, Some(2));
    }

    #[test]
    fn limit_check_serializes_without_reason_when_allowed() {
        let json = serde_json::to_value(LimitCheck::allow()).unwrap();
        assert_eq!(json, serde_json::json!({ "allowed": true }));
    }
}
