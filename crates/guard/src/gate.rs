//! The gate: interlocks first, then quota.
//!
//! A change may proceed only while the system is operational and its
//! tier/operation counter has headroom.  A disabled system short-circuits
//! before any counter reset or limit computation.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use tg_domain::config::Config;
use tg_domain::error::Result;
use tg_domain::state_file::StateFile;
use tg_interlock::{InterlockRegistry, SwitchName};
use tg_quota::{ChangeRecord, LimitCheck, QuotaStatus, QuotaStore, ResetCalendar};

use crate::lock::StateLock;

pub const SYSTEM_DISABLED: &str = "Self-improvement system is disabled";
pub const EMERGENCY_STOPPED: &str = "Emergency stop activated";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Store constructors
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub fn open_quota(config: &Config, now: DateTime<Utc>) -> Result<QuotaStore> {
    let file = StateFile::new(config.workspace.rate_limits_path(), config.storage.on_corrupt);
    QuotaStore::load(file, ResetCalendar::from(&config.quota), now)
}

pub fn open_interlock(config: &Config, now: DateTime<Utc>) -> Result<InterlockRegistry> {
    let file = StateFile::new(
        config.workspace.safety_switches_path(),
        config.storage.on_corrupt,
    );
    InterlockRegistry::load(file, now)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Results
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Outcome of a locked check-and-record.
#[derive(Debug, Clone, Serialize)]
pub struct ClaimOutcome {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<ChangeRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub generated_at: DateTime<Utc>,
    pub system_enabled: bool,
    pub switches: BTreeMap<String, bool>,
    pub quota: QuotaStatus,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Gate
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct Gate {
    quota: QuotaStore,
    interlock: InterlockRegistry,
    auto_resume: bool,
}

impl Gate {
    pub fn new(quota: QuotaStore, interlock: InterlockRegistry, auto_resume: bool) -> Self {
        Self {
            quota,
            interlock,
            auto_resume,
        }
    }

    /// Load both stores from the configured workspace.
    pub fn open(config: &Config, now: DateTime<Utc>) -> Result<Self> {
        Ok(Self::new(
            open_quota(config, now)?,
            open_interlock(config, now)?,
            config.interlock.auto_resume,
        ))
    }

    pub fn quota(&mut self) -> &mut QuotaStore {
        &mut self.quota
    }

    pub fn interlock(&mut self) -> &mut InterlockRegistry {
        &mut self.interlock
    }

    pub fn can_proceed(&mut self, tier: &str, operation: &str, now: DateTime<Utc>) -> LimitCheck {
        if let Some(reason) = self.interlock_veto(now) {
            tracing::info!(tier, operation, reason, "change vetoed by interlock");
            return LimitCheck::deny(reason);
        }
        self.quota.check_limit(tier, operation, now)
    }

    /// Check and record in one step.  Nothing is recorded on a denial.
    pub fn claim(
        &mut self,
        tier: &str,
        operation: &str,
        file: &Path,
        change_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ClaimOutcome> {
        let check = self.can_proceed(tier, operation, now);
        if !check.allowed {
            return Ok(ClaimOutcome {
                allowed: false,
                reason: check.reason,
                record: None,
            });
        }
        let record = self
            .quota
            .record_application(tier, operation, file, change_id, now)?;
        Ok(ClaimOutcome {
            allowed: true,
            reason: None,
            record: Some(record),
        })
    }

    pub fn status(&mut self, now: DateTime<Utc>) -> StatusSnapshot {
        self.maybe_resume(now);
        StatusSnapshot {
            generated_at: now,
            system_enabled: self.interlock.is_system_operational(),
            switches: self.interlock.flags(),
            quota: self.quota.status(now),
        }
    }

    /// A tripped emergency stop is reported ahead of the disabled master
    /// switch, since tripping the stop also turns the master off.
    fn interlock_veto(&mut self, now: DateTime<Utc>) -> Option<&'static str> {
        self.maybe_resume(now);
        if !self.interlock.switch_enabled(SwitchName::EmergencyStopAvailable) {
            Some(EMERGENCY_STOPPED)
        } else if !self.interlock.switch_enabled(SwitchName::AiSelfImprovement) {
            Some(SYSTEM_DISABLED)
        } else {
            None
        }
    }

    fn maybe_resume(&mut self, now: DateTime<Utc>) {
        if !self.auto_resume {
            return;
        }
        if let Err(e) = self.interlock.resume_if_due(now) {
            tracing::warn!(error = %e, "automatic resume failed");
        }
    }
}

/// [`Gate::claim`] under the workspace lock, loading fresh state inside it.
pub fn locked_claim(
    config: &Config,
    tier: &str,
    operation: &str,
    file: &Path,
    change_id: &str,
    now: DateTime<Utc>,
) -> Result<ClaimOutcome> {
    let _lock = StateLock::acquire(&config.workspace.lock_path())?;
    Gate::open(config, now)?.claim(tier, operation, file, change_id, now)
}

/// [`QuotaStore::record_application`] under the workspace lock.
pub fn locked_record(
    config: &Config,
    tier: &str,
    operation: &str,
    file: &Path,
    change_id: &str,
    now: DateTime<Utc>,
) -> Result<ChangeRecord> {
    let _lock = StateLock::acquire(&config.workspace.lock_path())?;
    open_quota(config, now)?.record_application(tier, operation, file, change_id, now)
}
