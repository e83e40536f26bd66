//! Safety interlock registry.
//!
//! Named boolean switches persisted in `safety_switches.json`, independent of
//! the quota store.  The registry can veto any operation regardless of quota:
//! the system is operational only while both the master switch and the
//! emergency-stop switch are enabled.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use tg_domain::error::{Error, Result};
use tg_domain::state_file::StateFile;
use tg_domain::trace::TraceEvent;

use crate::switch::{default_switches, Switch, SwitchName, SwitchTable};

pub struct InterlockRegistry {
    file: StateFile,
    switches: SwitchTable,
}

impl InterlockRegistry {
    /// Load the switch table, creating defaults if the file is absent.
    ///
    /// Unknown switch names fail to parse and surface as a storage error.
    /// Known switches missing from the file are added with their defaults.
    pub fn load(file: StateFile, now: DateTime<Utc>) -> Result<Self> {
        let mut switches: SwitchTable = file.load_or_init(now, Ok, default_switches)?;

        let missing: Vec<SwitchName> = SwitchName::ALL
            .into_iter()
            .filter(|name| !switches.contains_key(name))
            .collect();
        if !missing.is_empty() {
            for name in &missing {
                switches.insert(*name, name.default_switch());
            }
            file.save(&switches)?;
            TraceEvent::StateMigrated {
                path: file.path().display().to_string(),
                detail: format!(
                    "added switches: {}",
                    missing.iter().map(|n| n.as_str()).collect::<Vec<_>>().join(", ")
                ),
            }
            .emit();
        }

        Ok(Self { file, switches })
    }

    pub fn switches(&self) -> &SwitchTable {
        &self.switches
    }

    pub fn get(&self, name: SwitchName) -> Option<&Switch> {
        self.switches.get(&name)
    }

    pub fn switch_enabled(&self, name: SwitchName) -> bool {
        self.switches.get(&name).map(|s| s.enabled).unwrap_or(false)
    }

    /// String lookup.  Names the registry does not know are disabled.
    pub fn is_enabled(&self, name: &str) -> bool {
        name.parse::<SwitchName>()
            .map(|n| self.switch_enabled(n))
            .unwrap_or(false)
    }

    pub fn is_system_operational(&self) -> bool {
        self.switch_enabled(SwitchName::AiSelfImprovement)
            && self.switch_enabled(SwitchName::EmergencyStopAvailable)
    }

    /// `name -> enabled` for every switch, for status output.
    pub fn flags(&self) -> BTreeMap<String, bool> {
        self.switches
            .iter()
            .map(|(name, sw)| (name.as_str().to_owned(), sw.enabled))
            .collect()
    }

    /// Trip the emergency stop and turn the master switch off in one write.
    ///
    /// Only a manual [`Self::set`] brings either switch back.
    pub fn emergency_stop(&mut self, now: DateTime<Utc>) -> Result<()> {
        let reason = format!("emergency stop at {}", now.to_rfc3339());
        self.apply(&reason, |table| {
            for name in [SwitchName::EmergencyStopAvailable, SwitchName::AiSelfImprovement] {
                let sw = table.entry(name).or_insert_with(|| name.default_switch());
                sw.enabled = false;
                sw.resume_at = None;
            }
        })?;
        tracing::warn!("emergency stop activated");
        Ok(())
    }

    /// Turn the master switch off until `now + hours`.
    pub fn pause(&mut self, hours: u32, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let resume_at = now
            .checked_add_signed(Duration::hours(i64::from(hours)))
            .ok_or_else(|| Error::Other(format!("pause duration out of range: {hours}h")))?;
        let reason = format!("paused for {hours}h");
        self.apply(&reason, |table| {
            let sw = master(table);
            sw.enabled = false;
            sw.resume_at = Some(resume_at);
        })?;
        tracing::info!(resume_at = %resume_at, "self-improvement paused");
        Ok(resume_at)
    }

    /// Re-enable a paused master switch once its resume time has passed.
    ///
    /// Does nothing while the emergency stop is tripped.
    pub fn resume_if_due(&mut self, now: DateTime<Utc>) -> Result<bool> {
        if !self.switch_enabled(SwitchName::EmergencyStopAvailable) {
            return Ok(false);
        }
        let due = self
            .switches
            .get(&SwitchName::AiSelfImprovement)
            .is_some_and(|sw| !sw.enabled && sw.resume_at.is_some_and(|t| t <= now));
        if !due {
            return Ok(false);
        }
        self.apply("pause expired", |table| {
            let sw = master(table);
            sw.enabled = true;
            sw.resume_at = None;
        })?;
        Ok(true)
    }

    /// Manual switch change.  Clears any pending resume on that switch.
    pub fn set(&mut self, name: SwitchName, enabled: bool) -> Result<()> {
        self.apply("manual", |table| {
            let sw = table.entry(name).or_insert_with(|| name.default_switch());
            sw.enabled = enabled;
            sw.resume_at = None;
        })
    }

    /// Mutate a copy, persist it, then commit and report what flipped.
    fn apply(&mut self, reason: &str, change: impl FnOnce(&mut SwitchTable)) -> Result<()> {
        let mut next = self.switches.clone();
        change(&mut next);
        self.file.save(&next)?;

        for (name, sw) in &next {
            let before = self.switches.get(name).map(|s| s.enabled);
            if before != Some(sw.enabled) {
                TraceEvent::InterlockChanged {
                    switch: name.as_str().to_owned(),
                    enabled: sw.enabled,
                    reason: reason.to_owned(),
                }
                .emit();
            }
        }
        self.switches = next;
        Ok(())
    }
}

fn master(table: &mut SwitchTable) -> &mut Switch {
    table
        .entry(SwitchName::AiSelfImprovement)
        .or_insert_with(|| SwitchName::AiSelfImprovement.default_switch())
}
