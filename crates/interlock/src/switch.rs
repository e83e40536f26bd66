use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tg_domain::error::Error;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Switch names
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Every safety switch the registry knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SwitchName {
    /// Master on/off switch.
    AiSelfImprovement,
    AutoApplyChanges,
    #[serde(rename = "ALLOW_TIER_1_AUTO")]
    AllowTier1Auto,
    AllowSoulEdit,
    AllowAgentsEdit,
    RequireBackup,
    RequireValidation,
    EnableKillSwitchVotes,
    DangerousPatternDetection,
    /// Tripped (set to false) by an emergency stop.
    EmergencyStopAvailable,
}

impl SwitchName {
    pub const ALL: [SwitchName; 10] = [
        Self::AiSelfImprovement,
        Self::AutoApplyChanges,
        Self::AllowTier1Auto,
        Self::AllowSoulEdit,
        Self::AllowAgentsEdit,
        Self::RequireBackup,
        Self::RequireValidation,
        Self::EnableKillSwitchVotes,
        Self::DangerousPatternDetection,
        Self::EmergencyStopAvailable,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AiSelfImprovement => "AI_SELF_IMPROVEMENT",
            Self::AutoApplyChanges => "AUTO_APPLY_CHANGES",
            Self::AllowTier1Auto => "ALLOW_TIER_1_AUTO",
            Self::AllowSoulEdit => "ALLOW_SOUL_EDIT",
            Self::AllowAgentsEdit => "ALLOW_AGENTS_EDIT",
            Self::RequireBackup => "REQUIRE_BACKUP",
            Self::RequireValidation => "REQUIRE_VALIDATION",
            Self::EnableKillSwitchVotes => "ENABLE_KILL_SWITCH_VOTES",
            Self::DangerousPatternDetection => "DANGEROUS_PATTERN_DETECTION",
            Self::EmergencyStopAvailable => "EMERGENCY_STOP_AVAILABLE",
        }
    }

    /// Factory state of this switch.
    pub fn default_switch(self) -> Switch {
        let (enabled, description) = match self {
            Self::AiSelfImprovement => (false, "Master on/off switch"),
            Self::AutoApplyChanges => (false, "Allow automatic application"),
            Self::AllowTier1Auto => (false, "Auto-apply Tier 1 after timeout"),
            Self::AllowSoulEdit => (false, "Permit SOUL.md changes"),
            Self::AllowAgentsEdit => (false, "Permit AGENTS.md changes"),
            Self::RequireBackup => (true, "Require backup before changes"),
            Self::RequireValidation => (true, "Require validation"),
            Self::EnableKillSwitchVotes => (true, "User can disable"),
            Self::DangerousPatternDetection => (true, "Pattern detection"),
            Self::EmergencyStopAvailable => (true, "Emergency stop available"),
        };
        Switch {
            enabled,
            description: description.to_owned(),
            resume_at: None,
        }
    }
}

impl fmt::Display for SwitchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SwitchName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| Error::UnknownSwitch(s.to_owned()))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Switch state
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Unknown fields are rejected so a rewrite never drops them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Switch {
    /// Absent in the file means disabled.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub description: String,
    /// Set by a pause; when the master switch may come back on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_at: Option<DateTime<Utc>>,
}

/// The persisted switch document.
pub type SwitchTable = BTreeMap<SwitchName, Switch>;

pub fn default_switches() -> SwitchTable {
    SwitchName::ALL
        .into_iter()
        .map(|name| (name, name.default_switch()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_serde() {
        for name in SwitchName::ALL {
            let json = serde_json::to_value(name).unwrap();
            assert_eq!(json, serde_json::json!(name.as_str()));
            assert_eq!(name.as_str().parse::<SwitchName>().unwrap(), name);
        }
    }

    #[test]
    fn tier_one_name_keeps_its_underscore() {
        assert_eq!(
            serde_json::to_string(&SwitchName::AllowTier1Auto).unwrap(),
            "\"ALLOW_TIER_1_AUTO\""
        );
    }

    #[test]
    fn unknown_name_fails_to_parse() {
        let err = "SELF_DESTRUCT".parse::<SwitchName>().unwrap_err();
        assert!(matches!(err, Error::UnknownSwitch(n) if n == "SELF_DESTRUCT"));
    }

    #[test]
    fn defaults_ship_disabled_master() {
        let table = default_switches();
        assert_eq!(table.len(), 10);
        assert!(!table[&SwitchName::AiSelfImprovement].enabled);
        assert!(table[&SwitchName::EmergencyStopAvailable].enabled);
        assert!(table[&SwitchName::RequireBackup].enabled);
    }

    #[test]
    fn missing_enabled_field_means_disabled() {
        let sw: Switch = serde_json::from_str(r#"{"description": "x"}"#).unwrap();
        assert!(!sw.enabled);
        assert_eq!(sw.resume_at, None);
    }

    #[test]
    fn foreign_field_fails_to_parse() {
        let res = serde_json::from_str::<Switch>(r#"{"enabled": false, "paused_by": "ops"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn resume_at_is_omitted_when_unset() {
        let json = serde_json::to_value(SwitchName::RequireBackup.default_switch()).unwrap();
        assert!(json.get("resume_at").is_none());
    }
}
