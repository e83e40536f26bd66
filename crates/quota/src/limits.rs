use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::reset::Window;

/// Composite counter key for a tier/operation pair, e.g. `"tier1_append"`.
pub fn counter_key(tier: &str, operation: &str) -> String {
    format!("{tier}_{operation}")
}

/// Caps for one counter.  `None` = uncapped, `Some(0)` = fully blocked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Limit {
    pub daily: Option<u32>,
    pub weekly: Option<u32>,
}

impl Limit {
    pub const fn daily(cap: u32) -> Self {
        Self {
            daily: Some(cap),
            weekly: None,
        }
    }

    pub const fn weekly(cap: u32) -> Self {
        Self {
            daily: None,
            weekly: Some(cap),
        }
    }

    /// The window whose reset zeroes this counter.
    ///
    /// A daily cap makes the counter daily-scoped; a weekly cap alone makes it
    /// weekly-scoped; uncapped counters roll over daily.
    pub fn window(&self) -> Window {
        match (self.daily, self.weekly) {
            (None, Some(_)) => Window::Weekly,
            _ => Window::Daily,
        }
    }

    /// First cap that `count` has reached, as a human-readable reason.
    pub fn breach(&self, count: u32) -> Option<String> {
        if let Some(cap) = self.daily {
            if count >= cap {
                return Some(format!("Daily limit reached: {count}/{cap}"));
            }
        }
        if let Some(cap) = self.weekly {
            if count >= cap {
                return Some(format!("Weekly limit reached: {count}/{cap}"));
            }
        }
        None
    }

    pub fn remaining(&self, count: u32) -> RemainingQuota {
        RemainingQuota {
            daily_remaining: self.daily.map(|cap| cap.saturating_sub(count)),
            weekly_remaining: self.weekly.map(|cap| cap.saturating_sub(count)),
        }
    }
}

/// Headroom left on each configured cap.  Unset caps are omitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemainingQuota {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_remaining: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_remaining: Option<u32>,
}

/// The built-in limit table materialized on first use.
pub fn default_limits() -> BTreeMap<String, Limit> {
    BTreeMap::from([
        ("tier1_append".to_string(), Limit::daily(5)),
        ("tier2_parameter".to_string(), Limit::weekly(2)),
        ("tier3_content".to_string(), Limit::weekly(1)),
        (
            "tier4_structural".to_string(),
            Limit {
                daily: Some(0),
                weekly: Some(0),
            },
        ),
    ])
}
