use chrono::Weekday;
use serde::{Deserialize, Serialize};

/// Calendar settings for counter resets.
///
/// Dates are evaluated in `timezone` (an IANA name such as
/// `"Europe/Paris"`).  The weekly window starts on `week_start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    #[serde(default = "d_timezone")]
    pub timezone: String,
    #[serde(default = "d_week_start")]
    pub week_start: Weekday,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            timezone: d_timezone(),
            week_start: d_week_start(),
        }
    }
}

impl QuotaConfig {
    /// Parse the configured timezone, falling back to UTC.
    pub fn tz(&self) -> chrono_tz::Tz {
        self.timezone.parse::<chrono_tz::Tz>().unwrap_or(chrono_tz::UTC)
    }

    pub fn timezone_is_valid(&self) -> bool {
        self.timezone.parse::<chrono_tz::Tz>().is_ok()
    }
}

fn d_timezone() -> String {
    "UTC".into()
}

fn d_week_start() -> Weekday {
    Weekday::Mon
}
