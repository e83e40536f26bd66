use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Interlock & storage
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InterlockConfig {
    /// When true, the gate re-enables a paused system once its `resume_at`
    /// has passed.  An emergency stop is never lifted automatically.
    #[serde(default)]
    pub auto_resume: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub on_corrupt: CorruptStatePolicy,
}

/// What to do when a state file exists but cannot be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorruptStatePolicy {
    /// Surface the error and leave the file untouched.
    #[default]
    Fail,
    /// Move the file aside and start over from defaults.
    Reinitialize,
}
