//! Tiered change quotas for tierguard.
//!
//! Counts applied changes per `(tier, operation)` against daily and weekly
//! caps, resets counters on calendar boundaries, and keeps an audit trail of
//! what was applied with a content fingerprint of each changed file.

pub mod fingerprint;
pub mod limits;
pub mod record;
pub mod reset;
pub mod store;

pub use fingerprint::Fingerprint;
pub use limits::{counter_key, default_limits, Limit, RemainingQuota};
pub use record::ChangeRecord;
pub use reset::{ResetCalendar, Window};
pub use store::{LimitCheck, QuotaState, QuotaStatus, QuotaStore};
