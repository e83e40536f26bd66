//! Safety interlocks for tierguard: named kill switches that can veto any
//! change regardless of remaining quota.

pub mod registry;
pub mod switch;

pub use registry::InterlockRegistry;
pub use switch::{default_switches, Switch, SwitchName, SwitchTable};
