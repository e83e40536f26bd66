//! tierguard: gate, scheduled jobs and CLI over the quota store and the
//! safety interlock registry.

pub mod archive;
pub mod cli;
pub mod gate;
pub mod jobs;
pub mod lock;
pub mod reports;
