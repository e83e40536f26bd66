//! Shared types for tierguard: the error type, configuration, structured
//! trace events, and whole-file JSON state persistence.

pub mod config;
pub mod error;
pub mod state_file;
pub mod trace;
