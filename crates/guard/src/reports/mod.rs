//! Session-log aggregation into daily insights and weekly reports.

pub mod daily;
pub mod weekly;

use std::path::Path;

use serde::Serialize;

use tg_domain::error::Result;

/// Pretty-print `value` to `path`, creating parent directories.
pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}
