use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Workspace
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Where state, session logs, and reports live.
///
/// Every directory except `root` may be relative, in which case it is
/// resolved against `root`.  Nothing is derived from the process environment;
/// callers pass the resolved paths into the store constructors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default = "d_root")]
    pub root: PathBuf,
    #[serde(default = "d_state_dir")]
    pub state_dir: PathBuf,
    #[serde(default = "d_session_logs_dir")]
    pub session_logs_dir: PathBuf,
    #[serde(default = "d_insights_dir")]
    pub insights_dir: PathBuf,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: d_root(),
            state_dir: d_state_dir(),
            session_logs_dir: d_session_logs_dir(),
            insights_dir: d_insights_dir(),
        }
    }
}

impl WorkspaceConfig {
    /// A workspace rooted at `root` with every other directory at its default.
    pub fn rooted_at(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    pub fn state_dir(&self) -> PathBuf {
        self.resolve(&self.state_dir)
    }

    pub fn rate_limits_path(&self) -> PathBuf {
        self.state_dir().join("rate_limits.json")
    }

    pub fn safety_switches_path(&self) -> PathBuf {
        self.state_dir().join("safety_switches.json")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.state_dir().join("tierguard.lock")
    }

    pub fn job_log_path(&self) -> PathBuf {
        self.state_dir().join("cron_log.txt")
    }

    pub fn session_logs_dir(&self) -> PathBuf {
        self.resolve(&self.session_logs_dir)
    }

    pub fn insights_dir(&self) -> PathBuf {
        self.resolve(&self.insights_dir)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_root() -> PathBuf {
    PathBuf::from(".")
}
fn d_state_dir() -> PathBuf {
    PathBuf::from("self_improvement")
}
fn d_session_logs_dir() -> PathBuf {
    PathBuf::from("session_logs")
}
fn d_insights_dir() -> PathBuf {
    PathBuf::from("self_improvement/insights")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_dirs_resolve_against_root() {
        let ws = WorkspaceConfig::rooted_at("/srv/agent");
        assert_eq!(
            ws.rate_limits_path(),
            PathBuf::from("/srv/agent/self_improvement/rate_limits.json")
        );
        assert_eq!(
            ws.insights_dir(),
            PathBuf::from("/srv/agent/self_improvement/insights")
        );
    }

    #[test]
    fn absolute_dirs_are_kept() {
        let ws = WorkspaceConfig {
            session_logs_dir: PathBuf::from("/var/log/sessions"),
            ..WorkspaceConfig::rooted_at("/srv/agent")
        };
        assert_eq!(ws.session_logs_dir(), PathBuf::from("/var/log/sessions"));
    }
}
