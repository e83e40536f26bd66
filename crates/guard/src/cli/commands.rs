//! Handlers for the state-touching subcommands.  Each returns the JSON
//! document `main` prints on stdout.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use tg_domain::config::Config;
use tg_interlock::SwitchName;

use crate::gate::{self, Gate};
use crate::jobs::JobRunner;

use super::{ChangeArgs, Command, OnOff, SwitchCommand};

pub fn execute(config: &Config, command: Command, now: DateTime<Utc>) -> anyhow::Result<Value> {
    let value = match command {
        Command::Status => serde_json::to_value(Gate::open(config, now)?.status(now))?,
        Command::Check { tier, operation } => {
            let check = Gate::open(config, now)?.can_proceed(&tier, &operation, now);
            serde_json::to_value(check)?
        }
        Command::Remaining { tier, operation } => {
            let remaining = gate::open_quota(config, now)?.remaining_quota(&tier, &operation, now);
            json!({
                "tier": tier,
                "operation": operation,
                "remaining": remaining,
            })
        }
        Command::Record {
            tier,
            operation,
            change,
        } => {
            let change_id = change_id(&change);
            let record =
                gate::locked_record(config, &tier, &operation, &change.file, &change_id, now)?;
            serde_json::to_value(record)?
        }
        Command::Claim {
            tier,
            operation,
            change,
        } => {
            let change_id = change_id(&change);
            let outcome =
                gate::locked_claim(config, &tier, &operation, &change.file, &change_id, now)?;
            serde_json::to_value(outcome)?
        }
        Command::Pause { hours } => {
            let resume_at = gate::open_interlock(config, now)?.pause(hours, now)?;
            json!({ "paused": true, "resume_at": resume_at })
        }
        Command::Resume => {
            let mut registry = gate::open_interlock(config, now)?;
            let resumed = registry.resume_if_due(now)?;
            json!({
                "resumed": resumed,
                "system_enabled": registry.is_system_operational(),
            })
        }
        Command::EmergencyStop => {
            let mut registry = gate::open_interlock(config, now)?;
            registry.emergency_stop(now)?;
            json!({
                "emergency_stop": true,
                "system_enabled": registry.is_system_operational(),
            })
        }
        Command::Switch(SwitchCommand::List) => {
            serde_json::to_value(gate::open_interlock(config, now)?.switches())?
        }
        Command::Switch(SwitchCommand::Set { name, state }) => {
            let name: SwitchName = name.parse()?;
            let mut registry = gate::open_interlock(config, now)?;
            registry.set(name, state == OnOff::On)?;
            json!({
                "switch": name.as_str(),
                "enabled": registry.switch_enabled(name),
                "system_enabled": registry.is_system_operational(),
            })
        }
        Command::Job { job } => JobRunner::new(config).run(job.into(), now),
        Command::Config(_) | Command::Version => {
            anyhow::bail!("not a state command")
        }
    };
    Ok(value)
}

fn change_id(args: &ChangeArgs) -> String {
    args.change_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tg_domain::config::WorkspaceConfig;

    fn config(root: &std::path::Path) -> Config {
        Config {
            workspace: WorkspaceConfig::rooted_at(root),
            ..Config::default()
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 3, 9, 0, 0).unwrap()
    }

    #[test]
    fn fresh_workspace_denies_with_system_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let out = execute(
            &config(dir.path()),
            Command::Check {
                tier: "tier1".into(),
                operation: "append".into(),
            },
            now(),
        )
        .unwrap();
        assert_eq!(
            out,
            json!({ "allowed": false, "reason": "Self-improvement system is disabled" })
        );
    }

    #[test]
    fn unknown_switch_name_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = execute(
            &config(dir.path()),
            Command::Switch(SwitchCommand::Set {
                name: "WARP_DRIVE".into(),
                state: OnOff::On,
            }),
            now(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("WARP_DRIVE"));
    }

    #[test]
    fn record_generates_a_change_id() {
        let dir = tempfile::tempdir().unwrap();
        let out = execute(
            &config(dir.path()),
            Command::Record {
                tier: "tier1".into(),
                operation: "append".into(),
                change: ChangeArgs {
                    file: dir.path().join("MEMORY.md"),
                    change_id: None,
                },
            },
            now(),
        )
        .unwrap();
        let id = out["change_id"].as_str().unwrap();
        assert!(uuid::Uuid::parse_str(id).is_ok());
        assert_eq!(out["hash"], "file_not_found");
    }

    #[test]
    fn remaining_reports_only_set_caps() {
        let dir = tempfile::tempdir().unwrap();
        let out = execute(
            &config(dir.path()),
            Command::Remaining {
                tier: "tier3".into(),
                operation: "content".into(),
            },
            now(),
        )
        .unwrap();
        assert_eq!(out["remaining"], json!({ "weekly_remaining": 1 }));
    }
}
