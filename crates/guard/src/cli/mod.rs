pub mod commands;
pub mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::jobs::Job;

/// tierguard: tiered change quotas and safety interlocks for a
/// self-modifying agent workspace.
#[derive(Debug, Parser)]
#[command(name = "tierguard", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Interlock switches plus quota counters, remaining headroom and resets.
    Status,
    /// Ask whether one more change of this tier/operation may proceed.
    Check { tier: String, operation: String },
    /// Remaining daily/weekly quota for a tier/operation.
    Remaining { tier: String, operation: String },
    /// Record an applied change without checking limits.
    Record {
        tier: String,
        operation: String,
        #[command(flatten)]
        change: ChangeArgs,
    },
    /// Check and record under the state lock.  Nothing is recorded on denial.
    Claim {
        tier: String,
        operation: String,
        #[command(flatten)]
        change: ChangeArgs,
    },
    /// Disable the system for a number of hours.
    Pause {
        #[arg(long, default_value_t = 24)]
        hours: u32,
    },
    /// Re-enable a paused system whose pause has expired.
    Resume,
    /// Trip the emergency stop.  Only `switch set` undoes it.
    EmergencyStop,
    /// Inspect or flip individual safety switches.
    #[command(subcommand)]
    Switch(SwitchCommand),
    /// Run a maintenance job now.
    Job {
        #[arg(value_enum)]
        job: JobArg,
    },
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, clap::Args)]
pub struct ChangeArgs {
    /// The file the change was applied to.
    #[arg(long)]
    pub file: PathBuf,
    /// Change identifier (a random UUID when omitted).
    #[arg(long)]
    pub change_id: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum SwitchCommand {
    /// List every switch with its state.
    List,
    /// Turn a switch on or off.
    Set { name: String, state: OnOff },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OnOff {
    On,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum JobArg {
    Daily,
    Weekly,
    Monthly,
    Analyze,
}

impl From<JobArg> for Job {
    fn from(arg: JobArg) -> Self {
        match arg {
            JobArg::Daily => Job::Daily,
            JobArg::Weekly => Job::Weekly,
            JobArg::Monthly => Job::Monthly,
            JobArg::Analyze => Job::Analyze,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path in `TG_CONFIG` (or
/// `tierguard.toml` by default).  A missing file means all defaults.
pub fn load_config() -> anyhow::Result<(tg_domain::config::Config, String)> {
    let config_path = std::env::var("TG_CONFIG").unwrap_or_else(|_| "tierguard.toml".into());
    let config = load_config_from(&config_path)?;
    Ok((config, config_path))
}

pub fn load_config_from(config_path: &str) -> anyhow::Result<tg_domain::config::Config> {
    if !std::path::Path::new(config_path).exists() {
        return Ok(tg_domain::config::Config::default());
    }
    let raw = std::fs::read_to_string(config_path)
        .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
    toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))
}
