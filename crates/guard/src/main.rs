use clap::Parser;
use tracing_subscriber::EnvFilter;

use tg_domain::config::LoggingConfig;
use tg_guard::cli::{self, Cli, Command, ConfigCommand};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Version => {
            println!("tierguard {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Command::Config(ConfigCommand::Validate) => {
            let (config, config_path) = cli::load_config()?;
            if !cli::config::validate(&config, &config_path) {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Config(ConfigCommand::Show) => {
            let (config, _config_path) = cli::load_config()?;
            cli::config::show(&config)
        }
        command => {
            let (config, config_path) = cli::load_config()?;
            init_cli_tracing(&config.logging);
            tracing::debug!(config = %config_path, "configuration loaded");

            let out = cli::commands::execute(&config, command, chrono::Utc::now())?;
            println!("{}", serde_json::to_string_pretty(&out)?);
            Ok(())
        }
    }
}

/// Tracing for CLI commands: stderr only, so stdout stays machine-readable.
/// `RUST_LOG` takes precedence over `[logging] filter`.
fn init_cli_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if logging.json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}
