use tg_domain::config::{Config, ConfigSeverity};

/// Human-readable validation report and whether the config is usable.
///
/// Warnings alone keep the config usable.
pub fn report(config: &Config, config_path: &str) -> (String, bool) {
    let issues = config.validate();
    if issues.is_empty() {
        return (format!("Config OK ({config_path})\n"), true);
    }

    let error_count = issues
        .iter()
        .filter(|e| e.severity == ConfigSeverity::Error)
        .count();
    let warning_count = issues.len() - error_count;

    let mut out = String::new();
    for issue in &issues {
        out.push_str(&format!("{issue}\n"));
    }
    out.push_str(&format!(
        "\n{error_count} error(s), {warning_count} warning(s) in {config_path}\n"
    ));
    (out, error_count == 0)
}

/// Print the validation report.  Returns false when errors were found.
pub fn validate(config: &Config, config_path: &str) -> bool {
    let (text, ok) = report(config, config_path);
    print!("{text}");
    ok
}

/// Dump the resolved config (with all defaults filled in) as TOML.
pub fn show(config: &Config) -> anyhow::Result<()> {
    let output = toml::to_string_pretty(config)
        .map_err(|e| anyhow::anyhow!("serializing config: {e}"))?;
    print!("{output}");
    Ok(())
}
