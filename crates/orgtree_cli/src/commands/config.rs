use miette::{IntoDiagnostic, Result};
use orgtree_core::config::{self, OrgtreeConfig};
use owo_colors::OwoColorize;
use std::path::Path;

use crate::output::Output;

/// Show current configuration
pub async fn show(config: &OrgtreeConfig) -> Result<()> {
    let output = Output::new();

    output.section("Current Configuration");
    if config.service.internal_api_password.is_empty() {
        output.warning("No internal API password configured");
    }

    // Empty passwords are skipped when serializing
    let toml_str = toml::to_string_pretty(&redacted(config)).into_diagnostic()?;
    println!("{}", toml_str);

    Ok(())
}

/// Save current configuration to file
pub async fn save(config: &OrgtreeConfig, path: &Path) -> Result<()> {
    let output = Output::new();

    output.info(
        "💾",
        &format!("Saving configuration to: {}", path.display()),
    );

    config::save_config(config, path).await?;

    output.success("Configuration saved successfully!");
    eprintln!();
    eprintln!("To use this configuration, run:");
    eprintln!("  {} --config {}", "orgtree".bright_green(), path.display());

    Ok(())
}

fn redacted(config: &OrgtreeConfig) -> OrgtreeConfig {
    let mut shown = config.clone();
    shown.service.internal_api_password.clear();
    shown
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_password_is_not_shown() {
        let mut config = OrgtreeConfig::default();
        config.service.internal_api_password = "secret".to_string();

        let shown = toml::to_string_pretty(&redacted(&config)).unwrap();
        assert!(!shown.contains("secret"));
        assert_eq!(config.service.internal_api_password, "secret");
    }
}
