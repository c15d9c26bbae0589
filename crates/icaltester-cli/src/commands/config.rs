//! Configuration commands.

use std::io::Write;
use std::path::Path;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Dumps the effective configuration as TOML.
pub fn dump(out: &mut dyn Write, config: &ClientConfig, path: &Path) -> ClientResult<()> {
    let toml_str = toml::to_string_pretty(config)
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))?;
    writeln!(out, "# config.toml ({})", path.display())?;
    writeln!(out, "{}", toml_str)?;
    Ok(())
}

/// Validates the configuration.
pub fn validate(out: &mut dyn Write, config: &ClientConfig) -> ClientResult<()> {
    config.validate().map_err(ClientError::Config)?;
    writeln!(out, "Configuration is valid.")?;
    Ok(())
}

/// Shows the configuration and state file paths.
pub fn path(out: &mut dyn Write, config_path: &Path, config: &ClientConfig) -> ClientResult<()> {
    writeln!(out, "config: {}", config_path.display())?;
    writeln!(out, "state: {}", config.state_path(None).display())?;
    Ok(())
}
