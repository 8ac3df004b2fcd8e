//! XDG base directories for berth's config file and agent records.

use crate::error::ProvisionError;
use std::path::PathBuf;

const APP_DIR: &str = "berth";

/// `$var` when set and non-empty, else `$HOME/<fallback>`
fn base_dir(var: &str, fallback: &[&str]) -> Result<PathBuf, ProvisionError> {
    if let Some(dir) = std::env::var_os(var).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var_os("HOME").filter(|v| !v.is_empty()).ok_or_else(|| {
        ProvisionError::ConfigError(format!("Cannot resolve {}: neither it nor HOME is set", var))
    })?;
    Ok(fallback.iter().fold(PathBuf::from(home), |path, part| path.join(part)))
}

pub fn config_home() -> Result<PathBuf, ProvisionError> {
    base_dir("XDG_CONFIG_HOME", &[".config"])
}

pub fn data_home() -> Result<PathBuf, ProvisionError> {
    base_dir("XDG_DATA_HOME", &[".local", "share"])
}

/// `$XDG_CONFIG_HOME/berth/config.toml`
pub fn global_config_file() -> Result<PathBuf, ProvisionError> {
    Ok(config_home()?.join(APP_DIR).join("config.toml"))
}

/// `$XDG_DATA_HOME/berth/agents/`; created by the repository on first save
pub fn agents_data_dir() -> Result<PathBuf, ProvisionError> {
    Ok(data_home()?.join(APP_DIR).join("agents"))
}
