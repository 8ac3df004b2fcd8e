//! Logging
//!
//! `tracing` subscriber setup for the library and the `berth` binary. Settings
//! come from [`LoggingConfig`] with `BERTH_LOG*` environment overrides on top.

use crate::error::ProvisionError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::{fmt as layer_fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

const ENV_FILTER: &str = "BERTH_LOG";
const ENV_FORMAT: &str = "BERTH_LOG_FORMAT";
const ENV_OUTPUT: &str = "BERTH_LOG_OUTPUT";
const ENV_FILE: &str = "BERTH_LOG_FILE";
const ENV_MODULES: &str = "BERTH_LOG_MODULES";

/// Event encoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("invalid log format '{}' (expected text or json)", other)),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogFormat::Text => "text",
            LogFormat::Json => "json",
        })
    }
}

/// Where events are written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogOutput {
    #[serde(rename = "stdout")]
    Stdout,
    #[default]
    #[serde(rename = "stderr")]
    Stderr,
    #[serde(rename = "file")]
    File,
    #[serde(rename = "file+stderr")]
    FileAndStderr,
    /// stdout and stderr
    #[serde(rename = "both")]
    Both,
}

impl LogOutput {
    pub fn writes_file(self) -> bool {
        matches!(self, LogOutput::File | LogOutput::FileAndStderr)
    }

    pub fn writes_stderr(self) -> bool {
        matches!(self, LogOutput::Stderr | LogOutput::FileAndStderr | LogOutput::Both)
    }

    pub fn writes_stdout(self) -> bool {
        matches!(self, LogOutput::Stdout | LogOutput::Both)
    }
}

impl FromStr for LogOutput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdout" => Ok(LogOutput::Stdout),
            "stderr" => Ok(LogOutput::Stderr),
            "file" => Ok(LogOutput::File),
            "file+stderr" => Ok(LogOutput::FileAndStderr),
            "both" => Ok(LogOutput::Both),
            other => Err(format!(
                "invalid log output '{}' (expected stdout, stderr, file, file+stderr or both)",
                other
            )),
        }
    }
}

impl fmt::Display for LogOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogOutput::Stdout => "stdout",
            LogOutput::Stderr => "stderr",
            LogOutput::File => "file",
            LogOutput::FileAndStderr => "file+stderr",
            LogOutput::Both => "both",
        })
    }
}

/// `[logging]` section of the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// trace, debug, info, warn, error or off
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    /// Log file when `output` includes a file; defaults to the platform state dir
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,

    /// ANSI colors for text output to a terminal stream
    #[serde(default = "default_enabled")]
    pub color: bool,

    /// Per-target levels, e.g. `"berth::enrichment" = "debug"`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub modules: BTreeMap<String, String>,
}

fn default_enabled() -> bool {
    true
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_level(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            file: None,
            color: true,
            modules: BTreeMap::new(),
        }
    }
}

/// Settings after environment overrides are applied
#[derive(Debug, Clone, PartialEq)]
struct Resolved {
    filter: String,
    format: LogFormat,
    output: LogOutput,
    file: Option<PathBuf>,
    color: bool,
}

fn resolve(
    config: &LoggingConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Resolved, ProvisionError> {
    let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());
    let invalid = |key: &str, e: String| ProvisionError::ConfigError(format!("{}: {}", key, e));

    let format = match env(ENV_FORMAT) {
        Some(v) => v.parse().map_err(|e| invalid(ENV_FORMAT, e))?,
        None => config.format,
    };
    let output = match env(ENV_OUTPUT) {
        Some(v) => v.parse().map_err(|e| invalid(ENV_OUTPUT, e))?,
        None => config.output,
    };

    // A full BERTH_LOG filter replaces level and module directives
    let filter = match env(ENV_FILTER) {
        Some(filter) => filter,
        None => {
            let mut directives = vec![config.level.trim().to_string()];
            directives.extend(
                config
                    .modules
                    .iter()
                    .map(|(target, level)| format!("{}={}", target, level)),
            );
            if let Some(modules) = env(ENV_MODULES) {
                directives.extend(
                    modules
                        .split(',')
                        .filter_map(|m| m.split_once('='))
                        .map(|(target, level)| format!("{}={}", target.trim(), level.trim())),
                );
            }
            directives.join(",")
        }
    };

    Ok(Resolved {
        filter,
        format,
        output,
        file: env(ENV_FILE).map(PathBuf::from).or_else(|| config.file.clone()),
        color: config.color && !output.writes_file(),
    })
}

/// Default log file: `<state dir>/berth.log`
pub fn default_log_file() -> Result<PathBuf, ProvisionError> {
    let dirs = directories::ProjectDirs::from("", "berth", "berth").ok_or_else(|| {
        ProvisionError::ConfigError("Could not determine platform state directory".to_string())
    })?;
    let state_dir = dirs.state_dir().unwrap_or_else(|| dirs.data_local_dir());
    Ok(state_dir.join("berth.log"))
}

fn open_log_file(path: &Path) -> Result<std::fs::File, ProvisionError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ProvisionError::ConfigError(format!(
                "Failed to create log directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| {
            ProvisionError::ConfigError(format!("Failed to open log file {}: {}", path.display(), e))
        })
}

fn make_writer(resolved: &Resolved) -> Result<BoxMakeWriter, ProvisionError> {
    let output = resolved.output;
    if output.writes_file() {
        let path = match &resolved.file {
            Some(path) => path.clone(),
            None => default_log_file()?,
        };
        let file = Arc::new(open_log_file(&path)?);
        return Ok(if output.writes_stderr() {
            BoxMakeWriter::new(file.and(std::io::stderr))
        } else {
            BoxMakeWriter::new(file)
        });
    }
    Ok(match (output.writes_stdout(), output.writes_stderr()) {
        (true, true) => BoxMakeWriter::new(std::io::stdout.and(std::io::stderr)),
        (true, false) => BoxMakeWriter::new(std::io::stdout),
        _ => BoxMakeWriter::new(std::io::stderr),
    })
}

/// Install the global subscriber. `None` uses defaults plus environment.
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<(), ProvisionError> {
    let defaults = LoggingConfig::default();
    let config = config.unwrap_or(&defaults);
    let install_err =
        |e: tracing_subscriber::util::TryInitError| ProvisionError::ConfigError(format!("Failed to install logger: {}", e));

    if !config.enabled {
        return Registry::default()
            .with(EnvFilter::new("off"))
            .try_init()
            .map_err(install_err);
    }

    let resolved = resolve(config, |key| std::env::var(key).ok())?;
    let filter = EnvFilter::try_new(&resolved.filter).map_err(|e| {
        ProvisionError::ConfigError(format!("Invalid log filter '{}': {}", resolved.filter, e))
    })?;
    let writer = make_writer(&resolved)?;

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match resolved.format {
        LogFormat::Json => layer_fmt::layer()
            .json()
            .with_timer(ChronoUtc::rfc_3339())
            .with_writer(writer)
            .boxed(),
        LogFormat::Text => layer_fmt::layer()
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(resolved.color)
            .with_writer(writer)
            .boxed(),
    };

    Registry::default()
        .with(layer)
        .with(filter)
        .try_init()
        .map_err(install_err)
}
