//! Configuration file loading for the CLI
//!
//! This module finds and loads the TOML configuration (explicit path, local
//! directory, system directory) and applies the per-run overrides given on
//! the command line.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use directories::ProjectDirs;
use log::{debug, info};
use thiserror::Error;

use trellis::{
    TrellisError,
    config::{AppConfig, EngineBackend, SimplifyConfig},
};

use crate::Args;

/// Configuration-related errors for CLI
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse TOML configuration: {0}")]
    Parse(String),

    #[error("Missing configuration file: {0}")]
    MissingFile(PathBuf),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<ConfigError> for TrellisError {
    fn from(err: ConfigError) -> Self {
        TrellisError::Config(err.to_string())
    }
}

/// Find and load configuration from various locations
///
/// Search order:
/// 1. Explicit path if provided
/// 2. Local project directory (trellis/config.toml)
/// 3. Platform-specific config directory
/// 4. Default config if none found
///
/// # Errors
///
/// Returns error if:
/// - Explicit path is provided but file doesn't exist
/// - Config file exists but cannot be parsed or validated
pub fn load_config(explicit_path: Option<impl AsRef<Path>>) -> Result<AppConfig, TrellisError> {
    if let Some(path) = explicit_path {
        let path = path.as_ref();
        info!(path = path.display().to_string(); "Loading configuration from explicit path");
        return load_config_file(path);
    }

    let local_config = Path::new("trellis/config.toml");
    if local_config.exists() {
        info!(path = local_config.display().to_string(); "Loading configuration from local path");
        return load_config_file(local_config);
    }

    if let Some(proj_dirs) = ProjectDirs::from("com", "trellis", "trellis") {
        let system_config = proj_dirs.config_dir().join("config.toml");

        if system_config.exists() {
            info!(path = system_config.display().to_string(); "Loading configuration from system path");
            return load_config_file(system_config);
        }

        debug!(path = system_config.display().to_string(); "System configuration file not found");
    } else {
        debug!("Could not determine platform-specific config directory");
    }

    debug!("No configuration file found, using default configuration");
    Ok(AppConfig::default())
}

/// Apply the command-line overrides in `args` on top of `config`.
pub fn apply_overrides(config: AppConfig, args: &Args) -> AppConfig {
    let mut config = config;

    if args.no_simplify {
        let ladder_metric = config.simplify().ladder_metric();
        config = config.with_simplify(SimplifyConfig::new(false, ladder_metric));
        debug!("Route simplification disabled from the command line");
    }

    if let Some(timeout_ms) = args.timeout_ms {
        let engine = config
            .engine()
            .clone()
            .with_timeout(Some(Duration::from_millis(timeout_ms)));
        config = config.with_engine(engine);
        debug!(timeout_ms; "Layout timeout set from the command line");
    }

    config
}

fn load_config_file(path: impl AsRef<Path>) -> Result<AppConfig, TrellisError> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ConfigError::MissingFile(path.to_path_buf()).into());
    }

    let content = fs::read_to_string(path)?;

    let config: AppConfig =
        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
    validate(&config)?;

    Ok(config)
}

fn validate(config: &AppConfig) -> Result<(), ConfigError> {
    let engine = config.engine();
    match (engine.backend(), engine.command()) {
        (EngineBackend::Command, None) => Err(ConfigError::Validation(
            "engine backend `command` requires an [engine.command] table".to_owned(),
        )),
        (_, Some(command)) if command.program().trim().is_empty() => Err(
            ConfigError::Validation("engine.command.program must not be empty".to_owned()),
        ),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use tempfile::tempdir;

    use trellis::config::LadderMetric;

    use super::*;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempdir().expect("Failed to create temp directory");
        let path = dir.path().join("config.toml");
        fs::write(&path, content).expect("Failed to write config");
        (dir, path)
    }

    #[test]
    fn test_explicit_file_is_loaded() {
        let (_dir, path) = write_config(
            r#"
            [layout]
            node_spacing = 90

            [engine]
            timeout_ms = 1500

            [simplify]
            ladder_metric = "first_segment_twice"
            "#,
        );

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.layout().node_spacing(), 90);
        assert_eq!(config.engine().timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(
            config.simplify().ladder_metric(),
            LadderMetric::FirstSegmentTwice
        );
    }

    #[test]
    fn test_command_engine_table() {
        let (_dir, path) = write_config(
            r#"
            [engine]
            backend = "command"

            [engine.command]
            program = "elk-worker"
            args = ["--stdio"]
            "#,
        );

        let config = load_config(Some(&path)).unwrap();
        let command = config.engine().command().unwrap();
        assert_eq!(command.program(), "elk-worker");
        assert_eq!(command.args(), ["--stdio".to_owned()]);
    }

    #[test]
    fn test_missing_explicit_file() {
        let dir = tempdir().unwrap();
        let err = load_config(Some(dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, TrellisError::Config(message) if message.contains("Missing")));
    }

    #[test]
    fn test_malformed_toml() {
        let (_dir, path) = write_config("[layout\nnode_spacing = ");
        let err = load_config(Some(&path)).unwrap_err();
        assert!(matches!(err, TrellisError::Config(message) if message.contains("parse")));
    }

    #[test]
    fn test_command_backend_without_command_is_rejected() {
        let (_dir, path) = write_config("[engine]\nbackend = \"command\"\n");
        let err = load_config(Some(&path)).unwrap_err();
        assert!(matches!(err, TrellisError::Config(message) if message.contains("[engine.command]")));
    }

    #[test]
    fn test_overrides() {
        let args = Args::parse_from(["trellis", "in.json", "--no-simplify", "--timeout-ms", "40"]);
        let config = apply_overrides(AppConfig::default(), &args);
        assert!(!config.simplify().enabled());
        assert_eq!(config.engine().timeout(), Some(Duration::from_millis(40)));

        let args = Args::parse_from(["trellis", "in.json"]);
        let config = apply_overrides(AppConfig::default(), &args);
        assert!(config.simplify().enabled());
        assert_eq!(config.engine().timeout(), None);
    }
}
