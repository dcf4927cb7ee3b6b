// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! Values are applied in three tiers, later tiers winning:
//! 1. TOML file (base values)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{ConfigError, ConfigResult, PupilConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// File name searched for when no path is given
pub const CONFIG_FILE_NAME: &str = "pupil_remote.toml";

/// Find the configuration file
///
/// Search order:
/// 1. `PUPIL_CONFIG_PATH` environment variable
/// 2. Current working directory
/// 3. Up to five parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("PUPIL_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by PUPIL_CONFIG_PATH not found: {}",
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));

        let mut current = cwd.as_path();
        for _ in 0..5 {
            match current.parent() {
                Some(parent) => {
                    search_paths.push(parent.join(CONFIG_FILE_NAME));
                    current = parent;
                }
                None => break,
            }
        }
    }

    if let Some(path) = search_paths.iter().find(|p| p.exists()) {
        return Ok(path.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "'{}' not found in any of these locations:\n{}\n\nSet PUPIL_CONFIG_PATH to specify a custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration from TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if config file is not found or contains invalid TOML
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<PupilConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: PupilConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    Ok(config)
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `PUPIL_REMOTE_ADDRESS` -> `remote.address`
/// - `PUPIL_REMOTE_REQUEST_PORT` -> `remote.request_port`
/// - `PUPIL_REMOTE_CONNECT_TIMEOUT_MS` -> `remote.connect_timeout_ms`
/// - `PUPIL_REMOTE_BLOCK_UNTIL_CONNECTED` -> `remote.block_until_connected`
/// - `PUPIL_LOG_LEVEL` -> `logging.level`
pub fn apply_environment_overrides(config: &mut PupilConfig) {
    if let Ok(value) = env::var("PUPIL_REMOTE_ADDRESS") {
        config.remote.address = value;
    }
    if let Ok(value) = env::var("PUPIL_REMOTE_REQUEST_PORT") {
        if let Ok(port) = value.parse::<u16>() {
            config.remote.request_port = port;
        }
    }
    if let Ok(value) = env::var("PUPIL_REMOTE_CONNECT_TIMEOUT_MS") {
        if let Ok(timeout) = value.parse::<u64>() {
            config.remote.connect_timeout_ms = timeout;
        }
    }
    if let Ok(value) = env::var("PUPIL_REMOTE_BLOCK_UNTIL_CONNECTED") {
        config.remote.block_until_connected = parse_flag(&value);
    }
    if let Ok(value) = env::var("PUPIL_LOG_LEVEL") {
        config.logging.level = value;
    }
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - HashMap of CLI arguments (e.g., `{"address": "tcp://10.0.0.2", "request_port": "50020"}`)
pub fn apply_cli_overrides(config: &mut PupilConfig, cli_args: &HashMap<String, String>) {
    if let Some(value) = cli_args.get("address") {
        config.remote.address = value.clone();
    }
    if let Some(value) = cli_args.get("request_port") {
        if let Ok(port) = value.parse::<u16>() {
            config.remote.request_port = port;
        }
    }
    if let Some(value) = cli_args.get("connect_timeout_ms") {
        if let Ok(timeout) = value.parse::<u64>() {
            config.remote.connect_timeout_ms = timeout;
        }
    }
    if let Some(value) = cli_args.get("block_until_connected") {
        config.remote.block_until_connected = parse_flag(value);
    }
    if let Some(value) = cli_args.get("log_level") {
        config.logging.level = value.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const OVERRIDE_VARS: [&str; 5] = [
        "PUPIL_REMOTE_ADDRESS",
        "PUPIL_REMOTE_REQUEST_PORT",
        "PUPIL_REMOTE_CONNECT_TIMEOUT_MS",
        "PUPIL_REMOTE_BLOCK_UNTIL_CONNECTED",
        "PUPIL_LOG_LEVEL",
    ];

    fn clear_override_vars() {
        for var in OVERRIDE_VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_find_config_file_env_var() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("custom_config.toml");
        File::create(&config_path).unwrap();

        env::set_var("PUPIL_CONFIG_PATH", config_path.to_str().unwrap());
        let result = find_config_file();
        env::remove_var("PUPIL_CONFIG_PATH");

        assert_eq!(result.unwrap(), config_path);
    }

    #[test]
    fn test_missing_env_path_is_reported() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        env::set_var("PUPIL_CONFIG_PATH", "/nonexistent/pupil_remote.toml");
        let result = find_config_file();
        env::remove_var("PUPIL_CONFIG_PATH");

        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_minimal_config() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        clear_override_vars();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[remote]").unwrap();
        writeln!(file, "request_port = 50030").unwrap();
        writeln!(file, "connect_timeout_ms = 2000").unwrap();

        let config = load_config(Some(&config_path), None).unwrap();

        assert_eq!(config.remote.request_port, 50030);
        assert_eq!(config.remote.connect_timeout_ms, 2000);
        assert_eq!(config.remote.address, "tcp://127.0.0.1");
        assert!(config.remote.block_until_connected);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_invalid_toml() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&config_path, "[remote\nrequest_port = ").unwrap();

        assert!(matches!(
            load_config(Some(&config_path), None),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_environment_overrides() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let mut config = PupilConfig::default();

        env::set_var("PUPIL_REMOTE_ADDRESS", "tcp://192.168.1.100");
        env::set_var("PUPIL_REMOTE_REQUEST_PORT", "50100");
        env::set_var("PUPIL_REMOTE_BLOCK_UNTIL_CONNECTED", "no");

        apply_environment_overrides(&mut config);
        clear_override_vars();

        assert_eq!(config.remote.address, "tcp://192.168.1.100");
        assert_eq!(config.remote.request_port, 50100);
        assert!(!config.remote.block_until_connected);
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = PupilConfig::default();
        let mut cli_args = HashMap::new();
        cli_args.insert("address".to_string(), "tcp://10.0.0.1".to_string());
        cli_args.insert("request_port".to_string(), "not-a-port".to_string());
        cli_args.insert("log_level".to_string(), "debug".to_string());

        apply_cli_overrides(&mut config, &cli_args);

        assert_eq!(config.remote.address, "tcp://10.0.0.1");
        assert_eq!(config.remote.request_port, 50020);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_override_precedence() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[remote]").unwrap();
        writeln!(file, "address = \"tcp://file-host\"").unwrap();
        writeln!(file, "request_port = 50020").unwrap();

        env::set_var("PUPIL_REMOTE_ADDRESS", "tcp://env-host");
        env::set_var("PUPIL_REMOTE_REQUEST_PORT", "50040");

        let mut cli_args = HashMap::new();
        cli_args.insert("address".to_string(), "tcp://cli-host".to_string());

        let config = load_config(Some(&config_path), Some(&cli_args)).unwrap();
        clear_override_vars();

        // CLI wins for address, env wins for port (no CLI override)
        assert_eq!(config.remote.address, "tcp://cli-host");
        assert_eq!(config.remote.request_port, 50040);
    }
}
