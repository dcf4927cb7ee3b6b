// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Pupil Remote walkthrough.
//!
//! Simulates a successful calibration, waits for its notification, then
//! prints pupil data for one second and keeps draining events until three
//! seconds have passed.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::process;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use pupil_config::{
    apply_cli_overrides, apply_environment_overrides, load_config, validate_config, ConfigError,
    PupilConfig,
};
use pupil_observability::{debug_flags_help, parse_debug_flags, LoggingOptions};
use pupil_remote::{
    retry_with_backoff, Callback, Communicator, CommunicatorConfig, ReconnectionStrategy,
};
use serde_json::json;
use tracing::{info, warn};

const CAL_SUCCESSFUL: &str = "notify.calibration.successful";
const CAL_STOPPED: &str = "notify.calibration.stopped";
const SUBSCRIBE_FOR: Duration = Duration::from_secs(1);
const RUN_FOR: Duration = Duration::from_secs(3);
const DRAIN_INTERVAL: Duration = Duration::from_millis(50);
const CALIBRATION_TIMEOUT: Duration = Duration::from_secs(10);

struct Args {
    config_path: Option<PathBuf>,
    log_dir: Option<PathBuf>,
    overrides: HashMap<String, String>,
}

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: pupil_remote_demo [--config <path>] [--address <addr>] [--request-port <port>]\n\
         \x20                        [--connect-timeout-ms <ms>] [--log-level <level>] [--log-dir <path>]\n\n{}",
        debug_flags_help()
    );
    process::exit(2);
}

fn parse_args() -> Args {
    let mut parsed = Args {
        config_path: None,
        log_dir: None,
        overrides: HashMap::new(),
    };

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        let key = match arg.as_str() {
            "--config" => {
                let v = args.next().unwrap_or_else(|| usage_and_exit());
                parsed.config_path = Some(PathBuf::from(v));
                continue;
            }
            "--log-dir" => {
                let v = args.next().unwrap_or_else(|| usage_and_exit());
                parsed.log_dir = Some(PathBuf::from(v));
                continue;
            }
            "--address" => "address",
            "--request-port" => "request_port",
            "--connect-timeout-ms" => "connect_timeout_ms",
            "--log-level" => "log_level",
            "-h" | "--help" => usage_and_exit(),
            // Picked up by parse_debug_flags
            other if other.starts_with("--debug-") => continue,
            other => {
                eprintln!("Unknown argument: {other}");
                usage_and_exit();
            }
        };
        let v = args.next().unwrap_or_else(|| usage_and_exit());
        parsed.overrides.insert(key.to_string(), v);
    }

    parsed
}

fn load(args: &Args) -> Result<PupilConfig> {
    let config = match load_config(args.config_path.as_deref(), Some(&args.overrides)) {
        Ok(config) => config,
        Err(ConfigError::FileNotFound(_)) if args.config_path.is_none() => {
            let mut config = PupilConfig::default();
            apply_environment_overrides(&mut config);
            apply_cli_overrides(&mut config, &args.overrides);
            config
        }
        Err(e) => return Err(e).context("Failed to load configuration"),
    };
    validate_config(&config)?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = parse_args();
    let config = load(&args)?;

    let mut options = LoggingOptions::default().with_level(config.logging.level.clone());
    if let Some(log_dir) = &args.log_dir {
        options = options.with_log_dir(log_dir);
    }
    let _logging = pupil_observability::init_logging(&parse_debug_flags(), &options)?;

    let remote_config = CommunicatorConfig::from_config(&config);
    let mut strategy = ReconnectionStrategy::new(1000, 3);
    let mut remote = retry_with_backoff(
        || Communicator::connect(&remote_config),
        &mut strategy,
        "Pupil Remote connection",
    )
    .with_context(|| {
        format!(
            "{} unreachable, the remote host might be unavailable",
            remote_config.request_endpoint()
        )
    })?;

    info!("Simulating calibration...");
    let notification = json!({ "subject": "calibration.successful" });
    if let Some(notification) = notification.as_object() {
        remote.notify(notification)?;
    }

    let encountered = remote.wait_any(&[CAL_SUCCESSFUL, CAL_STOPPED], Some(CALIBRATION_TIMEOUT))?;
    if !encountered.contains(CAL_SUCCESSFUL) {
        warn!("Calibration did not succeed: {:?}", encountered.names().collect::<Vec<_>>());
        remote.close();
        return Ok(());
    }

    info!("Calibration successful. Subscribing to pupil data...");
    let handle_pupil = Callback::new(|event, payload| {
        println!("{} {:?}", event, payload);
        Ok(())
    });
    remote.add_callback(&handle_pupil, &["pupil"])?;

    let start = Instant::now();
    let mut subscribed = true;
    while start.elapsed() <= RUN_FOR {
        remote.check_all_available()?;
        std::thread::sleep(DRAIN_INTERVAL);

        if subscribed && start.elapsed() > SUBSCRIBE_FOR {
            remote.remove_callback(&handle_pupil, &["pupil"])?;
            subscribed = false;
            info!("Unsubscribed from pupil data");
        }
    }

    info!("exit...");
    remote.close();
    Ok(())
}
