//! # Run Logging
//!
//! One process-wide `tracing` subscriber: a colorized console layer plus an
//! optional append-only file layer. The file gets one sortable
//! timestamp-suffixed name per run and never rotates; its lines carry no
//! ANSI escapes. The subscriber is installed once; repeated `init` calls
//! are no-ops.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::Config;
use crate::error::{Error, Result};

/// Logging knobs read from the `logging.*` configuration keys.
#[derive(Debug, Clone, PartialEq)]
pub struct LogSettings {
    pub level: LevelFilter,
    pub console: bool,
    pub file: bool,
    pub file_path: String,
}

impl LogSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            level: parse_level(&config.get_str("logging.level", "INFO")),
            console: config.get_bool("logging.console", true),
            file: config.get_bool("logging.file", false),
            file_path: config.get_str("logging.file_path", "logs"),
        }
    }
}

/// Map the configured level name onto a tracing filter. `WARNING` and
/// `CRITICAL` are accepted alongside the native tracing names.
fn parse_level(name: &str) -> LevelFilter {
    match name.to_ascii_uppercase().as_str() {
        "DEBUG" => LevelFilter::DEBUG,
        "WARNING" | "WARN" => LevelFilter::WARN,
        "ERROR" | "CRITICAL" => LevelFilter::ERROR,
        _ => LevelFilter::INFO,
    }
}

/// Install the global subscriber from configuration. Returns `Ok(true)` when
/// this call installed it and `Ok(false)` when a subscriber was already in
/// place (deterministic no-op; handlers are never duplicated).
pub fn init(config: &Config) -> Result<bool> {
    let settings = LogSettings::from_config(config);
    init_with(&settings)
}

pub fn init_with(settings: &LogSettings) -> Result<bool> {
    let console_layer = settings
        .console
        .then(|| fmt::layer().with_ansi(true).with_target(false));

    let file_layer = if settings.file {
        let file = open_run_file(&settings.file_path)?;
        Some(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file)),
        )
    } else {
        None
    };

    let installed = tracing_subscriber::registry()
        .with(settings.level)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .is_ok();
    Ok(installed)
}

/// Open `<dir>/run-<timestamp>.log` in append mode, creating the directory
/// on first use.
fn open_run_file(dir: &str) -> Result<std::fs::File> {
    let dir = PathBuf::from(dir);
    fs::create_dir_all(&dir).map_err(|err| Error::ConfigInvalid {
        context: format!("logging.file_path `{}`", dir.display()),
        reason: err.to_string(),
    })?;
    let name = format!("run-{}.log", chrono::Local::now().format("%Y%m%d-%H%M%S"));
    let path = dir.join(name);
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|err| Error::ConfigInvalid {
            context: format!("logging.file_path `{}`", path.display()),
            reason: err.to_string(),
        })
}
