//! Tracing initialization and subscriber setup.

use super::file_writer::{prune_run_logs, FileWriter};
use crate::Config;
use chrono::Local;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Run log files kept in the log directory, including the new one.
const MAX_RUN_LOGS: usize = 10;

/// Directives appended to the level so dependency chatter stays out of the log.
const QUIET_DEPENDENCIES: &str = "serenity=warn,tungstenite=warn,h2=warn,hyper=warn,rustls=warn,reqwest=warn";

/// Installs the global subscriber writing to a new per-run log file.
///
/// The filter comes from `RUST_LOG` when set, otherwise from
/// `config.log_level`, otherwise `info`. Nothing is written to the terminal.
///
/// Returns the log file path, or `None` when the log directory cannot be
/// created or a subscriber is already installed; logging is optional.
pub fn init_tracing(config: &Config) -> Option<PathBuf> {
    let level = config.log_level.clone().unwrap_or_else(|| "info".to_string());

    let log_dir = crate::infrastructure::log_dir();
    if std::fs::create_dir_all(&log_dir).is_err() {
        return None;
    }
    // Make room for the file about to be created.
    let _ = prune_run_logs(&log_dir, MAX_RUN_LOGS - 1);

    let writer = Arc::new(FileWriter::for_run(&log_dir, Local::now()));
    let path = writer.path().to_path_buf();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{level},{QUIET_DEPENDENCIES}")));
    let layer = fmt::layer().with_writer(writer).with_ansi(false).with_target(true);

    tracing_subscriber::registry().with(filter).with(layer).try_init().ok()?;
    tracing::info!(log_file = %path.display(), version = env!("CARGO_PKG_VERSION"), "logging initialized");
    Some(path)
}
