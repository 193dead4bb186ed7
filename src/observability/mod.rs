//! File-based structured logging.
//!
//! `tracing` events are formatted by a `tracing-subscriber` fmt layer and
//! written to a per-run file, never to the terminal the TUI owns:
//!
//! ```text
//! tracing macros → EnvFilter → fmt layer (no ANSI) → FileWriter → <data_dir>/logs/chatbridge_<start>.log
//! ```
//!
//! # Features
//!
//! - **One file per run**: `chatbridge_YYYY-MM-DD_HH-MM-SS.log`
//! - **Automatic rotation**: a run's file rotates at 10 MB, 3 backups kept
//! - **Retention**: at most 10 run files survive startup pruning
//!
//! # Configuration
//!
//! Log level is controlled via:
//! 1. `RUST_LOG` environment variable (highest priority)
//! 2. `log_level` config option (`LOG_LEVEL` env or config file)
//! 3. Default: `"info"`
//!
//! # Modules
//!
//! - [`init`]: Subscriber setup
//! - [`file_writer`]: Rotating file writer and run retention

mod file_writer;
mod init;

pub use file_writer::{prune_run_logs, FileWriter};
pub use init::init_tracing;
