//! Infrastructure layer for filesystem and environment interactions.

pub mod paths;

pub use paths::{data_dir, default_config_file, default_download_dir, expand_tilde, log_dir, preview_dir};
