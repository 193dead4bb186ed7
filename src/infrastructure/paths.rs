//! Platform directories and path expansion.
//!
//! Locations follow the platform conventions reported by `dirs`:
//!
//! | Purpose   | Linux default                            |
//! |-----------|------------------------------------------|
//! | data      | `~/.local/share/chatbridge`               |
//! | logs      | `~/.local/share/chatbridge/logs`          |
//! | downloads | `~/.local/share/chatbridge/downloads`     |
//! | previews  | `~/.local/share/chatbridge/previews`      |
//! | config    | `~/.config/chatbridge/config.toml`        |

use std::path::PathBuf;

const APP_DIR: &str = "chatbridge";

/// Root directory for everything the console writes.
///
/// Falls back to `./chatbridge` when the platform reports no data directory.
#[must_use]
pub fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

#[must_use]
pub fn log_dir() -> PathBuf {
    data_dir().join("logs")
}

#[must_use]
pub fn default_download_dir() -> PathBuf {
    data_dir().join("downloads")
}

/// Scratch directory for `/preview` downloads.
#[must_use]
pub fn preview_dir() -> PathBuf {
    data_dir().join("previews")
}

/// Default configuration file, if the platform has a config directory.
#[must_use]
pub fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
}

/// Expands a leading `~` to the home directory.
///
/// Paths without a leading `~`, and all paths when the home directory is
/// unknown, are returned unchanged.
///
/// # Examples
///
/// ```
/// use chatbridge::infrastructure::expand_tilde;
/// use std::path::PathBuf;
///
/// assert_eq!(expand_tilde("/absolute/path"), PathBuf::from("/absolute/path"));
/// if let Some(home) = dirs::home_dir() {
///     assert_eq!(expand_tilde("~/notes.md"), home.join("notes.md"));
/// }
/// ```
#[must_use]
pub fn expand_tilde(path: &str) -> PathBuf {
    let home = dirs::home_dir();
    match (path, home) {
        ("~", Some(home)) => home,
        (p, Some(home)) if p.starts_with("~/") => home.join(&p[2..]),
        (p, _) => PathBuf::from(p),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_tilde_leaves_other_paths_alone() {
        assert_eq!(expand_tilde("relative/file.txt"), PathBuf::from("relative/file.txt"));
        assert_eq!(expand_tilde("~user/file"), PathBuf::from("~user/file"));
    }

    #[test]
    fn test_expand_tilde_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~"), home);
            assert_eq!(expand_tilde("~/a/b"), home.join("a/b"));
        }
    }

    #[test]
    fn test_directories_share_the_data_root() {
        let root = data_dir();
        assert!(log_dir().starts_with(&root));
        assert!(preview_dir().starts_with(&root));
        assert_eq!(root.file_name().and_then(|n| n.to_str()), Some("chatbridge"));
    }
}
