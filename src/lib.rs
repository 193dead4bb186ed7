//! Chatbridge: a terminal console for operating a Discord bot.
//!
//! Chatbridge lets an operator drive a bot account from the terminal:
//! - Browse guilds and channels by index, id or name (with fuzzy suggestions)
//! - Read history, send plain and multi-line messages
//! - List, edit and delete the bot's own messages
//! - Attach local files, list recent attachments, download or preview them
//! - See messages arriving in other channels as one-line notices
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │  Binary (main.rs)                                   │  ← Config, bootstrap, exit codes
//! └─────────────────────────────────────────────────────┘
//!                        │
//! ┌─────────────────────────────────────────────────────┐
//! │  Application Layer (app/)                           │  ← Runtime loop
//! │  - Command table and controller                     │  ← Command dispatch
//! │  - Session state                                    │
//! └─────────────────────────────────────────────────────┘
//!         │                    │                    │
//! ┌───────────────┐   ┌───────────────┐   ┌───────────────┐
//! │ UI Layer      │   │ Event Bus     │   │ Service Layer │
//! │ (ui/)         │   │ (events/)     │   │ (service/)    │
//! │ - Input modes │   │ - Taxonomy    │   │ - State owner │
//! │ - Rendering   │   │ - Fan-out     │   │ - Resolution  │
//! │ - Theming     │   │               │   │ - Backends    │
//! └───────────────┘   └───────────────┘   └───────────────┘
//!                                                   │
//! ┌─────────────────────────────────────────────────────┐
//! │  Platform, Domain & Infrastructure                  │
//! │  - Discord adapter over serenity (discord/)         │
//! │  - Models and error types (domain/)                 │
//! │  - Platform paths (infrastructure/)                 │
//! │  - File logging (observability/)                    │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Configuration
//!
//! See [`Config`]. Values come from the environment first, then from a TOML
//! file, then from defaults:
//!
//! ```toml
//! log_level = "debug"
//! theme = "catppuccin-latte"
//! download_dir = "~/Downloads/discord"
//! default_guild = "Lab"
//! default_channel = "general"
//! utc_offset_hours = 2
//! ```

#![allow(clippy::multiple_crate_versions)]

pub mod app;
pub mod discord;
pub mod domain;
pub mod events;
pub mod infrastructure;
pub mod observability;
pub mod service;
pub mod ui;

pub use app::{App, AppState};
pub use domain::{BridgeError, Result};
pub use ui::Theme;

use domain::BridgeError as Error;
use infrastructure::expand_tilde;
use service::{ChatService, ServiceLayer};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use ui::format::Clock;
use ui::View;

/// Keys understood in the configuration file and as `CHATBRIDGE_<KEY>`
/// environment variables.
pub const CONFIG_KEYS: [&str; 11] = [
    "token",
    "log_level",
    "theme",
    "theme_file",
    "download_dir",
    "default_guild",
    "default_channel",
    "backend",
    "fixture",
    "ready_timeout_secs",
    "utc_offset_hours",
];

const DEFAULT_READY_TIMEOUT_SECS: u64 = 30;

/// Which chat backend to run against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Backend {
    /// A live bot session through serenity.
    #[default]
    Discord,
    /// The in-process backend seeded from a JSON fixture.
    Memory,
}

/// Console configuration.
#[derive(Clone)]
pub struct Config {
    /// Bot token. Required for [`Backend::Discord`].
    pub token: Option<String>,

    /// Log filter such as `debug` or `chatbridge=trace`. `RUST_LOG` wins.
    pub log_level: Option<String>,

    /// Built-in theme name. Ignored if `theme_file` is set.
    ///
    /// Options: `catppuccin-mocha`, `catppuccin-latte`.
    pub theme_name: Option<String>,

    /// Path to a custom TOML theme file. See [`ui::theme`] for the format.
    pub theme_file: Option<String>,

    /// Destination for `/download`. Default: `<data_dir>/downloads`.
    pub download_dir: Option<String>,

    /// Guild selected at startup.
    pub default_guild: Option<String>,

    /// Channel selected at startup, within the default guild.
    pub default_channel: Option<String>,

    pub backend: Backend,

    /// JSON fixture for [`Backend::Memory`].
    pub fixture: Option<String>,

    /// How long to wait for the gateway `Ready`. Default: 30.
    pub ready_timeout_secs: u64,

    /// Fixed offset for displayed timestamps; local time when unset.
    pub utc_offset_hours: Option<i32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token: None,
            log_level: None,
            theme_name: None,
            theme_file: None,
            download_dir: None,
            default_guild: None,
            default_channel: None,
            backend: Backend::Discord,
            fixture: None,
            ready_timeout_secs: DEFAULT_READY_TIMEOUT_SECS,
            utc_offset_hours: None,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("log_level", &self.log_level)
            .field("theme_name", &self.theme_name)
            .field("theme_file", &self.theme_file)
            .field("download_dir", &self.download_dir)
            .field("default_guild", &self.default_guild)
            .field("default_channel", &self.default_channel)
            .field("backend", &self.backend)
            .field("fixture", &self.fixture)
            .field("ready_timeout_secs", &self.ready_timeout_secs)
            .field("utc_offset_hours", &self.utc_offset_hours)
            .finish()
    }
}

impl Config {
    /// Parses configuration from a flat key/value map.
    ///
    /// Empty values count as unset.
    ///
    /// # Errors
    ///
    /// [`BridgeError::Config`] for an unknown backend or a malformed number.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::collections::BTreeMap;
    /// use chatbridge::{Backend, Config};
    ///
    /// let mut map = BTreeMap::new();
    /// map.insert("backend".to_string(), "memory".to_string());
    /// map.insert("ready_timeout_secs".to_string(), "5".to_string());
    ///
    /// let config = Config::from_map(&map).unwrap();
    /// assert_eq!(config.backend, Backend::Memory);
    /// assert_eq!(config.ready_timeout_secs, 5);
    /// ```
    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self> {
        let get = |key: &str| map.get(key).map(|v| v.trim()).filter(|v| !v.is_empty()).map(String::from);

        let backend = match get("backend").as_deref().map(str::to_lowercase).as_deref() {
            None | Some("discord") => Backend::Discord,
            Some("memory") => Backend::Memory,
            Some(other) => return Err(Error::Config(format!("unknown backend '{other}' (expected discord or memory)"))),
        };
        let ready_timeout_secs = match get("ready_timeout_secs") {
            Some(v) => v
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| Error::Config(format!("ready_timeout_secs must be a positive integer, got '{v}'")))?,
            None => DEFAULT_READY_TIMEOUT_SECS,
        };
        let utc_offset_hours = get("utc_offset_hours")
            .map(|v| {
                v.parse::<i32>()
                    .ok()
                    .filter(|h| (-23..=23).contains(h))
                    .ok_or_else(|| Error::Config(format!("utc_offset_hours must be between -23 and 23, got '{v}'")))
            })
            .transpose()?;

        Ok(Self {
            token: get("token"),
            log_level: get("log_level"),
            theme_name: get("theme"),
            theme_file: get("theme_file"),
            download_dir: get("download_dir"),
            default_guild: get("default_guild"),
            default_channel: get("default_channel"),
            backend,
            fixture: get("fixture"),
            ready_timeout_secs,
            utc_offset_hours,
        })
    }

    /// Loads `.env`, then the process environment, then the config file.
    ///
    /// # Errors
    ///
    /// See [`Config::from_sources`].
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        let env: BTreeMap<String, String> = std::env::vars().collect();
        Self::from_sources(&env, infrastructure::default_config_file())
    }

    /// Merges environment variables over the TOML file.
    ///
    /// `CHATBRIDGE_CONFIG` names the file explicitly, and then it must
    /// exist; otherwise `default_file` is read when present. `DISCORD_TOKEN`
    /// and `LOG_LEVEL` are accepted besides the `CHATBRIDGE_<KEY>` forms.
    ///
    /// # Errors
    ///
    /// [`BridgeError::Config`] for an unreadable or malformed file, or an
    /// invalid value.
    pub fn from_sources(env: &BTreeMap<String, String>, default_file: Option<PathBuf>) -> Result<Self> {
        let mut map = match env.get("CHATBRIDGE_CONFIG") {
            Some(explicit) => read_config_file(&expand_tilde(explicit))?,
            None => match default_file {
                Some(path) if path.is_file() => read_config_file(&path)?,
                _ => BTreeMap::new(),
            },
        };

        let aliases = [("DISCORD_TOKEN", "token"), ("LOG_LEVEL", "log_level")];
        for (var, key) in aliases {
            if let Some(value) = env.get(var) {
                map.insert(key.to_string(), value.clone());
            }
        }
        for key in CONFIG_KEYS {
            if let Some(value) = env.get(&format!("CHATBRIDGE_{}", key.to_uppercase())) {
                map.insert(key.to_string(), value.clone());
            }
        }
        Self::from_map(&map)
    }

    /// The download directory with `~` expanded.
    #[must_use]
    pub fn download_path(&self) -> PathBuf {
        self.download_dir
            .as_deref()
            .map_or_else(infrastructure::default_download_dir, expand_tilde)
    }
}

/// Reads a flat TOML table into strings.
fn read_config_file(path: &Path) -> Result<BTreeMap<String, String>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
    let table: toml::Table =
        toml::from_str(&text).map_err(|e| Error::Config(format!("invalid TOML in {}: {e}", path.display())))?;

    table
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                toml::Value::String(s) => s,
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Boolean(b) => b.to_string(),
                other => {
                    return Err(Error::Config(format!(
                        "{}: '{key}' must be a string or number, got {}",
                        path.display(),
                        other.type_str()
                    )))
                }
            };
            Ok((key, value))
        })
        .collect()
}

/// Resolves the configured theme, falling back to the default.
#[must_use]
pub fn load_theme(config: &Config) -> Theme {
    config.theme_file.as_ref().map_or_else(
        || {
            config.theme_name.as_ref().map_or_else(Theme::default, |theme_name| {
                Theme::from_name(theme_name).unwrap_or_else(|| {
                    tracing::warn!(theme_name = %theme_name, "unknown theme, using default");
                    Theme::default()
                })
            })
        },
        |theme_file| {
            Theme::from_file(expand_tilde(theme_file)).unwrap_or_else(|e| {
                tracing::warn!(theme_file = %theme_file, error = %e, "failed to load theme from file, using default");
                Theme::default()
            })
        },
    )
}

/// Assembles the console around a chat backend.
///
/// # Example
///
/// ```rust
/// use chatbridge::domain::Author;
/// use chatbridge::service::MemoryChatService;
/// use chatbridge::{initialize, Config};
/// use std::sync::Arc;
///
/// let backend = MemoryChatService::new(Author { id: 1, name: "bot".into(), bot: true });
/// let app = initialize(&Config::default(), Arc::new(backend));
/// assert!(!app.session().service.state().is_bot_ready());
/// ```
pub fn initialize(config: &Config, client: Arc<dyn ChatService>) -> App {
    tracing::debug!(?config, "initializing chatbridge");

    let theme = load_theme(config);
    let service = ServiceLayer::new(client, config.download_path(), infrastructure::preview_dir());
    let view = View::new(Clock::with_offset_hours(config.utc_offset_hours));
    App::new(service, view, theme)
}
