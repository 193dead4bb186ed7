//! Error types for the chatbridge console.
//!
//! This module defines the centralized error type [`BridgeError`], the
//! chat-service failure type [`ServiceError`], and a [`Result`] alias used
//! throughout the crate. Both enums are implemented with `thiserror`.
//!
//! Failures the operator can act on (a bad command argument, a missing
//! permission, an unknown channel) never cross a component boundary as a raw
//! error: they are published as `Error` events and rendered in the log. Only
//! bootstrap failures and broken event handlers travel up as [`BridgeError`].

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for chatbridge operations.
///
/// # Examples
///
/// ```
/// use chatbridge::domain::BridgeError;
///
/// fn check_limit(limit: u32) -> Result<u32, BridgeError> {
///     if limit == 0 {
///         return Err(BridgeError::Validation("limit must be positive".to_string()));
///     }
///     Ok(limit)
/// }
///
/// assert!(check_limit(0).is_err());
/// ```
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A command argument failed local validation.
    ///
    /// The message is shown to the operator verbatim.
    #[error("{0}")]
    Validation(String),

    /// The chat service rejected or failed a request.
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    /// Filesystem or terminal I/O failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Theme parsing failed.
    #[error("Theme error: {0}")]
    Theme(String),

    /// Configuration is invalid or missing.
    ///
    /// Raised during bootstrap, before the event loop starts.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Terminal setup or teardown failed.
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// The session could not be brought up (gateway never became ready,
    /// no reachable guild).
    #[error("Startup error: {0}")]
    Startup(String),
}

/// Failures reported by a [`ChatService`](crate::service::ChatService) call or
/// by the service layer's own lookups.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    /// The bot lacks the permission required for the request.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// A guild, channel, message or file could not be resolved.
    #[error("{what} '{token}' not found{}", .suggestion.as_ref().map(|s| format!(". Did you mean '{s}'?")).unwrap_or_default())]
    NotFound {
        /// Kind of entity that was looked up ("Guild", "Channel", ...).
        what: &'static str,
        /// The token the operator typed.
        token: String,
        /// Closest known name, if any.
        suggestion: Option<String>,
    },

    /// Network or gateway failure.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// A guild must be selected first.
    #[error("No guild selected. Use /setguild first.")]
    NoGuildSelected,

    /// A channel must be selected first.
    #[error("No channel selected. Use /setchannel first.")]
    NoChannelSelected,

    /// An index referred past the end of a cached list.
    #[error("Index {index} is out of range (1-{len})")]
    InvalidIndex {
        /// The 1-based index the operator typed.
        index: usize,
        /// Length of the cached list.
        len: usize,
    },

    /// A local file to upload does not exist.
    #[error("File not found: {}", .0.display())]
    FileMissing(PathBuf),

    /// The platform refused the request for another reason.
    #[error("Request rejected: {0}")]
    Rejected(String),
}

/// A specialized `Result` type for chatbridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;
