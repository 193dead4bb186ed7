//! Domain layer for the chatbridge console.
//!
//! Core types independent of the terminal and of any particular chat
//! platform SDK.
//!
//! # Organization
//!
//! - [`error`]: Error types and result aliases
//! - [`models`]: Guilds, channels, messages and attachments
//!
//! # Examples
//!
//! ```
//! use chatbridge::domain::{GuildRef, Result};
//!
//! fn first_guild(guilds: &[GuildRef]) -> Result<Option<&GuildRef>> {
//!     Ok(guilds.first())
//! }
//! ```

pub mod error;
pub mod models;

pub use error::{BridgeError, Result, ServiceError};
pub use models::{
    Attachment, Author, ChannelRef, FileRef, GuildRef, IncomingMessage, Message, Snowflake,
};
