//! The chat platform seam.
//!
//! [`ChatService`] is everything the console needs from the platform client.
//! Two implementations ship with the crate: the serenity-backed
//! [`DiscordChatService`](crate::discord::DiscordChatService) and the
//! in-process [`MemoryChatService`](super::MemoryChatService).
//!
//! Besides request/response calls, a backend pushes [`Notification`]s over an
//! unbounded channel. The runtime loop is the only consumer of that channel,
//! which is how gateway tasks hand data to the single-threaded core.

use crate::domain::{ChannelRef, FileRef, GuildRef, IncomingMessage, Message, ServiceError, Snowflake};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Result of a chat service call.
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Asynchronous pushes from the platform, delivered regardless of what the
/// operator is doing.
#[derive(Debug, Clone)]
pub enum Notification {
    /// The gateway session is established.
    Ready {
        user_id: Snowflake,
        /// Display name of the bot account.
        user: String,
    },
    /// A message was posted somewhere the bot can see.
    Message(IncomingMessage),
    /// The gateway connection ended.
    Disconnected { reason: String },
}

/// Operations the console performs against the chat platform.
///
/// Every method either returns its result or a [`ServiceError`]; none of them
/// touch console state.
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Guilds the bot belongs to, in platform order.
    async fn list_guilds(&self) -> ServiceResult<Vec<GuildRef>>;

    /// Text channels of `guild`, in display order.
    async fn list_channels(&self, guild: &GuildRef) -> ServiceResult<Vec<ChannelRef>>;

    /// Up to `limit` (1..=100) messages of `channel`, newest first.
    async fn fetch_history(&self, channel: &ChannelRef, limit: u8) -> ServiceResult<Vec<Message>>;

    async fn send_message(&self, channel: &ChannelRef, text: &str) -> ServiceResult<Message>;

    /// Uploads a local file with an optional caption.
    async fn send_file(
        &self,
        channel: &ChannelRef,
        path: &Path,
        caption: Option<&str>,
    ) -> ServiceResult<Message>;

    /// Replaces the content of a message previously sent by the bot.
    async fn edit_message(&self, message: &Message, text: &str) -> ServiceResult<Message>;

    async fn delete_message(&self, message: &Message) -> ServiceResult<()>;

    /// Attachments found in the last `scan_limit` (1..=200) messages, newest
    /// first.
    async fn list_recent_attachments(
        &self,
        channel: &ChannelRef,
        scan_limit: u16,
    ) -> ServiceResult<Vec<FileRef>>;

    /// Saves an attachment under `dest_dir` and returns the written path.
    async fn download_attachment(&self, file: &FileRef, dest_dir: &Path) -> ServiceResult<PathBuf>;

    /// Closes the platform connection. Default: nothing to close.
    async fn shutdown(&self) {}
}

/// Picks a path inside `dir` for `file_name` that does not exist yet.
///
/// `report.pdf` becomes `report (1).pdf`, `report (2).pdf`, ... on collision.
/// Shared by the backends' download implementations.
#[must_use]
pub fn unique_destination(dir: &Path, file_name: &str) -> PathBuf {
    let safe_name = Path::new(file_name)
        .file_name()
        .map_or_else(|| "attachment".into(), |n| n.to_string_lossy().into_owned());
    let candidate = dir.join(&safe_name);
    if !candidate.exists() {
        return candidate;
    }

    let path = Path::new(&safe_name);
    let stem = path
        .file_stem()
        .map_or_else(|| safe_name.clone(), |s| s.to_string_lossy().into_owned());
    let ext = path.extension().map(|e| e.to_string_lossy().into_owned());

    (1..)
        .map(|n| match &ext {
            Some(ext) => dir.join(format!("{stem} ({n}).{ext}")),
            None => dir.join(format!("{stem} ({n})")),
        })
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_destination_numbers_collisions() {
        let dir = tempfile::tempdir().unwrap();
        let first = unique_destination(dir.path(), "report.pdf");
        assert_eq!(first, dir.path().join("report.pdf"));

        std::fs::write(&first, b"x").unwrap();
        let second = unique_destination(dir.path(), "report.pdf");
        assert_eq!(second, dir.path().join("report (1).pdf"));

        std::fs::write(&second, b"x").unwrap();
        assert_eq!(unique_destination(dir.path(), "report.pdf"), dir.path().join("report (2).pdf"));
    }

    #[test]
    fn test_unique_destination_strips_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = unique_destination(dir.path(), "../../etc/passwd");
        assert_eq!(path, dir.path().join("passwd"));
    }
}
