//! The state-owning service layer.
//!
//! [`ServiceLayer`] wraps a [`ChatService`] and owns the [`AppState`]. Each
//! operation follows the same shape:
//!
//! ```text
//! call the chat service ──► mutate AppState completely ──► return the Event
//! ```
//!
//! The caller publishes the returned event, so every subscriber observes the
//! fully updated state. Failures come back as [`ServiceError`] and the caller
//! publishes them as `Error` events (see [`publish_outcome`](super::publish_outcome)).

use super::chat::{ChatService, ServiceResult};
use super::resolve::resolve;
use crate::app::AppState;
use crate::domain::{ChannelRef, FileRef, IncomingMessage, ServiceError, Snowflake};
use crate::events::Event;
use crate::ui::preview::{self, PREVIEW_WIDTH};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Number of messages loaded automatically after a channel is selected.
pub const AUTO_READ_LIMIT: u8 = 20;

/// Owner of [`AppState`] and the only component that writes to it.
pub struct ServiceLayer {
    client: Arc<dyn ChatService>,
    state: AppState,
    download_dir: PathBuf,
    preview_dir: PathBuf,
}

impl ServiceLayer {
    /// Creates a layer with an empty state.
    ///
    /// # Parameters
    ///
    /// * `client` - Chat platform backend
    /// * `download_dir` - Destination for `/download`
    /// * `preview_dir` - Scratch directory for `/preview` downloads
    pub fn new(client: Arc<dyn ChatService>, download_dir: PathBuf, preview_dir: PathBuf) -> Self {
        Self {
            client,
            state: AppState::new(),
            download_dir,
            preview_dir,
        }
    }

    /// Read-only view of the shared state.
    #[must_use]
    pub const fn state(&self) -> &AppState {
        &self.state
    }

    /// The chat backend, for shutdown.
    #[must_use]
    pub fn client(&self) -> &Arc<dyn ChatService> {
        &self.client
    }

    #[must_use]
    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Records the gateway handshake.
    pub fn mark_ready(&mut self, user_id: Snowflake, user: String) -> Event {
        tracing::info!(user = %user, "bot ready");
        self.state.mark_ready(user_id, user.clone());
        Event::BotReady { user }
    }

    /// Reloads the guild list.
    ///
    /// # Errors
    ///
    /// Propagates chat service failures.
    pub async fn refresh_guilds(&mut self) -> ServiceResult<Event> {
        let guilds = self.client.list_guilds().await?;
        tracing::debug!(count = guilds.len(), "guilds loaded");
        self.state.set_guilds(guilds);
        Ok(Event::GuildsUpdated)
    }

    /// Resolves `token` against the guild list and makes it current.
    ///
    /// Loads the guild's channels before touching the state, so a failed
    /// channel listing leaves the previous selection intact.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotFound`] for an unknown token, or a chat service
    /// failure.
    pub async fn select_guild(&mut self, token: &str) -> ServiceResult<Event> {
        if self.state.all_guilds().is_empty() {
            self.refresh_guilds().await?;
        }
        let guild = resolve(self.state.all_guilds(), token, "Guild")?.clone();
        let channels = self.client.list_channels(&guild).await?;

        tracing::info!(guild = %guild.name, channels = channels.len(), "guild selected");
        let name = guild.name.clone();
        self.state.select_guild(guild, channels);
        Ok(Event::GuildSelected { name })
    }

    /// Reloads the channel list of the current guild.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NoGuildSelected`] or a chat service failure.
    pub async fn refresh_channels(&mut self) -> ServiceResult<Event> {
        let guild = self
            .state
            .current_guild()
            .cloned()
            .ok_or(ServiceError::NoGuildSelected)?;
        let channels = self.client.list_channels(&guild).await?;

        tracing::debug!(guild = %guild.name, count = channels.len(), "channels loaded");
        self.state.set_channels(channels);
        Ok(Event::ChannelsUpdated)
    }

    /// Resolves `token` within the current guild and makes it current.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NoGuildSelected`] or [`ServiceError::NotFound`].
    pub fn select_channel(&mut self, token: &str) -> ServiceResult<Event> {
        if self.state.current_guild().is_none() {
            return Err(ServiceError::NoGuildSelected);
        }
        let channel = resolve(self.state.available_channels(), token, "Channel")?.clone();
        let name = channel.name.clone();

        tracing::info!(channel = %name, "channel selected");
        self.state.select_channel(channel);
        Ok(Event::ChannelSelected { name })
    }

    /// Loads the last `limit` messages of the current channel, oldest first.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NoChannelSelected`] or a chat service failure.
    pub async fn fetch_recent_messages(&mut self, limit: u8) -> ServiceResult<Event> {
        let channel = self.require_channel()?;
        let mut messages = self.client.fetch_history(&channel, limit).await?;
        messages.reverse();

        tracing::debug!(channel = %channel.name, limit, fetched = messages.len(), "history loaded");
        self.state.set_recent_messages(messages);
        Ok(Event::MessagesUpdated)
    }

    /// Scans the last `limit` messages of the current channel and keeps the
    /// ones the bot wrote, newest first.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NoChannelSelected`] or a chat service failure.
    pub async fn fetch_self_messages(&mut self, limit: u8) -> ServiceResult<Event> {
        let channel = self.require_channel()?;
        let bot_id = self.state.bot_id();
        let messages: Vec<_> = self
            .client
            .fetch_history(&channel, limit)
            .await?
            .into_iter()
            .filter(|m| Some(m.author.id) == bot_id)
            .collect();

        tracing::debug!(channel = %channel.name, found = messages.len(), "self messages loaded");
        self.state.set_self_messages(messages);
        Ok(Event::SelfMessagesUpdated)
    }

    /// Sends `text` to the current channel.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NoChannelSelected`] or a chat service failure.
    pub async fn send_message(&mut self, text: &str) -> ServiceResult<Event> {
        let channel = self.require_channel()?;
        let message = self.client.send_message(&channel, text).await?;

        tracing::debug!(channel = %channel.name, message_id = message.id, "message sent");
        self.state.push_recent_message(message.clone());
        Ok(Event::MessageSent { message })
    }

    /// Uploads a local file to the current channel.
    ///
    /// # Errors
    ///
    /// [`ServiceError::FileMissing`] when `path` is not a file,
    /// [`ServiceError::NoChannelSelected`], or a chat service failure.
    pub async fn send_file(&mut self, path: &Path, caption: Option<&str>) -> ServiceResult<Event> {
        let channel = self.require_channel()?;
        if !path.is_file() {
            return Err(ServiceError::FileMissing(path.to_path_buf()));
        }
        let message = self.client.send_file(&channel, path, caption).await?;
        let file_name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

        tracing::debug!(channel = %channel.name, file = %file_name, "file sent");
        self.state.push_recent_message(message.clone());
        Ok(Event::FileSent { message, file_name })
    }

    /// Replaces the text of self message `index` (1-based).
    ///
    /// # Errors
    ///
    /// [`ServiceError::InvalidIndex`] or a chat service failure.
    pub async fn edit_message(&mut self, index: usize, text: &str) -> ServiceResult<Event> {
        let original = self
            .state
            .self_message(index)
            .cloned()
            .ok_or(ServiceError::InvalidIndex { index, len: self.state.recent_self_messages().len() })?;
        let message = self.client.edit_message(&original, text).await?;

        tracing::debug!(message_id = message.id, "message edited");
        self.state.replace_self_message(index, message.clone());
        Ok(Event::MessageEdited { message })
    }

    /// Deletes self message `index` (1-based).
    ///
    /// # Errors
    ///
    /// [`ServiceError::InvalidIndex`] or a chat service failure.
    pub async fn delete_message(&mut self, index: usize) -> ServiceResult<Event> {
        let target = self
            .state
            .self_message(index)
            .cloned()
            .ok_or(ServiceError::InvalidIndex { index, len: self.state.recent_self_messages().len() })?;
        self.client.delete_message(&target).await?;

        tracing::debug!(message_id = target.id, "message deleted");
        let message = self.state.remove_self_message(index).unwrap_or(target);
        Ok(Event::MessageDeleted { message })
    }

    /// Scans the current channel for attachments.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NoChannelSelected`] or a chat service failure.
    pub async fn fetch_files(&mut self, scan_limit: u16) -> ServiceResult<Event> {
        let channel = self.require_channel()?;
        let files = self.client.list_recent_attachments(&channel, scan_limit).await?;

        tracing::debug!(channel = %channel.name, scan_limit, found = files.len(), "attachments listed");
        self.state.set_file_cache(files);
        Ok(Event::FilesListUpdated)
    }

    /// Downloads cached file `index` (1-based) into the download directory.
    ///
    /// # Errors
    ///
    /// [`ServiceError::InvalidIndex`], an I/O failure creating the directory,
    /// or a chat service failure.
    pub async fn download_file(&mut self, index: usize) -> ServiceResult<Event> {
        let path = self.download_into(index, self.download_dir.clone()).await?;
        Ok(Event::FileDownloaded { path })
    }

    /// Downloads cached image `index` (1-based) into the preview directory
    /// and converts it off the event loop. A conversion failure is carried
    /// in the event, not returned.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Rejected`] if the file is not an image, plus the
    /// failures of [`Self::download_file`].
    pub async fn prepare_preview(&mut self, index: usize) -> ServiceResult<Event> {
        let file = self.cached_file(index)?;
        if !file.attachment.is_image() {
            return Err(ServiceError::Rejected(format!(
                "'{}' is not an image",
                file.attachment.filename
            )));
        }
        let path = self.download_into(index, self.preview_dir.clone()).await?;
        let source = path.clone();
        let art = tokio::task::spawn_blocking(move || preview::render(&source, PREVIEW_WIDTH))
            .await
            .unwrap_or_else(|e| Err(format!("Cannot preview {}: {e}", path.display())));
        Ok(Event::ImagePreviewRequested { path, art })
    }

    /// Records a gateway message and wraps it as an event.
    ///
    /// Messages for the selected channel are appended to the history cache.
    pub fn record_incoming(&mut self, incoming: IncomingMessage) -> Event {
        if self.state.is_current_channel(incoming.message.channel_id) {
            self.state.push_recent_message(incoming.message.clone());
        }
        Event::IncomingMessage(incoming)
    }

    async fn download_into(&self, index: usize, dir: PathBuf) -> ServiceResult<PathBuf> {
        let file = self.cached_file(index)?;
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| ServiceError::Rejected(format!("cannot create {}: {e}", dir.display())))?;
        let path = self.client.download_attachment(&file, &dir).await?;
        tracing::debug!(file = %file.attachment.filename, path = %path.display(), "attachment downloaded");
        Ok(path)
    }

    fn cached_file(&self, index: usize) -> ServiceResult<FileRef> {
        self.state
            .cached_file(index)
            .cloned()
            .ok_or(ServiceError::InvalidIndex { index, len: self.state.file_cache().len() })
    }

    fn require_channel(&self) -> ServiceResult<ChannelRef> {
        self.state
            .current_channel()
            .cloned()
            .ok_or(ServiceError::NoChannelSelected)
    }
}

impl std::fmt::Debug for ServiceLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceLayer")
            .field("state", &self.state)
            .field("download_dir", &self.download_dir)
            .finish_non_exhaustive()
    }
}
