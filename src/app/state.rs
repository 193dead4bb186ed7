//! Shared application state.
//!
//! [`AppState`] is the single record of the operator's current selection and
//! of the data cached from the chat service. It is owned by the
//! [`ServiceLayer`](crate::service::ServiceLayer), which is the only writer:
//! every mutator below is `pub(crate)` and called from `service` alone, while
//! the controller and the view get `&AppState` through
//! [`ServiceLayer::state`](crate::service::ServiceLayer::state).
//!
//! All access happens on the single application task, so the state needs no
//! lock.
//!
//! # Invariants
//!
//! - `current_channel`, if set, belongs to `current_guild`
//! - selecting a guild clears the channel selection, the channel list, the
//!   file cache and both message caches

use crate::domain::{ChannelRef, FileRef, GuildRef, Message, Snowflake};

/// Most messages kept in the history cache; the oldest go first.
pub const MAX_RECENT_MESSAGES: usize = 100;

/// Current selection and cached data.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    is_bot_ready: bool,
    bot_user: Option<String>,
    bot_id: Option<Snowflake>,
    current_guild: Option<GuildRef>,
    current_channel: Option<ChannelRef>,
    all_guilds: Vec<GuildRef>,
    available_channels: Vec<ChannelRef>,
    recent_messages: Vec<Message>,
    recent_self_messages: Vec<Message>,
    file_cache: Vec<FileRef>,
}

impl AppState {
    /// Creates an empty state: not ready, nothing selected, caches empty.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn is_bot_ready(&self) -> bool {
        self.is_bot_ready
    }

    #[must_use]
    pub fn bot_user(&self) -> Option<&str> {
        self.bot_user.as_deref()
    }

    /// Platform id of the bot account, known once the gateway is ready.
    #[must_use]
    pub const fn bot_id(&self) -> Option<Snowflake> {
        self.bot_id
    }

    #[must_use]
    pub const fn current_guild(&self) -> Option<&GuildRef> {
        self.current_guild.as_ref()
    }

    #[must_use]
    pub const fn current_channel(&self) -> Option<&ChannelRef> {
        self.current_channel.as_ref()
    }

    #[must_use]
    pub fn all_guilds(&self) -> &[GuildRef] {
        &self.all_guilds
    }

    #[must_use]
    pub fn available_channels(&self) -> &[ChannelRef] {
        &self.available_channels
    }

    /// Cached history of the current channel, oldest first.
    #[must_use]
    pub fn recent_messages(&self) -> &[Message] {
        &self.recent_messages
    }

    /// Messages sent by the bot, as listed by the last `/self_messages`.
    #[must_use]
    pub fn recent_self_messages(&self) -> &[Message] {
        &self.recent_self_messages
    }

    /// Attachments found by the last `/files`.
    #[must_use]
    pub fn file_cache(&self) -> &[FileRef] {
        &self.file_cache
    }

    /// Returns the self message at a 1-based index.
    #[must_use]
    pub fn self_message(&self, index: usize) -> Option<&Message> {
        index.checked_sub(1).and_then(|i| self.recent_self_messages.get(i))
    }

    /// Returns the cached file at a 1-based index.
    #[must_use]
    pub fn cached_file(&self, index: usize) -> Option<&FileRef> {
        index.checked_sub(1).and_then(|i| self.file_cache.get(i))
    }

    /// Whether `channel_id` is the selected channel.
    #[must_use]
    pub fn is_current_channel(&self, channel_id: Snowflake) -> bool {
        self.current_channel.as_ref().is_some_and(|c| c.id == channel_id)
    }

    /// Short `guild | #channel` label for prompts and the title bar.
    #[must_use]
    pub fn location_label(&self) -> String {
        let guild = self.current_guild.as_ref().map_or("No Guild", |g| g.name.as_str());
        match &self.current_channel {
            Some(channel) => format!("{guild} | #{}", channel.name),
            None => format!("{guild} | No Channel"),
        }
    }

    pub(crate) fn mark_ready(&mut self, user_id: Snowflake, user: String) {
        self.is_bot_ready = true;
        self.bot_id = Some(user_id);
        self.bot_user = Some(user);
    }

    pub(crate) fn set_guilds(&mut self, guilds: Vec<GuildRef>) {
        if let Some(current) = &self.current_guild {
            if !guilds.iter().any(|g| g.id == current.id) {
                tracing::debug!(guild = %current.name, "current guild no longer reachable");
                self.clear_guild_scope();
                self.current_guild = None;
            }
        }
        self.all_guilds = guilds;
    }

    /// Makes `guild` current and installs its channel list.
    pub(crate) fn select_guild(&mut self, guild: GuildRef, channels: Vec<ChannelRef>) {
        self.clear_guild_scope();
        self.current_guild = Some(guild);
        self.available_channels = channels;
    }

    /// Replaces the channel list of the current guild, dropping the channel
    /// selection if it disappeared.
    pub(crate) fn set_channels(&mut self, channels: Vec<ChannelRef>) {
        if let Some(current) = &self.current_channel {
            if !channels.iter().any(|c| c.id == current.id) {
                tracing::debug!(channel = %current.name, "current channel no longer listed");
                self.current_channel = None;
                self.recent_messages.clear();
                self.file_cache.clear();
            }
        }
        self.available_channels = channels;
    }

    /// Makes `channel` current. Ignores channels of another guild.
    pub(crate) fn select_channel(&mut self, channel: ChannelRef) -> bool {
        if self.current_guild.as_ref().map(|g| g.id) != Some(channel.guild_id) {
            tracing::debug!(channel = %channel.name, "channel outside current guild ignored");
            return false;
        }
        self.current_channel = Some(channel);
        self.recent_messages.clear();
        self.file_cache.clear();
        true
    }

    pub(crate) fn set_recent_messages(&mut self, messages: Vec<Message>) {
        self.recent_messages = messages;
    }

    pub(crate) fn push_recent_message(&mut self, message: Message) {
        self.recent_messages.push(message);
        let excess = self.recent_messages.len().saturating_sub(MAX_RECENT_MESSAGES);
        self.recent_messages.drain(..excess);
    }

    pub(crate) fn set_self_messages(&mut self, messages: Vec<Message>) {
        self.recent_self_messages = messages;
    }

    /// Replaces a cached self message (and its copy in the history cache).
    pub(crate) fn replace_self_message(&mut self, index: usize, message: Message) {
        if let Some(slot) = index.checked_sub(1).and_then(|i| self.recent_self_messages.get_mut(i)) {
            *slot = message.clone();
        }
        if let Some(slot) = self.recent_messages.iter_mut().find(|m| m.id == message.id) {
            *slot = message;
        }
    }

    /// Removes a cached self message and returns it.
    pub(crate) fn remove_self_message(&mut self, index: usize) -> Option<Message> {
        let i = index.checked_sub(1).filter(|i| *i < self.recent_self_messages.len())?;
        let removed = self.recent_self_messages.remove(i);
        self.recent_messages.retain(|m| m.id != removed.id);
        Some(removed)
    }

    pub(crate) fn set_file_cache(&mut self, files: Vec<FileRef>) {
        self.file_cache = files;
    }

    fn clear_guild_scope(&mut self) {
        self.current_channel = None;
        self.available_channels.clear();
        self.file_cache.clear();
        self.recent_messages.clear();
        self.recent_self_messages.clear();
    }
}
