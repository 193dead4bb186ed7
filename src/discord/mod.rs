//! Discord backend over `serenity`.
//!
//! [`DiscordChatService::connect`] starts the gateway client on its own tokio
//! task. Gateway events come back as [`Notification`]s; requests go through
//! serenity's REST client, and attachments are fetched with `reqwest`.
//!
//! # Modules
//!
//! - `convert`: serenity models to domain types, error classification
//! - `gateway`: the `EventHandler` that forwards gateway events

mod convert;
mod gateway;

use crate::domain::{BridgeError, ChannelRef, FileRef, GuildRef, Message, ServiceError};
use crate::service::{unique_destination, ChatService, Notification, ServiceResult};
use async_trait::async_trait;
use convert::{classify, page_sizes, text_channels, to_message};
use gateway::GatewayHandler;
use serenity::all::{
    Cache, ChannelId, Client, CreateAttachment, CreateMessage, EditMessage, GatewayIntents, GetMessages, GuildId,
    Http, MessageId, ShardManager,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// [`ChatService`] backed by a live Discord bot session.
pub struct DiscordChatService {
    http: Arc<Http>,
    cache: Arc<Cache>,
    shard_manager: Arc<ShardManager>,
    downloader: reqwest::Client,
}

impl DiscordChatService {
    /// Builds the client and starts the gateway in the background.
    ///
    /// `Ready`, incoming messages and the end of the gateway session are
    /// reported on `notifications`.
    ///
    /// # Errors
    ///
    /// [`BridgeError::Config`] when serenity rejects the token.
    pub async fn connect(token: &str, notifications: UnboundedSender<Notification>) -> crate::domain::Result<Self> {
        let intents = GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT
            | GatewayIntents::DIRECT_MESSAGES;

        let mut client = Client::builder(token, intents)
            .event_handler(GatewayHandler::new(notifications.clone()))
            .await
            .map_err(|e| BridgeError::Config(format!("invalid bot token: {e}")))?;

        let service = Self {
            http: client.http.clone(),
            cache: client.cache.clone(),
            shard_manager: client.shard_manager.clone(),
            downloader: reqwest::Client::new(),
        };

        tokio::spawn(async move {
            let reason = match client.start().await {
                Ok(()) => "gateway closed".to_string(),
                Err(e) => e.to_string(),
            };
            tracing::warn!(%reason, "gateway session ended");
            let _ = notifications.send(Notification::Disconnected { reason });
        });

        Ok(service)
    }

    async fn history_page(
        &self,
        channel: ChannelId,
        limit: u8,
        before: Option<MessageId>,
    ) -> ServiceResult<Vec<serenity::all::Message>> {
        let mut request = GetMessages::new().limit(limit);
        if let Some(before) = before {
            request = request.before(before);
        }
        channel
            .messages(&self.http, request)
            .await
            .map_err(|e| classify(&e, "Channel", channel))
    }
}

#[async_trait]
impl ChatService for DiscordChatService {
    async fn list_guilds(&self) -> ServiceResult<Vec<GuildRef>> {
        let guilds = self
            .http
            .get_guilds(None, None)
            .await
            .map_err(|e| classify(&e, "Guild list", "@me"))?;
        Ok(guilds
            .into_iter()
            .map(|g| GuildRef {
                id: g.id.get(),
                name: g.name,
            })
            .collect())
    }

    async fn list_channels(&self, guild: &GuildRef) -> ServiceResult<Vec<ChannelRef>> {
        let id = GuildId::new(guild.id);
        let channels = id
            .channels(&self.http)
            .await
            .map_err(|e| classify(&e, "Guild", &guild.name))?;
        Ok(text_channels(id, channels.into_values()))
    }

    async fn fetch_history(&self, channel: &ChannelRef, limit: u8) -> ServiceResult<Vec<Message>> {
        let page = self.history_page(ChannelId::new(channel.id), limit, None).await?;
        Ok(page.iter().map(|m| to_message(m, &self.cache)).collect())
    }

    async fn send_message(&self, channel: &ChannelRef, text: &str) -> ServiceResult<Message> {
        let sent = ChannelId::new(channel.id)
            .send_message(&self.http, CreateMessage::new().content(text))
            .await
            .map_err(|e| classify(&e, "Channel", &channel.name))?;
        Ok(to_message(&sent, &self.cache))
    }

    async fn send_file(&self, channel: &ChannelRef, path: &Path, caption: Option<&str>) -> ServiceResult<Message> {
        if !path.is_file() {
            return Err(ServiceError::FileMissing(path.to_path_buf()));
        }
        let attachment = CreateAttachment::path(path)
            .await
            .map_err(|e| ServiceError::Rejected(format!("cannot read {}: {e}", path.display())))?;
        let mut message = CreateMessage::new().add_file(attachment);
        if let Some(caption) = caption {
            message = message.content(caption);
        }
        let sent = ChannelId::new(channel.id)
            .send_message(&self.http, message)
            .await
            .map_err(|e| classify(&e, "Channel", &channel.name))?;
        Ok(to_message(&sent, &self.cache))
    }

    async fn edit_message(&self, message: &Message, text: &str) -> ServiceResult<Message> {
        let edited = ChannelId::new(message.channel_id)
            .edit_message(&self.http, MessageId::new(message.id), EditMessage::new().content(text))
            .await
            .map_err(|e| classify(&e, "Message", message.id))?;
        Ok(to_message(&edited, &self.cache))
    }

    async fn delete_message(&self, message: &Message) -> ServiceResult<()> {
        ChannelId::new(message.channel_id)
            .delete_message(&self.http, MessageId::new(message.id))
            .await
            .map_err(|e| classify(&e, "Message", message.id))
    }

    async fn list_recent_attachments(&self, channel: &ChannelRef, scan_limit: u16) -> ServiceResult<Vec<FileRef>> {
        let id = ChannelId::new(channel.id);
        let mut files = Vec::new();
        let mut before = None;
        for limit in page_sizes(scan_limit) {
            let page = self.history_page(id, limit, before).await?;
            files.extend(page.iter().flat_map(|m| FileRef::from_message(&to_message(m, &self.cache))));
            if page.len() < usize::from(limit) {
                break;
            }
            before = page.last().map(|m| m.id);
        }
        tracing::debug!(channel = %channel.name, found = files.len(), "attachments scanned");
        Ok(files)
    }

    async fn download_attachment(&self, file: &FileRef, dest_dir: &Path) -> ServiceResult<PathBuf> {
        let transport = |e: reqwest::Error| ServiceError::Transport(format!("download failed: {e}"));
        let bytes = self
            .downloader
            .get(&file.attachment.url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(transport)?
            .bytes()
            .await
            .map_err(transport)?;

        let path = unique_destination(dest_dir, &file.attachment.filename);
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| ServiceError::Rejected(format!("cannot write {}: {e}", path.display())))?;
        Ok(path)
    }

    async fn shutdown(&self) {
        tracing::info!("shutting down gateway shards");
        self.shard_manager.shutdown_all().await;
    }
}

impl std::fmt::Debug for DiscordChatService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordChatService").finish_non_exhaustive()
    }
}
