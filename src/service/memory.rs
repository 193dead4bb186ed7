//! In-process chat backend.
//!
//! [`MemoryChatService`] keeps guilds, channels and messages in memory and
//! implements [`ChatService`] over them. It backs the integration tests and
//! the `backend = "memory"` offline mode, where it is seeded from a JSON
//! [`Fixture`].
//!
//! Every call is recorded as a [`Call`] so tests can assert exactly what the
//! console asked for, and [`MemoryChatService::fail_next`] injects a failure
//! into the next call.
//!
//! Attachments whose URL uses the `file://` scheme are downloaded by copying
//! the local file; any other URL is written out as its own text.

use super::chat::{unique_destination, ChatService, ServiceResult};
use crate::domain::{
    Attachment, Author, BridgeError, ChannelRef, FileRef, GuildRef, Message, ServiceError,
    Snowflake,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Seed data for the in-memory backend.
///
/// # Example
///
/// ```json
/// {
///   "bot": { "id": 1, "name": "bridge-bot", "bot": true },
///   "guilds": [{ "id": 10, "name": "Lab" }],
///   "channels": [{ "id": 100, "guild_id": 10, "name": "general" }],
///   "messages": []
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixture {
    pub bot: Option<Author>,
    #[serde(default)]
    pub guilds: Vec<GuildRef>,
    #[serde(default)]
    pub channels: Vec<ChannelRef>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// A request received by the in-memory backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListGuilds,
    ListChannels { guild: Snowflake },
    FetchHistory { channel: Snowflake, limit: u8 },
    SendMessage { channel: Snowflake, text: String },
    SendFile { channel: Snowflake, path: PathBuf, caption: Option<String> },
    EditMessage { message: Snowflake, text: String },
    DeleteMessage { message: Snowflake },
    ListAttachments { channel: Snowflake, scan_limit: u16 },
    Download { attachment: Snowflake },
}

#[derive(Debug)]
struct Inner {
    bot: Author,
    guilds: Vec<GuildRef>,
    channels: Vec<ChannelRef>,
    messages: Vec<Message>,
    epoch: DateTime<Utc>,
    next_id: Snowflake,
    calls: Vec<Call>,
    fail_next: Option<ServiceError>,
}

impl Inner {
    fn next_id(&mut self) -> Snowflake {
        self.next_id += 1;
        self.next_id
    }

    /// Monotonic timestamps so history order is deterministic.
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let seq = i64::try_from(self.next_id()).unwrap_or(i64::MAX / 2);
        self.epoch + Duration::seconds(seq)
    }

    fn begin(&mut self, call: Call) -> ServiceResult<()> {
        tracing::trace!(?call, "memory backend call");
        self.calls.push(call);
        self.fail_next.take().map_or(Ok(()), Err)
    }

    fn channel(&self, id: Snowflake) -> ServiceResult<&ChannelRef> {
        self.channels.iter().find(|c| c.id == id).ok_or_else(|| ServiceError::NotFound {
            what: "Channel",
            token: id.to_string(),
            suggestion: None,
        })
    }

    /// Messages of a channel, newest first.
    fn history(&self, channel: Snowflake) -> Vec<Message> {
        let mut messages: Vec<Message> = self
            .messages
            .iter()
            .filter(|m| m.channel_id == channel)
            .cloned()
            .collect();
        messages.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        messages
    }
}

/// Chat backend that lives entirely in process memory.
#[derive(Debug)]
pub struct MemoryChatService {
    inner: Mutex<Inner>,
}

impl MemoryChatService {
    /// Creates an empty backend operated by `bot`.
    #[must_use]
    pub fn new(bot: Author) -> Self {
        Self::from_fixture(Fixture {
            bot: Some(bot),
            ..Fixture::default()
        })
    }

    /// Creates a backend from seed data.
    #[must_use]
    pub fn from_fixture(fixture: Fixture) -> Self {
        let bot = fixture.bot.unwrap_or_else(|| Author {
            id: 1,
            name: "chatbridge".to_string(),
            bot: true,
        });
        let next_id = fixture
            .messages
            .iter()
            .map(|m| m.id)
            .chain(fixture.messages.iter().flat_map(|m| m.attachments.iter().map(|a| a.id)))
            .max()
            .unwrap_or(1_000);
        Self {
            inner: Mutex::new(Inner {
                bot,
                guilds: fixture.guilds,
                channels: fixture.channels,
                messages: fixture.messages,
                epoch: Utc::now(),
                next_id,
                calls: Vec::new(),
                fail_next: None,
            }),
        }
    }

    /// Parses a JSON fixture.
    ///
    /// # Errors
    ///
    /// [`BridgeError::Config`] when the JSON does not match [`Fixture`].
    pub fn from_json(json: &str) -> crate::domain::Result<Self> {
        let fixture: Fixture = serde_json::from_str(json)
            .map_err(|e| BridgeError::Config(format!("invalid fixture: {e}")))?;
        Ok(Self::from_fixture(fixture))
    }

    /// Reads and parses a JSON fixture file.
    ///
    /// # Errors
    ///
    /// I/O failures and [`BridgeError::Config`] for malformed content.
    pub fn load(path: &Path) -> crate::domain::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The bot identity messages are sent as.
    #[must_use]
    pub fn bot(&self) -> Author {
        self.lock().bot.clone()
    }

    /// Adds a guild with its channels.
    pub fn add_guild(&self, guild: GuildRef, channels: Vec<ChannelRef>) {
        let mut inner = self.lock();
        inner.guilds.push(guild);
        inner.channels.extend(channels);
    }

    /// Posts a message as `author`, timestamped after every earlier post.
    pub fn post(&self, channel: Snowflake, author: &Author, content: &str) -> Message {
        self.post_with_attachments(channel, author, content, Vec::new())
    }

    /// Posts a message carrying attachments. Attachment ids of 0 are
    /// replaced with fresh ones.
    pub fn post_with_attachments(
        &self,
        channel: Snowflake,
        author: &Author,
        content: &str,
        mut attachments: Vec<Attachment>,
    ) -> Message {
        let mut inner = self.lock();
        for attachment in &mut attachments {
            if attachment.id == 0 {
                attachment.id = inner.next_id();
            }
        }
        let guild_id = inner.channels.iter().find(|c| c.id == channel).map(|c| c.guild_id);
        let timestamp = inner.next_timestamp();
        let message = Message {
            id: inner.next_id(),
            channel_id: channel,
            guild_id,
            author: author.clone(),
            content: content.to_string(),
            timestamp,
            attachments,
        };
        inner.messages.push(message.clone());
        message
    }

    /// Makes the next call fail with `error`.
    pub fn fail_next(&self, error: ServiceError) {
        self.lock().fail_next = Some(error);
    }

    /// Calls received so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Current content of a message, if it still exists.
    #[must_use]
    pub fn message(&self, id: Snowflake) -> Option<Message> {
        self.lock().messages.iter().find(|m| m.id == id).cloned()
    }
}

#[async_trait]
impl ChatService for MemoryChatService {
    async fn list_guilds(&self) -> ServiceResult<Vec<GuildRef>> {
        let mut inner = self.lock();
        inner.begin(Call::ListGuilds)?;
        Ok(inner.guilds.clone())
    }

    async fn list_channels(&self, guild: &GuildRef) -> ServiceResult<Vec<ChannelRef>> {
        let mut inner = self.lock();
        inner.begin(Call::ListChannels { guild: guild.id })?;
        Ok(inner
            .channels
            .iter()
            .filter(|c| c.guild_id == guild.id)
            .cloned()
            .collect())
    }

    async fn fetch_history(&self, channel: &ChannelRef, limit: u8) -> ServiceResult<Vec<Message>> {
        let mut inner = self.lock();
        inner.begin(Call::FetchHistory { channel: channel.id, limit })?;
        inner.channel(channel.id)?;
        Ok(inner
            .history(channel.id)
            .into_iter()
            .take(usize::from(limit))
            .collect())
    }

    async fn send_message(&self, channel: &ChannelRef, text: &str) -> ServiceResult<Message> {
        {
            let mut inner = self.lock();
            inner.begin(Call::SendMessage {
                channel: channel.id,
                text: text.to_string(),
            })?;
            inner.channel(channel.id)?;
        }
        let bot = self.bot();
        Ok(self.post(channel.id, &bot, text))
    }

    async fn send_file(
        &self,
        channel: &ChannelRef,
        path: &Path,
        caption: Option<&str>,
    ) -> ServiceResult<Message> {
        {
            let mut inner = self.lock();
            inner.begin(Call::SendFile {
                channel: channel.id,
                path: path.to_path_buf(),
                caption: caption.map(String::from),
            })?;
            inner.channel(channel.id)?;
        }
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|_| ServiceError::FileMissing(path.to_path_buf()))?;
        let absolute = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let attachment = Attachment {
            id: 0,
            filename: path
                .file_name()
                .map_or_else(|| "attachment".to_string(), |n| n.to_string_lossy().into_owned()),
            size: metadata.len(),
            url: format!("file://{}", absolute.display()),
            content_type: None,
        };
        let bot = self.bot();
        Ok(self.post_with_attachments(channel.id, &bot, caption.unwrap_or_default(), vec![attachment]))
    }

    async fn edit_message(&self, message: &Message, text: &str) -> ServiceResult<Message> {
        let mut inner = self.lock();
        inner.begin(Call::EditMessage {
            message: message.id,
            text: text.to_string(),
        })?;
        let bot_id = inner.bot.id;
        let stored = inner
            .messages
            .iter_mut()
            .find(|m| m.id == message.id)
            .ok_or_else(|| ServiceError::NotFound {
                what: "Message",
                token: message.id.to_string(),
                suggestion: None,
            })?;
        if stored.author.id != bot_id {
            return Err(ServiceError::PermissionDenied(
                "cannot edit a message sent by another user".to_string(),
            ));
        }
        stored.content = text.to_string();
        Ok(stored.clone())
    }

    async fn delete_message(&self, message: &Message) -> ServiceResult<()> {
        let mut inner = self.lock();
        inner.begin(Call::DeleteMessage { message: message.id })?;
        let before = inner.messages.len();
        inner.messages.retain(|m| m.id != message.id);
        if inner.messages.len() == before {
            return Err(ServiceError::NotFound {
                what: "Message",
                token: message.id.to_string(),
                suggestion: None,
            });
        }
        Ok(())
    }

    async fn list_recent_attachments(
        &self,
        channel: &ChannelRef,
        scan_limit: u16,
    ) -> ServiceResult<Vec<FileRef>> {
        let mut inner = self.lock();
        inner.begin(Call::ListAttachments {
            channel: channel.id,
            scan_limit,
        })?;
        inner.channel(channel.id)?;
        Ok(inner
            .history(channel.id)
            .iter()
            .take(usize::from(scan_limit))
            .flat_map(FileRef::from_message)
            .collect())
    }

    async fn download_attachment(&self, file: &FileRef, dest_dir: &Path) -> ServiceResult<PathBuf> {
        self.lock().begin(Call::Download {
            attachment: file.attachment.id,
        })?;

        let destination = unique_destination(dest_dir, &file.attachment.filename);
        let transport = |e: std::io::Error| ServiceError::Transport(e.to_string());
        match file.attachment.url.strip_prefix("file://") {
            Some(source) => {
                tokio::fs::copy(source, &destination).await.map_err(transport)?;
            }
            None => {
                tokio::fs::write(&destination, file.attachment.url.as_bytes())
                    .await
                    .map_err(transport)?;
            }
        }
        Ok(destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> (MemoryChatService, ChannelRef) {
        let service = MemoryChatService::new(Author { id: 1, name: "bot".into(), bot: true });
        let channel = ChannelRef { id: 100, guild_id: 10, name: "general".into() };
        service.add_guild(GuildRef { id: 10, name: "Lab".into() }, vec![channel.clone()]);
        (service, channel)
    }

    #[tokio::test]
    async fn test_history_is_newest_first_and_limited() {
        let (service, channel) = backend();
        let human = Author { id: 7, name: "ana".into(), bot: false };
        for i in 0..5 {
            service.post(channel.id, &human, &format!("m{i}"));
        }

        let history = service.fetch_history(&channel, 3).await.unwrap();
        let contents: Vec<_> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["m4", "m3", "m2"]);
        assert_eq!(service.calls(), vec![Call::FetchHistory { channel: 100, limit: 3 }]);
    }

    #[tokio::test]
    async fn test_fail_next_applies_once() {
        let (service, _) = backend();
        service.fail_next(ServiceError::Transport("offline".into()));

        assert!(service.list_guilds().await.is_err());
        assert_eq!(service.list_guilds().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_edit_rejects_foreign_messages() {
        let (service, channel) = backend();
        let human = Author { id: 7, name: "ana".into(), bot: false };
        let theirs = service.post(channel.id, &human, "hello");

        let err = service.edit_message(&theirs, "changed").await.unwrap_err();
        assert!(matches!(err, ServiceError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn test_download_copies_local_files() {
        let (service, channel) = backend();
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("notes.txt");
        std::fs::write(&source, "contents").unwrap();

        service.send_file(&channel, &source, None).await.unwrap();
        let files = service.list_recent_attachments(&channel, 10).await.unwrap();
        assert_eq!(files.len(), 1);

        let out = dir.path().join("out");
        std::fs::create_dir_all(&out).unwrap();
        let saved = service.download_attachment(&files[0], &out).await.unwrap();
        assert_eq!(std::fs::read_to_string(saved).unwrap(), "contents");
    }

    #[test]
    fn test_fixture_from_json() {
        let service = MemoryChatService::from_json(
            r#"{
                "bot": { "id": 5, "name": "bridge" },
                "guilds": [{ "id": 10, "name": "Lab" }],
                "channels": [{ "id": 100, "guild_id": 10, "name": "general" }]
            }"#,
        )
        .unwrap();
        assert_eq!(service.bot().name, "bridge");
        assert!(MemoryChatService::from_json("{ not json").is_err());
    }
}
