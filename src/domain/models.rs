//! Chat platform entities as the console sees them.
//!
//! These are opaque handles to external entities: the console never builds a
//! guild or a channel itself, it only receives them from a
//! [`ChatService`](crate::service::ChatService) and hands them back. All
//! types derive `Serialize`/`Deserialize` so the in-memory backend can be
//! seeded from a JSON fixture.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Platform identifier (a Discord snowflake).
pub type Snowflake = u64;

/// A server (guild) the bot is a member of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildRef {
    pub id: Snowflake,
    pub name: String,
}

/// A text channel inside a guild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRef {
    pub id: Snowflake,
    pub guild_id: Snowflake,
    pub name: String,
}

/// Author of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: Snowflake,
    pub name: String,
    #[serde(default)]
    pub bot: bool,
}

/// A file attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: Snowflake,
    pub filename: String,
    /// Size in bytes.
    pub size: u64,
    pub url: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

impl Attachment {
    /// Whether the attachment looks like an image that can be previewed.
    ///
    /// Uses the declared content type when present and falls back to the
    /// file extension.
    #[must_use]
    pub fn is_image(&self) -> bool {
        if let Some(content_type) = &self.content_type {
            return content_type.starts_with("image/");
        }
        let lower = self.filename.to_lowercase();
        [".png", ".jpg", ".jpeg", ".gif", ".webp", ".bmp"]
            .iter()
            .any(|ext| lower.ends_with(ext))
    }
}

/// A chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    pub author: Author,
    /// Content with mentions already rendered as `@name` / `#name`.
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// An attachment found while scanning a channel's history.
///
/// Carries enough of the owning message to be listed and downloaded later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub attachment: Attachment,
    pub message_id: Snowflake,
    pub author: String,
    pub posted_at: DateTime<Utc>,
}

impl FileRef {
    /// Builds file references for every attachment of a message.
    #[must_use]
    pub fn from_message(message: &Message) -> Vec<Self> {
        message
            .attachments
            .iter()
            .map(|attachment| Self {
                attachment: attachment.clone(),
                message_id: message.id,
                author: message.author.name.clone(),
                posted_at: message.timestamp,
            })
            .collect()
    }
}

/// A message pushed by the gateway, with the names needed to describe where
/// it arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub message: Message,
    pub guild_name: Option<String>,
    pub channel_name: Option<String>,
}

/// Names known for the ids that may appear in a message body.
///
/// Used by [`render_mentions`].
#[derive(Debug, Default, Clone)]
pub struct MentionNames {
    pub users: Vec<(Snowflake, String)>,
    pub roles: Vec<(Snowflake, String)>,
    pub channels: Vec<(Snowflake, String)>,
}

/// Replaces raw mention markup with readable names.
///
/// `<@id>` and `<@!id>` become `@user`, `<@&id>` becomes `@role`, and `<#id>`
/// becomes `#channel`. Unknown ids are left untouched.
///
/// # Example
///
/// ```
/// use chatbridge::domain::models::{render_mentions, MentionNames};
///
/// let names = MentionNames {
///     users: vec![(42, "ferris".to_string())],
///     channels: vec![(7, "general".to_string())],
///     ..Default::default()
/// };
/// assert_eq!(render_mentions("hi <@!42> see <#7>", &names), "hi @ferris see #general");
/// ```
#[must_use]
pub fn render_mentions(content: &str, names: &MentionNames) -> String {
    let mut out = content.to_string();
    for (id, name) in &names.users {
        out = out
            .replace(&format!("<@{id}>"), &format!("@{name}"))
            .replace(&format!("<@!{id}>"), &format!("@{name}"));
    }
    for (id, name) in &names.roles {
        out = out.replace(&format!("<@&{id}>"), &format!("@{name}"));
    }
    for (id, name) in &names.channels {
        out = out.replace(&format!("<#{id}>"), &format!("#{name}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment(name: &str, content_type: Option<&str>) -> Attachment {
        Attachment {
            id: 1,
            filename: name.to_string(),
            size: 10,
            url: format!("https://cdn.example/{name}"),
            content_type: content_type.map(String::from),
        }
    }

    #[test]
    fn test_is_image_prefers_content_type() {
        assert!(attachment("blob", Some("image/png")).is_image());
        assert!(!attachment("photo.png", Some("application/octet-stream")).is_image());
        assert!(attachment("PHOTO.JPG", None).is_image());
        assert!(!attachment("notes.txt", None).is_image());
    }

    #[test]
    fn test_render_mentions_leaves_unknown_ids() {
        let names = MentionNames {
            roles: vec![(5, "mods".to_string())],
            ..Default::default()
        };
        assert_eq!(render_mentions("<@&5> and <@9>", &names), "@mods and <@9>");
    }

    #[test]
    fn test_file_refs_from_message() {
        let message = Message {
            id: 11,
            channel_id: 2,
            guild_id: Some(1),
            author: Author { id: 3, name: "ana".to_string(), bot: false },
            content: String::new(),
            timestamp: Utc::now(),
            attachments: vec![attachment("a.png", None), attachment("b.txt", None)],
        };
        let refs = FileRef::from_message(&message);
        assert_eq!(refs.len(), 2);
        assert!(refs.iter().all(|f| f.message_id == 11 && f.author == "ana"));
    }
}
