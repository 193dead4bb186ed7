//! Mapping between serenity models and domain types.

use crate::domain::models::{render_mentions, MentionNames};
use crate::domain::{Attachment, Author, ChannelRef, Message, ServiceError};
use chrono::{DateTime, Utc};
use serenity::all::{Cache, ChannelType, GuildChannel, GuildId, Message as DiscordMessage};

/// Messages per history request; the API maximum.
pub const PAGE_SIZE: u16 = 100;

/// Splits a scan of `scan_limit` messages into API-sized pages.
pub fn page_sizes(scan_limit: u16) -> impl Iterator<Item = u8> {
    let full = scan_limit / PAGE_SIZE;
    let rest = scan_limit % PAGE_SIZE;
    std::iter::repeat(PAGE_SIZE)
        .take(usize::from(full))
        .chain((rest > 0).then_some(rest))
        .map(|n| u8::try_from(n).unwrap_or(u8::MAX))
}

/// Text channels of a guild in sidebar order.
pub fn text_channels(guild_id: GuildId, channels: impl IntoIterator<Item = GuildChannel>) -> Vec<ChannelRef> {
    let mut text: Vec<GuildChannel> = channels
        .into_iter()
        .filter(|c| matches!(c.kind, ChannelType::Text | ChannelType::News))
        .collect();
    text.sort_by_key(|c| (c.position, c.id));
    text.into_iter()
        .map(|c| ChannelRef {
            id: c.id.get(),
            guild_id: guild_id.get(),
            name: c.name,
        })
        .collect()
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

/// Names for the mentions in `message`, from the message itself and the
/// guild cache.
///
/// Never holds a cache reference past the call.
pub fn mention_names(message: &DiscordMessage, cache: &Cache) -> MentionNames {
    let mut names = MentionNames {
        users: message.mentions.iter().map(|u| (u.id.get(), u.name.clone())).collect(),
        ..MentionNames::default()
    };
    if let Some(guild) = message.guild_id.and_then(|id| cache.guild(id)) {
        names.roles = message
            .mention_roles
            .iter()
            .filter_map(|id| guild.roles.get(id).map(|r| (id.get(), r.name.clone())))
            .collect();
        names.channels = guild.channels.values().map(|c| (c.id.get(), c.name.clone())).collect();
    }
    names
}

pub fn to_message(message: &DiscordMessage, cache: &Cache) -> Message {
    let names = mention_names(message, cache);
    Message {
        id: message.id.get(),
        channel_id: message.channel_id.get(),
        guild_id: message.guild_id.map(GuildId::get),
        author: Author {
            id: message.author.id.get(),
            name: message.author.name.clone(),
            bot: message.author.bot,
        },
        content: render_mentions(&message.content, &names),
        timestamp: timestamp(message.timestamp.unix_timestamp()),
        attachments: message
            .attachments
            .iter()
            .map(|a| Attachment {
                id: a.id.get(),
                filename: a.filename.clone(),
                size: u64::from(a.size),
                url: a.url.clone(),
                content_type: a.content_type.clone(),
            })
            .collect(),
    }
}

/// Classifies a serenity failure.
///
/// HTTP 403 and 404 map to [`ServiceError::PermissionDenied`] and
/// [`ServiceError::NotFound`]; everything else is a transport failure.
pub fn classify(err: &serenity::Error, what: &'static str, token: impl ToString) -> ServiceError {
    let status = match err {
        serenity::Error::Http(http) => http.status_code().map(|s| s.as_u16()),
        _ => None,
    };
    match status {
        Some(403) => ServiceError::PermissionDenied(format!("{what} {}: {err}", token.to_string())),
        Some(404) => ServiceError::NotFound {
            what,
            token: token.to_string(),
            suggestion: None,
        },
        Some(code) if (400..500).contains(&code) => ServiceError::Rejected(err.to_string()),
        _ => ServiceError::Transport(err.to_string()),
    }
}
