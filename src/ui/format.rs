//! Log line model and text formatting.
//!
//! The view never stores ratatui types: a [`LogLine`] is a list of
//! [`Segment`]s tagged with a [`Tone`], and the renderer maps tones to theme
//! colors at draw time. This keeps formatting testable without a terminal.

use crate::domain::{Attachment, ChannelRef, FileRef, GuildRef, Message, Snowflake};
use chrono::{DateTime, FixedOffset, Local, Utc};

/// Display format for message timestamps.
const TIMESTAMP_FORMAT: &str = "%m/%d %H:%M:%S";

/// Semantic style class of a piece of log text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Plain,
    Info,
    Error,
    Timestamp,
    Author,
    OwnAuthor,
    Attachment,
    Notice,
    Banner,
    Dim,
}

/// A run of text with one tone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub tone: Tone,
    pub text: String,
}

/// One row of the log pane (before wrapping).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogLine {
    pub segments: Vec<Segment>,
}

impl LogLine {
    /// A line made of a single segment.
    pub fn tone(tone: Tone, text: impl Into<String>) -> Self {
        Self::default().push(tone, text)
    }

    /// Appends a segment.
    #[must_use]
    pub fn push(mut self, tone: Tone, text: impl Into<String>) -> Self {
        self.segments.push(Segment { tone, text: text.into() });
        self
    }

    /// The line's text without styling.
    #[must_use]
    pub fn plain_text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }
}

/// Converts platform timestamps to the operator's wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct Clock {
    offset: Option<FixedOffset>,
}

impl Clock {
    /// Uses a fixed UTC offset instead of the system time zone.
    ///
    /// Offsets outside -23..=23 hours fall back to the system time zone.
    #[must_use]
    pub fn with_offset_hours(hours: Option<i32>) -> Self {
        let offset = hours.and_then(|h| FixedOffset::east_opt(h * 3600));
        Self { offset }
    }

    /// Formats `ts` as `MM/DD HH:MM:SS`.
    #[must_use]
    pub fn stamp(&self, ts: DateTime<Utc>) -> String {
        match self.offset {
            Some(offset) => ts.with_timezone(&offset).format(TIMESTAMP_FORMAT).to_string(),
            None => ts.with_timezone(&Local).format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}

/// Human readable byte count.
///
/// # Example
///
/// ```
/// use chatbridge::ui::format::format_size;
///
/// assert_eq!(format_size(512), "512 B");
/// assert_eq!(format_size(2048), "2.0 KB");
/// assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
/// ```
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

fn attachment_line(attachment: &Attachment) -> LogLine {
    LogLine::tone(Tone::Dim, "  ").push(
        Tone::Attachment,
        format!("[file] {} ({})", attachment.filename, format_size(attachment.size)),
    )
}

/// Formats a chat message: a header line with the first content line, then
/// any further content lines and one line per attachment.
#[must_use]
pub fn message_lines(message: &Message, clock: &Clock, bot_id: Option<Snowflake>) -> Vec<LogLine> {
    let author_tone = if Some(message.author.id) == bot_id {
        Tone::OwnAuthor
    } else {
        Tone::Author
    };
    let mut content = message.content.lines();
    let first = content.next().unwrap_or_default();

    let mut lines = vec![LogLine::tone(Tone::Timestamp, format!("[{}] ", clock.stamp(message.timestamp)))
        .push(author_tone, message.author.name.clone())
        .push(Tone::Plain, format!(": {first}"))];
    lines.extend(content.map(|line| LogLine::tone(Tone::Plain, format!("    {line}"))));
    lines.extend(message.attachments.iter().map(attachment_line));
    lines
}

/// Numbered guild list with the current one starred.
#[must_use]
pub fn guild_lines(guilds: &[GuildRef], current: Option<&GuildRef>) -> Vec<LogLine> {
    if guilds.is_empty() {
        return vec![LogLine::tone(Tone::Info, "The bot is not a member of any guild.")];
    }
    let mut lines = vec![LogLine::tone(Tone::Banner, "--- Guilds ---")];
    lines.extend(guilds.iter().enumerate().map(|(i, guild)| {
        let marker = if current.is_some_and(|c| c.id == guild.id) { "*" } else { " " };
        LogLine::tone(Tone::Plain, format!("{marker}{:>3}. {}", i + 1, guild.name))
            .push(Tone::Dim, format!("  ({})", guild.id))
    }));
    lines
}

/// Numbered channel list with the current one starred.
#[must_use]
pub fn channel_lines(guild: Option<&GuildRef>, channels: &[ChannelRef], current: Option<&ChannelRef>) -> Vec<LogLine> {
    let guild_name = guild.map_or("current guild", |g| g.name.as_str());
    if channels.is_empty() {
        return vec![LogLine::tone(Tone::Info, format!("No text channels in {guild_name}."))];
    }
    let mut lines = vec![LogLine::tone(Tone::Banner, format!("--- Channels in {guild_name} ---"))];
    lines.extend(channels.iter().enumerate().map(|(i, channel)| {
        let marker = if current.is_some_and(|c| c.id == channel.id) { "*" } else { " " };
        LogLine::tone(Tone::Plain, format!("{marker}{:>3}. #{}", i + 1, channel.name))
            .push(Tone::Dim, format!("  ({})", channel.id))
    }));
    lines
}

/// Numbered list of the bot's own messages, for `/delete` and `/edit`.
#[must_use]
pub fn self_message_lines(messages: &[Message], clock: &Clock) -> Vec<LogLine> {
    if messages.is_empty() {
        return vec![LogLine::tone(Tone::Info, "No recent messages from the bot in this channel.")];
    }
    let mut lines = vec![LogLine::tone(Tone::Banner, "--- Your recent messages ---")];
    for (i, message) in messages.iter().enumerate() {
        let preview = message.content.lines().next().unwrap_or_default();
        let mut line = LogLine::tone(Tone::Plain, format!("{:>3}. ", i + 1))
            .push(Tone::Timestamp, format!("[{}] ", clock.stamp(message.timestamp)))
            .push(Tone::Plain, preview.to_string());
        if !message.attachments.is_empty() {
            line = line.push(Tone::Attachment, format!(" (+{} file(s))", message.attachments.len()));
        }
        lines.push(line);
    }
    lines
}

/// Numbered attachment list, for `/download` and `/preview`.
#[must_use]
pub fn file_lines(files: &[FileRef], clock: &Clock) -> Vec<LogLine> {
    if files.is_empty() {
        return vec![LogLine::tone(Tone::Info, "No attachments found.")];
    }
    let mut lines = vec![LogLine::tone(Tone::Banner, "--- Files ---")];
    lines.extend(files.iter().enumerate().map(|(i, file)| {
        LogLine::tone(Tone::Plain, format!("{:>3}. ", i + 1))
            .push(Tone::Attachment, file.attachment.filename.clone())
            .push(Tone::Dim, format!(" ({})", format_size(file.attachment.size)))
            .push(Tone::Plain, format!(" by {} at {}", file.author, clock.stamp(file.posted_at)))
    }));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Author;
    use chrono::TimeZone;

    fn message(content: &str, attachments: Vec<Attachment>) -> Message {
        Message {
            id: 1,
            channel_id: 2,
            guild_id: Some(3),
            author: Author { id: 9, name: "ana".to_string(), bot: false },
            content: content.to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 5, 6, 7, 8).unwrap(),
            attachments,
        }
    }

    #[test]
    fn test_clock_applies_fixed_offset() {
        let clock = Clock::with_offset_hours(Some(9));
        let ts = Utc.with_ymd_and_hms(2024, 12, 31, 20, 0, 0).unwrap();
        assert_eq!(clock.stamp(ts), "01/01 05:00:00");
    }

    #[test]
    fn test_message_lines_layout() {
        let attachment = Attachment {
            id: 4,
            filename: "plot.png".to_string(),
            size: 1536,
            url: "https://cdn.example/plot.png".to_string(),
            content_type: None,
        };
        let clock = Clock::with_offset_hours(Some(0));
        let lines = message_lines(&message("hello\nworld", vec![attachment]), &clock, None);

        let text: Vec<_> = lines.iter().map(LogLine::plain_text).collect();
        assert_eq!(text[0], "[03/05 06:07:08] ana: hello");
        assert_eq!(text[1], "    world");
        assert_eq!(text[2], "  [file] plot.png (1.5 KB)");
    }

    #[test]
    fn test_own_messages_use_own_author_tone() {
        let clock = Clock::default();
        let lines = message_lines(&message("hi", vec![]), &clock, Some(9));
        assert!(lines[0].segments.iter().any(|s| s.tone == Tone::OwnAuthor));
    }

    #[test]
    fn test_guild_list_marks_current() {
        let guilds = vec![
            GuildRef { id: 1, name: "alpha".to_string() },
            GuildRef { id: 2, name: "beta".to_string() },
        ];
        let lines = guild_lines(&guilds, Some(&guilds[1]));
        assert_eq!(lines[1].plain_text(), "   1. alpha  (1)");
        assert_eq!(lines[2].plain_text(), "*  2. beta  (2)");
    }

    #[test]
    fn test_format_size_boundaries() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1024 * 1024), "1.0 MB");
    }
}
