//! The closed event taxonomy.
//!
//! Every message that travels over the [`EventBus`](super::EventBus) is an
//! [`Event`]. Its [`EventKind`] is derived from the variant, so a payload can
//! never be published under the wrong kind.
//!
//! # Groups
//!
//! - **Lifecycle**: `BotReady`
//! - **Selection**: `GuildsUpdated`, `GuildSelected`, `ChannelsUpdated`, `ChannelSelected`
//! - **Data**: `MessagesUpdated`, `SelfMessagesUpdated`, `FilesListUpdated`
//! - **Request with continuation**: `MultilineInputRequested`,
//!   `FileInputRequested`, `EditInputRequested`, `ImagePreviewRequested`
//! - **Request**: `MessageSendRequested`, `FileSendRequested`,
//!   `MessageEditRequested`, `MessageDeleteRequested`, `FileDownloadRequested`
//! - **Result**: `MessageSent`, `FileSent`, `MessageEdited`, `MessageDeleted`,
//!   `FileDownloaded`, `IncomingMessage`
//! - **Terminal**: `Error`, `ShowText`, `ClearDisplay`
//!
//! Data and selection events carry no snapshot of the data: by the time they
//! are published the service layer has already updated the
//! [`AppState`](crate::app::AppState), and subscribers read it from there.

use crate::domain::{IncomingMessage, Message};
use crate::ui::preview::PreviewArt;
use std::cell::RefCell;
use std::fmt;
use std::path::PathBuf;

/// Discriminant of an [`Event`], used as the subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    BotReady,
    GuildsUpdated,
    GuildSelected,
    ChannelsUpdated,
    ChannelSelected,
    MessagesUpdated,
    SelfMessagesUpdated,
    FilesListUpdated,
    MultilineInputRequested,
    FileInputRequested,
    EditInputRequested,
    ImagePreviewRequested,
    MessageSendRequested,
    FileSendRequested,
    MessageEditRequested,
    MessageDeleteRequested,
    FileDownloadRequested,
    MessageSent,
    FileSent,
    MessageEdited,
    MessageDeleted,
    FileDownloaded,
    IncomingMessage,
    Error,
    ShowText,
    ClearDisplay,
}

/// A one-shot callback that turns the result of an interactive workflow into
/// the next event to publish.
///
/// Returning `None` ends the workflow without publishing anything.
pub type Continuation<T> = Box<dyn FnOnce(T) -> Option<Event>>;

/// A continuation carried inside an event payload.
///
/// Handlers only see events by shared reference, so the continuation sits in
/// a `RefCell` and the first subscriber that calls [`Pending::take`] owns it.
/// Every later `take` returns `None`, which keeps the callback at-most-once.
pub struct Pending<T>(RefCell<Option<Continuation<T>>>);

impl<T> Pending<T> {
    /// Wraps a callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: FnOnce(T) -> Option<Event> + 'static,
    {
        Self(RefCell::new(Some(Box::new(callback))))
    }

    /// Removes the callback, leaving the slot empty.
    #[must_use]
    pub fn take(&self) -> Option<Continuation<T>> {
        self.0.borrow_mut().take()
    }

    /// Whether the callback is still waiting to be claimed.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.0.borrow().is_some()
    }
}

impl<T> fmt::Debug for Pending<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pending").field(&self.is_pending()).finish()
    }
}

/// Result of the two-phase file attach workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSubmission {
    pub path: String,
    /// `None` when the operator left the caption empty.
    pub caption: Option<String>,
}

/// Events published on the bus.
#[derive(Debug)]
pub enum Event {
    /// The gateway session is up.
    BotReady {
        /// Display name of the bot account.
        user: String,
    },
    /// `AppState::all_guilds` was refreshed.
    GuildsUpdated,
    /// A guild became current.
    GuildSelected { name: String },
    /// `AppState::available_channels` was refreshed.
    ChannelsUpdated,
    /// A channel became current.
    ChannelSelected { name: String },
    /// `AppState::recent_messages` was refreshed.
    MessagesUpdated,
    /// `AppState::recent_self_messages` was refreshed.
    SelfMessagesUpdated,
    /// `AppState::file_cache` was refreshed.
    FilesListUpdated,

    /// Switch the input to multi-line compose.
    MultilineInputRequested { on_complete: Pending<String> },
    /// Switch the input to the path/caption prompt.
    FileInputRequested {
        /// Path given on the command line; skips the path phase.
        initial_path: Option<String>,
        on_complete: Pending<FileSubmission>,
    },
    /// Switch the input to edit an existing message.
    EditInputRequested {
        original: String,
        on_complete: Pending<String>,
    },
    /// Show a downloaded image in place of the log.
    ImagePreviewRequested {
        path: PathBuf,
        /// Converted cells, or why conversion failed.
        art: Result<PreviewArt, String>,
    },

    /// Send plain text to the current channel.
    MessageSendRequested { text: String },
    /// Upload a local file to the current channel.
    FileSendRequested {
        path: String,
        caption: Option<String>,
    },
    /// Replace the content of a cached self message (1-based index).
    MessageEditRequested { index: usize, text: String },
    /// Delete a cached self message (1-based index).
    MessageDeleteRequested { index: usize },
    /// Download a cached file (1-based index).
    FileDownloadRequested { index: usize },

    MessageSent { message: Message },
    FileSent { message: Message, file_name: String },
    MessageEdited { message: Message },
    MessageDeleted { message: Message },
    FileDownloaded { path: PathBuf },
    /// A message pushed by the gateway.
    IncomingMessage(IncomingMessage),

    /// A user-facing failure.
    Error { message: String },
    /// Informational text for the log.
    ShowText { text: String },
    /// Clear the log pane.
    ClearDisplay,
}

impl Event {
    /// Builds an [`Event::Error`] from anything printable.
    pub fn error(message: impl fmt::Display) -> Self {
        Self::Error {
            message: message.to_string(),
        }
    }

    /// Builds an [`Event::ShowText`].
    pub fn text(text: impl Into<String>) -> Self {
        Self::ShowText { text: text.into() }
    }

    /// The subscription key of this event.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::BotReady { .. } => EventKind::BotReady,
            Self::GuildsUpdated => EventKind::GuildsUpdated,
            Self::GuildSelected { .. } => EventKind::GuildSelected,
            Self::ChannelsUpdated => EventKind::ChannelsUpdated,
            Self::ChannelSelected { .. } => EventKind::ChannelSelected,
            Self::MessagesUpdated => EventKind::MessagesUpdated,
            Self::SelfMessagesUpdated => EventKind::SelfMessagesUpdated,
            Self::FilesListUpdated => EventKind::FilesListUpdated,
            Self::MultilineInputRequested { .. } => EventKind::MultilineInputRequested,
            Self::FileInputRequested { .. } => EventKind::FileInputRequested,
            Self::EditInputRequested { .. } => EventKind::EditInputRequested,
            Self::ImagePreviewRequested { .. } => EventKind::ImagePreviewRequested,
            Self::MessageSendRequested { .. } => EventKind::MessageSendRequested,
            Self::FileSendRequested { .. } => EventKind::FileSendRequested,
            Self::MessageEditRequested { .. } => EventKind::MessageEditRequested,
            Self::MessageDeleteRequested { .. } => EventKind::MessageDeleteRequested,
            Self::FileDownloadRequested { .. } => EventKind::FileDownloadRequested,
            Self::MessageSent { .. } => EventKind::MessageSent,
            Self::FileSent { .. } => EventKind::FileSent,
            Self::MessageEdited { .. } => EventKind::MessageEdited,
            Self::MessageDeleted { .. } => EventKind::MessageDeleted,
            Self::FileDownloaded { .. } => EventKind::FileDownloaded,
            Self::IncomingMessage(_) => EventKind::IncomingMessage,
            Self::Error { .. } => EventKind::Error,
            Self::ShowText { .. } => EventKind::ShowText,
            Self::ClearDisplay => EventKind::ClearDisplay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_is_taken_once() {
        let pending = Pending::new(|text: String| Some(Event::MessageSendRequested { text }));
        assert!(pending.is_pending());

        let callback = pending.take();
        assert!(callback.is_some());
        assert!(pending.take().is_none());
        assert!(!pending.is_pending());
    }

    #[test]
    fn test_kind_matches_variant() {
        assert_eq!(Event::error("boom").kind(), EventKind::Error);
        assert_eq!(Event::text("hi").kind(), EventKind::ShowText);
        let ev = Event::FileInputRequested {
            initial_path: None,
            on_complete: Pending::new(|_| None),
        };
        assert_eq!(ev.kind(), EventKind::FileInputRequested);
    }
}
