//! Terminal user interface.
//!
//! ```text
//! keys ─► View::handle_key ─► InputState::on_accept ─► Intent ─► runtime
//! bus events ─► View::render_event ─► log lines ─► renderer ─► terminal
//! ```
//!
//! # Modules
//!
//! - [`view`]: The [`View`], owner of the active input state
//! - [`states`]: The modal [`InputState`] machine
//! - [`keys`]: Key chords and merged bindings
//! - [`surface`]: Log buffer and line editor
//! - [`format`]: Message and list formatting
//! - [`preview`]: Image to half-block conversion
//! - [`renderer`]: ratatui drawing
//! - [`theme`]: Color schemes
//! - [`terminal`]: Raw mode and the keyboard reader thread

pub mod format;
pub mod keys;
pub mod preview;
pub mod renderer;
pub mod states;
pub mod surface;
pub mod terminal;
pub mod theme;
pub mod view;

pub use renderer::render;
pub use states::InputState;
pub use theme::Theme;
pub use view::{Focus, Intent, View};

use crate::app::{Bus, Session};
use crate::events::EventKind;

/// Event kinds the view renders.
const RENDERED: [EventKind; 21] = [
    EventKind::BotReady,
    EventKind::GuildsUpdated,
    EventKind::GuildSelected,
    EventKind::ChannelsUpdated,
    EventKind::ChannelSelected,
    EventKind::MessagesUpdated,
    EventKind::SelfMessagesUpdated,
    EventKind::FilesListUpdated,
    EventKind::MultilineInputRequested,
    EventKind::FileInputRequested,
    EventKind::EditInputRequested,
    EventKind::ImagePreviewRequested,
    EventKind::MessageSent,
    EventKind::FileSent,
    EventKind::MessageEdited,
    EventKind::MessageDeleted,
    EventKind::FileDownloaded,
    EventKind::IncomingMessage,
    EventKind::Error,
    EventKind::ShowText,
    EventKind::ClearDisplay,
];

/// Subscribes the view to every event it renders.
pub fn register(bus: &mut Bus) {
    for kind in RENDERED {
        bus.subscribe_sync(kind, |session: &mut Session, event| {
            session.view.render_event(session.service.state(), event);
            Ok(())
        });
    }
}
