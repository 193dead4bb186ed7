//! Service layer: the chat platform seam and the owner of [`AppState`].
//!
//! # Organization
//!
//! - [`chat`]: The [`ChatService`] trait and gateway [`Notification`]s
//! - [`layer`]: [`ServiceLayer`], the single writer of [`AppState`]
//! - [`resolve`]: Index / id / name resolution with fuzzy suggestions
//! - [`memory`]: In-process backend for tests and offline runs
//!
//! The request events (`MessageSendRequested`, `FileSendRequested`,
//! `MessageEditRequested`, `MessageDeleteRequested`, `FileDownloadRequested`)
//! are handled here; see [`register`].
//!
//! [`AppState`]: crate::app::AppState

pub mod chat;
pub mod layer;
pub mod memory;
pub mod resolve;

pub use chat::{unique_destination, ChatService, Notification, ServiceResult};
pub use layer::{ServiceLayer, AUTO_READ_LIMIT};
pub use memory::{Call, Fixture, MemoryChatService};

use crate::app::{Bus, Session};
use crate::domain::Result;
use crate::events::{Event, EventKind, HandlerFuture};
use tracing::Instrument;

/// Publishes the event a service call produced, or its failure as an
/// `Error` event.
///
/// Returns whether the call succeeded, so callers can chain follow-up work.
///
/// # Errors
///
/// Only handler failures raised while publishing.
pub async fn publish_outcome(bus: &Bus, session: &mut Session, outcome: ServiceResult<Event>) -> Result<bool> {
    match outcome {
        Ok(event) => {
            bus.publish(session, event).await?;
            Ok(true)
        }
        Err(err) => {
            tracing::warn!(error = %err, "service call failed");
            bus.publish(session, Event::error(err)).await?;
            Ok(false)
        }
    }
}

/// Subscribes the service layer to the request events.
pub fn register(bus: &mut Bus) {
    bus.subscribe(EventKind::MessageSendRequested, on_send_requested);
    bus.subscribe(EventKind::FileSendRequested, on_file_send_requested);
    bus.subscribe(EventKind::MessageEditRequested, on_edit_requested);
    bus.subscribe(EventKind::MessageDeleteRequested, on_delete_requested);
    bus.subscribe(EventKind::FileDownloadRequested, on_download_requested);
}

fn on_send_requested<'a>(bus: &'a Bus, session: &'a mut Session, event: &'a Event) -> HandlerFuture<'a> {
    Box::pin(async move {
        let Event::MessageSendRequested { text } = event else {
            return Ok(());
        };
        let outcome = session
            .service
            .send_message(text)
            .instrument(tracing::debug_span!("send_message", len = text.len()))
            .await;
        publish_outcome(bus, session, outcome).await.map(drop)
    })
}

fn on_file_send_requested<'a>(bus: &'a Bus, session: &'a mut Session, event: &'a Event) -> HandlerFuture<'a> {
    Box::pin(async move {
        let Event::FileSendRequested { path, caption } = event else {
            return Ok(());
        };
        let expanded = crate::infrastructure::expand_tilde(path);
        let outcome = session
            .service
            .send_file(&expanded, caption.as_deref())
            .instrument(tracing::debug_span!("send_file", path = %expanded.display()))
            .await;
        publish_outcome(bus, session, outcome).await.map(drop)
    })
}

fn on_edit_requested<'a>(bus: &'a Bus, session: &'a mut Session, event: &'a Event) -> HandlerFuture<'a> {
    Box::pin(async move {
        let Event::MessageEditRequested { index, text } = event else {
            return Ok(());
        };
        let outcome = session
            .service
            .edit_message(*index, text)
            .instrument(tracing::debug_span!("edit_message", index))
            .await;
        publish_outcome(bus, session, outcome).await.map(drop)
    })
}

fn on_delete_requested<'a>(bus: &'a Bus, session: &'a mut Session, event: &'a Event) -> HandlerFuture<'a> {
    Box::pin(async move {
        let Event::MessageDeleteRequested { index } = event else {
            return Ok(());
        };
        let outcome = session
            .service
            .delete_message(*index)
            .instrument(tracing::debug_span!("delete_message", index))
            .await;
        publish_outcome(bus, session, outcome).await.map(drop)
    })
}

fn on_download_requested<'a>(bus: &'a Bus, session: &'a mut Session, event: &'a Event) -> HandlerFuture<'a> {
    Box::pin(async move {
        let Event::FileDownloadRequested { index } = event else {
            return Ok(());
        };
        let outcome = session
            .service
            .download_file(*index)
            .instrument(tracing::debug_span!("download_file", index))
            .await;
        publish_outcome(bus, session, outcome).await.map(drop)
    })
}
