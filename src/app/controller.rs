//! Slash command handling.
//!
//! [`Controller::handle_command`] validates the argument, calls the service
//! layer, and publishes the outcome. Validation failures and unknown commands
//! become `Error` events; they never abort the loop. Commands that need more
//! input (`/multiline`, `/attach`, `/edit`) publish an `*InputRequested`
//! event carrying a continuation and return at once.

use super::commands::{self, CommandAction};
use super::session::{Bus, Session};
use crate::domain::{BridgeError, Result};
use crate::events::{Event, FileSubmission, Pending};
use crate::service::{publish_outcome, AUTO_READ_LIMIT};
use std::collections::HashMap;

/// Default `/read` count.
pub const DEFAULT_READ: u16 = 20;
/// Upper bound for `/read` and `/self_messages`.
pub const MAX_READ: u16 = 100;
/// Default number of messages `/self_messages` scans.
pub const DEFAULT_SELF_SCAN: u16 = 50;
/// Default number of messages `/files` scans.
pub const DEFAULT_FILE_SCAN: u16 = 50;
/// Upper bound for `/files`.
pub const MAX_FILE_SCAN: u16 = 200;

/// Parses an optional count in `1..=max`, falling back to `default`.
///
/// # Errors
///
/// [`BridgeError::Validation`] for non-numbers and out-of-range values.
pub fn parse_count(arg: &str, default: u16, max: u16) -> Result<u16> {
    let arg = arg.trim();
    if arg.is_empty() {
        return Ok(default);
    }
    let value: i64 = arg
        .parse()
        .map_err(|_| BridgeError::Validation(format!("'{arg}' is not a number")))?;
    u16::try_from(value)
        .ok()
        .filter(|v| (1..=max).contains(v))
        .ok_or_else(|| BridgeError::Validation(format!("Count must be between 1 and {max}, got {value}")))
}

/// Parses a required 1-based list index.
///
/// # Errors
///
/// [`BridgeError::Validation`] with `usage` when missing, or when not a
/// positive integer.
pub fn parse_index(arg: &str, usage: &str) -> Result<usize> {
    let arg = arg.trim();
    if arg.is_empty() {
        return Err(BridgeError::Validation(format!("Usage: {usage}")));
    }
    arg.parse::<usize>()
        .ok()
        .filter(|i| *i >= 1)
        .ok_or_else(|| BridgeError::Validation(format!("'{arg}' is not a valid index (1, 2, ...)")))
}

/// Splits `/attach` arguments into a path and a caption.
///
/// The path is either double-quoted or the first whitespace-free word.
#[must_use]
pub fn split_attach_args(arg: &str) -> (Option<String>, Option<String>) {
    let arg = arg.trim();
    if arg.is_empty() {
        return (None, None);
    }
    let (path, rest) = match arg.strip_prefix('"') {
        Some(quoted) => quoted.split_once('"').unwrap_or((quoted, "")),
        None => arg.split_once(char::is_whitespace).unwrap_or((arg, "")),
    };
    let caption = rest.trim();
    (
        Some(path.to_string()).filter(|p| !p.is_empty()),
        (!caption.is_empty()).then(|| caption.to_string()),
    )
}

/// Maps command tokens to handlers.
#[derive(Debug)]
pub struct Controller {
    table: HashMap<&'static str, CommandAction>,
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

impl Controller {
    #[must_use]
    pub fn new() -> Self {
        let table = commands::COMMANDS
            .iter()
            .flat_map(|c| [(c.name, c.action), (c.alias, c.action)])
            .collect();
        Self { table }
    }

    /// Runs one slash command. Returns `true` when the operator asked to quit.
    ///
    /// # Errors
    ///
    /// Only handler failures raised while publishing; command problems are
    /// reported as `Error` events.
    pub async fn handle_command(&self, bus: &Bus, session: &mut Session, command: &str, arg: &str) -> Result<bool> {
        let token = command.trim().trim_start_matches('/').to_lowercase();
        let Some(action) = self.table.get(token.as_str()).copied() else {
            tracing::debug!(command = %token, "unknown command");
            let message = format!("Unknown command: /{token}. Type /help for a list of commands.");
            bus.publish(session, Event::error(message)).await?;
            return Ok(false);
        };

        tracing::debug!(?action, arg, "handling command");
        match self.run(bus, session, action, arg).await {
            Ok(quit) => Ok(quit),
            Err(BridgeError::Validation(message)) => {
                bus.publish(session, Event::error(message)).await?;
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    #[allow(clippy::too_many_lines)]
    async fn run(&self, bus: &Bus, session: &mut Session, action: CommandAction, arg: &str) -> Result<bool> {
        match action {
            CommandAction::Help => bus.publish(session, Event::text(commands::help_text())).await?,
            CommandAction::ListGuilds => {
                let outcome = session.service.refresh_guilds().await;
                publish_outcome(bus, session, outcome).await?;
            }
            CommandAction::SetGuild => {
                let token = required(arg, "/setguild <index|id|name>")?;
                let outcome = session.service.select_guild(token).await;
                if publish_outcome(bus, session, outcome).await? {
                    bus.publish(session, Event::ChannelsUpdated).await?;
                }
            }
            CommandAction::ListChannels => {
                let outcome = session.service.refresh_channels().await;
                publish_outcome(bus, session, outcome).await?;
            }
            CommandAction::SetChannel => {
                let token = required(arg, "/setchannel <index|id|name>")?;
                let outcome = session.service.select_channel(token);
                if publish_outcome(bus, session, outcome).await? {
                    let outcome = session.service.fetch_recent_messages(AUTO_READ_LIMIT).await;
                    publish_outcome(bus, session, outcome).await?;
                }
            }
            CommandAction::Read => {
                let limit = narrow(parse_count(arg, DEFAULT_READ, MAX_READ)?);
                let outcome = session.service.fetch_recent_messages(limit).await;
                publish_outcome(bus, session, outcome).await?;
            }
            CommandAction::SelfMessages => {
                let limit = narrow(parse_count(arg, DEFAULT_SELF_SCAN, MAX_READ)?);
                let outcome = session.service.fetch_self_messages(limit).await;
                publish_outcome(bus, session, outcome).await?;
            }
            CommandAction::Delete => {
                let index = parse_index(arg, "/delete <index> (see /self_messages)")?;
                bus.publish(session, Event::MessageDeleteRequested { index }).await?;
            }
            CommandAction::Edit => {
                let index = parse_index(arg, "/edit <index> (see /self_messages)")?;
                let Some(message) = session.service.state().self_message(index) else {
                    let len = session.service.state().recent_self_messages().len();
                    return Err(BridgeError::Validation(format!(
                        "No self message #{index} ({len} listed). Run /self_messages first."
                    )));
                };
                let event = Event::EditInputRequested {
                    original: message.content.clone(),
                    on_complete: Pending::new(move |text: String| Some(Event::MessageEditRequested { index, text })),
                };
                bus.publish(session, event).await?;
            }
            CommandAction::Multiline => {
                require_channel(session)?;
                let event = Event::MultilineInputRequested {
                    on_complete: Pending::new(|text: String| {
                        if text.trim().is_empty() {
                            Some(Event::text("Nothing to send."))
                        } else {
                            Some(Event::MessageSendRequested { text })
                        }
                    }),
                };
                bus.publish(session, event).await?;
            }
            CommandAction::Attach => {
                require_channel(session)?;
                match split_attach_args(arg) {
                    (Some(path), Some(caption)) => {
                        let event = Event::FileSendRequested { path, caption: Some(caption) };
                        bus.publish(session, event).await?;
                    }
                    (initial_path, _) => {
                        let event = Event::FileInputRequested {
                            initial_path,
                            on_complete: Pending::new(|FileSubmission { path, caption }| {
                                Some(Event::FileSendRequested { path, caption })
                            }),
                        };
                        bus.publish(session, event).await?;
                    }
                }
            }
            CommandAction::Files => {
                let scan = parse_count(arg, DEFAULT_FILE_SCAN, MAX_FILE_SCAN)?;
                bus.publish(session, Event::text(format!("Scanning the last {scan} messages for files..."))).await?;
                let outcome = session.service.fetch_files(scan).await;
                publish_outcome(bus, session, outcome).await?;
            }
            CommandAction::Download => {
                let index = parse_index(arg, "/download <index> (see /files)")?;
                bus.publish(session, Event::FileDownloadRequested { index }).await?;
            }
            CommandAction::Preview => {
                let index = parse_index(arg, "/preview <index> (see /files)")?;
                let outcome = session.service.prepare_preview(index).await;
                publish_outcome(bus, session, outcome).await?;
            }
            CommandAction::Clear => bus.publish(session, Event::ClearDisplay).await?,
            CommandAction::Quit => {
                bus.publish(session, Event::text("Shutting down...")).await?;
                return Ok(true);
            }
        }
        Ok(false)
    }
}

fn required<'a>(arg: &'a str, usage: &str) -> Result<&'a str> {
    let arg = arg.trim();
    if arg.is_empty() {
        Err(BridgeError::Validation(format!("Usage: {usage}")))
    } else {
        Ok(arg)
    }
}

fn require_channel(session: &Session) -> Result<()> {
    if session.service.state().current_channel().is_some() {
        Ok(())
    } else {
        Err(BridgeError::Validation("No channel selected. Use /setchannel first.".to_string()))
    }
}

/// Counts validated against `MAX_READ` always fit a `u8`.
fn narrow(count: u16) -> u8 {
    u8::try_from(count).unwrap_or(u8::MAX)
}
