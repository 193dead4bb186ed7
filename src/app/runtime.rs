//! The application loop.
//!
//! [`App`] owns the bus, the controller and the [`Session`] and is the only
//! place where terminal input and gateway notifications meet. Everything runs
//! on the calling task:
//!
//! ```text
//! terminal thread ──► inputs ────────┐
//!                                     ├─► select! ──► View / Controller ──► Bus ──► handlers
//! serenity tasks ──► notifications ──┘
//! ```
//!
//! A handler error never ends the session. It is logged and shown in the
//! console, and the loop keeps reading input.

use super::controller::Controller;
use super::session::{Bus, Session};
use crate::domain::{BridgeError, Result};
use crate::events::Event;
use crate::service::{Notification, ServiceLayer};
use crate::ui::terminal::TerminalInput;
use crate::ui::{Intent, Theme, View};
use crossterm::event::KeyEvent;
use ratatui::backend::Backend;
use ratatui::Terminal;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::Instrument;

/// The assembled console.
pub struct App {
    bus: Bus,
    controller: Controller,
    session: Session,
    theme: Theme,
}

impl App {
    /// Wires the service layer and the view to a fresh bus.
    #[must_use]
    pub fn new(service: ServiceLayer, view: View, theme: Theme) -> Self {
        let mut bus = Bus::new();
        crate::service::register(&mut bus);
        crate::ui::register(&mut bus);
        tracing::debug!(?bus, "bus wired");

        Self {
            bus,
            controller: Controller::new(),
            session: Session::new(service, view),
            theme,
        }
    }

    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub const fn theme(&self) -> &Theme {
        &self.theme
    }

    /// Publishes an event on the application bus.
    ///
    /// # Errors
    ///
    /// The first handler failure.
    pub async fn publish(&mut self, event: Event) -> Result<()> {
        self.bus.publish(&mut self.session, event).await
    }

    /// Feeds one line to the active input state, as if typed and entered.
    ///
    /// Returns `true` when the line asked to quit.
    ///
    /// # Errors
    ///
    /// Handler failures raised by the resulting dispatch.
    pub async fn submit(&mut self, line: &str) -> Result<bool> {
        match self.session.view.accept(line.to_string()) {
            Some(intent) => self.dispatch(intent).await,
            None => Ok(false),
        }
    }

    /// Carries out what the view asked for.
    ///
    /// # Errors
    ///
    /// Handler failures.
    pub async fn dispatch(&mut self, intent: Intent) -> Result<bool> {
        match intent {
            Intent::Command { command, arg } => {
                self.controller
                    .handle_command(&self.bus, &mut self.session, &command, &arg)
                    .instrument(tracing::debug_span!("command", %command))
                    .await
            }
            Intent::Publish(event) => {
                self.publish(event).await?;
                Ok(false)
            }
            Intent::Quit => self.controller.handle_command(&self.bus, &mut self.session, "quit", "").await,
        }
    }

    /// Handles one key press. Returns `true` when the session should end.
    pub async fn handle_key(&mut self, key: KeyEvent) -> bool {
        match self.session.view.handle_key(key) {
            Some(intent) => {
                let outcome = self.dispatch(intent).await;
                self.isolate(outcome).unwrap_or(false)
            }
            None => false,
        }
    }

    /// Applies a gateway notification to the state and publishes the result.
    pub async fn handle_notification(&mut self, notification: Notification) {
        let event = match notification {
            Notification::Ready { user_id, user } => self.session.service.mark_ready(user_id, user),
            Notification::Message(incoming) => self.session.service.record_incoming(incoming),
            Notification::Disconnected { reason } => Event::error(format!("Disconnected from gateway: {reason}")),
        };
        let outcome = self.publish(event).await;
        self.isolate(outcome);
    }

    /// Logs and displays a handler failure instead of ending the session.
    fn isolate<T>(&mut self, outcome: Result<T>) -> Option<T> {
        match outcome {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::error!(error = %err, "event handler failed");
                self.session.view.error(&err.to_string());
                None
            }
        }
    }

    /// Consumes notifications until the gateway reports `Ready`.
    ///
    /// Messages that arrive first are handled normally.
    ///
    /// # Errors
    ///
    /// [`BridgeError::Startup`] on timeout, or when the gateway disconnects
    /// or its channel closes first.
    pub async fn wait_until_ready(
        &mut self,
        notifications: &mut UnboundedReceiver<Notification>,
        timeout: Duration,
    ) -> Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let next = tokio::time::timeout_at(deadline, notifications.recv())
                .await
                .map_err(|_| BridgeError::Startup(format!("bot not ready after {}s", timeout.as_secs())))?;
            match next {
                Some(Notification::Disconnected { reason }) => {
                    return Err(BridgeError::Startup(format!("gateway closed before ready: {reason}")));
                }
                Some(notification) => {
                    self.handle_notification(notification).await;
                    if self.session.service.state().is_bot_ready() {
                        return Ok(());
                    }
                }
                None => return Err(BridgeError::Startup("gateway channel closed before ready".to_string())),
            }
        }
    }

    /// Loads guilds and applies the configured default selection.
    ///
    /// # Errors
    ///
    /// [`BridgeError::Startup`] when the guild list cannot be loaded or is
    /// empty; handler failures.
    pub async fn startup(&mut self, default_guild: Option<&str>, default_channel: Option<&str>) -> Result<()> {
        let event = self
            .session
            .service
            .refresh_guilds()
            .await
            .map_err(|e| BridgeError::Startup(format!("cannot list guilds: {e}")))?;
        if self.session.service.state().all_guilds().is_empty() {
            return Err(BridgeError::Startup("the bot is not a member of any guild".to_string()));
        }
        self.publish(event).await?;

        if let Some(guild) = default_guild {
            self.controller.handle_command(&self.bus, &mut self.session, "setguild", guild).await?;
        }
        if let Some(channel) = default_channel {
            self.controller.handle_command(&self.bus, &mut self.session, "setchannel", channel).await?;
        }
        self.publish(Event::text("Type /help for a list of commands.")).await
    }

    /// Runs until the operator quits or terminal input ends.
    ///
    /// # Errors
    ///
    /// Drawing failures.
    pub async fn run<B: Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
        inputs: &mut UnboundedReceiver<TerminalInput>,
        notifications: &mut UnboundedReceiver<Notification>,
    ) -> Result<()> {
        self.draw(terminal)?;
        loop {
            let quit = tokio::select! {
                input = inputs.recv() => match input {
                    Some(TerminalInput::Key(key)) => self.handle_key(key).await,
                    Some(TerminalInput::Resize) => {
                        self.session.view.invalidate();
                        false
                    }
                    Some(TerminalInput::Closed) | None => {
                        tracing::info!("terminal input closed");
                        true
                    }
                },
                Some(notification) = notifications.recv() => {
                    self.handle_notification(notification).await;
                    false
                }
            };
            if self.session.view.take_dirty() {
                self.draw(terminal)?;
            }
            if quit {
                return Ok(());
            }
        }
    }

    fn draw<B: Backend>(&self, terminal: &mut Terminal<B>) -> Result<()> {
        crate::ui::render(terminal, &self.session.view, self.session.service.state(), &self.theme)?;
        Ok(())
    }

    /// Closes the chat backend.
    pub async fn shutdown(&self) {
        self.session.service.client().shutdown().await;
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("bus", &self.bus)
            .field("session", &self.session)
            .field("theme", &self.theme.name)
            .finish_non_exhaustive()
    }
}
