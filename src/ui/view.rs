//! The view: log, input line, active input state and bindings.
//!
//! Key events come in through [`View::handle_key`]; anything that needs the
//! controller or the bus comes back out as an [`Intent`] for the runtime to
//! carry out. Bus events are rendered by [`View::render_event`].

use super::format::{self, Clock, LogLine, Tone};
use super::keys::{Binding, KeyChord, KeyMap};
use super::states::{Accepted, InputState};
use super::surface::{LineBuffer, Surface};
use crate::app::{commands, AppState};
use crate::events::Event;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::collections::VecDeque;

/// Lines moved per PageUp / PageDown.
const PAGE: usize = 10;

/// Which pane receives plain keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Input,
    Log,
}

/// Work the view cannot do itself.
#[derive(Debug)]
pub enum Intent {
    Command { command: String, arg: String },
    Publish(Event),
    Quit,
}

#[derive(Debug)]
pub struct View {
    surface: Surface,
    state: InputState,
    bindings: KeyMap,
    focus: Focus,
    /// Lines scrolled up from the bottom of the log.
    scroll: usize,
    clock: Clock,
    dirty: bool,
}

impl View {
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        let state = InputState::Normal;
        let bindings = KeyMap::merged(&state.key_bindings());
        Self {
            surface: Surface::default(),
            state,
            bindings,
            focus: Focus::Input,
            scroll: 0,
            clock,
            dirty: true,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &InputState {
        &self.state
    }

    #[must_use]
    pub const fn log(&self) -> &VecDeque<LogLine> {
        self.surface.log()
    }

    #[must_use]
    pub const fn input(&self) -> &LineBuffer {
        &self.surface.input
    }

    #[must_use]
    pub const fn bindings(&self) -> &KeyMap {
        &self.bindings
    }

    #[must_use]
    pub const fn focus(&self) -> Focus {
        self.focus
    }

    #[must_use]
    pub const fn scroll(&self) -> usize {
        self.scroll
    }

    #[must_use]
    pub const fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Returns whether anything changed since the last call.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    /// Forces a redraw, e.g. after a terminal resize.
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    pub fn info(&mut self, text: &str) {
        self.surface.say(Tone::Info, text);
        self.dirty = true;
    }

    pub fn error(&mut self, text: &str) {
        self.surface.say(Tone::Error, &format!("[ERROR] {text}"));
        self.dirty = true;
    }

    fn extend(&mut self, lines: Vec<LogLine>) {
        self.surface.extend(lines);
        self.dirty = true;
    }

    /// Replaces the active state.
    ///
    /// The old state's exit hook runs to completion before the new state's
    /// entry hook, then bindings and the prompt follow the new state.
    pub fn transition_to(&mut self, next: InputState) {
        tracing::debug!(from = self.state.name(), to = next.name(), "input state transition");
        self.state.on_exit(&mut self.surface);
        self.state = next;
        self.state.on_enter(&mut self.surface);
        self.bindings = KeyMap::merged(&self.state.key_bindings());
        self.focus = Focus::Input;
        self.dirty = true;
    }

    /// Feeds an accepted line to the active state.
    pub fn accept(&mut self, text: String) -> Option<Intent> {
        let outcome = self.state.on_accept(text, &mut self.surface);
        self.apply(outcome)
    }

    fn apply(&mut self, outcome: Accepted) -> Option<Intent> {
        self.dirty = true;
        match outcome {
            Accepted::Stay => None,
            Accepted::Command { command, arg } => Some(Intent::Command { command, arg }),
            Accepted::Publish(event) => Some(Intent::Publish(event)),
            Accepted::Transition { next, emit } => {
                self.transition_to(next);
                emit.map(Intent::Publish)
            }
        }
    }

    /// Handles one terminal key event.
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Intent> {
        if key.kind == KeyEventKind::Release {
            return None;
        }
        if let Some(binding) = self.bindings.lookup(KeyChord::from_event(&key)) {
            return self.apply_binding(binding);
        }

        self.dirty = true;
        if self.focus == Focus::Log || !self.state.accepts_text() {
            self.scroll_key(key.code);
            return None;
        }

        let input = &mut self.surface.input;
        match key.code {
            KeyCode::Enter => {
                let text = input.take();
                return self.accept(text);
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => input.insert(c),
            KeyCode::Backspace => input.backspace(),
            KeyCode::Delete => input.delete(),
            KeyCode::Left => input.left(),
            KeyCode::Right => input.right(),
            KeyCode::Home => input.home(),
            KeyCode::End => input.end(),
            code => self.scroll_key(code),
        }
        None
    }

    fn scroll_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Up => self.scroll = (self.scroll + 1).min(self.log().len()),
            KeyCode::Down => self.scroll = self.scroll.saturating_sub(1),
            KeyCode::PageUp => self.scroll = (self.scroll + PAGE).min(self.log().len()),
            KeyCode::PageDown => self.scroll = self.scroll.saturating_sub(PAGE),
            KeyCode::End if self.focus == Focus::Log => self.scroll = 0,
            KeyCode::Esc if self.focus == Focus::Log => self.focus = Focus::Input,
            _ => {}
        }
    }

    fn apply_binding(&mut self, binding: Binding) -> Option<Intent> {
        self.dirty = true;
        match binding {
            Binding::Quit => Some(Intent::Quit),
            Binding::CycleFocus => {
                self.focus = match self.focus {
                    Focus::Input => Focus::Log,
                    Focus::Log => Focus::Input,
                };
                None
            }
            Binding::SubmitEarly => {
                let pending = self.surface.input.take();
                let outcome = self.state.submit_early(pending, &mut self.surface);
                self.apply(outcome)
            }
            Binding::Cancel => {
                let outcome = self.state.cancel(&mut self.surface);
                self.apply(outcome)
            }
            Binding::Dismiss => {
                self.transition_to(InputState::Normal);
                None
            }
            Binding::CompleteCommand => {
                self.complete_command();
                None
            }
        }
    }

    /// Tab completion of slash command names.
    fn complete_command(&mut self) {
        let text = self.surface.input.text();
        let Some(prefix) = text.strip_prefix('/') else {
            return;
        };
        if prefix.contains(char::is_whitespace) {
            return;
        }
        match commands::complete(prefix).as_slice() {
            [] => {}
            [only] => self.surface.input.set(format!("/{only} ")),
            many => {
                let names: Vec<String> = many.iter().map(|n| format!("/{n}")).collect();
                self.surface.say(Tone::Dim, &names.join("  "));
            }
        }
    }

    /// Renders a bus event against the current state.
    pub fn render_event(&mut self, state: &AppState, event: &Event) {
        let clock = self.clock;
        match event {
            Event::BotReady { user } => self.info(&format!("Logged in as {user}")),
            Event::GuildsUpdated => self.extend(format::guild_lines(state.all_guilds(), state.current_guild())),
            Event::GuildSelected { name } => self.info(&format!("Guild selected: {name}")),
            Event::ChannelsUpdated => self.extend(format::channel_lines(
                state.current_guild(),
                state.available_channels(),
                state.current_channel(),
            )),
            Event::ChannelSelected { name } => self.info(&format!("Channel selected: #{name}")),
            Event::MessagesUpdated => {
                let channel = state.current_channel().map_or("", |c| c.name.as_str());
                let mut lines = vec![LogLine::tone(Tone::Banner, format!("--- Recent messages in #{channel} ---"))];
                if state.recent_messages().is_empty() {
                    lines.push(LogLine::tone(Tone::Info, "No messages."));
                }
                for message in state.recent_messages() {
                    lines.extend(format::message_lines(message, &clock, state.bot_id()));
                }
                self.extend(lines);
            }
            Event::SelfMessagesUpdated => self.extend(format::self_message_lines(state.recent_self_messages(), &clock)),
            Event::FilesListUpdated => self.extend(format::file_lines(state.file_cache(), &clock)),
            Event::MultilineInputRequested { on_complete } => {
                if let Some(complete) = on_complete.take() {
                    self.transition_to(InputState::multiline(complete));
                }
            }
            Event::FileInputRequested { initial_path, on_complete } => {
                if let Some(complete) = on_complete.take() {
                    self.transition_to(InputState::file_input(initial_path.clone(), complete));
                }
            }
            Event::EditInputRequested { original, on_complete } => {
                if let Some(complete) = on_complete.take() {
                    self.transition_to(InputState::edit(original.clone(), complete));
                }
            }
            Event::ImagePreviewRequested { path, art } => {
                self.transition_to(InputState::image_preview(path.clone(), art.clone()));
            }
            Event::MessageSent { message } => self.extend(format::message_lines(message, &clock, state.bot_id())),
            Event::FileSent { message, file_name } => {
                self.info(&format!("File sent: {file_name}"));
                self.extend(format::message_lines(message, &clock, state.bot_id()));
            }
            Event::MessageEdited { message } => {
                self.info("Message edited:");
                self.extend(format::message_lines(message, &clock, state.bot_id()));
            }
            Event::MessageDeleted { message } => {
                let preview: String = message.content.chars().take(60).collect();
                self.info(&format!("Message deleted: {preview}"));
            }
            Event::FileDownloaded { path } => self.info(&format!("Downloaded to {}", path.display())),
            Event::IncomingMessage(incoming) => {
                if state.is_current_channel(incoming.message.channel_id) {
                    self.extend(format::message_lines(&incoming.message, &clock, state.bot_id()));
                } else {
                    self.extend(vec![LogLine::tone(
                        Tone::Notice,
                        format!(
                            "[New message in @{}/#{}]",
                            incoming.guild_name.as_deref().unwrap_or("DM"),
                            incoming.channel_name.as_deref().unwrap_or("unknown"),
                        ),
                    )]);
                }
            }
            Event::Error { message } => self.error(message),
            Event::ShowText { text } => self.info(text),
            Event::ClearDisplay => {
                self.surface.clear_log();
                self.scroll = 0;
                self.dirty = true;
            }
            Event::MessageSendRequested { .. }
            | Event::FileSendRequested { .. }
            | Event::MessageEditRequested { .. }
            | Event::MessageDeleteRequested { .. }
            | Event::FileDownloadRequested { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Pending;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(view: &mut View, text: &str) {
        for c in text.chars() {
            assert!(view.handle_key(key(KeyCode::Char(c))).is_none());
        }
    }

    fn log_text(view: &View) -> Vec<String> {
        view.log().iter().map(LogLine::plain_text).collect()
    }

    #[test]
    fn test_enter_dispatches_command() {
        let mut view = View::new(Clock::default());
        type_text(&mut view, "/sc general");
        match view.handle_key(key(KeyCode::Enter)) {
            Some(Intent::Command { command, arg }) => {
                assert_eq!(command, "sc");
                assert_eq!(arg, "general");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(view.input().text(), "");
    }

    #[test]
    fn test_global_bindings_survive_every_state() {
        let mut view = View::new(Clock::default());
        view.transition_to(InputState::image_preview("/nonexistent.png".into(), Err("unreadable".to_string())));
        let quit = view.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(matches!(quit, Some(Intent::Quit)));
    }

    #[test]
    fn test_exit_hook_runs_before_enter_hook() {
        let state = AppState::new();
        let mut view = View::new(Clock::default());
        view.render_event(
            &state,
            &Event::MultilineInputRequested { on_complete: Pending::new(|_: String| None) },
        );
        type_text(&mut view, "half typed");

        view.render_event(
            &state,
            &Event::EditInputRequested {
                original: "old message".to_string(),
                on_complete: Pending::new(|_: String| None),
            },
        );

        let log = log_text(&view);
        let closed = log.iter().position(|l| l.starts_with("[Multiline] closed")).unwrap();
        let opened = log.iter().position(|l| l.starts_with("[Edit]")).unwrap();
        assert!(closed < opened);
        assert_eq!(view.input().text(), "old message");
        assert_eq!(view.state().name(), "Edit");
    }

    #[test]
    fn test_multiline_completion_publishes_continuation_event() {
        let state = AppState::new();
        let mut view = View::new(Clock::default());
        view.render_event(
            &state,
            &Event::MultilineInputRequested {
                on_complete: Pending::new(|text: String| Some(Event::MessageSendRequested { text })),
            },
        );

        for line in ["a", "b"] {
            assert!(view.accept(line.to_string()).is_none());
        }
        match view.accept("@END".to_string()) {
            Some(Intent::Publish(Event::MessageSendRequested { text })) => assert_eq!(text, "a\nb"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(view.state().name(), "Normal");
    }

    #[test]
    fn test_preview_dismiss_keys_return_to_normal() {
        for code in [KeyCode::Char('q'), KeyCode::Esc, KeyCode::Enter, KeyCode::Char(' ')] {
            let mut view = View::new(Clock::default());
            view.transition_to(InputState::image_preview("/nonexistent.png".into(), Err("unreadable".to_string())));
            assert!(view.handle_key(key(code)).is_none());
            assert_eq!(view.state().name(), "Normal");
        }
    }

    #[test]
    fn test_tab_completes_unique_command() {
        let mut view = View::new(Clock::default());
        type_text(&mut view, "/self");
        view.handle_key(key(KeyCode::Tab));
        assert_eq!(view.input().text(), "/self_messages ");
    }

    #[test]
    fn test_focus_cycles_and_log_scrolls() {
        let mut view = View::new(Clock::default());
        for i in 0..5 {
            view.info(&i.to_string());
        }
        view.handle_key(KeyEvent::new(KeyCode::Char('o'), KeyModifiers::CONTROL));
        assert_eq!(view.focus(), Focus::Log);
        view.handle_key(key(KeyCode::Up));
        view.handle_key(key(KeyCode::Up));
        assert_eq!(view.scroll(), 2);
        type_text(&mut view, "x");
        assert_eq!(view.input().text(), "");
    }

    #[test]
    fn test_clear_display_empties_log() {
        let mut view = View::new(Clock::default());
        view.info("something");
        view.render_event(&AppState::new(), &Event::ClearDisplay);
        assert!(view.log().is_empty());
    }
}
