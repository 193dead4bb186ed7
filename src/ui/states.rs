//! The modal input states.
//!
//! Exactly one [`InputState`] is active at a time. The view feeds it every
//! accepted line through [`InputState::on_accept`] and applies the returned
//! [`Accepted`] value; states never reach the bus or the service layer
//! directly. A workflow that ends in a request (send this text, upload this
//! file) does so through the continuation the requester stored in the state,
//! which turns the result into the next [`Event`].
//!
//! ```text
//!            MultilineInputRequested / FileInputRequested / ...
//!   Normal ────────────────────────────────────────────────► Multiline │ FileInput │ Edit │ ImagePreview
//!     ▲                                                                  │
//!     └───────────── terminator / completion / cancel / dismiss ─────────┘
//! ```

use super::format::{LogLine, Tone};
use super::keys::{Binding, KeyChord};
use super::preview::PreviewArt;
use super::surface::Surface;
use crate::app::AppState;
use crate::events::{Continuation, Event, FileSubmission};
use crossterm::event::KeyCode;
use std::path::PathBuf;

/// Line that ends multi-line entry, compared case-insensitively.
pub const MULTILINE_TERMINATOR: &str = "@END";

/// What the view should do after a state handled input.
pub enum Accepted {
    /// Nothing beyond what the state already did.
    Stay,
    /// Hand a slash command to the controller.
    Command { command: String, arg: String },
    Publish(Event),
    /// Switch states, then publish `emit` if present.
    Transition { next: InputState, emit: Option<Event> },
}

impl Accepted {
    fn normal(emit: Option<Event>) -> Self {
        Self::Transition { next: InputState::Normal, emit }
    }
}

/// Accumulates lines until the terminator.
pub struct Multiline {
    lines: Vec<String>,
    on_complete: Option<Continuation<String>>,
}

/// Asks for a path, then an optional caption.
pub struct FileInput {
    path: Option<String>,
    on_complete: Option<Continuation<FileSubmission>>,
}

/// Revises the text of an existing message.
pub struct Edit {
    original: String,
    on_complete: Option<Continuation<String>>,
}

/// Shows an image instead of the log.
pub struct ImagePreview {
    path: PathBuf,
    art: Result<PreviewArt, String>,
}

impl ImagePreview {
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// The converted image, or the conversion error.
    #[must_use]
    pub const fn art(&self) -> &Result<PreviewArt, String> {
        &self.art
    }
}

/// The active input mode.
#[derive(Default)]
pub enum InputState {
    #[default]
    Normal,
    Multiline(Multiline),
    FileInput(FileInput),
    Edit(Edit),
    ImagePreview(ImagePreview),
}

impl std::fmt::Debug for InputState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn strip_quotes(path: &str) -> &str {
    let path = path.trim();
    path.strip_prefix('"')
        .and_then(|p| p.strip_suffix('"'))
        .or_else(|| path.strip_prefix('\'').and_then(|p| p.strip_suffix('\'')))
        .unwrap_or(path)
}

impl InputState {
    pub fn multiline(on_complete: Continuation<String>) -> Self {
        Self::Multiline(Multiline { lines: Vec::new(), on_complete: Some(on_complete) })
    }

    /// Starts in the caption phase when `path` is already known.
    pub fn file_input(path: Option<String>, on_complete: Continuation<FileSubmission>) -> Self {
        let path = path.map(|p| strip_quotes(&p).to_string()).filter(|p| !p.is_empty());
        Self::FileInput(FileInput { path, on_complete: Some(on_complete) })
    }

    pub fn edit(original: String, on_complete: Continuation<String>) -> Self {
        Self::Edit(Edit { original, on_complete: Some(on_complete) })
    }

    pub fn image_preview(path: PathBuf, art: Result<PreviewArt, String>) -> Self {
        Self::ImagePreview(ImagePreview { path, art })
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Multiline(_) => "Multiline",
            Self::FileInput(_) => "FileInput",
            Self::Edit(_) => "Edit",
            Self::ImagePreview(_) => "ImagePreview",
        }
    }

    /// Whether the input line is live in this state.
    #[must_use]
    pub const fn accepts_text(&self) -> bool {
        !matches!(self, Self::ImagePreview(_))
    }

    /// Activation side effects: banners and buffer pre-fill.
    pub fn on_enter(&mut self, surface: &mut Surface) {
        match self {
            Self::Normal => {}
            Self::Multiline(_) => surface.say(
                Tone::Banner,
                &format!("[Multiline] Enter lines; finish with {MULTILINE_TERMINATOR} on its own line or Alt+Enter."),
            ),
            Self::FileInput(state) => {
                let text = match &state.path {
                    Some(path) => format!("[Attach] {path}\n[Attach] Enter a caption, or leave empty for none."),
                    None => "[Attach] Enter the file path (empty line cancels).".to_string(),
                };
                surface.say(Tone::Banner, &text);
            }
            Self::Edit(state) => {
                surface.say(Tone::Banner, "[Edit] Revise the message and press Enter; Esc or an empty line cancels.");
                surface.input.set(state.original.clone());
            }
            Self::ImagePreview(state) => {
                if let Err(err) = &state.art {
                    tracing::warn!(path = %state.path.display(), error = %err, "preview failed");
                }
            }
        }
    }

    /// Deactivation side effects.
    pub fn on_exit(&mut self, surface: &mut Surface) {
        match self {
            Self::Normal => {}
            Self::Multiline(state) => {
                surface.input.clear();
                surface.say(Tone::Dim, &format!("[Multiline] closed ({} line(s))", state.lines.len()));
            }
            Self::FileInput(_) => surface.input.clear(),
            Self::Edit(_) => {
                surface.input.clear();
                surface.say(Tone::Dim, "[Edit] closed");
            }
            Self::ImagePreview(state) => {
                surface.say(Tone::Dim, &format!("[Preview] closed {}", state.path.display()));
            }
        }
    }

    /// Handles one accepted line.
    pub fn on_accept(&mut self, text: String, surface: &mut Surface) -> Accepted {
        match self {
            Self::Normal => accept_normal(&text, surface),
            Self::Multiline(state) => {
                if text.trim().eq_ignore_ascii_case(MULTILINE_TERMINATOR) {
                    state.finish()
                } else {
                    surface.push(LogLine::tone(Tone::Dim, "  | ").push(Tone::Plain, text.clone()));
                    state.lines.push(text);
                    Accepted::Stay
                }
            }
            Self::FileInput(state) => state.accept(&text, surface),
            Self::Edit(state) => state.accept(text, surface),
            Self::ImagePreview(_) => Accepted::Stay,
        }
    }

    /// Alt+Enter in Multiline: keeps a non-empty pending line, then finishes.
    pub fn submit_early(&mut self, pending: String, surface: &mut Surface) -> Accepted {
        match self {
            Self::Multiline(state) => {
                if !pending.is_empty() {
                    surface.push(LogLine::tone(Tone::Dim, "  | ").push(Tone::Plain, pending.clone()));
                    state.lines.push(pending);
                }
                state.finish()
            }
            _ => Accepted::Stay,
        }
    }

    /// User cancel: drops any pending continuation and returns to Normal.
    pub fn cancel(&mut self, surface: &mut Surface) -> Accepted {
        match self {
            Self::Normal => Accepted::Stay,
            _ => {
                surface.say(Tone::Info, &format!("[Cancelled] {}", self.name()));
                Accepted::normal(None)
            }
        }
    }

    /// Prompt shown before the input line.
    #[must_use]
    pub fn prompt_text(&self, state: &AppState) -> String {
        match self {
            Self::Normal => format!("[{}]> ", state.location_label()),
            Self::Multiline(s) => format!("[{}]... ", s.lines.len() + 1),
            Self::FileInput(FileInput { path: None, .. }) => "File Path > ".to_string(),
            Self::FileInput(_) => "Caption (optional) > ".to_string(),
            Self::Edit(_) => "Edit > ".to_string(),
            Self::ImagePreview(_) => "[q/Esc/Enter/Space to close] ".to_string(),
        }
    }

    /// State-local bindings, merged under the global ones by the view.
    #[must_use]
    pub fn key_bindings(&self) -> Vec<(KeyChord, Binding)> {
        match self {
            Self::Normal => vec![(KeyChord::plain(KeyCode::Tab), Binding::CompleteCommand)],
            Self::Multiline(_) => vec![
                (KeyChord::alt(KeyCode::Enter), Binding::SubmitEarly),
                (KeyChord::plain(KeyCode::Esc), Binding::Cancel),
            ],
            Self::FileInput(_) | Self::Edit(_) => vec![(KeyChord::plain(KeyCode::Esc), Binding::Cancel)],
            Self::ImagePreview(_) => [KeyCode::Char('q'), KeyCode::Esc, KeyCode::Enter, KeyCode::Char(' ')]
                .into_iter()
                .map(|code| (KeyChord::plain(code), Binding::Dismiss))
                .collect(),
        }
    }
}

fn accept_normal(text: &str, surface: &mut Surface) -> Accepted {
    let text = text.trim();
    if text.is_empty() {
        return Accepted::Stay;
    }
    if let Some(command) = text.strip_prefix('/') {
        surface.push(LogLine::tone(Tone::Dim, format!("> {text}")));
        let (command, arg) = command.split_once(char::is_whitespace).unwrap_or((command, ""));
        return Accepted::Command {
            command: command.to_lowercase(),
            arg: arg.trim().to_string(),
        };
    }
    Accepted::Publish(Event::MessageSendRequested { text: text.to_string() })
}

impl Multiline {
    fn finish(&mut self) -> Accepted {
        let text = self.lines.join("\n");
        let emit = self.on_complete.take().and_then(|complete| complete(text));
        Accepted::normal(emit)
    }
}

impl FileInput {
    fn accept(&mut self, text: &str, surface: &mut Surface) -> Accepted {
        match &self.path {
            None => {
                let path = strip_quotes(text);
                if path.is_empty() {
                    surface.say(Tone::Info, "[Cancelled] File attach cancelled.");
                    return Accepted::normal(None);
                }
                surface.say(Tone::Dim, &format!("[Attach] {path}"));
                self.path = Some(path.to_string());
                Accepted::Stay
            }
            Some(path) => {
                let caption = text.trim();
                let submission = FileSubmission {
                    path: path.clone(),
                    caption: (!caption.is_empty()).then(|| caption.to_string()),
                };
                let emit = self.on_complete.take().and_then(|complete| complete(submission));
                Accepted::normal(emit)
            }
        }
    }
}

impl Edit {
    fn accept(&mut self, text: String, surface: &mut Surface) -> Accepted {
        if text.trim().is_empty() {
            surface.say(Tone::Info, "[Cancelled] Edit cancelled, message unchanged.");
            return Accepted::normal(None);
        }
        if text == self.original {
            surface.say(Tone::Info, "[Edit] No changes.");
            return Accepted::normal(None);
        }
        let emit = self.on_complete.take().and_then(|complete| complete(text));
        Accepted::normal(emit)
    }
}
