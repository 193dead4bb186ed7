//! Key chords and the active binding table.
//!
//! Every input state contributes its own bindings; [`KeyMap::merged`] layers
//! the global bindings on top so quitting and focus cycling always work.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::HashMap;
use std::fmt;

/// A key plus the modifiers that matter for bindings (Ctrl and Alt).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyChord {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyChord {
    #[must_use]
    pub const fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    #[must_use]
    pub const fn plain(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    #[must_use]
    pub const fn ctrl(c: char) -> Self {
        Self::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    #[must_use]
    pub const fn alt(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::ALT)
    }

    /// Normalizes a terminal key event. Shift is dropped because it is
    /// already reflected in the character.
    #[must_use]
    pub fn from_event(event: &KeyEvent) -> Self {
        let modifiers = event.modifiers & (KeyModifiers::CONTROL | KeyModifiers::ALT);
        let code = match event.code {
            KeyCode::Char(c) if modifiers.contains(KeyModifiers::CONTROL) => KeyCode::Char(c.to_ascii_lowercase()),
            code => code,
        };
        Self { code, modifiers }
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.contains(KeyModifiers::CONTROL) {
            f.write_str("C-")?;
        }
        if self.modifiers.contains(KeyModifiers::ALT) {
            f.write_str("M-")?;
        }
        match self.code {
            KeyCode::Char(' ') => f.write_str("Space"),
            KeyCode::Char(c) => write!(f, "{c}"),
            KeyCode::Enter => f.write_str("Enter"),
            KeyCode::Esc => f.write_str("Esc"),
            KeyCode::Tab => f.write_str("Tab"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// What a bound key does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Quit,
    /// Moves focus between the input line and the log pane.
    CycleFocus,
    /// Finishes multi-line entry without typing the terminator.
    SubmitEarly,
    /// Closes the image preview.
    Dismiss,
    /// Abandons the current workflow.
    Cancel,
    /// Completes a partially typed slash command.
    CompleteCommand,
}

impl Binding {
    /// Footer label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Quit => "quit",
            Self::CycleFocus => "focus",
            Self::SubmitEarly => "submit",
            Self::Dismiss => "close",
            Self::Cancel => "cancel",
            Self::CompleteCommand => "complete",
        }
    }
}

/// Bindings that are active in every input state.
#[must_use]
pub fn global_bindings() -> Vec<(KeyChord, Binding)> {
    vec![
        (KeyChord::ctrl('c'), Binding::Quit),
        (KeyChord::ctrl('d'), Binding::Quit),
        (KeyChord::ctrl('o'), Binding::CycleFocus),
    ]
}

/// The binding table of the current input state.
#[derive(Debug, Clone, Default)]
pub struct KeyMap {
    bindings: HashMap<KeyChord, Binding>,
    /// Chords in insertion order, for the footer.
    order: Vec<KeyChord>,
}

impl KeyMap {
    /// State bindings first, then the globals; a global wins on conflict.
    #[must_use]
    pub fn merged(state_bindings: &[(KeyChord, Binding)]) -> Self {
        let mut map = Self::default();
        for (chord, binding) in state_bindings.iter().copied().chain(global_bindings()) {
            if map.bindings.insert(chord, binding).is_none() {
                map.order.push(chord);
            }
        }
        map
    }

    #[must_use]
    pub fn lookup(&self, chord: KeyChord) -> Option<Binding> {
        self.bindings.get(&chord).copied()
    }

    /// `(key, action)` pairs for the footer, one per action.
    #[must_use]
    pub fn describe(&self) -> Vec<(String, &'static str)> {
        let mut seen = Vec::new();
        let mut out = Vec::new();
        for chord in &self.order {
            if let Some(binding) = self.bindings.get(chord) {
                if !seen.contains(binding) {
                    seen.push(*binding);
                    out.push((chord.to_string(), binding.label()));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_binding_overrides_state_binding() {
        let map = KeyMap::merged(&[(KeyChord::ctrl('c'), Binding::Cancel)]);
        assert_eq!(map.lookup(KeyChord::ctrl('c')), Some(Binding::Quit));
    }

    #[test]
    fn test_state_bindings_survive_merge() {
        let map = KeyMap::merged(&[(KeyChord::plain(KeyCode::Esc), Binding::Cancel)]);
        assert_eq!(map.lookup(KeyChord::plain(KeyCode::Esc)), Some(Binding::Cancel));
        assert_eq!(map.lookup(KeyChord::ctrl('o')), Some(Binding::CycleFocus));
        assert_eq!(map.lookup(KeyChord::plain(KeyCode::Enter)), None);
    }

    #[test]
    fn test_from_event_drops_shift_and_lowercases_ctrl() {
        let event = KeyEvent::new(KeyCode::Char('C'), KeyModifiers::CONTROL | KeyModifiers::SHIFT);
        assert_eq!(KeyChord::from_event(&event), KeyChord::ctrl('c'));

        let event = KeyEvent::new(KeyCode::Char('Q'), KeyModifiers::SHIFT);
        assert_eq!(KeyChord::from_event(&event), KeyChord::plain(KeyCode::Char('Q')));
    }

    #[test]
    fn test_describe_lists_each_action_once() {
        let map = KeyMap::merged(&[]);
        let described = map.describe();
        assert_eq!(
            described,
            vec![("C-c".to_string(), "quit"), ("C-o".to_string(), "focus")]
        );
    }
}
