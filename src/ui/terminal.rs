//! Terminal setup and the keyboard reader thread.

use crate::domain::{BridgeError, Result};
use crossterm::event::{self, Event as TermEvent, KeyEvent};
use crossterm::execute;
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, Stdout};
use tokio::sync::mpsc::UnboundedSender;

pub type ConsoleTerminal = Terminal<CrosstermBackend<Stdout>>;

/// What the reader thread forwards to the runtime.
#[derive(Debug, Clone)]
pub enum TerminalInput {
    Key(KeyEvent),
    Resize,
    /// Standard input is gone; treated like `/quit`.
    Closed,
}

/// Raw mode plus the alternate screen, undone on drop.
pub struct TerminalGuard {
    terminal: ConsoleTerminal,
}

impl TerminalGuard {
    /// # Errors
    ///
    /// [`BridgeError::Terminal`] when the terminal cannot be switched to raw
    /// mode (for example when stdout is not a TTY).
    pub fn enter() -> Result<Self> {
        terminal::enable_raw_mode().map_err(|e| BridgeError::Terminal(format!("cannot enable raw mode: {e}")))?;
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen) {
            let _ = terminal::disable_raw_mode();
            return Err(BridgeError::Terminal(format!("cannot enter alternate screen: {e}")));
        }
        let terminal = Terminal::new(CrosstermBackend::new(stdout))
            .map_err(|e| BridgeError::Terminal(e.to_string()))?;
        Ok(Self { terminal })
    }

    pub fn terminal(&mut self) -> &mut ConsoleTerminal {
        &mut self.terminal
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Forwards terminal events from a blocking thread.
///
/// The thread ends when the receiver is dropped or reading fails.
pub fn spawn_input_reader(tx: UnboundedSender<TerminalInput>) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || loop {
        let input = match event::read() {
            Ok(TermEvent::Key(key)) => TerminalInput::Key(key),
            Ok(TermEvent::Resize(..)) => TerminalInput::Resize,
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!(error = %e, "terminal read failed");
                let _ = tx.send(TerminalInput::Closed);
                break;
            }
        };
        if tx.send(input).is_err() {
            break;
        }
    })
}
