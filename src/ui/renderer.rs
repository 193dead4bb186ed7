//! Top-level rendering coordinator.
//!
//! Layout, top to bottom:
//!
//! ```text
//! ┌ title: bot │ guild / channel │ mode ─────────────┐
//! │ log pane (or image preview)                       │
//! ├ input: prompt + buffer ───────────────────────────┤
//! └ footer: active key bindings ──────────────────────┘
//! ```

use super::format::{LogLine, Tone};
use super::preview::PreviewArt;
use super::states::InputState;
use super::theme::Theme;
use super::view::{Focus, View};
use crate::app::AppState;
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Draws one frame.
///
/// # Errors
///
/// Propagates terminal write failures.
pub fn render<B: Backend>(terminal: &mut Terminal<B>, view: &View, state: &AppState, theme: &Theme) -> std::io::Result<()> {
    terminal.draw(|f| draw(f, view, state, theme))?;
    Ok(())
}

fn draw(f: &mut Frame, view: &View, state: &AppState, theme: &Theme) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(f.area());

    draw_title(f, view, state, theme, chunks[0]);
    match view.state() {
        InputState::ImagePreview(preview) => {
            let title = format!(" {} ", preview.path().display());
            match preview.art() {
                Ok(art) => draw_art(f, art, &title, theme, chunks[1]),
                Err(err) => draw_log(f, &[LogLine::tone(Tone::Error, format!("[ERROR] {err}"))], 0, &title, false, theme, chunks[1]),
            }
        }
        _ => {
            let lines: Vec<LogLine> = view.log().iter().cloned().collect();
            draw_log(f, &lines, view.scroll(), " Log ", view.focus() == Focus::Log, theme, chunks[1]);
        }
    }
    draw_input(f, view, state, theme, chunks[2]);
    draw_footer(f, view, theme, chunks[3]);
}

fn draw_title(f: &mut Frame, view: &View, state: &AppState, theme: &Theme, area: Rect) {
    let bot = state.bot_user().unwrap_or("connecting...");
    let text = format!(" chatbridge │ {bot} │ {} │ {} ", state.location_label(), view.state().name());
    f.render_widget(Paragraph::new(Line::from(text)).style(theme.title()), area);
}

/// Splits a log line into rows at most `width` cells wide.
fn wrap(line: &LogLine, width: usize, theme: &Theme) -> Vec<Line<'static>> {
    let width = width.max(1);
    let mut rows: Vec<Vec<Span<'static>>> = vec![Vec::new()];
    let mut used = 0;
    for segment in &line.segments {
        let style = theme.tone(segment.tone);
        let mut piece = String::new();
        for c in segment.text.chars() {
            let cells = c.width().unwrap_or(0);
            if used > 0 && used + cells > width {
                if let Some(row) = rows.last_mut() {
                    if !piece.is_empty() {
                        row.push(Span::styled(std::mem::take(&mut piece), style));
                    }
                }
                rows.push(Vec::new());
                used = 0;
            }
            piece.push(c);
            used += cells;
        }
        if let Some(row) = rows.last_mut() {
            if !piece.is_empty() {
                row.push(Span::styled(piece, style));
            }
        }
    }
    rows.into_iter().map(Line::from).collect()
}

/// The part of `text` that starts `columns` cells in.
fn skip_columns(text: &str, columns: usize) -> &str {
    let mut used = 0;
    for (i, c) in text.char_indices() {
        if used >= columns {
            return &text[i..];
        }
        used += c.width().unwrap_or(0);
    }
    ""
}

/// Smallest char-aligned column offset that keeps `cursor` inside `width`.
fn scroll_offset(text: &str, cursor: usize, width: usize) -> usize {
    let min = cursor.saturating_sub(width.saturating_sub(1));
    let mut column = 0;
    for c in text.chars() {
        if column >= min {
            return column;
        }
        column += c.width().unwrap_or(0);
    }
    column
}

fn draw_log(f: &mut Frame, lines: &[LogLine], scroll: usize, title: &str, focused: bool, theme: &Theme, area: Rect) {
    let block = Block::default()
        .borders(Borders::LEFT | Borders::RIGHT | Borders::TOP)
        .border_style(theme.border(focused))
        .title(title.to_string());
    let inner = block.inner(area);
    let height = usize::from(inner.height);

    let rows: Vec<Line> = lines
        .iter()
        .flat_map(|line| wrap(line, usize::from(inner.width), theme))
        .collect();
    let end = rows.len().saturating_sub(scroll.min(rows.len().saturating_sub(height)));
    let start = end.saturating_sub(height);
    let visible: Vec<Line> = rows[start..end].to_vec();

    f.render_widget(Paragraph::new(visible).block(block), area);
}

fn rgb([r, g, b]: [u8; 3]) -> Color {
    Color::Rgb(r, g, b)
}

fn draw_art(f: &mut Frame, art: &PreviewArt, title: &str, theme: &Theme, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border(true))
        .title(title.to_string());
    let lines: Vec<Line> = art
        .rows
        .iter()
        .map(|row| {
            Line::from(
                row.iter()
                    .map(|cell| Span::styled("▀", Style::default().fg(rgb(cell.top)).bg(rgb(cell.bottom))))
                    .collect::<Vec<_>>(),
            )
        })
        .collect();
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_input(f: &mut Frame, view: &View, state: &AppState, theme: &Theme, area: Rect) {
    let focused = view.focus() == Focus::Input && view.state().accepts_text();
    let block = Block::default().borders(Borders::ALL).border_style(theme.border(focused));
    let inner = block.inner(area);

    let prompt = view.state().prompt_text(state);
    let buffer = view.input().text();

    // Keep the cursor visible on long input by scrolling horizontally.
    let cursor = prompt.width() + view.input().cursor_column();
    let width = usize::from(inner.width.max(1));
    let offset = scroll_offset(&format!("{prompt}{buffer}"), cursor, width);
    let line = Line::from(vec![
        Span::styled(skip_columns(&prompt, offset).to_string(), theme.prompt()),
        Span::styled(
            skip_columns(buffer, offset.saturating_sub(prompt.width())).to_string(),
            theme.tone(Tone::Plain),
        ),
    ]);
    f.render_widget(Paragraph::new(line).block(block), area);

    if focused {
        let x = u16::try_from(cursor - offset).unwrap_or(0);
        f.set_cursor_position(Position::new(inner.x + x, inner.y));
    }
}

fn draw_footer(f: &mut Frame, view: &View, theme: &Theme, area: Rect) {
    let mut spans = Vec::new();
    for (key, action) in view.bindings().describe() {
        spans.push(Span::styled(format!(" {key}"), theme.prompt()));
        spans.push(Span::styled(format!(" {action} "), theme.tone(Tone::Dim)));
    }
    let hint = match view.focus() {
        Focus::Log => " │ ↑/↓ PgUp/PgDn scroll, Esc back",
        Focus::Input => " │ /help for commands",
    };
    spans.push(Span::styled(hint, theme.tone(Tone::Dim)));
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::format::Clock;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::backend::TestBackend;

    fn screen(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let width = usize::from(buffer.area.width);
        buffer
            .content
            .chunks(width)
            .map(|row| row.iter().map(ratatui::buffer::Cell::symbol).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_render_shows_prompt_log_and_footer() {
        let mut terminal = Terminal::new(TestBackend::new(60, 12)).unwrap();
        let mut view = View::new(Clock::default());
        view.info("hello from the log");

        render(&mut terminal, &view, &AppState::new(), &Theme::default()).unwrap();
        let text = screen(&terminal);

        assert!(text.contains("hello from the log"));
        assert!(text.contains("[No Guild | No Channel]> "));
        assert!(text.contains("C-c quit"));
        assert!(text.contains("Normal"));
    }

    #[test]
    fn test_wrap_splits_long_segments() {
        let line = LogLine::tone(Tone::Plain, "abcdefgh").push(Tone::Dim, "ij");
        let rows = wrap(&line, 4, &Theme::default());
        let text: Vec<String> = rows
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect();
        assert_eq!(text, vec!["abcd", "efgh", "ij"]);
    }

    fn hangul(text: &str) -> String {
        text.chars().filter(|c| ('가'..='힣').contains(c)).collect()
    }

    #[test]
    fn test_wrap_counts_wide_chars_as_two_cells() {
        let line = LogLine::tone(Tone::Plain, "ab가나다");
        let rows = wrap(&line, 5, &Theme::default());
        let text: Vec<String> = rows
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect();
        assert_eq!(text, vec!["ab가", "나다"]);
    }

    #[test]
    fn test_wide_log_text_is_not_truncated() {
        let mut terminal = Terminal::new(TestBackend::new(24, 12)).unwrap();
        let mut view = View::new(Clock::default());
        let text = "가나다라마바사아자차카타파하".repeat(2) + "끝";
        view.info(&text);

        render(&mut terminal, &view, &AppState::new(), &Theme::default()).unwrap();

        assert_eq!(hangul(&screen(&terminal)), text);
    }

    #[test]
    fn test_input_cursor_follows_wide_chars() {
        let mut terminal = Terminal::new(TestBackend::new(60, 12)).unwrap();
        let mut view = View::new(Clock::default());
        for c in "가나다라마".chars() {
            view.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
        }

        render(&mut terminal, &view, &AppState::new(), &Theme::default()).unwrap();

        // Prompt "[No Guild | No Channel]> " is 25 cells, then 5 wide chars.
        assert_eq!(terminal.backend_mut().get_cursor_position().unwrap(), Position::new(1 + 35, 9));
        assert!(screen(&terminal).contains("가"));
    }

    #[test]
    fn test_long_wide_input_scrolls_to_cursor() {
        let mut terminal = Terminal::new(TestBackend::new(60, 12)).unwrap();
        let mut view = View::new(Clock::default());
        let text = "가나다라마바사아자차".repeat(3);
        for c in text.chars() {
            view.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
        }

        render(&mut terminal, &view, &AppState::new(), &Theme::default()).unwrap();

        // 25 + 60 = 85 cells; the view starts at the first char boundary >= 28.
        assert_eq!(terminal.backend_mut().get_cursor_position().unwrap(), Position::new(1 + 56, 9));
        let shown = hangul(&screen(&terminal));
        assert!(text.ends_with(&shown));
        assert_eq!(shown.chars().count(), 28);
    }

    #[test]
    fn test_log_follows_tail() {
        let mut terminal = Terminal::new(TestBackend::new(40, 8)).unwrap();
        let mut view = View::new(Clock::default());
        for i in 0..30 {
            view.info(&format!("line {i}"));
        }
        render(&mut terminal, &view, &AppState::new(), &Theme::default()).unwrap();
        let text = screen(&terminal);
        assert!(text.contains("line 29"));
        assert!(!text.contains("line 0 "));
    }
}
