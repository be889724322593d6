//! Full-screen overlay rendering and key input for the selection loop.
//!
//! The overlay repaints the captured pane contents inside the hidden pane
//! and layers labels, highlights, and a status message on top. Drawing is a
//! pure function of [`RenderState`] so identical state always produces an
//! identical frame.

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::prelude::*;
use std::io::{self, Stdout};
use std::time::Duration;

use crate::align::{ScreenPos, Viewport};

/// A key press in the selection loop, canonicalized for comparison against
/// configured key lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Esc,
    Ctrl(char),
}

impl Key {
    /// Parse one configured key token: `Escape`, `Enter`, `Space`, `^C`, or
    /// a single literal character. Unknown tokens are dropped.
    pub fn parse(token: &str) -> Option<Key> {
        match token {
            "Escape" | "Esc" => return Some(Key::Esc),
            "Enter" => return Some(Key::Enter),
            "Space" => return Some(Key::Char(' ')),
            _ => {}
        }
        let mut chars = token.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some('^'), Some(c), None) => Some(Key::Ctrl(c.to_ascii_lowercase())),
            (Some(c), None, _) => Some(Key::Char(c)),
            _ => None,
        }
    }

    /// Parse a whitespace-separated key list.
    pub fn parse_list(tokens: &str) -> Vec<Key> {
        tokens.split_whitespace().filter_map(Key::parse).collect()
    }

    pub fn printable_char(self) -> Option<char> {
        match self {
            Key::Char(c) if !c.is_control() => Some(c),
            _ => None,
        }
    }
}

/// A label pinned to a screen position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledSpot {
    pub pos: ScreenPos,
    pub label: String,
}

/// Everything the overlay needs to paint one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderState {
    /// Captured pane size; content is clipped to it.
    pub pane: (usize, usize),
    /// Processed display lines (tabs expanded, non-printables stripped).
    pub lines: Vec<String>,
    pub labels: Vec<LabeledSpot>,
    /// How many label chars have been keyed in so far.
    pub typed: usize,
    /// Single highlighted cell (first easy-copy anchor).
    pub highlight: Option<ScreenPos>,
    /// Inclusive highlighted ranges.
    pub ranges: Vec<(ScreenPos, ScreenPos)>,
    /// Message shown bottom-right.
    pub status: Option<String>,
}

impl RenderState {
    pub fn new(viewport: Viewport, lines: Vec<String>) -> RenderState {
        RenderState {
            pane: (viewport.width, viewport.height),
            lines,
            ..RenderState::default()
        }
    }
}

fn label_head_style() -> Style {
    Style::default().fg(Color::Red)
}

fn label_tail_style() -> Style {
    Style::default().fg(Color::Yellow)
}

fn highlight_style() -> Style {
    Style::default().fg(Color::Green).bg(Color::Yellow)
}

fn status_style() -> Style {
    Style::default().fg(Color::Red)
}

/// Paint one frame from the state. Pure: no side effects beyond the buffer.
pub fn draw(frame: &mut Frame, state: &RenderState) {
    let area = frame.area();
    let line_width = state.pane.0.min(area.width as usize);
    let max_row = state
        .lines
        .len()
        .min(state.pane.1)
        .min(area.height as usize);
    let buf = frame.buffer_mut();

    for (row, line) in state.lines.iter().enumerate().take(max_row) {
        for (col, c) in line.chars().take(line_width).enumerate() {
            if let Some(cell) = buf.cell_mut((col as u16, row as u16)) {
                cell.set_char(c);
            }
        }
    }

    for &(start, end) in &state.ranges {
        paint_range(buf, start, end, line_width, max_row);
    }

    for spot in &state.labels {
        let visible: Vec<char> = spot.label.chars().skip(state.typed).collect();
        if visible.is_empty() || spot.pos.y >= max_row {
            continue;
        }
        for (i, c) in visible.iter().enumerate() {
            let col = spot.pos.x + i;
            if col >= line_width {
                break;
            }
            let style = if i == 0 {
                label_head_style()
            } else {
                label_tail_style()
            };
            if let Some(cell) = buf.cell_mut((col as u16, spot.pos.y as u16)) {
                cell.set_char(*c).set_style(style);
            }
        }
    }

    if let Some(pos) = state.highlight {
        if pos.x < line_width && pos.y < max_row {
            if let Some(cell) = buf.cell_mut((pos.x as u16, pos.y as u16)) {
                cell.set_style(highlight_style());
            }
        }
    }

    if let Some(msg) = &state.status {
        let len = msg.chars().count().min(area.width as usize);
        let x = area.width as usize - len;
        for (i, c) in msg.chars().take(len).enumerate() {
            if let Some(cell) = buf.cell_mut(((x + i) as u16, area.height.saturating_sub(1))) {
                cell.set_char(c).set_style(status_style());
            }
        }
    }
}

fn paint_range(
    buf: &mut Buffer,
    start: ScreenPos,
    end: ScreenPos,
    line_width: usize,
    max_row: usize,
) {
    for row in start.y..=end.y.min(max_row.saturating_sub(1)) {
        let (lo, hi) = if row == start.y && row == end.y {
            (start.x, end.x)
        } else if row == start.y {
            (start.x, line_width.saturating_sub(1))
        } else if row == end.y {
            (0, end.x)
        } else {
            (0, line_width.saturating_sub(1))
        };
        for col in lo..=hi.min(line_width.saturating_sub(1)) {
            if let Some(cell) = buf.cell_mut((col as u16, row as u16)) {
                cell.set_style(highlight_style());
            }
        }
    }
}

/// The live overlay: a raw-mode alternate-screen terminal plus the current
/// render state. Terminal modes are restored on drop, whichever way the
/// selection ends.
pub struct Screen {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    pub state: RenderState,
    cancel_keys: Vec<Key>,
}

impl Screen {
    pub fn enter(
        viewport: Viewport,
        lines: Vec<String>,
        cancel_keys: Vec<Key>,
    ) -> Result<Screen> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, crossterm::cursor::Hide)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(Screen {
            terminal,
            state: RenderState::new(viewport, lines),
            cancel_keys,
        })
    }

    pub fn render(&mut self) -> Result<()> {
        let state = &self.state;
        self.terminal.draw(|frame| draw(frame, state))?;
        Ok(())
    }

    /// Block until the next usable key. Returns `None` when a cancel key was
    /// pressed. Resize notifications update the frame and keep waiting; they
    /// are never handed to the caller as input.
    pub fn next_key(&mut self) -> Result<Option<Key>> {
        loop {
            match event::read()? {
                Event::Key(ev) => {
                    if let Some(key) = map_key(ev) {
                        if self.cancel_keys.contains(&key) {
                            return Ok(None);
                        }
                        return Ok(Some(key));
                    }
                }
                Event::Resize(..) => {
                    self.render()?;
                }
                _ => {}
            }
        }
    }

    /// Block until a printable character (or cancel).
    pub fn next_printable(&mut self) -> Result<Option<char>> {
        loop {
            match self.next_key()? {
                None => return Ok(None),
                Some(key) => {
                    if let Some(c) = key.printable_char() {
                        return Ok(Some(c));
                    }
                }
            }
        }
    }

    /// Flash highlight ranges on top of the current frame, then restore it.
    pub fn flash_ranges(
        &mut self,
        ranges: &[(ScreenPos, ScreenPos)],
        hold: Duration,
        preflash: Option<Duration>,
    ) -> Result<()> {
        if let Some(delay) = preflash {
            self.render()?;
            std::thread::sleep(delay);
        }
        let depth = self.state.ranges.len();
        self.state.ranges.extend_from_slice(ranges);
        self.render()?;
        std::thread::sleep(hold);
        self.state.ranges.truncate(depth);
        self.render()?;
        Ok(())
    }
}

impl Drop for Screen {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(
            io::stdout(),
            LeaveAlternateScreen,
            crossterm::cursor::Show
        );
    }
}

fn map_key(ev: KeyEvent) -> Option<Key> {
    if ev.kind == KeyEventKind::Release {
        return None;
    }
    match ev.code {
        KeyCode::Esc => Some(Key::Esc),
        KeyCode::Enter => Some(Key::Enter),
        KeyCode::Char(c) if ev.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(Key::Ctrl(c.to_ascii_lowercase()))
        }
        KeyCode::Char(c) => Some(Key::Char(c)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_tokens_parse_like_tmux_option_values() {
        assert_eq!(Key::parse("Escape"), Some(Key::Esc));
        assert_eq!(Key::parse("Enter"), Some(Key::Enter));
        assert_eq!(Key::parse("Space"), Some(Key::Char(' ')));
        assert_eq!(Key::parse("^C"), Some(Key::Ctrl('c')));
        assert_eq!(Key::parse("n"), Some(Key::Char('n')));
        assert_eq!(Key::parse("F12"), None);
        assert_eq!(
            Key::parse_list("Escape Enter ^C"),
            vec![Key::Esc, Key::Enter, Key::Ctrl('c')]
        );
    }

    #[test]
    fn control_keys_are_not_printable() {
        assert_eq!(Key::Char('a').printable_char(), Some('a'));
        assert_eq!(Key::Ctrl('c').printable_char(), None);
        assert_eq!(Key::Esc.printable_char(), None);
    }

    #[test]
    fn drawing_identical_state_is_idempotent() {
        let state = RenderState {
            pane: (20, 3),
            lines: vec!["alpha beta".into(), "gamma".into()],
            labels: vec![
                LabeledSpot {
                    pos: ScreenPos::new(0, 0),
                    label: "a".into(),
                },
                LabeledSpot {
                    pos: ScreenPos::new(6, 0),
                    label: "s".into(),
                },
            ],
            typed: 0,
            highlight: Some(ScreenPos::new(0, 1)),
            ranges: vec![(ScreenPos::new(2, 0), ScreenPos::new(4, 0))],
            status: Some("INPUT CHAR".into()),
        };

        let backend = ratatui::backend::TestBackend::new(20, 3);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| draw(f, &state)).unwrap();
        let first = terminal.backend().buffer().clone();
        terminal.draw(|f| draw(f, &state)).unwrap();
        let second = terminal.backend().buffer().clone();
        assert_eq!(first, second);
    }

    #[test]
    fn typed_prefix_shifts_label_tail_left() {
        let state = RenderState {
            pane: (10, 1),
            lines: vec!["xxxxxxxxxx".into()],
            labels: vec![LabeledSpot {
                pos: ScreenPos::new(2, 0),
                label: "ab".into(),
            }],
            typed: 1,
            ..RenderState::default()
        };
        let backend = ratatui::backend::TestBackend::new(10, 1);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| draw(f, &state)).unwrap();
        let buf = terminal.backend().buffer();
        // Only 'b' remains, drawn at the match position.
        assert_eq!(buf.cell((2, 0)).unwrap().symbol(), "b");
        assert_eq!(buf.cell((3, 0)).unwrap().symbol(), "x");
    }
}
