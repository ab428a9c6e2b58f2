use anyhow::{Context, Result};
use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::terminal;
use spdf_core::{Button, InputEvent, Key, Modifiers, ScreenRect, ViewerError};
use tracing::debug;

/// Size of one terminal cell in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellSize {
    pub width: u16,
    pub height: u16,
}

impl CellSize {
    /// Queries the terminal for its pixel geometry. Returns the cell size and
    /// the window rectangle in pixels.
    pub fn detect() -> Result<(Self, ScreenRect)> {
        let size = terminal::window_size().context("failed to query terminal size")?;
        if size.width == 0 || size.height == 0 || size.columns == 0 || size.rows == 0 {
            return Err(ViewerError::DisplaySetup(
                "terminal does not report its size in pixels".into(),
            )
            .into());
        }
        let cell = Self {
            width: (size.width / size.columns).max(1),
            height: (size.height / size.rows).max(1),
        };
        debug!(?cell, columns = size.columns, rows = size.rows, "terminal geometry");
        Ok((cell, cell.window(size.columns, size.rows)))
    }

    /// Pixel rectangle covered by a `columns` x `rows` window.
    pub fn window(&self, columns: u16, rows: u16) -> ScreenRect {
        ScreenRect::new(
            0,
            0,
            i32::from(columns) * i32::from(self.width),
            i32::from(rows) * i32::from(self.height),
        )
    }

    /// Centre of a cell in pixels.
    fn to_pixels(self, column: u16, row: u16) -> (i32, i32) {
        (
            i32::from(column) * i32::from(self.width) + i32::from(self.width) / 2,
            i32::from(row) * i32::from(self.height) + i32::from(self.height) / 2,
        )
    }
}

/// Turns crossterm events into session input.
#[derive(Debug, Clone)]
pub struct EventTranslator {
    cell: CellSize,
}

impl EventTranslator {
    pub fn new(cell: CellSize) -> Self {
        Self { cell }
    }

    pub fn translate(&self, event: Event) -> Option<InputEvent> {
        match event {
            Event::Key(key) => translate_key(key),
            Event::Mouse(mouse) => self.translate_mouse(mouse),
            Event::Resize(columns, rows) => {
                Some(InputEvent::GeometryChanged(self.cell.window(columns, rows)))
            }
            _ => None,
        }
    }

    fn translate_mouse(&self, mouse: MouseEvent) -> Option<InputEvent> {
        let (x, y) = self.cell.to_pixels(mouse.column, mouse.row);
        let event = match mouse.kind {
            MouseEventKind::Down(button) => InputEvent::ButtonPress {
                button: button_of(button),
                x,
                y,
            },
            MouseEventKind::Up(button) => InputEvent::ButtonRelease {
                button: button_of(button),
                x,
                y,
            },
            MouseEventKind::Drag(_) | MouseEventKind::Moved => InputEvent::PointerMotion { x, y },
            MouseEventKind::ScrollUp => InputEvent::ButtonPress {
                button: Button::WheelUp,
                x,
                y,
            },
            MouseEventKind::ScrollDown => InputEvent::ButtonPress {
                button: Button::WheelDown,
                x,
                y,
            },
            _ => return None,
        };
        Some(event)
    }
}

fn button_of(button: MouseButton) -> Button {
    match button {
        MouseButton::Left => Button::Primary,
        MouseButton::Middle => Button::Middle,
        MouseButton::Right => Button::Secondary,
    }
}

fn translate_key(event: KeyEvent) -> Option<InputEvent> {
    if event.kind == KeyEventKind::Release {
        return None;
    }

    let key = match event.code {
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::Esc => Key::Escape,
        KeyCode::Enter => Key::Enter,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::PageUp => Key::PageUp,
        KeyCode::PageDown => Key::PageDown,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        _ => Key::Other,
    };

    let mut modifiers = Modifiers::empty();
    if event.modifiers.contains(KeyModifiers::CONTROL) {
        modifiers |= Modifiers::CONTROL;
    }
    if event.modifiers.contains(KeyModifiers::ALT) {
        modifiers |= Modifiers::ALT;
    }
    // Shift is already folded into the character.
    if event.modifiers.contains(KeyModifiers::SHIFT) && !matches!(key, Key::Char(_)) {
        modifiers |= Modifiers::SHIFT;
    }

    Some(InputEvent::key(key, modifiers))
}
