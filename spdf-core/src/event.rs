use crate::geometry::ScreenRect;
use crate::keymap::{Key, Modifiers};
use crate::surface::DrawOp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Primary,
    Middle,
    Secondary,
    WheelUp,
    WheelDown,
}

/// Input delivered by the windowing layer. Coordinates are surface pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Expose(ScreenRect),
    GeometryChanged(ScreenRect),
    KeyPress {
        key: Key,
        modifiers: Modifiers,
        /// Printable text produced by the key, if any.
        text: Option<String>,
    },
    ButtonPress {
        button: Button,
        x: i32,
        y: i32,
    },
    ButtonRelease {
        button: Button,
        x: i32,
        y: i32,
    },
    PointerMotion {
        x: i32,
        y: i32,
    },
    ClientClose,
}

impl InputEvent {
    /// Key press with the text a plain character key would produce.
    pub fn key(key: Key, modifiers: Modifiers) -> Self {
        let text = match &key {
            Key::Char(c) if !modifiers.intersects(Modifiers::CONTROL | Modifiers::ALT) => {
                Some(c.to_string())
            }
            _ => None,
        };
        InputEvent::KeyPress {
            key,
            modifiers,
            text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionTarget {
    /// Selection-buffer style ownership (X11 PRIMARY).
    Primary,
    Clipboard,
}

/// Work the session asks its host to carry out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Draw(DrawOp),
    /// Repaint this region; hosts feed it back as an `Expose`.
    Damage(ScreenRect),
    SetSelection {
        target: SelectionTarget,
        text: String,
    },
    /// Reopen the document and hand the result to `Session::reload`.
    Reload,
    Quit,
}
