bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 1;
        const CONTROL = 1 << 1;
        const ALT = 1 << 2;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Escape,
    Enter,
    Backspace,
    Up,
    Down,
    Left,
    Right,
    PageUp,
    PageDown,
    Home,
    End,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierMatch {
    /// Matches regardless of held modifiers.
    Any,
    /// Matches only when no modifier is held.
    None,
    Exact(Modifiers),
}

impl ModifierMatch {
    pub fn matches(self, held: Modifiers) -> bool {
        match self {
            ModifierMatch::Any => true,
            ModifierMatch::None => held.is_empty(),
            ModifierMatch::Exact(mask) => held == mask,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    NextPage,
    PrevPage,
    FirstPage,
    LastPage,
    FitPage,
    FitWidth,
    ScrollDown,
    ScrollUp,
    PageDown,
    PageUp,
    Back,
    Reload,
    Copy,
    GotoPage,
    Search,
    PageIndicator,
    Magnify,
    RotateCw,
    RotateCcw,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortcut {
    pub modifiers: ModifierMatch,
    pub key: Key,
    pub action: Action,
}

impl Shortcut {
    pub fn new(modifiers: ModifierMatch, key: Key, action: Action) -> Self {
        Self {
            modifiers,
            key,
            action,
        }
    }
}

/// Ordered shortcut table. The first entry matching a key press wins.
#[derive(Debug, Clone)]
pub struct Keymap {
    shortcuts: Vec<Shortcut>,
}

impl Keymap {
    pub fn new(shortcuts: Vec<Shortcut>) -> Self {
        Self { shortcuts }
    }

    pub fn lookup(&self, key: &Key, held: Modifiers) -> Option<Action> {
        self.shortcuts
            .iter()
            .find(|s| s.key == *key && s.modifiers.matches(held))
            .map(|s| s.action)
    }
}

impl Default for Keymap {
    fn default() -> Self {
        use Action::*;
        use ModifierMatch::{Any, Exact};

        let none = ModifierMatch::None;
        let ctrl = Exact(Modifiers::CONTROL);

        Self::new(vec![
            Shortcut::new(Any, Key::Char('q'), Quit),
            Shortcut::new(none, Key::Escape, Quit),
            Shortcut::new(ctrl, Key::PageDown, NextPage),
            Shortcut::new(ctrl, Key::PageUp, PrevPage),
            Shortcut::new(ctrl, Key::Home, FirstPage),
            Shortcut::new(ctrl, Key::End, LastPage),
            Shortcut::new(none, Key::Char('z'), FitPage),
            Shortcut::new(none, Key::Char('w'), FitWidth),
            Shortcut::new(none, Key::Down, ScrollDown),
            Shortcut::new(none, Key::Up, ScrollUp),
            Shortcut::new(none, Key::PageDown, PageDown),
            Shortcut::new(none, Key::PageUp, PageUp),
            Shortcut::new(none, Key::Char('b'), Back),
            Shortcut::new(Any, Key::Char('r'), Reload),
            Shortcut::new(ctrl, Key::Char('c'), Copy),
            Shortcut::new(Any, Key::Char('g'), GotoPage),
            Shortcut::new(Any, Key::Char('s'), Search),
            Shortcut::new(none, Key::Char('/'), Search),
            Shortcut::new(none, Key::Char('p'), PageIndicator),
            Shortcut::new(none, Key::Char('m'), Magnify),
            Shortcut::new(none, Key::Char(']'), RotateCw),
            Shortcut::new(none, Key::Char('['), RotateCcw),
        ])
    }
}
