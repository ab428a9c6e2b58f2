#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    GotoPage,
    Search,
    PageIndicator,
    Magnify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptMode {
    Inactive,
    Display,
    Input,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Prompt {
    kind: PromptKind,
    label: String,
    value: String,
}

/// Single-line prompt shown in the status bar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusPrompt {
    current: Option<Prompt>,
}

impl StatusPrompt {
    /// Replaces whatever prompt was open.
    pub fn open(&mut self, kind: PromptKind, label: impl Into<String>) {
        self.current = Some(Prompt {
            kind,
            label: label.into(),
            value: String::new(),
        });
    }

    pub fn close(&mut self) {
        self.current = None;
    }

    pub fn kind(&self) -> Option<PromptKind> {
        self.current.as_ref().map(|p| p.kind)
    }

    pub fn mode(&self) -> PromptMode {
        match self.kind() {
            None => PromptMode::Inactive,
            Some(PromptKind::GotoPage | PromptKind::Search) => PromptMode::Input,
            Some(PromptKind::PageIndicator | PromptKind::Magnify) => PromptMode::Display,
        }
    }

    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }

    pub fn value(&self) -> &str {
        self.current.as_ref().map_or("", |p| p.value.as_str())
    }

    /// Appends to the buffer in input mode. Returns whether it changed.
    pub fn push_str(&mut self, text: &str) -> bool {
        if self.mode() != PromptMode::Input || text.is_empty() {
            return false;
        }
        match self.current.as_mut() {
            Some(p) => {
                p.value.push_str(text);
                true
            }
            None => false,
        }
    }

    /// Removes the last character. Returns whether one was removed.
    pub fn backspace(&mut self) -> bool {
        if self.mode() != PromptMode::Input {
            return false;
        }
        self.current
            .as_mut()
            .and_then(|p| p.value.pop())
            .is_some()
    }

    /// Text for the status bar: label, buffer and a caret while editing.
    pub fn display_text(&self) -> Option<String> {
        let prompt = self.current.as_ref()?;
        Some(match self.mode() {
            PromptMode::Input => format!("{}{}_", prompt.label, prompt.value),
            _ => prompt.label.clone(),
        })
    }
}
