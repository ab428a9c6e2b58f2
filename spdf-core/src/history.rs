/// A place to return to after following a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryEntry {
    pub page: usize,
    /// Vertical placement offset of the page at the time of the jump.
    pub offset: i32,
}

#[derive(Debug, Clone, Default)]
pub struct NavigationHistory {
    entries: Vec<HistoryEntry>,
}

impl NavigationHistory {
    pub fn push(&mut self, page: usize, offset: i32) {
        self.entries.push(HistoryEntry { page, offset });
    }

    pub fn pop(&mut self) -> Option<HistoryEntry> {
        self.entries.pop()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
