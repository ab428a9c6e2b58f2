use std::cmp::Ordering;

use anyhow::Result;
use tracing::debug;

use crate::document::{DocumentBackend, TextQuery};
use crate::geometry::DocRect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// A search string with its trailing flags decoded.
///
/// `?` searches backwards, `~` ignores case and `%` matches whole words
/// only. Flags may appear in any order and may repeat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    pub direction: Direction,
    pub case_sensitive: bool,
    pub whole_word: bool,
}

impl SearchQuery {
    pub fn parse(input: &str) -> Option<Self> {
        let mut direction = Direction::Forward;
        let mut case_sensitive = true;
        let mut whole_word = false;

        let text = input.trim_end_matches(|c: char| match c {
            '?' => {
                direction = Direction::Backward;
                true
            }
            '~' => {
                case_sensitive = false;
                true
            }
            '%' => {
                whole_word = true;
                true
            }
            _ => false,
        });

        if text.is_empty() {
            return None;
        }

        Some(Self {
            text: text.to_owned(),
            direction,
            case_sensitive,
            whole_word,
        })
    }

    pub fn text_query(&self) -> TextQuery {
        TextQuery {
            text: self.text.clone(),
            case_sensitive: self.case_sensitive,
            whole_word: self.whole_word,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchMatch {
    pub page: usize,
    /// Hit bounds, top-left origin.
    pub rect: DocRect,
}

/// Continuation state for repeated searches.
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    last: Option<SearchMatch>,
}

impl SearchState {
    pub fn is_active(&self) -> bool {
        self.last.is_some()
    }

    pub fn record(&mut self, found: Option<SearchMatch>) {
        self.last = found;
    }

    pub fn reset(&mut self) {
        self.last = None;
    }

    /// Where a repeated search on `page` should resume from.
    pub fn resume_point(&self, page: usize) -> Option<DocRect> {
        self.last.filter(|m| m.page == page).map(|m| m.rect)
    }
}

fn reading_order(a: &DocRect, b: &DocRect) -> Ordering {
    a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x))
}

/// Looks for `query` starting at `start_page` and moving page by page in the
/// query's direction, without wrapping.
///
/// `resume` only applies to `start_page`: hits at or before it (after it
/// when searching backwards) are skipped.
pub fn find(
    backend: &dyn DocumentBackend,
    query: &SearchQuery,
    start_page: usize,
    resume: Option<DocRect>,
) -> Result<Option<SearchMatch>> {
    let page_count = backend.info().page_count;
    if start_page >= page_count {
        return Ok(None);
    }

    let text_query = query.text_query();
    let mut page = start_page;
    let mut resume = resume;

    loop {
        let mut hits = backend.find_text(page, &text_query)?;
        hits.sort_by(reading_order);

        let hit = match (query.direction, resume.take()) {
            (Direction::Forward, Some(last)) => hits
                .into_iter()
                .find(|h| reading_order(h, &last) == Ordering::Greater),
            (Direction::Backward, Some(last)) => hits
                .into_iter()
                .rev()
                .find(|h| reading_order(h, &last) == Ordering::Less),
            (Direction::Forward, None) => hits.into_iter().next(),
            (Direction::Backward, None) => hits.into_iter().next_back(),
        };

        if let Some(rect) = hit {
            debug!(page, ?rect, "search hit");
            return Ok(Some(SearchMatch { page, rect }));
        }

        page = match query.direction {
            Direction::Forward if page + 1 < page_count => page + 1,
            Direction::Backward if page > 0 => page - 1,
            _ => return Ok(None),
        };
    }
}
