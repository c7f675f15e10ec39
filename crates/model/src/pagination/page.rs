use crate::pagination::cursor::Cursor;
use serde::{Deserialize, Serialize};

/// Result of a single page fetch.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Page<T> {
    /// Items of this page, in service order.
    pub items: Vec<T>,

    /// Cursor that should be used to fetch the next page.
    pub next_cursor: Cursor,

    /// Whether the service has more pages after this one.
    pub more: bool,

    /// Time spent fetching (ms).
    #[serde(default)]
    pub took_ms: u128,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_cursor: Cursor, more: bool) -> Self {
        Page {
            items,
            next_cursor,
            more,
            took_ms: 0,
        }
    }

    /// A final page: no successor is requested after it.
    pub fn last(items: Vec<T>) -> Self {
        Page::new(items, Cursor::Start, false)
    }

    pub fn empty() -> Self {
        Page::last(Vec::new())
    }

    pub fn with_took_ms(mut self, took_ms: u128) -> Self {
        self.took_ms = took_ms;
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
            more: self.more,
            took_ms: self.took_ms,
        }
    }
}
