//! Keyset pagination page

use serde::{Deserialize, Serialize};

/// One page of a keyset-paginated read.
///
/// `next_cursor` holds the ordering-column value of the last item when more
/// rows remain; passing it back to the executor continues the sequence with
/// an exclusive bound on that column. Pages are produced fresh on every
/// call and never persisted. A cursor computed from a page that has since
/// been overtaken by concurrent writes can skip or repeat rows; the layer
/// documents this rather than correcting it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CursorPage<T> {
    /// Items in requested order
    pub items: Vec<T>,
    /// Ordering-column value of the last item, present only when `has_more`
    pub next_cursor: Option<serde_json::Value>,
    /// Whether a follow-up call may return further rows
    pub has_more: bool,
}

impl<T> CursorPage<T> {
    /// An empty, exhausted page.
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
            has_more: false,
        }
    }

    /// Map the item type, preserving cursor metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> CursorPage<U> {
        CursorPage {
            items: self.items.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
            has_more: self.has_more,
        }
    }
}
