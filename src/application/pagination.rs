//! Shared cursor pagination helpers.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct PostCursorPayload {
    pub_date: OffsetDateTime,
    id: i64,
}

/// Position after the last post of a page, in `(pub_date DESC, id DESC)` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostCursor {
    pub_date: OffsetDateTime,
    id: i64,
}

impl PostCursor {
    pub fn new(pub_date: OffsetDateTime, id: i64) -> Self {
        Self { pub_date, id }
    }

    pub fn pub_date(&self) -> OffsetDateTime {
        self.pub_date
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    /// Whether a post sorts strictly after this cursor.
    pub fn precedes(&self, pub_date: OffsetDateTime, id: i64) -> bool {
        (pub_date, id) < (self.pub_date, self.id)
    }

    pub fn encode(&self) -> String {
        let payload = PostCursorPayload {
            pub_date: self.pub_date,
            id: self.id,
        };
        let serialized =
            serde_json::to_vec(&payload).expect("serializing post cursor payload should succeed");
        URL_SAFE_NO_PAD.encode(serialized)
    }

    pub fn decode(cursor: &str) -> Result<Self, PaginationError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(cursor)
            .map_err(|err| PaginationError::InvalidCursor(err.to_string()))?;
        let payload: PostCursorPayload = serde_json::from_slice(&bytes)
            .map_err(|err| PaginationError::InvalidCursor(err.to_string()))?;
        Ok(Self {
            pub_date: payload.pub_date,
            id: payload.id,
        })
    }
}

/// Cursor-aware pagination request.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest<C> {
    pub limit: u32,
    pub cursor: Option<C>,
}

impl<C> PageRequest<C> {
    pub fn new(limit: u32, cursor: Option<C>) -> Self {
        Self { limit, cursor }
    }

    /// Rows to fetch so that the presence of a following page can be detected.
    pub fn fetch_limit(&self) -> i64 {
        i64::from(self.limit) + 1
    }
}

/// Cursor-aware page result.
#[derive(Debug, Clone, Serialize)]
pub struct CursorPage<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

impl<T> CursorPage<T> {
    /// Build a page from up to `limit + 1` ordered rows.
    ///
    /// The extra row only signals that another page exists; the cursor is
    /// taken from the last row that is kept.
    pub fn from_overfetch(mut items: Vec<T>, limit: u32, cursor_of: impl Fn(&T) -> String) -> Self {
        let limit = limit as usize;
        let has_more = items.len() > limit;
        items.truncate(limit);
        let next_cursor = if has_more {
            items.last().map(cursor_of)
        } else {
            None
        };
        Self { items, next_cursor }
    }
}

#[derive(Debug, Error)]
pub enum PaginationError {
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn post_cursor_round_trip() {
        let when = datetime!(2024-12-01 12:00 UTC);
        let cursor = PostCursor::new(when, 42);
        let decoded = PostCursor::decode(&cursor.encode()).expect("decoded post cursor");

        assert_eq!(decoded.pub_date(), when);
        assert_eq!(decoded.id(), 42);
    }

    #[test]
    fn decoding_invalid_cursor_reports_error() {
        let err = PostCursor::decode("not-base64!").expect_err("invalid cursor rejected");
        assert!(matches!(err, PaginationError::InvalidCursor(_)));
    }

    #[test]
    fn cursor_ordering_breaks_ties_by_id() {
        let when = datetime!(2024-12-01 12:00 UTC);
        let cursor = PostCursor::new(when, 5);

        assert!(cursor.precedes(when, 4));
        assert!(!cursor.precedes(when, 5));
        assert!(cursor.precedes(datetime!(2024-11-30 12:00 UTC), 99));
        assert!(!cursor.precedes(datetime!(2024-12-02 12:00 UTC), 1));
    }

    #[test]
    fn overfetch_sets_next_cursor_only_when_more_rows_exist() {
        let page = CursorPage::from_overfetch(vec![1, 2, 3], 2, |n| n.to_string());
        assert_eq!(page.items, vec![1, 2]);
        assert_eq!(page.next_cursor.as_deref(), Some("2"));

        let page = CursorPage::from_overfetch(vec![1, 2], 2, |n| n.to_string());
        assert_eq!(page.items, vec![1, 2]);
        assert!(page.next_cursor.is_none());
    }
}
