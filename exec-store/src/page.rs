use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::record::{ExecutionId, ExecutionRecord};

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

/// Position after the last record of a page.
///
/// Encodes the `(created_at, id)` key of that record, so pages stay stable
/// when newer records are inserted between fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cursor {
    created_at_ms: i64,
    id: ExecutionId,
}

impl Cursor {
    pub fn after(record: &ExecutionRecord) -> Self {
        let (created_at_ms, id) = record.sort_key();
        Self { created_at_ms, id }
    }

    /// Whether `record` comes strictly after this cursor in newest-first order
    pub fn precedes(&self, record: &ExecutionRecord) -> bool {
        record.sort_key() < (self.created_at_ms, self.id)
    }

    pub fn encode(&self) -> String {
        URL_SAFE_NO_PAD.encode(format!("{}:{}", self.created_at_ms, self.id.0))
    }

    pub fn decode(token: &str) -> Result<Self, StoreError> {
        let invalid = || StoreError::InvalidCursor(token.to_string());

        let bytes = URL_SAFE_NO_PAD.decode(token).map_err(|_| invalid())?;
        let text = String::from_utf8(bytes).map_err(|_| invalid())?;
        let (millis, id) = text.split_once(':').ok_or_else(invalid)?;

        Ok(Self {
            created_at_ms: millis.parse().map_err(|_| invalid())?,
            id: ExecutionId(id.parse().map_err(|_| invalid())?),
        })
    }
}

impl TryFrom<String> for Cursor {
    type Error = StoreError;

    fn try_from(token: String) -> Result<Self, Self::Error> {
        Cursor::decode(&token)
    }
}

impl From<Cursor> for String {
    fn from(cursor: Cursor) -> Self {
        cursor.encode()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageRequest {
    pub cursor: Option<Cursor>,
    pub page_size: Option<usize>,
}

impl PageRequest {
    pub fn first(page_size: usize) -> Self {
        Self {
            cursor: None,
            page_size: Some(page_size),
        }
    }

    pub fn next(cursor: Cursor, page_size: usize) -> Self {
        Self {
            cursor: Some(cursor),
            page_size: Some(page_size),
        }
    }

    /// Requested size clamped to `1..=MAX_PAGE_SIZE`
    pub fn limit(&self) -> usize {
        self.page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Absent on the last page
    pub next_cursor: Option<Cursor>,
}

impl<T> Page<T> {
    pub fn is_done(&self) -> bool {
        self.next_cursor.is_none()
    }
}

/// Cut one page out of records already sorted newest first.
pub fn paginate(sorted: Vec<ExecutionRecord>, request: &PageRequest) -> Page<ExecutionRecord> {
    let limit = request.limit();
    let mut items: Vec<ExecutionRecord> = sorted
        .into_iter()
        .filter(|record| request.cursor.map_or(true, |c| c.precedes(record)))
        .take(limit + 1)
        .collect();

    let next_cursor = if items.len() > limit {
        items.truncate(limit);
        items.last().map(Cursor::after)
    } else {
        None
    };

    Page { items, next_cursor }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(id: u64, millis: i64) -> ExecutionRecord {
        ExecutionRecord {
            id: ExecutionId(id),
            user_id: "u1".to_string(),
            language: "javascript".to_string(),
            code: "1".to_string(),
            output: Some("1".to_string()),
            error: None,
            created_at: Utc.timestamp_millis_opt(millis).unwrap(),
        }
    }

    #[test]
    fn test_cursor_token_decodes() {
        let cursor = Cursor::after(&record(7, 1_700_000_000_123));
        assert_eq!(Cursor::decode(&cursor.encode()).unwrap(), cursor);
    }

    #[test]
    fn test_garbage_cursor_rejected() {
        for token in ["", "!!!", "bm9jb2xvbg"] {
            assert!(matches!(
                Cursor::decode(token),
                Err(StoreError::InvalidCursor(_))
            ));
        }
    }

    #[test]
    fn test_cursor_serializes_as_opaque_string() {
        let cursor = Cursor::after(&record(3, 10));
        let json = serde_json::to_value(cursor).unwrap();
        assert_eq!(json, serde_json::Value::String(cursor.encode()));
        let back: Cursor = serde_json::from_value(json).unwrap();
        assert_eq!(back, cursor);
    }

    #[test]
    fn test_limit_is_clamped() {
        assert_eq!(PageRequest::default().limit(), DEFAULT_PAGE_SIZE);
        assert_eq!(PageRequest::first(0).limit(), 1);
        assert_eq!(PageRequest::first(10_000).limit(), MAX_PAGE_SIZE);
    }

    #[test]
    fn test_paginate_walks_all_records() {
        let sorted = vec![record(4, 40), record(3, 30), record(2, 30), record(1, 10)];

        let first = paginate(sorted.clone(), &PageRequest::first(2));
        assert_eq!(
            first.items.iter().map(|r| r.id.0).collect::<Vec<_>>(),
            vec![4, 3]
        );

        let second = paginate(
            sorted.clone(),
            &PageRequest::next(first.next_cursor.unwrap(), 2),
        );
        assert_eq!(
            second.items.iter().map(|r| r.id.0).collect::<Vec<_>>(),
            vec![2, 1]
        );
        assert!(second.is_done());
    }

    #[test]
    fn test_exact_fit_has_no_next_page() {
        let page = paginate(vec![record(2, 20), record(1, 10)], &PageRequest::first(2));
        assert_eq!(page.items.len(), 2);
        assert!(page.is_done());
    }
}
