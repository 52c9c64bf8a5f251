//! Pagination parsing and bounds checking
//!
//! Raw `limit`/`offset` query values arrive as optional strings. They are
//! validated once into an immutable [`Pagination`] that every listing call takes.
//!
//! # Example
//!
//! ```rust
//! use catalog_service::pagination::Pagination;
//!
//! let page = Pagination::from_query(Some("25"), None).unwrap();
//! assert_eq!(page.limit(), 25);
//! assert_eq!(page.offset(), 0);
//!
//! assert!(Pagination::from_query(Some("0"), None).is_err());
//! ```

use serde::Deserialize;
use std::ops::Range;

use crate::error::{Error, Result};

/// Page size used when `limit` is absent or empty
pub const DEFAULT_LIMIT: u32 = 10;

/// Smallest accepted page size
pub const MIN_LIMIT: u32 = 1;

/// Largest accepted page size
pub const MAX_LIMIT: u32 = 100;

/// Offset used when `offset` is absent or empty
pub const DEFAULT_OFFSET: u64 = 0;

/// Validated pagination window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    limit: u32,
    offset: u64,
}

impl Pagination {
    /// Validate raw `limit` and `offset` query values
    ///
    /// Absent and empty values fall back to the defaults. Present values must
    /// be base-10 integers within bounds.
    pub fn from_query(limit: Option<&str>, offset: Option<&str>) -> Result<Self> {
        let limit = match non_empty(limit) {
            Some(raw) => parse_integer(raw, "limit")?,
            None => i64::from(DEFAULT_LIMIT),
        };
        let offset = match non_empty(offset) {
            Some(raw) => parse_integer(raw, "offset")?,
            None => DEFAULT_OFFSET as i64,
        };

        if limit < i64::from(MIN_LIMIT) {
            return Err(Error::Validation(
                "invalid limit parameter: must be greater than 0".to_string(),
            ));
        }
        if limit > i64::from(MAX_LIMIT) {
            return Err(Error::Validation(format!(
                "invalid limit parameter: must be less than {}",
                MAX_LIMIT
            )));
        }
        if offset < 0 {
            return Err(Error::Validation(
                "invalid offset parameter: must be greater than or equal to 0".to_string(),
            ));
        }

        Ok(Self {
            limit: limit as u32,
            offset: offset as u64,
        })
    }

    /// Maximum number of rows in the page
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Number of rows skipped before the page starts
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// Index range `[offset, offset + limit)` clamped to a result of `len` rows
    ///
    /// Empty when the offset is at or beyond `len`.
    pub fn window(&self, len: usize) -> Range<usize> {
        let start = usize::try_from(self.offset).unwrap_or(usize::MAX).min(len);
        let end = start.saturating_add(self.limit as usize).min(len);
        start..end
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: DEFAULT_OFFSET,
        }
    }
}

/// Raw pagination query-string parameters
///
/// Kept as strings so that malformed input is reported with the same
/// messages as [`Pagination::from_query`] rather than a deserializer error.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct PaginationQuery {
    /// Raw `limit` value
    #[serde(default)]
    pub limit: Option<String>,

    /// Raw `offset` value
    #[serde(default)]
    pub offset: Option<String>,
}

impl PaginationQuery {
    /// Validate into a [`Pagination`]
    pub fn validate(&self) -> Result<Pagination> {
        Pagination::from_query(self.limit.as_deref(), self.offset.as_deref())
    }
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.filter(|value| !value.is_empty())
}

fn parse_integer(raw: &str, name: &str) -> Result<i64> {
    raw.parse::<i64>()
        .map_err(|_| Error::Validation(format!("invalid {} parameter: must be a number", name)))
}
