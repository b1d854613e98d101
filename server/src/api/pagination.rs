//! Pagination
//!
//! Optional `limit`/`offset` query parameters shared by every list
//! endpoint. Validated bounds slice the ordered result set as
//! `[offset : offset + limit]`, with absent bounds open-ended.

use super::error::ApiError;

/// Validated pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Upper bound on returned rows; `None` means unbounded.
    pub limit: Option<i64>,
    /// Rows skipped from the start of the ordered set.
    pub offset: i64,
}

impl Page {
    /// Validate raw query parameters into a window.
    ///
    /// `limit` must be >= 1 and `offset` >= 0 when present.
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Result<Self, ApiError> {
        if let Some(limit) = limit {
            if limit < 1 {
                return Err(ApiError::Validation(
                    "limit must be a positive integer".into(),
                ));
            }
        }
        if let Some(offset) = offset {
            if offset < 0 {
                return Err(ApiError::Validation(
                    "offset must be a non-negative integer".into(),
                ));
            }
        }

        Ok(Self {
            limit,
            offset: offset.unwrap_or(0),
        })
    }
}
