//! Pagination types for list endpoints.

use serde::{Deserialize, Serialize};

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Request parameters for paginated queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Page number (1-indexed).
    #[serde(default = "default_page")]
    pub page: u32,
    /// Number of items per page.
    #[serde(default = "default_limit")]
    pub limit: u32,
}

const fn default_page() -> u32 {
    1
}

const fn default_limit() -> u32 {
    20
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

impl PageRequest {
    /// Creates a page request, clamping page to at least 1 and limit to `1..=MAX_PAGE_SIZE`.
    #[must_use]
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Returns a copy with page and limit clamped into valid ranges.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self::new(self.page, self.limit)
    }

    /// Calculates the offset for database queries.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }

    /// Returns the limit for database queries.
    #[must_use]
    pub fn limit(&self) -> u64 {
        u64::from(self.limit)
    }
}

/// Response wrapper for paginated data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResponse<T> {
    /// The items in the current page.
    pub items: Vec<T>,
    /// Pagination metadata.
    pub pagination: PageMeta,
}

/// Pagination metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    /// Current page number.
    pub page: u32,
    /// Items per page.
    pub limit: u32,
    /// Total number of items across all pages.
    pub total: u64,
    /// Total number of pages, `ceil(total / limit)`.
    #[serde(rename = "totalPages")]
    pub total_pages: u64,
}

impl PageMeta {
    /// Builds pagination metadata for a request and a total row count.
    #[must_use]
    pub fn new(request: PageRequest, total: u64) -> Self {
        let limit = u64::from(request.limit.max(1));
        Self {
            page: request.page,
            limit: request.limit,
            total,
            total_pages: total.div_ceil(limit),
        }
    }
}

impl<T> PageResponse<T> {
    /// Creates a new paginated response.
    #[must_use]
    pub fn new(items: Vec<T>, request: PageRequest, total: u64) -> Self {
        Self {
            items,
            pagination: PageMeta::new(request, total),
        }
    }

    /// Maps the items while keeping the pagination metadata.
    #[must_use]
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> PageResponse<U> {
        PageResponse {
            items: self.items.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}
