//! Shared Types
//!
//! Common types used across the handlers

use serde::Deserialize;

/// Upper bound for a single page
pub const MAX_PAGE_SIZE: u32 = 100;

/// Pagination query parameters
#[derive(Debug, Clone, Deserialize)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: u32,

    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    20
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl PaginationParams {
    /// Page number, 1-based (0 is treated as 1)
    pub fn page(&self) -> u32 {
        self.page.max(1)
    }

    /// Get limit for SQL queries
    pub fn limit(&self) -> u32 {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }

    /// Calculate offset for SQL queries
    pub fn offset(&self) -> u32 {
        (self.page() - 1) * self.limit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_and_clamping() {
        let p = PaginationParams {
            page: 3,
            page_size: 10,
        };
        assert_eq!(p.offset(), 20);

        let p = PaginationParams {
            page: 0,
            page_size: 1000,
        };
        assert_eq!(p.page(), 1);
        assert_eq!(p.limit(), MAX_PAGE_SIZE);
        assert_eq!(p.offset(), 0);
    }
}
