//! Page arithmetic for the campground index.

use serde::Serialize;

/// Listings shown per index page.
pub const PER_PAGE: u32 = 8;

/// A 1-based page of a fixed size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    /// 1-based page number
    pub number: u32,
    /// Items per page
    pub size: u32,
}

impl PageRequest {
    /// A page, with numbers below 1 treated as the first page.
    pub fn new(number: u32, size: u32) -> Self {
        Self {
            number: number.max(1),
            size,
        }
    }

    /// Rows to skip before this page.
    pub fn skip(&self) -> u64 {
        u64::from(self.size) * u64::from(self.number - 1)
    }

    /// Rows on this page.
    pub fn limit(&self) -> u64 {
        u64::from(self.size)
    }
}

/// Reads the `page` query value. Absent, non-numeric and non-positive values mean page 1.
pub fn parse_page(raw: Option<&str>) -> u32 {
    raw.and_then(|value| value.trim().parse::<u32>().ok())
        .filter(|page| *page > 0)
        .unwrap_or(1)
}

/// Number of pages needed for `total_count` items.
pub fn total_pages(total_count: u64, size: u32) -> u32 {
    if size == 0 {
        return 0;
    }
    total_count.div_ceil(u64::from(size)) as u32
}

/// Escapes every regular-expression metacharacter so user input matches literally.
pub fn search_pattern(query: &str) -> String {
    regex::escape(query)
}
