//! Pagination types shared by the list endpoints

use serde::{Deserialize, Serialize};

use crate::utils::helpers::{calculate_offset, page_count};

/// Largest page a client may ask for
pub const MAX_PAGE_SIZE: i64 = 100;

/// `page` / `per_page` query parameters
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageRequest {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl PageRequest {
    pub fn new(page: i64, per_page: i64) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
        }
    }

    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    /// Requested page size, clamped to `1..=MAX_PAGE_SIZE`
    pub fn size(&self, default_size: i64) -> i64 {
        self.per_page.unwrap_or(default_size).clamp(1, MAX_PAGE_SIZE)
    }

    /// `(limit, offset)` for the SQL query
    pub fn limits(&self, default_size: i64) -> (i64, i64) {
        let size = self.size(default_size);
        (size, calculate_offset(self.page(), size))
    }
}

/// One page of a list result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub pages: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, request: &PageRequest, default_size: i64) -> Self {
        let per_page = request.size(default_size);
        Self {
            items,
            total,
            page: request.page(),
            per_page,
            pages: page_count(total, per_page),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            pages: self.pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_defaults_and_clamps() {
        let req = PageRequest::default();
        assert_eq!(req.limits(25), (25, 0));

        let req = PageRequest::new(3, 500);
        assert_eq!(req.limits(25), (MAX_PAGE_SIZE, 200));

        let req = PageRequest::new(-2, 0);
        assert_eq!(req.limits(9), (1, 0));
    }

    #[test]
    fn test_huge_page_number_does_not_overflow() {
        let (limit, offset) = PageRequest::new(i64::MAX, 100).limits(25);
        assert_eq!(limit, 100);
        assert_eq!(offset, i64::MAX);
    }

    #[test]
    fn test_page_metadata() {
        let page = Page::new(vec![1, 2, 3], 28, &PageRequest::new(4, 9), 25);
        assert_eq!(page.pages, 4);
        assert_eq!(page.per_page, 9);
        assert_eq!(page.page, 4);
    }
}
