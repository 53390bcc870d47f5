use serde::{Deserialize, Serialize};

use crate::RowRange;

/// One-based page request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    #[must_use]
    pub fn new(page: u64, limit: u64) -> Self {
        Self { page, limit }
    }

    /// Row offset of the first item on this page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }

    #[must_use]
    pub fn range(&self) -> RowRange {
        RowRange {
            offset: self.offset(),
            limit: self.limit,
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, limit: 10 }
    }
}

/// `max(1, ceil(total_count / limit))`
#[must_use]
pub fn total_pages(total_count: u64, limit: u64) -> u64 {
    if limit == 0 {
        return 1;
    }
    total_count.div_ceil(limit).max(1)
}

/// A page of items plus the totals needed to render pagination controls.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub page: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(items: Vec<T>, total_count: u64, request: PageRequest) -> Self {
        Self {
            items,
            total_count,
            page: request.page,
            total_pages: total_pages(total_count, request.limit),
        }
    }

    /// Page with no items; used when the caller may not see any data.
    #[must_use]
    pub fn empty(request: PageRequest) -> Self {
        Self::new(Vec::new(), 0, request)
    }

    #[must_use]
    pub fn map_items<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            page: self.page,
            total_pages: self.total_pages,
        }
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn total_pages_is_at_least_one() {
        assert_eq!(total_pages(0, 10), 1);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(25, 10), 3);
    }

    #[test]
    fn offset_for_first_page_is_zero() {
        assert_eq!(PageRequest::new(1, 20).offset(), 0);
        assert_eq!(PageRequest::new(4, 20).offset(), 60);
    }

    #[test]
    fn empty_page_reports_single_page() {
        let page: Page<u8> = Page::empty(PageRequest::new(1, 10));
        assert!(page.items.is_empty());
        assert_eq!(page.total_pages, 1);
        assert!(!page.has_next());
    }

    #[test]
    fn map_items_keeps_totals() {
        let page = Page::new(vec![1, 2], 12, PageRequest::new(1, 2)).map_items(|n| n * 10);
        assert_eq!(page.items, vec![10, 20]);
        assert_eq!(page.total_pages, 6);
        assert!(page.has_next());
    }
}
