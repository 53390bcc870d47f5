use fleetdesk_query::{PageRequest, total_pages};
use serde::Serialize;

/// Page controls of a list view.
///
/// Changing the page size or the filters always returns to page 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaginationState {
    page: u64,
    limit: u64,
    total_count: u64,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self::new(PageRequest::default().limit)
    }
}

impl PaginationState {
    #[must_use]
    pub fn new(limit: u64) -> Self {
        Self {
            page: 1,
            limit: limit.max(1),
            total_count: 0,
        }
    }

    #[must_use]
    pub fn page(&self) -> u64 {
        self.page
    }

    #[must_use]
    pub fn limit(&self) -> u64 {
        self.limit
    }

    #[must_use]
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    #[must_use]
    pub fn total_pages(&self) -> u64 {
        total_pages(self.total_count, self.limit)
    }

    #[must_use]
    pub fn request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    #[must_use]
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Record the total reported with the latest page. A shrinking total
    /// pulls the current page back into range.
    pub fn set_total(&mut self, total_count: u64) {
        self.total_count = total_count;
        self.page = self.page.min(self.total_pages());
    }

    pub fn next(&mut self) {
        if self.has_next() {
            self.page += 1;
        }
    }

    pub fn prev(&mut self) {
        if self.has_prev() {
            self.page -= 1;
        }
    }

    /// Jump to `page`, clamped to `1..=total_pages`.
    pub fn go_to(&mut self, page: u64) {
        self.page = page.clamp(1, self.total_pages());
    }

    pub fn set_limit(&mut self, limit: u64) {
        self.limit = limit.max(1);
        self.page = 1;
    }

    /// Filters changed; the old page number means nothing anymore.
    pub fn reset(&mut self) {
        self.page = 1;
    }
}
