//! Paging limits applied to incoming page requests.

use serde::{Deserialize, Serialize};

use crate::Error;
use crate::page::PageRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueryLimits {
    /// Page size used when the caller does not pass one (default: 10)
    pub default_limit: u64,
    /// Largest accepted page size (default: 100)
    pub max_limit: u64,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
        }
    }
}

impl QueryLimits {
    /// Build a page request, falling back to the default limit.
    ///
    /// # Errors
    /// Returns `Error::InvalidPage` for page 0 and `Error::InvalidLimit` for a
    /// limit outside `1..=max_limit`.
    pub fn page_request(&self, page: Option<u64>, limit: Option<u64>) -> Result<PageRequest, Error> {
        let request = PageRequest::new(page.unwrap_or(1), limit.unwrap_or(self.default_limit));
        self.validate(request)?;
        Ok(request)
    }

    /// # Errors
    /// Same conditions as [`QueryLimits::page_request`].
    pub fn validate(&self, request: PageRequest) -> Result<(), Error> {
        if request.page < 1 {
            return Err(Error::InvalidPage(request.page));
        }
        if request.limit < 1 || request.limit > self.max_limit {
            return Err(Error::InvalidLimit {
                got: request.limit,
                max: self.max_limit,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply() {
        let limits = QueryLimits::default();
        assert_eq!(limits.page_request(None, None), Ok(PageRequest::new(1, 10)));
    }

    #[test]
    fn rejects_page_zero() {
        let limits = QueryLimits::default();
        assert_eq!(limits.page_request(Some(0), None), Err(Error::InvalidPage(0)));
    }

    #[test]
    fn rejects_out_of_range_limits() {
        let limits = QueryLimits {
            default_limit: 10,
            max_limit: 50,
        };
        assert!(matches!(
            limits.page_request(Some(1), Some(0)),
            Err(Error::InvalidLimit { got: 0, max: 50 })
        ));
        assert!(matches!(
            limits.page_request(Some(1), Some(51)),
            Err(Error::InvalidLimit { got: 51, max: 50 })
        ));
        assert!(limits.page_request(Some(2), Some(50)).is_ok());
    }
}
