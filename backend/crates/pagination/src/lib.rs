//! Page-number pagination primitives shared by listing endpoints.
//!
//! Callers describe their bounds once as [`PageLimits`], turn untrusted query
//! parameters into a clamped [`PageRequest`], and answer with a [`Page`]
//! carrying [`PaginationMeta`] so every listing exposes the same metadata
//! shape.

use serde::{Deserialize, Serialize};

/// Default and maximum page sizes for one listing endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    default_limit: u32,
    max_limit: u32,
}

impl PageLimits {
    /// Build limits, coercing `max_limit` to at least one and
    /// `default_limit` into `1..=max_limit`.
    ///
    /// # Examples
    /// ```
    /// use pagination::PageLimits;
    ///
    /// let limits = PageLimits::new(25, 100);
    /// assert_eq!(limits.default_limit(), 25);
    /// assert_eq!(limits.max_limit(), 100);
    /// ```
    #[must_use]
    pub const fn new(default_limit: u32, max_limit: u32) -> Self {
        let max = if max_limit == 0 { 1 } else { max_limit };
        let default = if default_limit == 0 {
            1
        } else if default_limit > max {
            max
        } else {
            default_limit
        };
        Self {
            default_limit: default,
            max_limit: max,
        }
    }

    /// Page size applied when the caller omits one.
    #[must_use]
    pub const fn default_limit(&self) -> u32 {
        self.default_limit
    }

    /// Largest page size a caller may request.
    #[must_use]
    pub const fn max_limit(&self) -> u32 {
        self.max_limit
    }
}

/// A validated one-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl PageRequest {
    /// Clamp raw query values into a usable request.
    ///
    /// Missing or non-positive pages fall back to the first page. A missing
    /// or zero limit uses the default; other values are clamped into
    /// `1..=max_limit`.
    ///
    /// # Examples
    /// ```
    /// use pagination::{PageLimits, PageRequest};
    ///
    /// let limits = PageLimits::new(25, 100);
    /// let request = PageRequest::from_query(Some(3), Some(500), limits);
    /// assert_eq!(request.page(), 3);
    /// assert_eq!(request.limit(), 100);
    /// assert_eq!(request.offset(), 200);
    /// ```
    #[must_use]
    pub fn from_query(page: Option<i64>, limit: Option<i64>, limits: PageLimits) -> Self {
        let page = page
            .filter(|value| *value >= 1)
            .map_or(1, |value| u32::try_from(value).unwrap_or(u32::MAX));
        let limit = match limit {
            None | Some(0) => limits.default_limit(),
            Some(value) => {
                let bounded = value.clamp(1, i64::from(limits.max_limit()));
                u32::try_from(bounded).unwrap_or(limits.max_limit())
            }
        };
        Self { page, limit }
    }

    /// First page using the default size of `limits`.
    #[must_use]
    pub const fn first(limits: PageLimits) -> Self {
        Self {
            page: 1,
            limit: limits.default_limit(),
        }
    }

    /// One-based page number.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Page size.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Number of items preceding this page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

/// Pagination metadata returned alongside a page of items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    /// One-based page number that was served.
    pub current_page: u32,
    /// Number of pages available for the current total.
    pub total_pages: u64,
    /// Total number of items across every page.
    pub total_count: u64,
    /// Page size used to slice the items.
    pub page_size: u32,
    /// Whether a following page exists.
    pub has_next_page: bool,
    /// Whether a preceding page exists.
    pub has_previous_page: bool,
}

impl PaginationMeta {
    /// Derive metadata for `request` given the total item count.
    ///
    /// # Examples
    /// ```
    /// use pagination::{PageLimits, PageRequest, PaginationMeta};
    ///
    /// let request = PageRequest::from_query(Some(2), Some(10), PageLimits::new(25, 100));
    /// let meta = PaginationMeta::new(request, 35);
    /// assert_eq!(meta.total_pages, 4);
    /// assert!(meta.has_next_page);
    /// assert!(meta.has_previous_page);
    /// ```
    #[must_use]
    pub fn new(request: PageRequest, total_count: u64) -> Self {
        let total_pages = total_count.div_ceil(u64::from(request.limit()));
        Self {
            current_page: request.page(),
            total_pages,
            total_count,
            page_size: request.limit(),
            has_next_page: u64::from(request.page()) < total_pages,
            has_previous_page: request.page() > 1,
        }
    }
}

/// A single page of items plus its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items on this page, in listing order.
    pub items: Vec<T>,
    /// Metadata describing where the page sits in the full listing.
    pub pagination: PaginationMeta,
}

impl<T> Page<T> {
    /// Assemble a page from already-sliced items.
    #[must_use]
    pub fn new(items: Vec<T>, request: PageRequest, total_count: u64) -> Self {
        Self {
            items,
            pagination: PaginationMeta::new(request, total_count),
        }
    }

    /// Transform every item while keeping the metadata.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}

#[cfg(test)]
mod tests {
    //! Clamping and metadata behaviour.

    use super::*;
    use rstest::rstest;

    const LIMITS: PageLimits = PageLimits::new(25, 100);

    #[rstest]
    #[case(None, None, 1, 25)]
    #[case(Some(0), Some(0), 1, 25)]
    #[case(Some(-4), Some(-1), 1, 1)]
    #[case(Some(7), Some(40), 7, 40)]
    #[case(Some(2), Some(10_000), 2, 100)]
    fn from_query_clamps_values(
        #[case] page: Option<i64>,
        #[case] limit: Option<i64>,
        #[case] expected_page: u32,
        #[case] expected_limit: u32,
    ) {
        let request = PageRequest::from_query(page, limit, LIMITS);
        assert_eq!(request.page(), expected_page);
        assert_eq!(request.limit(), expected_limit);
    }

    #[rstest]
    #[case(0, 0, false)]
    #[case(25, 1, false)]
    #[case(26, 2, true)]
    #[case(100, 4, true)]
    fn meta_counts_pages(#[case] total: u64, #[case] pages: u64, #[case] has_next: bool) {
        let meta = PaginationMeta::new(PageRequest::first(LIMITS), total);
        assert_eq!(meta.total_pages, pages);
        assert_eq!(meta.has_next_page, has_next);
        assert!(!meta.has_previous_page);
    }

    #[rstest]
    fn limits_coerce_inconsistent_bounds() {
        let limits = PageLimits::new(50, 10);
        assert_eq!(limits.default_limit(), 10);
        assert_eq!(PageLimits::new(0, 0).max_limit(), 1);
    }

    #[rstest]
    fn meta_serialises_in_camel_case() {
        let meta = PaginationMeta::new(PageRequest::first(LIMITS), 3);
        let value = serde_json::to_value(meta).expect("serialise meta");
        assert_eq!(value["currentPage"], 1);
        assert_eq!(value["totalCount"], 3);
        assert_eq!(value["hasPreviousPage"], false);
    }

    #[rstest]
    fn map_keeps_metadata() {
        let page = Page::new(vec![1, 2], PageRequest::first(LIMITS), 2).map(|n| n * 10);
        assert_eq!(page.items, vec![10, 20]);
        assert_eq!(page.pagination.total_count, 2);
    }
}
