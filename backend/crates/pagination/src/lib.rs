//! Page-number pagination primitives shared by Repair Desk read endpoints.
//!
//! Read endpoints (transition history, work-session segments, XP ledger)
//! accept a 1-based `page` and a bounded `pageSize`, and answer with a
//! [`Page`] envelope. The envelope is transport agnostic; HTTP adapters can
//! derive `next`/`previous` links from the request URL with [`Page::links`].

use serde::{Deserialize, Serialize};
use url::Url;

/// Page size used when the caller does not provide one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;

const PAGE_PARAM: &str = "page";
const PAGE_SIZE_PARAM: &str = "pageSize";

/// Errors raised while validating pagination parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PaginationError {
    /// Pages are numbered from one.
    #[error("page must be at least 1")]
    InvalidPage,
    /// The page size is zero or above the configured maximum.
    #[error("pageSize must be between 1 and {max}")]
    InvalidPageSize {
        /// Upper bound accepted for the page size.
        max: u32,
    },
}

/// Validated page selection.
///
/// # Examples
/// ```
/// use pagination::PageRequest;
///
/// let request = PageRequest::new(3, 10).expect("valid page");
/// assert_eq!(request.offset(), 20);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawPageRequest")]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

/// Wire shape of [`PageRequest`]; deserialisation validates through
/// [`PageRequest::new`].
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPageRequest {
    page: u32,
    page_size: u32,
}

impl TryFrom<RawPageRequest> for PageRequest {
    type Error = PaginationError;

    fn try_from(raw: RawPageRequest) -> Result<Self, Self::Error> {
        Self::new(raw.page, raw.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Validate an explicit page number and page size.
    pub fn new(page: u32, page_size: u32) -> Result<Self, PaginationError> {
        if page == 0 {
            return Err(PaginationError::InvalidPage);
        }
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(PaginationError::InvalidPageSize { max: MAX_PAGE_SIZE });
        }
        Ok(Self { page, page_size })
    }

    /// Build a request from optional query parameters, applying defaults.
    ///
    /// # Examples
    /// ```
    /// use pagination::{DEFAULT_PAGE_SIZE, PageRequest};
    ///
    /// let request = PageRequest::from_query(None, None).expect("defaults are valid");
    /// assert_eq!(request.page(), 1);
    /// assert_eq!(request.page_size(), DEFAULT_PAGE_SIZE);
    /// ```
    pub fn from_query(page: Option<u32>, page_size: Option<u32>) -> Result<Self, PaginationError> {
        Self::new(page.unwrap_or(1), page_size.unwrap_or(DEFAULT_PAGE_SIZE))
    }

    /// One-based page number.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Maximum number of items on the page.
    #[must_use]
    pub const fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of items skipped before this page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }

    /// Alias for [`PageRequest::page_size`] widened for query builders.
    #[must_use]
    pub fn limit(&self) -> u64 {
        u64::from(self.page_size)
    }
}

/// Navigation links derived from a page and its request URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageLinks {
    /// Link to the following page, when one exists.
    pub next: Option<String>,
    /// Link to the preceding page, when one exists.
    pub previous: Option<String>,
}

/// A single page of items plus the totals required to navigate the rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    items: Vec<T>,
    page: u32,
    page_size: u32,
    total_items: u64,
    total_pages: u64,
}

impl<T> Page<T> {
    /// Wrap items already selected by the storage layer.
    #[must_use]
    pub fn new(items: Vec<T>, request: PageRequest, total_items: u64) -> Self {
        Self {
            items,
            page: request.page(),
            page_size: request.page_size(),
            total_items,
            total_pages: total_items.div_ceil(u64::from(request.page_size())),
        }
    }

    /// Select the requested window from a fully materialised collection.
    ///
    /// # Examples
    /// ```
    /// use pagination::{Page, PageRequest};
    ///
    /// let request = PageRequest::new(2, 2).expect("valid page");
    /// let page = Page::from_items(vec![1, 2, 3, 4, 5], request);
    /// assert_eq!(page.items(), &[3, 4]);
    /// assert_eq!(page.total_pages(), 3);
    /// ```
    #[must_use]
    pub fn from_items(all: Vec<T>, request: PageRequest) -> Self {
        let total_items = u64::try_from(all.len()).unwrap_or(u64::MAX);
        let skip = usize::try_from(request.offset()).unwrap_or(usize::MAX);
        let take = usize::try_from(request.limit()).unwrap_or(usize::MAX);
        let items = all.into_iter().skip(skip).take(take).collect();
        Self::new(items, request, total_items)
    }

    /// Items on this page.
    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Consume the page and return its items.
    #[must_use]
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// One-based page number.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Requested page size.
    #[must_use]
    pub const fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Total number of items across all pages.
    #[must_use]
    pub const fn total_items(&self) -> u64 {
        self.total_items
    }

    /// Total number of pages for the current page size.
    #[must_use]
    pub const fn total_pages(&self) -> u64 {
        self.total_pages
    }

    /// Whether a following page exists.
    #[must_use]
    pub fn has_next(&self) -> bool {
        u64::from(self.page) < self.total_pages
    }

    /// Whether a preceding page exists.
    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.page > 1
    }

    /// Convert every item while keeping the page metadata.
    #[must_use]
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total_items: self.total_items,
            total_pages: self.total_pages,
        }
    }

    /// Fallible variant of [`Page::map`].
    pub fn try_map<U, E, F>(self, f: F) -> Result<Page<U>, E>
    where
        F: FnMut(T) -> Result<U, E>,
    {
        let items = self.items.into_iter().map(f).collect::<Result<Vec<_>, E>>()?;
        Ok(Page {
            items,
            page: self.page,
            page_size: self.page_size,
            total_items: self.total_items,
            total_pages: self.total_pages,
        })
    }

    /// Build `next`/`previous` links by rewriting the paging parameters of
    /// `request_url`. Other query parameters (filters) are preserved.
    ///
    /// # Examples
    /// ```
    /// use pagination::{Page, PageRequest};
    /// use url::Url;
    ///
    /// let request = PageRequest::new(1, 2).expect("valid page");
    /// let page = Page::from_items(vec!["a", "b", "c"], request);
    /// let url = Url::parse("http://localhost/xp/ledger/?userId=7").expect("valid url");
    /// let links = page.links(&url);
    /// assert_eq!(
    ///     links.next.as_deref(),
    ///     Some("http://localhost/xp/ledger/?userId=7&page=2&pageSize=2")
    /// );
    /// assert!(links.previous.is_none());
    /// ```
    #[must_use]
    pub fn links(&self, request_url: &Url) -> PageLinks {
        let next = self
            .has_next()
            .then(|| link_for(request_url, self.page.saturating_add(1), self.page_size));
        let previous = self
            .has_previous()
            .then(|| link_for(request_url, self.page.saturating_sub(1), self.page_size));
        PageLinks { next, previous }
    }
}

fn link_for(base: &Url, page: u32, page_size: u32) -> String {
    let retained: Vec<(String, String)> = base
        .query_pairs()
        .filter(|(key, _)| key != PAGE_PARAM && key != PAGE_SIZE_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut link = base.clone();
    link.query_pairs_mut()
        .clear()
        .extend_pairs(retained)
        .append_pair(PAGE_PARAM, &page.to_string())
        .append_pair(PAGE_SIZE_PARAM, &page_size.to_string());
    link.to_string()
}
