//! Page query parameters and page envelopes for list endpoints.

use actix_web::HttpRequest;
use pagination::{Page, PageRequest};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::Error;

use super::validation::page_request;

/// `page` and `pageSize` query parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// 1-based page number (default 1).
    #[param(minimum = 1)]
    pub page: Option<u32>,
    /// Items per page (default 20, maximum 100).
    #[param(minimum = 1, maximum = 100)]
    pub page_size: Option<u32>,
}

impl PageQuery {
    /// Validate into a [`PageRequest`].
    pub fn to_request(self) -> Result<PageRequest, Error> {
        page_request(self.page, self.page_size)
    }
}

/// Page of items with navigation links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageBody<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total_items: u64,
    pub total_pages: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
}

impl<T> PageBody<T> {
    /// Convert a domain page, deriving links from the request URL.
    pub fn from_page<D>(page: Page<D>, req: &HttpRequest) -> Self
    where
        T: From<D>,
    {
        let links = page.links(&req.full_url());
        let page_number = page.page();
        let page_size = page.page_size();
        let total_items = page.total_items();
        let total_pages = page.total_pages();
        Self {
            items: page.into_items().into_iter().map(T::from).collect(),
            page: page_number,
            page_size,
            total_items,
            total_pages,
            next: links.next,
            previous: links.previous,
        }
    }
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;

    use super::*;

    #[test]
    fn links_keep_filters() {
        let req = TestRequest::get()
            .uri("/api/v1/xp/ledger/?userId=7&page=1&pageSize=2")
            .to_http_request();
        let request = PageRequest::new(1, 2).expect("valid page");
        let page = Page::new(vec![1_i64, 2], request, 5);

        let body: PageBody<i64> = PageBody::from_page(page, &req);
        assert_eq!(body.total_pages, 3);
        assert!(body.previous.is_none());
        let next = body.next.expect("next link");
        assert!(next.ends_with("/api/v1/xp/ledger/?userId=7&page=2&pageSize=2"));
    }

    #[test]
    fn defaults_apply_when_query_is_empty() {
        let request = PageQuery::default().to_request().expect("defaults are valid");
        assert_eq!(request, PageRequest::default());
    }
}
