use axum::http::Uri;
use serde::{Deserialize, Serialize};

use crate::AppConfig;

const DEFAULT_LIMIT: i64 = 6;
const MAX_LIMIT: i64 = 100;

/// Page-number pagination: `page` is 1-based, `limit` is clamped to `1..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PageParams {
    pub page: i64,
    pub limit: i64,
}

impl PageParams {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        }
    }

    /// Saturates, so a huge `page` asks for rows past the end instead of overflowing.
    pub fn offset(self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    pub fn params(&self) -> PageParams {
        PageParams::new(self.page, self.limit)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// `uri` is the request's own URI; the links repeat its query with `page` swapped out.
    pub fn new(
        results: Vec<T>,
        count: i64,
        params: PageParams,
        config: &AppConfig,
        uri: &Uri,
    ) -> Self {
        let has_next = params.offset().saturating_add(params.limit) < count;
        let has_previous = params.page > 1;

        Self {
            count,
            next: has_next.then(|| page_link(config, uri, params.page + 1)),
            previous: has_previous.then(|| page_link(config, uri, params.page - 1)),
            results,
        }
    }

    pub fn empty(params: PageParams, config: &AppConfig, uri: &Uri) -> Self {
        Self::new(Vec::new(), 0, params, config, uri)
    }
}

fn page_link(config: &AppConfig, uri: &Uri, page: i64) -> String {
    let mut url = config.base_url.clone();
    url.set_path(uri.path());

    let query = uri.query().unwrap_or_default();
    let kept: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
        .filter(|(key, _)| key != "page")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        pairs.extend_pairs(kept);
        pairs.append_pair("page", &page.to_string());
    }

    url.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_fall_back_to_defaults_and_clamp() {
        assert_eq!(PageParams::new(None, None), PageParams { page: 1, limit: 6 });
        assert_eq!(
            PageParams::new(Some(0), Some(1000)),
            PageParams { page: 1, limit: 100 }
        );
        assert_eq!(PageParams::new(Some(3), Some(10)).offset(), 20);
    }

    #[test]
    fn links_keep_filters_and_swap_the_page() {
        let config = AppConfig::for_tests();
        let uri: Uri = "/api/recipes?tags=lunch&page=2&tags=dinner&limit=2".parse().unwrap();
        let params = PageParams::new(Some(2), Some(2));

        let page = Page::new(vec![1, 2], 7, params, &config, &uri);

        assert_eq!(
            page.next.as_deref(),
            Some("https://foodgram.example/api/recipes?tags=lunch&tags=dinner&limit=2&page=3")
        );
        assert_eq!(
            page.previous.as_deref(),
            Some("https://foodgram.example/api/recipes?tags=lunch&tags=dinner&limit=2&page=1")
        );
    }

    #[test]
    fn huge_pages_are_past_the_end() {
        let config = AppConfig::for_tests();
        let uri: Uri = "/api/recipes?page=9223372036854775807".parse().unwrap();
        let params = PageParams::new(Some(i64::MAX), Some(100));

        assert_eq!(params.offset(), i64::MAX);

        let page = Page::<u8>::new(Vec::new(), 3, params, &config, &uri);
        assert!(page.next.is_none());
        assert_eq!(
            page.previous.as_deref(),
            Some("https://foodgram.example/api/recipes?page=9223372036854775806")
        );
    }

    #[test]
    fn last_page_has_no_next_link() {
        let config = AppConfig::for_tests();
        let uri: Uri = "/api/users".parse().unwrap();

        let page = Page::new(vec!["a"], 1, PageParams::new(None, None), &config, &uri);

        assert!(page.next.is_none());
        assert!(page.previous.is_none());
    }
}
