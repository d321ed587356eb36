use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub page: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    /// `offset` wins over `page` when both are present.
    pub fn from_query(query: PageQuery) -> Self {
        let limit = query
            .limit
            .filter(|limit| *limit > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE);

        let offset = match (query.offset, query.page) {
            (Some(offset), _) => offset.max(0),
            (None, Some(page)) => (page.max(1) - 1).saturating_mul(limit),
            (None, None) => 0,
        };

        Self { limit, offset }
    }

    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let find = |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .and_then(|(_, v)| v.parse::<i64>().ok())
        };

        Self::from_query(PageQuery {
            limit: find("limit"),
            offset: find("offset"),
            page: find("page"),
        })
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct PageContext<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> PageContext<T> {
    /// `base_url` may already carry a query string; paging parameters are appended.
    pub fn from_rows(rows: Vec<T>, total_rows: i64, page: Page, base_url: &str) -> Self {
        let next_offset = page.offset.saturating_add(page.limit);
        let next = if next_offset < total_rows {
            Some(page_link(base_url, page.limit, next_offset))
        } else {
            None
        };

        let previous = if page.offset > 0 {
            Some(page_link(
                base_url,
                page.limit,
                (page.offset - page.limit).max(0),
            ))
        } else {
            None
        };

        Self {
            count: total_rows,
            next,
            previous,
            results: rows,
        }
    }

    pub fn no_rows() -> Self {
        Self {
            count: 0,
            next: None,
            previous: None,
            results: vec![],
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageContext<U> {
        PageContext {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

fn page_link(base_url: &str, limit: i64, offset: i64) -> String {
    let separator = match base_url.split_once('?') {
        Some((_, query)) if !query.is_empty() => "&",
        Some(_) => "",
        None => "?",
    };

    if offset == 0 {
        format!("{base_url}{separator}limit={limit}")
    } else {
        format!("{base_url}{separator}limit={limit}&offset={offset}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://localhost/api/recipes/";

    #[test]
    fn defaults_and_clamps_limits() {
        assert_eq!(
            Page::from_query(PageQuery::default()),
            Page { limit: DEFAULT_PAGE_SIZE, offset: 0 }
        );
        assert_eq!(
            Page::from_query(PageQuery { limit: Some(1000), offset: Some(-4), page: None }),
            Page { limit: MAX_PAGE_SIZE, offset: 0 }
        );
    }

    #[test]
    fn page_numbers_translate_to_offsets() {
        let page = Page::from_query(PageQuery { limit: Some(10), offset: None, page: Some(3) });
        assert_eq!(page, Page { limit: 10, offset: 20 });
    }

    #[test]
    fn middle_page_links_both_ways() {
        let page = Page { limit: 10, offset: 10 };
        let context = PageContext::from_rows(vec![1, 2, 3], 25, page, BASE);

        assert_eq!(context.count, 25);
        assert_eq!(
            context.next.as_deref(),
            Some("http://localhost/api/recipes/?limit=10&offset=20")
        );
        assert_eq!(
            context.previous.as_deref(),
            Some("http://localhost/api/recipes/?limit=10")
        );
    }

    #[test]
    fn last_page_has_no_next() {
        let page = Page { limit: 10, offset: 20 };
        let context = PageContext::from_rows(vec![1], 21, page, "http://localhost/api/recipes/?tags=lunch");

        assert_eq!(context.next, None);
        assert_eq!(
            context.previous.as_deref(),
            Some("http://localhost/api/recipes/?tags=lunch&limit=10&offset=10")
        );
    }

    #[test]
    fn huge_page_numbers_saturate() {
        let page = Page::from_query(PageQuery { limit: Some(6), offset: None, page: Some(i64::MAX) });
        assert_eq!(page, Page { limit: 6, offset: i64::MAX });

        let context = PageContext::<i32>::from_rows(vec![], 3, page, BASE);
        assert_eq!(context.next, None);
        assert!(context.previous.is_some());
    }

    #[test]
    fn huge_offsets_saturate() {
        let page = Page::from_query(PageQuery { limit: Some(10), offset: Some(i64::MAX), page: None });
        let context = PageContext::<i32>::from_rows(vec![], i64::MAX, page, BASE);

        assert_eq!(context.next, None);
        assert_eq!(
            context.previous.as_deref(),
            Some("http://localhost/api/recipes/?limit=10&offset=9223372036854775797")
        );
    }

    #[test]
    fn pairs_are_parsed_leniently() {
        let pairs = vec![
            (String::from("limit"), String::from("3")),
            (String::from("page"), String::from("two")),
        ];
        assert_eq!(Page::from_pairs(&pairs), Page { limit: 3, offset: 0 });
    }
}
