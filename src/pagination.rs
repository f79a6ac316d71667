//! Splitting long tables into pages and rendering the page links.

use maud::{Markup, html};
use serde::{Deserialize, Serialize};

use crate::html::LINK_STYLE;

/// Defaults for paged tables.
#[derive(Debug, Clone)]
pub struct PaginationConfig {
    /// The page shown when a request does not ask for one.
    pub default_page: u64,
    /// Rows per page.
    pub default_page_size: u64,
    /// The most page numbers to show at once in the page links.
    pub max_pages: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page: 1,
            default_page_size: 20,
            max_pages: 5,
        }
    }
}

/// One page of a table with `item_count` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// One-based, always between 1 and [Page::count].
    pub number: u64,
    pub size: u64,
    /// The number of pages. An empty table still has one (empty) page.
    pub count: u64,
}

impl Page {
    /// The page `requested`, moved into range if it is past either end.
    pub fn clamped(requested: u64, size: u64, item_count: u64) -> Self {
        let size = size.max(1);
        let count = item_count.div_ceil(size).max(1);

        Self {
            number: requested.clamp(1, count),
            size,
            count,
        }
    }

    /// The SQL `LIMIT` for this page.
    pub fn limit(&self) -> i64 {
        self.size as i64
    }

    /// The SQL `OFFSET` for this page.
    pub fn offset(&self) -> i64 {
        ((self.number - 1) * self.size) as i64
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum PaginationIndicator {
    Page(u64),
    CurrPage(u64),
    Ellipsis,
    NextButton(u64),
    BackButton(u64),
}

/// The links to show for page `curr_page` out of `page_count`, showing at
/// most `max_pages` page numbers around the current page plus the first and
/// last pages.
pub fn create_pagination_indicators(
    curr_page: u64,
    page_count: u64,
    max_pages: u64,
) -> Vec<PaginationIndicator> {
    let max_pages = max_pages.max(1);
    let half = max_pages / 2;

    let (first, last) = if page_count <= max_pages {
        (1, page_count)
    } else if curr_page <= half {
        (1, max_pages)
    } else if curr_page > page_count - half {
        (page_count - max_pages + 1, page_count)
    } else {
        (curr_page - half, curr_page + half)
    };

    let mut indicators = Vec::new();

    if curr_page > 1 {
        indicators.push(PaginationIndicator::BackButton(curr_page - 1));
    }

    if first > 1 {
        indicators.push(PaginationIndicator::Page(1));
        indicators.push(PaginationIndicator::Ellipsis);
    }

    indicators.extend((first..=last).map(|page| {
        if page == curr_page {
            PaginationIndicator::CurrPage(page)
        } else {
            PaginationIndicator::Page(page)
        }
    }));

    if last < page_count {
        indicators.push(PaginationIndicator::Ellipsis);
        indicators.push(PaginationIndicator::Page(page_count));
    }

    if curr_page < page_count {
        indicators.push(PaginationIndicator::NextButton(curr_page + 1));
    }

    indicators
}

/// Render the page links, using `href` to build the URL for a page number.
pub fn pagination_nav(indicators: &[PaginationIndicator], href: impl Fn(u64) -> String) -> Markup {
    html! {
        nav class="pagination flex justify-center my-4" aria-label="Pages"
        {
            ul class="flex gap-3 items-center"
            {
                @for indicator in indicators
                {
                    li
                    {
                        @match indicator
                        {
                            PaginationIndicator::Page(page) => {
                                a href=(href(*page)) class=(LINK_STYLE) { (page) }
                            }
                            PaginationIndicator::CurrPage(page) => {
                                span aria-current="page" class="font-bold" { (page) }
                            }
                            PaginationIndicator::Ellipsis => { "..." }
                            PaginationIndicator::BackButton(page) => {
                                a href=(href(*page)) role="button" class=(LINK_STYLE) { "Back" }
                            }
                            PaginationIndicator::NextButton(page) => {
                                a href=(href(*page)) role="button" class=(LINK_STYLE) { "Next" }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Search text and page number for a searchable table.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SearchQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
}

impl SearchQuery {
    /// The trimmed search text, empty if there is none.
    pub fn search(&self) -> &str {
        self.q.as_deref().map(str::trim).unwrap_or_default()
    }

    /// A link to `page` with the same search.
    pub fn page_url(&self, path: &str, page: u64) -> String {
        let query = SearchQuery {
            q: Some(self.search().to_owned()).filter(|search| !search.is_empty()),
            page: Some(page),
        };

        page_url(path, &query)
    }
}

/// `path` with `query` encoded as its query string.
///
/// Falls back to `path` alone if the query cannot be encoded.
pub fn page_url(path: &str, query: &impl Serialize) -> String {
    match serde_urlencoded::to_string(query) {
        Ok(query) if query.is_empty() => path.to_owned(),
        Ok(query) => format!("{path}?{query}"),
        Err(error) => {
            tracing::error!("Could not encode the query for {path}: {error}");
            path.to_owned()
        }
    }
}

#[cfg(test)]
mod page_tests {
    use crate::pagination::Page;

    #[test]
    fn empty_table_has_one_page() {
        let page = Page::clamped(3, 10, 0);

        assert_eq!(page.count, 1);
        assert_eq!(page.number, 1);
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn page_past_the_end_is_clamped_to_last() {
        let page = Page::clamped(99, 10, 25);

        assert_eq!(page.count, 3);
        assert_eq!(page.number, 3);
        assert_eq!(page.limit(), 10);
        assert_eq!(page.offset(), 20);
    }

    #[test]
    fn page_zero_is_clamped_to_first() {
        assert_eq!(Page::clamped(0, 10, 25).number, 1);
    }
}

#[cfg(test)]
mod indicator_tests {
    use scraper::{Html, Selector};

    use crate::pagination::{
        PaginationIndicator::{self, BackButton, CurrPage, Ellipsis, NextButton, Page},
        create_pagination_indicators, pagination_nav,
    };

    #[test]
    fn shows_all_pages_when_they_fit() {
        let got = create_pagination_indicators(1, 5, 5);

        assert_eq!(
            got,
            [CurrPage(1), Page(2), Page(3), Page(4), Page(5), NextButton(2)]
        );
    }

    #[test]
    fn single_page_has_no_buttons() {
        assert_eq!(create_pagination_indicators(1, 1, 5), [CurrPage(1)]);
    }

    #[test]
    fn shows_subset_on_left() {
        let got = create_pagination_indicators(1, 10, 5);

        assert_eq!(
            got,
            [
                CurrPage(1),
                Page(2),
                Page(3),
                Page(4),
                Page(5),
                Ellipsis,
                Page(10),
                NextButton(2)
            ]
        );
    }

    #[test]
    fn shows_subset_in_center() {
        let got = create_pagination_indicators(5, 10, 5);

        assert_eq!(
            got,
            [
                BackButton(4),
                Page(1),
                Ellipsis,
                Page(3),
                Page(4),
                CurrPage(5),
                Page(6),
                Page(7),
                Ellipsis,
                Page(10),
                NextButton(6)
            ]
        );
    }

    #[test]
    fn shows_subset_on_right() {
        let got = create_pagination_indicators(10, 10, 5);

        assert_eq!(
            got,
            [
                BackButton(9),
                Page(1),
                Ellipsis,
                Page(6),
                Page(7),
                Page(8),
                Page(9),
                CurrPage(10)
            ]
        );
    }

    #[test]
    fn renders_links_for_each_indicator() {
        let indicators: Vec<PaginationIndicator> = create_pagination_indicators(2, 3, 5);

        let markup = pagination_nav(&indicators, |page| format!("/things?page={page}"));
        let html = Html::parse_fragment(&markup.into_string());

        let hrefs: Vec<&str> = html
            .select(&Selector::parse("a").unwrap())
            .filter_map(|link| link.value().attr("href"))
            .collect();
        assert_eq!(
            hrefs,
            [
                "/things?page=1",
                "/things?page=1",
                "/things?page=3",
                "/things?page=3"
            ]
        );
        let current = html
            .select(&Selector::parse("[aria-current=page]").unwrap())
            .next()
            .unwrap();
        assert_eq!(current.text().collect::<String>(), "2");
    }
}

#[cfg(test)]
mod page_url_tests {
    use serde::{Deserialize, Serialize};

    use crate::pagination::page_url;

    #[derive(Serialize)]
    struct SearchPage<'a> {
        #[serde(skip_serializing_if = "Option::is_none")]
        q: Option<&'a str>,
        page: u64,
    }

    #[test]
    fn encodes_query() {
        let got = page_url(
            "/admin/users",
            &SearchPage {
                q: Some("a b&c"),
                page: 2,
            },
        );

        assert_eq!(got, "/admin/users?q=a+b%26c&page=2");
    }

    #[test]
    fn skips_missing_search() {
        let got = page_url("/admin/users", &SearchPage { q: None, page: 3 });

        assert_eq!(got, "/admin/users?page=3");
    }
}
