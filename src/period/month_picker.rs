//! Choosing which month a page shows.

use axum::http::{HeaderMap, Uri};
use maud::{Markup, html};
use serde::Deserialize;

use crate::{Error, endpoints::with_month, html::LINK_STYLE, period::MonthKey};

/// The `month` query parameter shared by every month-scoped page.
#[derive(Debug, Default, Deserialize)]
pub struct MonthQuery {
    pub month: Option<String>,
}

impl MonthQuery {
    /// The requested month, or the current month in `canonical_timezone` if
    /// none was given.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidMonth] if the month is malformed, or
    /// [Error::InvalidTimezoneError] if the timezone is unknown.
    pub fn resolve(&self, canonical_timezone: &str) -> Result<MonthKey, Error> {
        match self.month.as_deref().map(str::trim) {
            None | Some("") => MonthKey::current(canonical_timezone),
            Some(month) => MonthKey::parse(month),
        }
    }

    /// The month shown by the page that sent an HTMX request, read from the
    /// `HX-Current-URL` header.
    ///
    /// Returns `None` if the header is missing or unreadable.
    pub fn from_current_url(headers: &HeaderMap) -> Option<Self> {
        let current_url = headers.get("hx-current-url")?.to_str().ok()?;
        let uri = current_url.parse::<Uri>().ok()?;

        match uri.query() {
            Some(query) => serde_urlencoded::from_str(query).ok(),
            None => Some(Self::default()),
        }
    }
}

/// Links to the previous and next month around the month's name, plus a
/// month input for jumping further.
///
/// There is no link past [MonthKey::FIRST] or [MonthKey::LAST].
pub fn month_picker(page: &str, month: MonthKey) -> Markup {
    html! {
        div class="flex flex-wrap items-center justify-center gap-4 my-4"
        {
            @if month > MonthKey::FIRST {
                a
                    href=(with_month(page, month.previous()))
                    class=(LINK_STYLE)
                    aria-label="Previous month"
                {
                    "←"
                }
            }

            h2 class="text-xl font-bold" { (month.label()) }

            @if month < MonthKey::LAST {
                a
                    href=(with_month(page, month.next()))
                    class=(LINK_STYLE)
                    aria-label="Next month"
                {
                    "→"
                }
            }

            form method="get" action=(page) class="flex items-center gap-2"
            {
                label for="month" class="sr-only" { "Month" }
                input
                    type="month"
                    id="month"
                    name="month"
                    value=(month)
                    onchange="this.form.submit()"
                    class="rounded border-gray-300 text-sm dark:bg-gray-700 dark:border-gray-600";
            }
        }
    }
}


#[cfg(test)]
mod month_picker_tests {
    use scraper::{Html, Selector};
    use time::Month;

    use crate::{
        endpoints,
        period::{MonthKey, month_picker},
    };

    #[test]
    fn links_to_neighbouring_months() {
        let month = MonthKey::new(2025, Month::January);

        let html = Html::parse_fragment(
            &month_picker(endpoints::DASHBOARD_VIEW, month).into_string(),
        );

        let hrefs: Vec<&str> = html
            .select(&Selector::parse("a").unwrap())
            .filter_map(|link| link.value().attr("href"))
            .collect();
        assert_eq!(hrefs, ["/dashboard?month=2024-12", "/dashboard?month=2025-02"]);

        let input = html
            .select(&Selector::parse("input[type=month]").unwrap())
            .next()
            .unwrap();
        assert_eq!(input.value().attr("value"), Some("2025-01"));
    }

    #[test]
    fn no_links_past_the_supported_range() {
        let hrefs = |month: MonthKey| -> Vec<String> {
            let html = Html::parse_fragment(
                &month_picker(endpoints::DASHBOARD_VIEW, month).into_string(),
            );

            html.select(&Selector::parse("a").unwrap())
                .filter_map(|link| link.value().attr("href"))
                .map(str::to_owned)
                .collect()
        };

        assert_eq!(hrefs(MonthKey::FIRST), ["/dashboard?month=0001-02"]);
        assert_eq!(hrefs(MonthKey::LAST), ["/dashboard?month=9999-11"]);
    }
}
