//! The summary card showing a month's budget, spending and what is left.

use maud::{Markup, html};

use crate::{
    endpoints::{self, with_month},
    html::format_currency,
    ledger::{LEDGER_CHANGED_EVENT, SummaryState},
    period::MonthKey,
};

/// The element ID of the summary card, for targeting swaps.
pub const SUMMARY_CARD_ID: &str = "ledger-summary";

fn figure(label: &str, value: f64, style: &str) -> Markup {
    html! {
        div class="flex flex-col"
        {
            dt class="text-sm text-gray-500 dark:text-gray-400" { (label) }
            dd class={ "text-2xl font-semibold " (style) } { (format_currency(value)) }
        }
    }
}

/// Render the summary card for `month`.
///
/// The card reloads itself from the summary endpoint whenever a mutation
/// fires the ledger-changed event.
pub fn summary_card(month: MonthKey, summary: &SummaryState) -> Markup {
    let refresh_trigger = format!("{LEDGER_CHANGED_EVENT} from:body");

    html! {
        section
            id=(SUMMARY_CARD_ID)
            hx-get=(with_month(endpoints::SUMMARY_API, month))
            hx-trigger=(refresh_trigger)
            hx-swap="outerHTML"
            class="w-full max-w-2xl p-4 my-4 bg-white rounded-lg shadow dark:bg-gray-800"
        {
            h3 class="text-lg font-semibold mb-2" { "Summary for " (month.label()) }

            @match summary {
                SummaryState::Loading => {
                    p class="text-gray-500" { "Loading…" }
                }
                SummaryState::Unavailable(reason) => {
                    div role="alert" data-state="unavailable" class="text-red-700 dark:text-red-400"
                    {
                        p class="font-semibold" { "The summary is unavailable." }
                        p { (reason) }
                    }
                }
                SummaryState::Ready(summary) => {
                    @let remaining_style = if summary.is_over_budget {
                        "text-red-600 dark:text-red-400"
                    } else {
                        "text-green-700 dark:text-green-400"
                    };

                    dl class="grid grid-cols-1 sm:grid-cols-3 gap-4" data-state="ready"
                    {
                        (figure("Budget", summary.total_budget, ""))
                        (figure("Spent", summary.total_spent, ""))
                        div data-field="remaining" class="contents"
                        {
                            (figure("Remaining", summary.remaining, remaining_style))
                        }
                    }

                    @if let Some(warning) = summary.warning() {
                        p
                            role="alert"
                            class="mt-4 p-2 rounded bg-red-50 text-red-800 dark:bg-gray-900 dark:text-red-400"
                        {
                            (warning)
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod summary_card_tests {
    use scraper::{Html, Selector};
    use time::Month;

    use crate::{
        endpoints::{self, with_month},
        ledger::{LedgerSummary, OVER_BUDGET_WARNING, SummaryState, summary_card},
        period::MonthKey,
    };

    fn render(summary: SummaryState) -> Html {
        let month = MonthKey::new(2025, Month::October);
        Html::parse_fragment(&summary_card(month, &summary).into_string())
    }

    fn text_of(html: &Html, selector: &str) -> Option<String> {
        html.select(&Selector::parse(selector).unwrap())
            .next()
            .map(|element| element.text().collect::<String>())
    }

    #[test]
    fn refreshes_from_summary_endpoint() {
        let html = render(SummaryState::Loading);

        let card = html
            .select(&Selector::parse("#ledger-summary").unwrap())
            .next()
            .unwrap();
        assert_eq!(
            card.value().attr("hx-get"),
            Some(with_month(endpoints::SUMMARY_API, "2025-10").as_str())
        );
        assert_eq!(
            card.value().attr("hx-trigger"),
            Some("ledger-changed from:body")
        );
    }

    #[test]
    fn shows_negative_remaining_and_warning() {
        let html = render(SummaryState::Ready(LedgerSummary {
            total_budget: 100.0,
            total_spent: 130.0,
            remaining: -30.0,
            is_over_budget: true,
        }));

        assert_eq!(
            text_of(&html, "[data-field=remaining] dd").as_deref(),
            Some("-$30.00")
        );
        assert_eq!(
            text_of(&html, "p[role=alert]").as_deref(),
            Some(OVER_BUDGET_WARNING)
        );
    }

    #[test]
    fn no_warning_within_budget() {
        let html = render(SummaryState::Ready(LedgerSummary {
            total_budget: 100.0,
            total_spent: 40.0,
            remaining: 60.0,
            is_over_budget: false,
        }));

        assert_eq!(
            text_of(&html, "[data-field=remaining] dd").as_deref(),
            Some("$60.00")
        );
        assert!(text_of(&html, "p[role=alert]").is_none());
    }

    #[test]
    fn unavailable_is_not_shown_as_zero() {
        let html = render(SummaryState::Unavailable(
            "could not load the transactions for this month".to_owned(),
        ));

        assert!(text_of(&html, "[data-state=unavailable]").is_some());
        assert!(text_of(&html, "dd").is_none());
    }
}
