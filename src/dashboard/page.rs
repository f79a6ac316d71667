//! The dashboard: a month's budget, its summary, spending per category and
//! a chart of recent months.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::SessionContext,
    category::{category_breakdown_table, load_category_breakdown},
    chart::{DashboardChart, budget_vs_spending_chart, charts_head_elements, charts_view},
    endpoints::{self, format_endpoint, with_month},
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, PAGE_CONTAINER_STYLE, amount_input, base,
        dollar_input_styles, link,
    },
    ledger::{SUMMARY_CARD_ID, load_ledger_view, summarize, summary_card},
    navigation::NavBar,
    period::{MonthKey, MonthQuery, PeriodBudget, get_period_budgets_between, month_picker},
    transaction::list_transactions,
    user::UserID,
};

/// How many months, ending with the selected one, the budget chart covers.
const CHART_MONTH_COUNT: usize = 6;

/// The state needed for displaying the dashboard page.
#[derive(Debug, Clone)]
pub struct DashboardState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

fn budget_form(period: &PeriodBudget) -> Markup {
    let endpoint = format_endpoint(endpoints::PERIOD_BUDGET_API, period.id);
    let target = format!("#{SUMMARY_CARD_ID}");

    html! {
        form
            hx-put=(endpoint)
            hx-target=(target)
            hx-swap="outerHTML"
            hx-target-error="#alert-container"
            class="w-full max-w-2xl flex flex-col sm:flex-row sm:items-end gap-4"
        {
            div class="grow"
            {
                (amount_input("total_budget", "Total budget", Some(period.total_budget.as_f64())))
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Save budget" }
        }
    }
}

/// Budget and net spending for each of the `months`, oldest first.
///
/// Months the user never opened count as zero.
fn budget_history(
    user_id: UserID,
    months: &[MonthKey],
    connection: &Connection,
) -> Result<Vec<(MonthKey, f64, f64)>, Error> {
    let (Some(first), Some(last)) = (months.first(), months.last()) else {
        return Ok(Vec::new());
    };

    let periods = get_period_budgets_between(user_id, *first, *last, connection)?;

    months
        .iter()
        .map(|month| {
            match periods.iter().find(|period| period.month == *month) {
                Some(period) => {
                    let transactions = list_transactions(period.id, connection)?;
                    let summary = summarize(Some(period.total_budget), &transactions, period.id);
                    Ok((*month, summary.total_budget, summary.total_spent))
                }
                None => Ok((*month, 0.0, 0.0)),
            }
        })
        .collect()
}

/// Display the session user's budget for the month in the `month` query
/// parameter, or the current month.
pub async fn get_dashboard_page(
    State(state): State<DashboardState>,
    Extension(session): Extension<SessionContext>,
    Query(query): Query<MonthQuery>,
) -> Result<Response, Error> {
    let month = query.resolve(&state.local_timezone)?;

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("Could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let view = load_ledger_view(session.user_id, month, &connection);
    let Some(period) = view.budget().cloned() else {
        return Err(Error::RetrievalFailed("the budget for this month".to_owned()));
    };

    let breakdown = load_category_breakdown(period.id, &connection)
        .inspect_err(|error| tracing::error!("Could not load the category breakdown: {error}"))
        .map_err(|_| Error::RetrievalFailed("the spending per category".to_owned()))?;

    let history = budget_history(
        session.user_id,
        &month.trailing(CHART_MONTH_COUNT),
        &connection,
    )
    .inspect_err(|error| tracing::error!("Could not load the budget history: {error}"))
    .map_err(|_| Error::RetrievalFailed("the budgets for recent months".to_owned()))?;

    drop(connection);

    let charts = [DashboardChart::new(
        "budget-chart",
        &budget_vs_spending_chart(&history),
    )];

    let nav_bar = NavBar::for_role(endpoints::DASHBOARD_VIEW, session.is_admin());
    let content = html! {
        (nav_bar.into_html())

        div class=(PAGE_CONTAINER_STYLE)
        {
            (month_picker(endpoints::DASHBOARD_VIEW, month))

            div class=(FORM_CONTAINER_STYLE)
            {
                (budget_form(&period))
            }

            (summary_card(month, &view.summary()))

            section class="w-full max-w-2xl my-4"
            {
                div class="flex justify-between items-baseline mb-2"
                {
                    h2 class="text-lg font-semibold" { "Spending by category" }
                    (link(&with_month(endpoints::TRANSACTIONS_VIEW, month), "View transactions"))
                }

                (category_breakdown_table(&breakdown, false))
            }

            (charts_view(&charts))
        }
    };

    let [echarts, chart_script] = charts_head_elements(&charts);

    Ok(base(
        "Dashboard",
        &[dollar_input_styles(), echarts, chart_script],
        &content,
    )
    .into_response())
}
