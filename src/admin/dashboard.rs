//! The admin overview: headline counts and spending across all users.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    category::count_categories,
    chart::{DashboardChart, charts_head_elements, charts_view, total_spending_chart},
    endpoints,
    html::{LINK_STYLE, PAGE_CONTAINER_STYLE, base, format_currency},
    navigation::NavBar,
    period::MonthKey,
    transaction::{count_transactions_in_month, total_spent_by_month},
    user::{UserStatus, count_users},
};

/// How many months, ending with the current one, the spending chart covers.
const CHART_MONTH_COUNT: usize = 12;

/// The state needed for the admin dashboard.
#[derive(Debug, Clone)]
pub struct AdminDashboardState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for AdminDashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The figures shown on the admin dashboard.
#[derive(Debug, PartialEq)]
struct Overview {
    user_count: u64,
    blocked_user_count: u64,
    category_count: u64,
    transaction_count: u64,
    spent_this_month: f64,
    /// Net spending per month, oldest first, with a zero for quiet months.
    monthly_spending: Vec<(MonthKey, f64)>,
}

fn load_overview(current: MonthKey, connection: &Connection) -> Result<Overview, Error> {
    let months = current.trailing(CHART_MONTH_COUNT);
    let first = months.first().copied().unwrap_or(current);
    let totals = total_spent_by_month(first, current, connection)?;

    let monthly_spending: Vec<(MonthKey, f64)> = months
        .iter()
        .map(|month| {
            let spent = totals
                .iter()
                .find(|(total_month, _)| total_month == month)
                .map_or(0.0, |(_, spent)| *spent);
            (*month, spent)
        })
        .collect();

    let spent_this_month = monthly_spending
        .last()
        .map_or(0.0, |(_, spent)| *spent);

    Ok(Overview {
        user_count: count_users(None, connection)?,
        blocked_user_count: count_users(Some(UserStatus::Blocked), connection)?,
        category_count: count_categories("", connection)?,
        transaction_count: count_transactions_in_month(current, connection)?,
        spent_this_month,
        monthly_spending,
    })
}

fn stat_card(label: &str, value: &str, href: Option<&str>) -> Markup {
    html! {
        div class="p-4 bg-white rounded-lg shadow dark:bg-gray-800"
        {
            dt class="text-sm text-gray-500 dark:text-gray-400" { (label) }
            dd class="text-2xl font-semibold" data-stat=(label) { (value) }

            @if let Some(href) = href {
                a href=(href) class={ (LINK_STYLE) " text-sm" } { "Manage" }
            }
        }
    }
}

fn overview_cards(overview: &Overview, current: MonthKey) -> Markup {
    let month_label = current.label();

    html! {
        dl class="w-full max-w-4xl grid grid-cols-1 sm:grid-cols-2 lg:grid-cols-3 gap-4 my-4"
        {
            (stat_card("Users", &overview.user_count.to_string(), Some(endpoints::ADMIN_USERS_VIEW)))
            (stat_card("Blocked users", &overview.blocked_user_count.to_string(), None))
            (stat_card(
                "Categories",
                &overview.category_count.to_string(),
                Some(endpoints::ADMIN_CATEGORIES_VIEW),
            ))
            (stat_card(
                &format!("Transactions in {month_label}"),
                &overview.transaction_count.to_string(),
                None,
            ))
            (stat_card(
                &format!("Spent in {month_label}"),
                &format_currency(overview.spent_this_month),
                None,
            ))
        }
    }
}

/// Render the admin dashboard for the current month.
pub async fn get_admin_dashboard_page(
    State(state): State<AdminDashboardState>,
) -> Result<Response, Error> {
    let current = MonthKey::current(&state.local_timezone)?;

    let overview = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("Could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        load_overview(current, &connection)
            .inspect_err(|error| tracing::error!("Could not load the admin overview: {error}"))
            .map_err(|_| Error::RetrievalFailed("the overview".to_owned()))?
    };

    let charts = [DashboardChart::new(
        "spending-chart",
        &total_spending_chart(&overview.monthly_spending),
    )];

    let content = html! {
        (NavBar::admin(endpoints::ADMIN_DASHBOARD_VIEW).into_html())

        div class=(PAGE_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold" { "Overview" }

            (overview_cards(&overview, current))

            (charts_view(&charts))
        }
    };

    Ok(base("Admin", &charts_head_elements(&charts), &content).into_response())
}
