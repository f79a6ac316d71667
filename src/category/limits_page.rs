//! The page where users set how much they plan to spend in each category
//! during a month, and the endpoints for setting and removing limits.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    Extension, Form,
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    alert::Alert,
    amount::Amount,
    auth::SessionContext,
    category::{
        Category, CategoryId, CategoryLimit, CategoryLimitId, delete_category_limit,
        get_active_categories, get_category, get_category_limits, set_category_limit,
    },
    endpoints::{self, format_endpoint, with_month},
    html::{
        BUTTON_DELETE_STYLE, BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE,
        PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, amount_input,
        base, dollar_input_styles, format_currency,
    },
    ledger::spending_by_category,
    navigation::NavBar,
    period::{MonthKey, MonthQuery, PeriodId, get_or_create_period_budget, month_picker},
    transaction::list_transactions,
};

/// The state needed for the category limits page and its endpoints.
#[derive(Debug, Clone)]
pub struct CategoryLimitsState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for CategoryLimitsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// A category's limit and spending for one month.
///
/// `category` is `None` for spending without a category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryBreakdownRow {
    pub category: Option<Category>,
    pub limit: Option<CategoryLimit>,
    /// Expenses minus income.
    pub spent: f64,
}

impl CategoryBreakdownRow {
    pub fn name(&self) -> String {
        match &self.category {
            Some(category) => category.name.to_string(),
            None => "Uncategorised".to_owned(),
        }
    }

    pub fn is_over_limit(&self) -> bool {
        self.limit
            .as_ref()
            .is_some_and(|limit| self.spent > limit.amount.as_f64())
    }
}

/// Every active category with its limit and spending for `period_id`,
/// followed by any other category with spending that month.
///
/// Limits never affect the month's remaining budget.
pub fn load_category_breakdown(
    period_id: PeriodId,
    connection: &Connection,
) -> Result<Vec<CategoryBreakdownRow>, Error> {
    let transactions = list_transactions(period_id, connection)?;
    let mut spending: HashMap<Option<CategoryId>, f64> =
        spending_by_category(&transactions, period_id)
            .into_iter()
            .collect();
    let mut limits: HashMap<CategoryId, CategoryLimit> = get_category_limits(period_id, connection)?
        .into_iter()
        .map(|limit| (limit.category_id, limit))
        .collect();

    let mut rows: Vec<CategoryBreakdownRow> = get_active_categories(connection)?
        .into_iter()
        .map(|category| CategoryBreakdownRow {
            limit: limits.remove(&category.id),
            spent: spending.remove(&Some(category.id)).unwrap_or_default(),
            category: Some(category),
        })
        .collect();

    let uncategorised = spending.remove(&None);

    let mut inactive_ids: Vec<CategoryId> = spending.keys().flatten().copied().collect();
    inactive_ids.sort_unstable();

    for category_id in inactive_ids {
        let category = get_category(category_id, connection)?;
        rows.push(CategoryBreakdownRow {
            limit: limits.remove(&category_id),
            spent: spending.remove(&Some(category_id)).unwrap_or_default(),
            category: Some(category),
        });
    }

    if let Some(spent) = uncategorised {
        rows.push(CategoryBreakdownRow {
            category: None,
            limit: None,
            spent,
        });
    }

    Ok(rows)
}

/// The table of limits and spending per category.
///
/// With `show_actions`, rows with a limit get a button to remove it.
pub fn category_breakdown_table(rows: &[CategoryBreakdownRow], show_actions: bool) -> Markup {
    html! {
        div class="w-full overflow-x-auto dark:bg-gray-800"
        {
            table id="category-breakdown" class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
            {
                thead class=(TABLE_HEADER_STYLE)
                {
                    tr
                    {
                        th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                        th scope="col" class={ (TABLE_CELL_STYLE) " text-right" } { "Limit" }
                        th scope="col" class={ (TABLE_CELL_STYLE) " text-right" } { "Spent" }
                        @if show_actions {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                        }
                    }
                }

                tbody
                {
                    @for row in rows {
                        @let spent_style = if row.is_over_limit() {
                            "text-right text-red-600 dark:text-red-400"
                        } else {
                            "text-right"
                        };

                        tr class=(TABLE_ROW_STYLE) data-over-limit=[row.is_over_limit().then_some("true")]
                        {
                            td class=(TABLE_CELL_STYLE) { (row.name()) }

                            td class={ (TABLE_CELL_STYLE) " text-right" }
                            {
                                @match &row.limit {
                                    Some(limit) => { (format_currency(limit.amount.as_f64())) }
                                    None => { "-" }
                                }
                            }

                            td class={ (TABLE_CELL_STYLE) " " (spent_style) }
                            {
                                (format_currency(row.spent))
                            }

                            @if show_actions {
                                td class=(TABLE_CELL_STYLE)
                                {
                                    @if let Some(limit) = &row.limit {
                                        button
                                            hx-delete=(format_endpoint(endpoints::CATEGORY_LIMIT_API, limit.id))
                                            hx-target="closest td"
                                            hx-target-error="#alert-container"
                                            hx-swap="innerHTML"
                                            class=(BUTTON_DELETE_STYLE)
                                        {
                                            "Remove limit"
                                        }
                                    }
                                }
                            }
                        }
                    }

                    @if rows.is_empty() {
                        tr
                        {
                            td colspan="4" class="px-6 py-4 text-center" data-state="empty"
                            {
                                "No categories yet."
                            }
                        }
                    }
                }
            }
        }
    }
}

fn limit_form(month: MonthKey, rows: &[CategoryBreakdownRow]) -> Markup {
    let active_categories = rows
        .iter()
        .filter_map(|row| row.category.as_ref())
        .filter(|category| category.is_active());

    html! {
        form
            hx-post=(endpoints::CATEGORY_LIMITS_API)
            hx-target-error="#alert-container"
            class="w-full max-w-md space-y-4 mb-8"
        {
            h2 class="text-lg font-semibold" { "Set a limit" }

            input type="hidden" name="month" value=(month);

            div
            {
                label for="category-id" class=(FORM_LABEL_STYLE) { "Category" }

                select name="category_id" id="category-id" required class=(FORM_TEXT_INPUT_STYLE)
                {
                    @for category in active_categories {
                        option value=(category.id) { (category.name) }
                    }
                }
            }

            (amount_input("amount", "Limit", None))

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Save limit" }
        }
    }
}

/// Render the active categories with the selected month's limits and spending.
pub async fn get_category_limits_page(
    State(state): State<CategoryLimitsState>,
    Extension(session): Extension<SessionContext>,
    Query(query): Query<MonthQuery>,
) -> Result<Response, Error> {
    let month = query.resolve(&state.local_timezone)?;

    let rows = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("Could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        get_or_create_period_budget(session.user_id, month, &connection)
            .and_then(|period| load_category_breakdown(period.id, &connection))
            .inspect_err(|error| tracing::error!("Could not load category limits: {error}"))
            .map_err(|_| Error::RetrievalFailed("the category limits for this month".to_owned()))?
    };

    let nav_bar = NavBar::for_role(endpoints::CATEGORIES_VIEW, session.is_admin());
    let content = html! {
        (nav_bar.into_html())

        div class=(PAGE_CONTAINER_STYLE)
        {
            (month_picker(endpoints::CATEGORIES_VIEW, month))

            (limit_form(month, &rows))

            section class="w-full max-w-2xl"
            {
                h2 class="text-lg font-semibold mb-2" { "Limits and spending" }
                p class="text-sm text-gray-500 dark:text-gray-400 mb-2"
                {
                    "Limits are a guide only and do not change the month's remaining budget."
                }

                (category_breakdown_table(&rows, true))
            }
        }
    };

    Ok(base("Categories", &[dollar_input_styles()], &content).into_response())
}

/// The form data for setting a category limit.
#[derive(Debug, Deserialize)]
pub struct CategoryLimitForm {
    pub month: String,
    pub category_id: CategoryId,
    pub amount: String,
}

/// Set the limit for a category in one of the session user's months,
/// reloading the categories page on success.
pub async fn set_category_limit_endpoint(
    State(state): State<CategoryLimitsState>,
    Extension(session): Extension<SessionContext>,
    Form(form): Form<CategoryLimitForm>,
) -> Response {
    let month = match MonthKey::parse(&form.month) {
        Ok(month) => month,
        Err(error) => return error.into_alert_response(),
    };

    let amount = match Amount::parse_positive(&form.amount) {
        Ok(amount) => amount,
        Err(error) => return error.into_alert_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("Could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match get_category(form.category_id, &connection) {
        Ok(category) if category.is_active() => {}
        Ok(_) | Err(Error::NotFound) => {
            return Error::InvalidCategory(Some(form.category_id)).into_alert_response();
        }
        Err(error) => {
            tracing::error!("Could not load category {}: {error}", form.category_id);
            return error.into_alert_response();
        }
    }

    let result = get_or_create_period_budget(session.user_id, month, &connection)
        .and_then(|period| set_category_limit(period.id, form.category_id, amount, &connection));

    match result {
        Ok(limit) => {
            tracing::debug!("Set limit {} for category {}", limit.id, limit.category_id);
            (
                HxRedirect(with_month(endpoints::CATEGORIES_VIEW, month)),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
        Err(error @ (Error::InvalidAmount(_) | Error::InvalidCategory(_))) => {
            error.into_alert_response()
        }
        Err(error) => {
            tracing::error!("Could not set category limit: {error}");
            error.into_alert_response()
        }
    }
}

/// Remove one of the session user's limits, responds with an alert.
pub async fn delete_category_limit_endpoint(
    State(state): State<CategoryLimitsState>,
    Extension(session): Extension<SessionContext>,
    Path(limit_id): Path<CategoryLimitId>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("Could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match delete_category_limit(limit_id, session.user_id, &connection) {
        Ok(()) => Alert::SuccessSimple {
            message: "Limit removed".to_owned(),
        }
        .into_response(),
        Err(Error::DeleteMissingCategoryLimit) => {
            Error::DeleteMissingCategoryLimit.into_alert_response()
        }
        Err(error) => {
            tracing::error!("Could not delete category limit {limit_id}: {error}");
            error.into_alert_response()
        }
    }
}
