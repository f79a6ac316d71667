//! Defines the route handler for the page that lists a month's transactions
//! and the form for adding new ones.
use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    auth::SessionContext,
    category::{Category, get_active_categories},
    endpoints::{self, format_endpoint},
    html::{
        BUTTON_DELETE_STYLE, BUTTON_PRIMARY_STYLE, CATEGORY_BADGE_STYLE, FORM_LABEL_STYLE,
        FORM_RADIO_GROUP_STYLE, FORM_RADIO_INPUT_STYLE, FORM_RADIO_LABEL_STYLE,
        FORM_TEXT_INPUT_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE,
        TABLE_ROW_STYLE, amount_input, base, dollar_input_styles, format_currency,
    },
    navigation::NavBar,
    pagination::{
        Page, PaginationConfig, create_pagination_indicators, page_url, pagination_nav,
    },
    period::{MonthKey, MonthQuery, get_or_create_period_budget, month_picker},
    timezone::get_local_offset,
    transaction::{
        SortOrder, TransactionKind, TransactionRow, count_search_transactions,
        search_transactions,
    },
};

/// The state needed for the transactions page.
#[derive(Debug, Clone)]
pub struct TransactionsViewState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    pub pagination_config: PaginationConfig,
}

impl FromRef<AppState> for TransactionsViewState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
            pagination_config: state.pagination_config.clone(),
        }
    }
}

/// The query parameters for the transactions page.
#[derive(Debug, Default, Deserialize)]
pub struct TransactionsQuery {
    pub month: Option<String>,
    /// Text to search for in transaction notes.
    pub q: Option<String>,
    /// `asc` or `desc` to sort by amount.
    pub sort: Option<String>,
    pub page: Option<u64>,
}

/// URL encoding helper for links that keep the current search and sort.
#[derive(Debug, Serialize)]
struct TransactionsLink {
    month: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    q: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sort: Option<&'static str>,
    page: u64,
}

/// Everything shown on the page, loaded from the database.
struct TransactionsViewModel {
    month: MonthKey,
    search: String,
    sort_order: SortOrder,
    page: Page,
    total_matches: u64,
    rows: Vec<TransactionRow>,
    categories: Vec<Category>,
}

fn kind_radio(kind: TransactionKind, is_checked: bool) -> Markup {
    let id = format!("kind-{}", kind.as_str());

    html! {
        div class="flex items-center gap-2"
        {
            input
                type="radio"
                name="kind"
                id=(id)
                value=(kind.as_str())
                checked[is_checked]
                class=(FORM_RADIO_INPUT_STYLE);

            label for=(id) class=(FORM_RADIO_LABEL_STYLE) { (kind.label()) }
        }
    }
}

fn new_transaction_form(month: MonthKey, categories: &[Category]) -> Markup {
    html! {
        form
            hx-post=(endpoints::TRANSACTIONS_API)
            hx-target-error="#alert-container"
            class="w-full max-w-md space-y-4 mb-8"
        {
            h2 class="text-lg font-semibold" { "Add a transaction" }

            input type="hidden" name="month" value=(month);

            (amount_input("amount", "Amount", None))

            fieldset class=(FORM_RADIO_GROUP_STYLE)
            {
                legend class=(FORM_LABEL_STYLE) { "Kind" }
                (kind_radio(TransactionKind::Expense, true))
                (kind_radio(TransactionKind::Income, false))
            }

            div
            {
                label for="category-id" class=(FORM_LABEL_STYLE) { "Category" }

                select name="category_id" id="category-id" class=(FORM_TEXT_INPUT_STYLE)
                {
                    option value="" { "Uncategorised" }

                    @for category in categories {
                        option value=(category.id) { (category.name) }
                    }
                }
            }

            div
            {
                label for="note" class=(FORM_LABEL_STYLE) { "Note" }

                input
                    type="text"
                    name="note"
                    id="note"
                    placeholder="e.g. Groceries from the market"
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Add transaction" }
        }
    }
}

fn search_form(month: MonthKey, search: &str, sort_order: SortOrder) -> Markup {
    let sort_options = [
        (None, "Newest first"),
        (Some("asc"), "Amount, low to high"),
        (Some("desc"), "Amount, high to low"),
    ];

    html! {
        form
            method="get"
            action=(endpoints::TRANSACTIONS_VIEW)
            role="search"
            class="w-full flex flex-wrap gap-2 items-end mb-4"
        {
            input type="hidden" name="month" value=(month);

            div class="flex-1"
            {
                label for="q" class=(FORM_LABEL_STYLE) { "Search notes" }
                input
                    type="search"
                    name="q"
                    id="q"
                    value=(search)
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="sort" class=(FORM_LABEL_STYLE) { "Sort" }
                select name="sort" id="sort" class=(FORM_TEXT_INPUT_STYLE)
                {
                    @for (value, label) in sort_options {
                        option
                            value=(value.unwrap_or_default())
                            selected[value == sort_order.as_query_value()]
                        {
                            (label)
                        }
                    }
                }
            }

            button type="submit" class="px-4 py-2.5 bg-blue-500 text-white rounded text-sm"
            {
                "Search"
            }
        }
    }
}

fn transaction_row(row: &TransactionRow, local_offset: time::UtcOffset) -> Markup {
    let transaction = &row.transaction;
    let created_on = transaction.created_at.to_offset(local_offset).date();

    html! {
        tr class=(TABLE_ROW_STYLE) data-transaction-id=(transaction.id)
        {
            td class=(TABLE_CELL_STYLE) { (created_on) }

            td class=(TABLE_CELL_STYLE)
            {
                @if let Some(category_name) = &row.category_name {
                    span class=(CATEGORY_BADGE_STYLE) { (category_name) }
                }
            }

            td class=(TABLE_CELL_STYLE) { (transaction.note) }

            td class=(TABLE_CELL_STYLE) { (transaction.kind.label()) }

            td class={ (TABLE_CELL_STYLE) " text-right" }
            {
                (format_currency(transaction.signed_amount()))
            }

            td class=(TABLE_CELL_STYLE)
            {
                button
                    hx-delete=(format_endpoint(endpoints::TRANSACTION_API, transaction.id))
                    hx-confirm="Are you sure you want to delete this transaction?"
                    hx-target="closest tr"
                    hx-target-error="#alert-container"
                    hx-swap="delete"
                    class=(BUTTON_DELETE_STYLE)
                {
                    "Delete"
                }
            }
        }
    }
}

fn transactions_view(
    model: &TransactionsViewModel,
    nav_bar: NavBar,
    local_offset: time::UtcOffset,
    max_pages: u64,
) -> Markup {
    let link_for_page = |page: u64| {
        page_url(
            endpoints::TRANSACTIONS_VIEW,
            &TransactionsLink {
                month: model.month.to_string(),
                q: model.search.clone(),
                sort: model.sort_order.as_query_value(),
                page,
            },
        )
    };
    let indicators = create_pagination_indicators(model.page.number, model.page.count, max_pages);
    let empty_message = if model.search.is_empty() {
        "No transactions this month."
    } else {
        "No transactions match your search."
    };

    html! {
        (nav_bar.into_html())

        div class=(PAGE_CONTAINER_STYLE)
        {
            (month_picker(endpoints::TRANSACTIONS_VIEW, model.month))

            (new_transaction_form(model.month, &model.categories))

            section class="w-full max-w-4xl"
            {
                h2 class="text-lg font-semibold mb-2" { "History" }

                (search_form(model.month, &model.search, model.sort_order))

                div class="overflow-x-auto dark:bg-gray-800"
                {
                    table id="transactions" class="w-full text-sm text-left rtl:text-right
                        text-gray-500 dark:text-gray-400"
                    {
                        thead class=(TABLE_HEADER_STYLE)
                        {
                            tr
                            {
                                th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Note" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Kind" }
                                th scope="col" class={ (TABLE_CELL_STYLE) " text-right" } { "Amount" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                            }
                        }

                        tbody
                        {
                            @for row in &model.rows {
                                (transaction_row(row, local_offset))
                            }

                            @if model.rows.is_empty() {
                                tr
                                {
                                    td colspan="6" class="px-6 py-4 text-center" data-state="empty"
                                    {
                                        (empty_message)
                                    }
                                }
                            }
                        }
                    }
                }

                @if model.total_matches > 0 {
                    (pagination_nav(&indicators, link_for_page))
                }
            }
        }
    }
}

fn load_view_model(
    month: MonthKey,
    query: &TransactionsQuery,
    session: &SessionContext,
    pagination_config: &PaginationConfig,
    connection: &Connection,
) -> Result<TransactionsViewModel, Error> {
    let search = query.q.as_deref().unwrap_or_default().trim().to_owned();
    let sort_order = SortOrder::from_raw(query.sort.as_deref());

    let period = get_or_create_period_budget(session.user_id, month, connection)
        .inspect_err(|error| tracing::error!("Could not load the budget for {month}: {error}"))
        .map_err(|_| Error::RetrievalFailed("the budget for this month".to_owned()))?;

    let total_matches = count_search_transactions(period.id, &search, connection)
        .inspect_err(|error| tracing::error!("Could not count transactions: {error}"))
        .map_err(|_| Error::RetrievalFailed("the transactions for this month".to_owned()))?;

    let page = Page::clamped(
        query.page.unwrap_or(pagination_config.default_page),
        pagination_config.default_page_size,
        total_matches,
    );

    let rows = search_transactions(
        period.id,
        &search,
        sort_order,
        page.limit(),
        page.offset(),
        connection,
    )
    .inspect_err(|error| tracing::error!("Could not load transactions: {error}"))
    .map_err(|_| Error::RetrievalFailed("the transactions for this month".to_owned()))?;

    let categories = get_active_categories(connection)
        .inspect_err(|error| tracing::error!("Could not load categories: {error}"))
        .map_err(|_| Error::RetrievalFailed("the categories".to_owned()))?;

    Ok(TransactionsViewModel {
        month,
        search,
        sort_order,
        page,
        total_matches,
        rows,
        categories,
    })
}

/// Render the selected month's transactions with the add-transaction form.
pub async fn get_transactions_page(
    State(state): State<TransactionsViewState>,
    Extension(session): Extension<SessionContext>,
    Query(query): Query<TransactionsQuery>,
) -> Result<Response, Error> {
    let month = MonthQuery {
        month: query.month.clone(),
    }
    .resolve(&state.local_timezone)?;
    let local_offset = get_local_offset(&state.local_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(state.local_timezone.clone()))?;

    let model = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("Could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        load_view_model(
            month,
            &query,
            &session,
            &state.pagination_config,
            &connection,
        )?
    };

    let nav_bar = NavBar::for_role(endpoints::TRANSACTIONS_VIEW, session.is_admin());
    let content = transactions_view(
        &model,
        nav_bar,
        local_offset,
        state.pagination_config.max_pages,
    );

    Ok(base("Transactions", &[dollar_input_styles()], &content).into_response())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension,
        extract::{Query, State},
        http::StatusCode,
        response::IntoResponse,
    };
    use scraper::{Html, Selector};
    use time::Month;

    use crate::{
        auth::SessionContext,
        category::{CategoryName, CategoryStatus, create_category, set_category_status},
        endpoints,
        pagination::PaginationConfig,
        period::{MonthKey, get_or_create_period_budget},
        test_utils::{
            assert_form_input, assert_form_submit_button, assert_hx_endpoint, assert_valid_html,
            parse_html_document,
        },
        transaction::{
            Transaction, TransactionsQuery, TransactionsViewState, create_transaction,
            get_transactions_page,
        },
        user::User,
    };

    fn get_state(page_size: u64) -> (TransactionsViewState, User) {
        let connection = crate::test_utils::get_test_connection();
        let user = crate::test_utils::insert_test_user("someone@example.com", &connection);

        let state = TransactionsViewState {
            db_connection: Arc::new(Mutex::new(connection)),
            local_timezone: "Etc/UTC".to_owned(),
            pagination_config: PaginationConfig {
                default_page: 1,
                default_page_size: page_size,
                max_pages: 5,
            },
        };

        (state, user)
    }

    fn october_query() -> TransactionsQuery {
        TransactionsQuery {
            month: Some("2025-10".to_owned()),
            ..Default::default()
        }
    }

    fn add_transactions(state: &TransactionsViewState, user: &User, notes: &[&str]) {
        let connection = state.db_connection.lock().unwrap();
        let period =
            get_or_create_period_budget(user.id, MonthKey::new(2025, Month::October), &connection)
                .unwrap();

        for (i, note) in notes.iter().enumerate() {
            create_transaction(
                Transaction::build(period.id, (i + 1) as f64).note(note),
                &connection,
            )
            .unwrap();
        }
    }

    async fn render(
        state: TransactionsViewState,
        user: &User,
        query: TransactionsQuery,
    ) -> Html {
        let response = get_transactions_page(
            State(state),
            Extension(SessionContext::from(user)),
            Query(query),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        html
    }

    fn table_notes(html: &Html) -> Vec<String> {
        let selector = Selector::parse("#transactions tbody tr td:nth-child(3)").unwrap();
        html.select(&selector)
            .map(|cell| cell.text().collect::<String>())
            .collect()
    }

    #[tokio::test]
    async fn renders_add_transaction_form() {
        let (state, user) = get_state(10);

        let html = render(state, &user, october_query()).await;

        let form = html
            .select(&Selector::parse("form[hx-post]").unwrap())
            .next()
            .expect("No add transaction form");
        assert_hx_endpoint(&form, endpoints::TRANSACTIONS_API, "hx-post");
        assert_form_input(&form, "amount", "number");
        assert_form_submit_button(&form);

        let month = form
            .select(&Selector::parse("input[name=month]").unwrap())
            .next()
            .unwrap();
        assert_eq!(month.value().attr("value"), Some("2025-10"));
    }

    #[tokio::test]
    async fn lists_only_active_categories() {
        let (state, user) = get_state(10);
        {
            let connection = state.db_connection.lock().unwrap();
            create_category(CategoryName::new_unchecked("Food"), &connection).unwrap();
            let old = create_category(CategoryName::new_unchecked("Old"), &connection).unwrap();
            set_category_status(old.id, CategoryStatus::Inactive, &connection).unwrap();
        }

        let html = render(state, &user, october_query()).await;

        let options: Vec<String> = html
            .select(&Selector::parse("select[name=category_id] option").unwrap())
            .map(|option| option.text().collect())
            .collect();
        assert_eq!(options, ["Uncategorised", "Food"]);
    }

    #[tokio::test]
    async fn shows_empty_message() {
        let (state, user) = get_state(10);

        let html = render(state, &user, october_query()).await;

        let empty = html
            .select(&Selector::parse("[data-state=empty]").unwrap())
            .next()
            .unwrap()
            .text()
            .collect::<String>();
        assert_eq!(empty, "No transactions this month.");
    }

    #[tokio::test]
    async fn filters_and_sorts_history() {
        let (state, user) = get_state(10);
        add_transactions(&state, &user, &["coffee", "rent", "Iced Coffee"]);

        let html = render(
            state,
            &user,
            TransactionsQuery {
                q: Some("coffee".to_owned()),
                sort: Some("desc".to_owned()),
                ..october_query()
            },
        )
        .await;

        assert_eq!(table_notes(&html), ["Iced Coffee", "coffee"]);
    }

    #[tokio::test]
    async fn out_of_range_page_is_clamped() {
        let (state, user) = get_state(2);
        add_transactions(&state, &user, &["a", "b", "c"]);

        let html = render(
            state,
            &user,
            TransactionsQuery {
                sort: Some("asc".to_owned()),
                page: Some(99),
                ..october_query()
            },
        )
        .await;

        assert_eq!(table_notes(&html), ["c"]);
        let current = html
            .select(&Selector::parse("nav.pagination [aria-current=page]").unwrap())
            .next()
            .unwrap()
            .text()
            .collect::<String>();
        assert_eq!(current, "2");
    }

    #[tokio::test]
    async fn page_links_keep_search_and_sort() {
        let (state, user) = get_state(1);
        add_transactions(&state, &user, &["tea", "more tea"]);

        let html = render(
            state,
            &user,
            TransactionsQuery {
                q: Some("tea".to_owned()),
                sort: Some("asc".to_owned()),
                ..october_query()
            },
        )
        .await;

        let href = html
            .select(&Selector::parse("nav.pagination a").unwrap())
            .next()
            .unwrap()
            .value()
            .attr("href")
            .unwrap()
            .to_owned();
        assert_eq!(href, "/transactions?month=2025-10&q=tea&sort=asc&page=2");
    }

    #[tokio::test]
    async fn other_users_transactions_are_hidden() {
        let (state, user) = get_state(10);
        add_transactions(&state, &user, &["mine"]);
        let other = crate::test_utils::insert_test_user(
            "other@example.com",
            &state.db_connection.lock().unwrap(),
        );

        let html = render(state, &other, october_query()).await;

        assert!(table_notes(&html).is_empty());
    }
}
