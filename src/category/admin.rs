//! The admin page for managing categories and its endpoints.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    alert::Alert,
    category::{
        Category, CategoryFormData, CategoryId, CategoryName, count_categories, create_category,
        delete_category, get_category, rename_category, search_categories, set_category_status,
    },
    endpoints::{self, format_endpoint},
    html::{
        BUTTON_DELETE_STYLE, BUTTON_PRIMARY_STYLE, CATEGORY_BADGE_STYLE, FORM_LABEL_STYLE,
        FORM_TEXT_INPUT_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE,
        TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base,
    },
    navigation::NavBar,
    pagination::{
        Page, PaginationConfig, SearchQuery, create_pagination_indicators, pagination_nav,
    },
};

/// The state needed for the admin categories page and its endpoints.
#[derive(Debug, Clone)]
pub struct AdminCategoriesState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub pagination_config: PaginationConfig,
}

impl FromRef<AppState> for AdminCategoriesState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            pagination_config: state.pagination_config.clone(),
        }
    }
}

fn status_badge(category: &Category) -> Markup {
    let style = if category.is_active() {
        CATEGORY_BADGE_STYLE
    } else {
        "inline-flex items-center px-2.5 py-0.5 text-xs font-semibold \
        text-gray-800 bg-gray-100 rounded-full dark:bg-gray-700 dark:text-gray-300"
    };

    html!( span class=(style) data-status=(category.status.as_str()) { (category.status.as_str()) } )
}

/// A row of the categories table. Toggling the status swaps in a new row.
fn category_row(category: &Category) -> Markup {
    let rename_endpoint = format_endpoint(endpoints::ADMIN_CATEGORY_API, category.id);
    let status_endpoint = format_endpoint(endpoints::ADMIN_CATEGORY_STATUS_API, category.id);
    let toggle_label = if category.is_active() {
        "Deactivate"
    } else {
        "Activate"
    };

    html! {
        tr class=(TABLE_ROW_STYLE) data-category-id=(category.id)
        {
            td class=(TABLE_CELL_STYLE)
            {
                form
                    hx-put=(rename_endpoint)
                    hx-target-error="#alert-container"
                    hx-swap="none"
                    class="flex gap-2"
                {
                    input
                        type="text"
                        name="name"
                        value=(category.name)
                        aria-label="Category name"
                        required
                        class=(FORM_TEXT_INPUT_STYLE);

                    button type="submit" class=(LINK_STYLE) { "Rename" }
                }
            }

            td class=(TABLE_CELL_STYLE) { (status_badge(category)) }

            td class=(TABLE_CELL_STYLE)
            {
                div class="flex gap-4"
                {
                    button
                        hx-post=(status_endpoint)
                        hx-target="closest tr"
                        hx-target-error="#alert-container"
                        hx-swap="outerHTML"
                        class=(LINK_STYLE)
                    {
                        (toggle_label)
                    }

                    button
                        hx-delete=(rename_endpoint)
                        hx-confirm={
                            "Are you sure you want to delete '" (category.name) "'? "
                            "Transactions in this category will become uncategorised."
                        }
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
}

fn admin_categories_view(
    categories: &[Category],
    query: &SearchQuery,
    page: Page,
    max_pages: u64,
) -> Markup {
    let nav_bar = NavBar::admin(endpoints::ADMIN_CATEGORIES_VIEW).into_html();
    let indicators = create_pagination_indicators(page.number, page.count, max_pages);

    html! {
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold mb-4" { "Categories" }

            form
                hx-post=(endpoints::ADMIN_CATEGORIES_API)
                hx-target-error="#alert-container"
                class="w-full max-w-md flex gap-2 items-end mb-6"
            {
                div class="flex-1"
                {
                    label for="new-category-name" class=(FORM_LABEL_STYLE) { "New category" }
                    input
                        type="text"
                        name="name"
                        id="new-category-name"
                        placeholder="e.g. Groceries"
                        required
                        class=(FORM_TEXT_INPUT_STYLE);
                }

                div { button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Create" } }
            }

            form
                method="get"
                action=(endpoints::ADMIN_CATEGORIES_VIEW)
                role="search"
                class="w-full max-w-2xl mb-4"
            {
                label for="q" class=(FORM_LABEL_STYLE) { "Search categories" }
                input
                    type="search"
                    name="q"
                    id="q"
                    value=(query.search())
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div class="w-full max-w-2xl overflow-x-auto dark:bg-gray-800"
            {
                table id="categories" class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Name" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Status" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                        }
                    }

                    tbody
                    {
                        @for category in categories {
                            (category_row(category))
                        }

                        @if categories.is_empty() {
                            tr
                            {
                                td colspan="3" class="px-6 py-4 text-center" data-state="empty"
                                {
                                    "No categories found."
                                }
                            }
                        }
                    }
                }
            }

            (pagination_nav(&indicators, |page| {
                query.page_url(endpoints::ADMIN_CATEGORIES_VIEW, page)
            }))
        }
    }
}

/// Render the admin page listing categories by name.
pub async fn get_admin_categories_page(
    State(state): State<AdminCategoriesState>,
    Query(query): Query<SearchQuery>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("Could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let config = &state.pagination_config;
    let category_count = count_categories(query.search(), &connection)
        .inspect_err(|error| tracing::error!("Could not count categories: {error}"))
        .map_err(|_| Error::RetrievalFailed("the categories".to_owned()))?;
    let page = Page::clamped(
        query.page.unwrap_or(config.default_page),
        config.default_page_size,
        category_count,
    );
    let categories = search_categories(query.search(), page.limit(), page.offset(), &connection)
        .inspect_err(|error| tracing::error!("Could not load categories: {error}"))
        .map_err(|_| Error::RetrievalFailed("the categories".to_owned()))?;

    let content = admin_categories_view(&categories, &query, page, config.max_pages);

    Ok(base("Categories", &[], &content).into_response())
}

fn lock_connection(
    db_connection: &Mutex<Connection>,
) -> Result<std::sync::MutexGuard<'_, Connection>, Response> {
    db_connection.lock().map_err(|error| {
        tracing::error!("Could not acquire database lock: {error}");
        Error::DatabaseLockError.into_alert_response()
    })
}

/// Create an active category, reloading the admin page on success.
pub async fn create_category_endpoint(
    State(state): State<AdminCategoriesState>,
    Form(form): Form<CategoryFormData>,
) -> Response {
    let name = match CategoryName::new(&form.name) {
        Ok(name) => name,
        Err(error) => return error.into_alert_response(),
    };

    let connection = match lock_connection(&state.db_connection) {
        Ok(connection) => connection,
        Err(response) => return response,
    };

    match create_category(name, &connection) {
        Ok(category) => {
            tracing::info!("Created category {} ({})", category.name, category.id);
            (
                HxRedirect(endpoints::ADMIN_CATEGORIES_VIEW.to_owned()),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
        Err(error @ Error::DuplicateCategoryName(_)) => error.into_alert_response(),
        Err(error) => {
            tracing::error!("An unexpected error occurred while creating a category: {error}");
            error.into_alert_response()
        }
    }
}

/// Rename a category, responds with an alert.
pub async fn rename_category_endpoint(
    State(state): State<AdminCategoriesState>,
    Path(category_id): Path<CategoryId>,
    Form(form): Form<CategoryFormData>,
) -> Response {
    let name = match CategoryName::new(&form.name) {
        Ok(name) => name,
        Err(error) => return error.into_alert_response(),
    };

    let connection = match lock_connection(&state.db_connection) {
        Ok(connection) => connection,
        Err(response) => return response,
    };

    match rename_category(category_id, name.clone(), &connection) {
        Ok(()) => Alert::SuccessSimple {
            message: format!("Category renamed to {name}"),
        }
        .into_response(),
        Err(error @ (Error::UpdateMissingCategory | Error::DuplicateCategoryName(_))) => {
            error.into_alert_response()
        }
        Err(error) => {
            tracing::error!("Could not rename category {category_id}: {error}");
            error.into_alert_response()
        }
    }
}

/// Switch a category between active and inactive, responds with the new table row.
pub async fn toggle_category_status_endpoint(
    State(state): State<AdminCategoriesState>,
    Path(category_id): Path<CategoryId>,
) -> Response {
    let connection = match lock_connection(&state.db_connection) {
        Ok(connection) => connection,
        Err(response) => return response,
    };

    let category = match get_category(category_id, &connection) {
        Ok(category) => category,
        Err(Error::NotFound) => return Error::UpdateMissingCategory.into_alert_response(),
        Err(error) => {
            tracing::error!("Could not load category {category_id}: {error}");
            return error.into_alert_response();
        }
    };

    let status = category.status.toggled();

    if let Err(error) = set_category_status(category_id, status, &connection) {
        tracing::error!("Could not update category {category_id}: {error}");
        return error.into_alert_response();
    }

    category_row(&Category { status, ..category }).into_response()
}

/// Delete a category, responds with an alert.
///
/// Transactions keep their rows with the category cleared.
pub async fn delete_category_endpoint(
    State(state): State<AdminCategoriesState>,
    Path(category_id): Path<CategoryId>,
) -> Response {
    let connection = match lock_connection(&state.db_connection) {
        Ok(connection) => connection,
        Err(response) => return response,
    };

    match delete_category(category_id, &connection) {
        // The status code has to be 200 OK or HTMX will not delete the table row.
        Ok(()) => Alert::SuccessSimple {
            message: "Category deleted".to_owned(),
        }
        .into_response(),
        Err(Error::DeleteMissingCategory) => Error::DeleteMissingCategory.into_alert_response(),
        Err(error) => {
            tracing::error!("Could not delete category {category_id}: {error}");
            error.into_alert_response()
        }
    }
}

#[cfg(test)]
mod admin_categories_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        extract::{Query, State},
        response::IntoResponse,
    };
    use scraper::{Html, Selector};

    use crate::{
        category::{AdminCategoriesState, CategoryName, create_category, get_admin_categories_page},
        endpoints,
        pagination::{PaginationConfig, SearchQuery},
        test_utils::{
            assert_form_input, assert_hx_endpoint, assert_status_ok, assert_valid_html,
            get_test_connection, parse_html_document,
        },
    };

    fn get_state(names: &[&str], page_size: u64) -> AdminCategoriesState {
        let connection = get_test_connection();
        for name in names {
            create_category(CategoryName::new_unchecked(name), &connection).unwrap();
        }

        AdminCategoriesState {
            db_connection: Arc::new(Mutex::new(connection)),
            pagination_config: PaginationConfig {
                default_page: 1,
                default_page_size: page_size,
                max_pages: 5,
            },
        }
    }

    async fn render(state: AdminCategoriesState, query: SearchQuery) -> Html {
        let response = get_admin_categories_page(State(state), Query(query))
            .await
            .into_response();

        assert_status_ok(&response);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        html
    }

    fn names(html: &Html) -> Vec<String> {
        html.select(&Selector::parse("#categories input[name=name]").unwrap())
            .filter_map(|input| input.value().attr("value").map(str::to_owned))
            .collect()
    }

    #[tokio::test]
    async fn renders_create_form() {
        let html = render(get_state(&[], 10), SearchQuery::default()).await;

        let form = html
            .select(&Selector::parse("form[hx-post]").unwrap())
            .next()
            .unwrap();
        assert_hx_endpoint(&form, endpoints::ADMIN_CATEGORIES_API, "hx-post");
        assert_form_input(&form, "name", "text");
    }

    #[tokio::test]
    async fn searches_by_name() {
        let state = get_state(&["Groceries", "Rent", "Eating out"], 10);

        let html = render(
            state,
            SearchQuery {
                q: Some("  e".to_owned()),
                page: None,
            },
        )
        .await;

        assert_eq!(names(&html), ["Eating out", "Groceries", "Rent"]);
    }

    #[tokio::test]
    async fn pages_results() {
        let state = get_state(&["A", "B", "C"], 2);

        let html = render(
            state,
            SearchQuery {
                q: None,
                page: Some(2),
            },
        )
        .await;

        assert_eq!(names(&html), ["C"]);
    }
}

#[cfg(test)]
mod category_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Form,
        extract::{Path, State},
        http::StatusCode,
    };
    use scraper::Selector;

    use crate::{
        Error,
        category::{
            AdminCategoriesState, CategoryFormData, CategoryName, CategoryStatus,
            create_category, create_category_endpoint, delete_category_endpoint, get_category,
            rename_category_endpoint, toggle_category_status_endpoint,
        },
        pagination::PaginationConfig,
        period::{MonthKey, get_or_create_period_budget},
        test_utils::{
            assert_hx_redirect, get_test_connection, insert_test_user, parse_html_fragment,
        },
        transaction::{Transaction, create_transaction, get_transaction},
    };

    fn get_state() -> AdminCategoriesState {
        AdminCategoriesState {
            db_connection: Arc::new(Mutex::new(get_test_connection())),
            pagination_config: PaginationConfig::default(),
        }
    }

    fn name_form(name: &str) -> Form<CategoryFormData> {
        Form(CategoryFormData {
            name: name.to_owned(),
        })
    }

    #[tokio::test]
    async fn creates_category() {
        let state = get_state();

        let response = create_category_endpoint(State(state.clone()), name_form(" Food ")).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, "/admin/categories");
        let category = get_category(1, &state.db_connection.lock().unwrap()).unwrap();
        assert_eq!(category.name, CategoryName::new_unchecked("Food"));
        assert_eq!(category.status, CategoryStatus::Active);
    }

    #[tokio::test]
    async fn rejects_empty_and_duplicate_names() {
        let state = get_state();
        create_category(
            CategoryName::new_unchecked("Food"),
            &state.db_connection.lock().unwrap(),
        )
        .unwrap();

        for name in ["  ", "Food"] {
            let response = create_category_endpoint(State(state.clone()), name_form(name)).await;

            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{name:?}");
        }
    }

    #[tokio::test]
    async fn renames_category() {
        let state = get_state();
        let category = create_category(
            CategoryName::new_unchecked("Food"),
            &state.db_connection.lock().unwrap(),
        )
        .unwrap();

        let response = rename_category_endpoint(
            State(state.clone()),
            Path(category.id),
            name_form("Groceries"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let category = get_category(category.id, &state.db_connection.lock().unwrap()).unwrap();
        assert_eq!(category.name, CategoryName::new_unchecked("Groceries"));
    }

    #[tokio::test]
    async fn renaming_missing_category_is_not_found() {
        let state = get_state();

        let response = rename_category_endpoint(State(state), Path(42), name_form("X")).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn toggles_status_and_renders_row() {
        let state = get_state();
        let category = create_category(
            CategoryName::new_unchecked("Food"),
            &state.db_connection.lock().unwrap(),
        )
        .unwrap();

        let response =
            toggle_category_status_endpoint(State(state.clone()), Path(category.id)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_fragment(response).await;
        let status = html
            .select(&Selector::parse("[data-status]").unwrap())
            .next()
            .unwrap();
        assert_eq!(status.value().attr("data-status"), Some("inactive"));
        let category = get_category(category.id, &state.db_connection.lock().unwrap()).unwrap();
        assert_eq!(category.status, CategoryStatus::Inactive);
    }

    #[tokio::test]
    async fn delete_keeps_transactions_uncategorised() {
        let state = get_state();
        let (category, transaction) = {
            let connection = state.db_connection.lock().unwrap();
            let user = insert_test_user("someone@example.com", &connection);
            let period = get_or_create_period_budget(
                user.id,
                MonthKey::parse("2025-10").unwrap(),
                &connection,
            )
            .unwrap();
            let category =
                create_category(CategoryName::new_unchecked("Food"), &connection).unwrap();
            let transaction = create_transaction(
                Transaction::build(period.id, 3.0).category_id(Some(category.id)),
                &connection,
            )
            .unwrap();
            (category, transaction)
        };

        let response = delete_category_endpoint(State(state.clone()), Path(category.id)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let connection = state.db_connection.lock().unwrap();
        assert_eq!(get_category(category.id, &connection), Err(Error::NotFound));
        assert_eq!(
            get_transaction(transaction.id, &connection).unwrap().category_id,
            None
        );
    }

    #[tokio::test]
    async fn deleting_missing_category_is_not_found() {
        let state = get_state();

        let response = delete_category_endpoint(State(state), Path(7)).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
