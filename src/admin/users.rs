//! The admin page listing users, and the endpoint for blocking and
//! unblocking them.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::SessionContext,
    endpoints::{self, format_endpoint},
    html::{
        CATEGORY_BADGE_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, LINK_STYLE,
        PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base,
    },
    navigation::NavBar,
    pagination::{
        Page, PaginationConfig, SearchQuery, create_pagination_indicators, pagination_nav,
    },
    user::{User, UserID, count_search_users, get_user_by_id, search_users, set_user_status},
};

const BLOCKED_BADGE_STYLE: &str = "inline-flex items-center px-2.5 py-0.5 text-xs font-semibold \
    text-red-800 bg-red-100 rounded-full dark:bg-red-900 dark:text-red-300";

/// The state needed for the admin users page and its endpoint.
#[derive(Debug, Clone)]
pub struct AdminUsersState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub pagination_config: PaginationConfig,
}

impl FromRef<AppState> for AdminUsersState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            pagination_config: state.pagination_config.clone(),
        }
    }
}

fn user_row(user: &User, session_user_id: UserID) -> Markup {
    let status_endpoint = format_endpoint(endpoints::ADMIN_USER_STATUS_API, user.id.as_i64());
    let badge_style = if user.is_blocked() {
        BLOCKED_BADGE_STYLE
    } else {
        CATEGORY_BADGE_STYLE
    };
    let toggle_label = if user.is_blocked() { "Unblock" } else { "Block" };

    html! {
        tr class=(TABLE_ROW_STYLE) data-user-id=(user.id)
        {
            td class=(TABLE_CELL_STYLE) { (user.email) }
            td class=(TABLE_CELL_STYLE) { (user.full_name) }
            td class=(TABLE_CELL_STYLE) { (user.role.as_str()) }
            td class=(TABLE_CELL_STYLE)
            {
                span class=(badge_style) data-status=(user.status.as_str()) { (user.status.as_str()) }
            }
            td class=(TABLE_CELL_STYLE)
            {
                @if user.id == session_user_id {
                    span class="text-gray-400" { "You" }
                } @else {
                    button
                        hx-post=(status_endpoint)
                        hx-target="closest tr"
                        hx-target-error="#alert-container"
                        hx-swap="outerHTML"
                        class=(LINK_STYLE)
                    {
                        (toggle_label)
                    }
                }
            }
        }
    }
}

fn admin_users_view(
    users: &[User],
    session_user_id: UserID,
    query: &SearchQuery,
    page: Page,
    max_pages: u64,
) -> Markup {
    let indicators = create_pagination_indicators(page.number, page.count, max_pages);

    html! {
        (NavBar::admin(endpoints::ADMIN_USERS_VIEW).into_html())

        div class=(PAGE_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold mb-4" { "Users" }

            form
                method="get"
                action=(endpoints::ADMIN_USERS_VIEW)
                role="search"
                class="w-full max-w-2xl mb-4"
            {
                label for="q" class=(FORM_LABEL_STYLE) { "Search by email or name" }
                input
                    type="search"
                    name="q"
                    id="q"
                    value=(query.search())
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div class="w-full max-w-4xl overflow-x-auto dark:bg-gray-800"
            {
                table id="users" class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Email" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Name" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Role" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Status" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                        }
                    }

                    tbody
                    {
                        @for user in users {
                            (user_row(user, session_user_id))
                        }

                        @if users.is_empty() {
                            tr
                            {
                                td colspan="5" class="px-6 py-4 text-center" data-state="empty"
                                {
                                    "No users found."
                                }
                            }
                        }
                    }
                }
            }

            (pagination_nav(&indicators, |page| {
                query.page_url(endpoints::ADMIN_USERS_VIEW, page)
            }))
        }
    }
}

/// Render the admin page listing users by ID.
pub async fn get_admin_users_page(
    State(state): State<AdminUsersState>,
    Extension(session): Extension<SessionContext>,
    Query(query): Query<SearchQuery>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("Could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let config = &state.pagination_config;
    let user_count = count_search_users(query.search(), &connection)
        .inspect_err(|error| tracing::error!("Could not count users: {error}"))
        .map_err(|_| Error::RetrievalFailed("the users".to_owned()))?;
    let page = Page::clamped(
        query.page.unwrap_or(config.default_page),
        config.default_page_size,
        user_count,
    );
    let users = search_users(query.search(), page.limit(), page.offset(), &connection)
        .inspect_err(|error| tracing::error!("Could not load users: {error}"))
        .map_err(|_| Error::RetrievalFailed("the users".to_owned()))?;

    let content = admin_users_view(&users, session.user_id, &query, page, config.max_pages);

    Ok(base("Users", &[], &content).into_response())
}

/// Block an active user or unblock a blocked one, responds with the new
/// table row.
///
/// Administrators cannot block themselves.
pub async fn toggle_user_status_endpoint(
    State(state): State<AdminUsersState>,
    Extension(session): Extension<SessionContext>,
    Path(user_id): Path<i64>,
) -> Response {
    let user_id = UserID::new(user_id);

    if user_id == session.user_id {
        return Error::CannotBlockSelf.into_alert_response();
    }

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("Could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let user = match get_user_by_id(user_id, &connection) {
        Ok(user) => user,
        Err(Error::NotFound) => return Error::UpdateMissingUser.into_alert_response(),
        Err(error) => {
            tracing::error!("Could not load user {user_id}: {error}");
            return error.into_alert_response();
        }
    };

    let status = user.status.toggled();

    if let Err(error) = set_user_status(user_id, status, &connection) {
        tracing::error!("Could not update the status of user {user_id}: {error}");
        return error.into_alert_response();
    }

    tracing::info!("User {user_id} is now {}", status.as_str());

    user_row(&User { status, ..user }, session.user_id).into_response()
}
