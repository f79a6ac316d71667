//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router, middleware,
    response::Redirect,
    routing::{delete, get, post, put},
};
use tower_http::services::ServeDir;

use crate::{
    AppState,
    admin::{get_admin_dashboard_page, get_admin_users_page, toggle_user_status_endpoint},
    auth::{
        admin_guard, auth_guard, auth_guard_hx, get_log_in_page, get_log_out, get_register_page,
        post_log_in, register_user,
    },
    category::{
        create_category_endpoint, delete_category_endpoint, delete_category_limit_endpoint,
        get_admin_categories_page, get_category_limits_page, rename_category_endpoint,
        set_category_limit_endpoint, toggle_category_status_endpoint,
    },
    dashboard::get_dashboard_page,
    endpoints,
    internal_server_error::get_internal_server_error_page,
    ledger::get_summary_fragment,
    not_found::get_404_not_found,
    period::update_budget_endpoint,
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, get_transactions_page,
    },
    user::{change_password_endpoint, get_profile_page, update_profile_endpoint},
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::LOG_IN_VIEW, get(get_log_in_page))
        .route(endpoints::LOG_IN_API, post(post_log_in))
        .route(endpoints::LOG_OUT, get(get_log_out))
        .route(endpoints::REGISTER_VIEW, get(get_register_page))
        .route(endpoints::USERS, post(register_user))
        .route(
            endpoints::INTERNAL_ERROR_VIEW,
            get(get_internal_server_error_page),
        );

    let protected_routes = Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::DASHBOARD_VIEW, get(get_dashboard_page))
        .route(endpoints::TRANSACTIONS_VIEW, get(get_transactions_page))
        .route(endpoints::CATEGORIES_VIEW, get(get_category_limits_page))
        .route(endpoints::PROFILE_VIEW, get(get_profile_page))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    // These routes need to use the HX-REDIRECT header for auth redirects to work properly for HTMX requests.
    let protected_api_routes = Router::new()
        .route(endpoints::SUMMARY_API, get(get_summary_fragment))
        .route(endpoints::PERIOD_BUDGET_API, put(update_budget_endpoint))
        .route(
            endpoints::TRANSACTIONS_API,
            post(create_transaction_endpoint),
        )
        .route(
            endpoints::TRANSACTION_API,
            delete(delete_transaction_endpoint),
        )
        .route(
            endpoints::CATEGORY_LIMITS_API,
            post(set_category_limit_endpoint),
        )
        .route(
            endpoints::CATEGORY_LIMIT_API,
            delete(delete_category_limit_endpoint),
        )
        .route(endpoints::PROFILE_API, put(update_profile_endpoint))
        .route(endpoints::PASSWORD_API, put(change_password_endpoint))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard_hx));

    // The admin guard needs the session added by the auth guard, so it goes on first.
    let admin_routes = Router::new()
        .route(endpoints::ADMIN_DASHBOARD_VIEW, get(get_admin_dashboard_page))
        .route(endpoints::ADMIN_USERS_VIEW, get(get_admin_users_page))
        .route(
            endpoints::ADMIN_CATEGORIES_VIEW,
            get(get_admin_categories_page),
        )
        .route_layer(middleware::from_fn(admin_guard))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    let admin_api_routes = Router::new()
        .route(
            endpoints::ADMIN_USER_STATUS_API,
            post(toggle_user_status_endpoint),
        )
        .route(
            endpoints::ADMIN_CATEGORIES_API,
            post(create_category_endpoint),
        )
        .route(
            endpoints::ADMIN_CATEGORY_API,
            put(rename_category_endpoint).delete(delete_category_endpoint),
        )
        .route(
            endpoints::ADMIN_CATEGORY_STATUS_API,
            post(toggle_category_status_endpoint),
        )
        .route_layer(middleware::from_fn(admin_guard))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard_hx));

    protected_routes
        .merge(protected_api_routes)
        .merge(admin_routes)
        .merge(admin_api_routes)
        .merge(unprotected_routes)
        .nest_service(endpoints::STATIC, ServeDir::new("static/"))
        .fallback(get_404_not_found)
        .with_state(state)
}

/// The root path '/' redirects to the dashboard page.
async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::DASHBOARD_VIEW)
}
