//! The URIs of every page and API route.
//!
//! For endpoints that take a parameter, e.g., '/api/transactions/{transaction_id}', use [format_endpoint].

/// Redirects to the dashboard.
pub const ROOT: &str = "/";
/// The landing page for users: this month's budget and summary.
pub const DASHBOARD_VIEW: &str = "/dashboard";
/// The month's transaction history and the form for adding transactions.
pub const TRANSACTIONS_VIEW: &str = "/transactions";
/// Per-category limits for a month.
pub const CATEGORIES_VIEW: &str = "/categories";
/// The logged-in user's profile.
pub const PROFILE_VIEW: &str = "/profile";
pub const REGISTER_VIEW: &str = "/register";
pub const LOG_IN_VIEW: &str = "/log_in";
/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";
pub const STATIC: &str = "/static";

/// The landing page for administrators.
pub const ADMIN_DASHBOARD_VIEW: &str = "/admin";
pub const ADMIN_USERS_VIEW: &str = "/admin/users";
pub const ADMIN_CATEGORIES_VIEW: &str = "/admin/categories";

pub const LOG_IN_API: &str = "/api/log_in";
pub const LOG_OUT: &str = "/api/log_out";
/// Registers a new user.
pub const USERS: &str = "/api/users";
pub const PROFILE_API: &str = "/api/profile";
pub const PASSWORD_API: &str = "/api/profile/password";
/// The summary card for the month in the `month` query parameter.
pub const SUMMARY_API: &str = "/api/summary";
pub const PERIOD_BUDGET_API: &str = "/api/periods/{period_id}/budget";
pub const TRANSACTIONS_API: &str = "/api/transactions";
pub const TRANSACTION_API: &str = "/api/transactions/{transaction_id}";
pub const CATEGORY_LIMITS_API: &str = "/api/category_limits";
pub const CATEGORY_LIMIT_API: &str = "/api/category_limits/{limit_id}";
pub const ADMIN_USER_STATUS_API: &str = "/api/admin/users/{user_id}/status";
pub const ADMIN_CATEGORIES_API: &str = "/api/admin/categories";
pub const ADMIN_CATEGORY_API: &str = "/api/admin/categories/{category_id}";
pub const ADMIN_CATEGORY_STATUS_API: &str = "/api/admin/categories/{category_id}/status";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a name in braces, e.g. '{user_id}' in '/api/admin/users/{user_id}/status'.
/// Only the first parameter is replaced. Paths without one are returned unchanged.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(start) = endpoint_path.find('{') else {
        return endpoint_path.to_owned();
    };

    let end = endpoint_path[start..]
        .find('}')
        .map_or(endpoint_path.len(), |offset| start + offset + 1);

    format!("{}{id}{}", &endpoint_path[..start], &endpoint_path[end..])
}

/// `endpoint_path` with `month` as the `month` query parameter.
pub fn with_month(endpoint_path: &str, month: impl std::fmt::Display) -> String {
    format!("{endpoint_path}?month={month}")
}
