//! The admin area: an overview of the whole ledger and user management.
//!
//! Category management lives with the rest of the category code in
//! [crate::category].

mod dashboard;
mod users;

pub use dashboard::{AdminDashboardState, get_admin_dashboard_page};
pub use users::{AdminUsersState, get_admin_users_page, toggle_user_status_endpoint};
