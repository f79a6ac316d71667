//! The dashboard shown after logging in.

mod page;

pub use page::{DashboardState, get_dashboard_page};
