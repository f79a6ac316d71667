//! Spending categories and the monthly limits users set for them.

mod admin;
mod db;
mod domain;
mod limit;
mod limits_page;

pub use admin::{
    AdminCategoriesState, create_category_endpoint, delete_category_endpoint,
    get_admin_categories_page, rename_category_endpoint, toggle_category_status_endpoint,
};
pub use db::{
    count_categories, create_category, create_category_table, delete_category,
    get_active_categories, get_category, rename_category, search_categories, set_category_status,
};
pub use domain::{
    Category, CategoryFormData, CategoryId, CategoryLimit, CategoryLimitId, CategoryName,
    CategoryStatus,
};
pub use limit::{
    create_category_limit_table, delete_category_limit, get_category_limits, set_category_limit,
};
pub use limits_page::{
    CategoryBreakdownRow, CategoryLimitForm, CategoryLimitsState, category_breakdown_table,
    delete_category_limit_endpoint, get_category_limits_page, load_category_breakdown,
    set_category_limit_endpoint,
};
