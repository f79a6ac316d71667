//! Calendar months and the budget each user sets for them.

mod budget_endpoint;
mod db;
mod domain;
mod month_picker;

pub use budget_endpoint::{BudgetForm, BudgetState, update_budget_endpoint};
pub use db::{
    create_period_table, get_or_create_period_budget, get_period_budget,
    get_period_budgets_between, update_budget,
};
pub use domain::{MonthKey, PeriodBudget, PeriodId};
pub use month_picker::{MonthQuery, month_picker};
