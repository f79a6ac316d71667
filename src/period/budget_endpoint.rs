//! The endpoint for changing a month's total budget.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use maud::html;
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    alert::Alert,
    amount::Amount,
    auth::SessionContext,
    ledger::{load_ledger_view, summary_card},
    period::{PeriodId, get_period_budget, update_budget},
};

/// The state needed to update a budget.
#[derive(Debug, Clone)]
pub struct BudgetState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for BudgetState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BudgetForm {
    pub total_budget: String,
}

/// Set the total budget for one of the user's months and respond with the
/// refreshed summary card.
///
/// Months belonging to other users are reported as not found.
pub async fn update_budget_endpoint(
    State(state): State<BudgetState>,
    Extension(session): Extension<SessionContext>,
    Path(period_id): Path<PeriodId>,
    Form(form): Form<BudgetForm>,
) -> Response {
    let total_budget = match Amount::parse(&form.total_budget) {
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

    match get_period_budget(period_id, &connection) {
        Ok(period) if period.user_id == session.user_id => {}
        Ok(_) | Err(Error::NotFound) => return Error::UpdateMissingPeriod.into_alert_response(),
        Err(error) => {
            tracing::error!("Could not load budget {period_id}: {error}");
            return error.into_alert_response();
        }
    }

    let period = match update_budget(period_id, total_budget, &connection) {
        Ok(period) => period,
        Err(error) => {
            tracing::error!("Could not update budget {period_id}: {error}");
            return error.into_alert_response();
        }
    };

    let view = load_ledger_view(session.user_id, period.month, &connection);
    let alert = Alert::SuccessSimple {
        message: format!("Budget for {} saved", period.month.label()),
    };

    // Swaps the card in place, without a ledger-changed trigger.
    html! {
        (summary_card(period.month, &view.summary()))
        (alert.into_oob_html())
    }
    .into_response()
}
