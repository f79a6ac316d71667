//! Defines the endpoint for adding a transaction to a month.
use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
// Must use axum_extra's Form since that parses an empty string as None instead
// of crashing like axum::Form.
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use rusqlite::Connection;

use crate::{
    AppState, Error,
    amount::Amount,
    auth::SessionContext,
    category::{CategoryId, get_category},
    endpoints::{self, with_month},
    ledger::LEDGER_CHANGED_EVENT,
    period::{MonthQuery, get_or_create_period_budget},
    transaction::{Transaction, TransactionFormData, TransactionKind, create_transaction},
};

/// The state needed to add a transaction.
#[derive(Debug, Clone)]
pub struct CreateTransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for CreateTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Parse the submitted category, if any.
///
/// The category must exist and be active.
fn parse_category(
    raw: Option<&str>,
    connection: &Connection,
) -> Result<Option<CategoryId>, Error> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(raw) => raw,
    };

    let category_id: CategoryId = raw.parse().map_err(|_| Error::InvalidCategory(None))?;

    match get_category(category_id, connection) {
        Ok(category) if category.is_active() => Ok(Some(category_id)),
        Ok(_) | Err(Error::NotFound) => Err(Error::InvalidCategory(Some(category_id))),
        Err(error) => Err(error),
    }
}

/// A route handler for adding a transaction to one of the session user's
/// months, redirects to that month's transactions on success.
pub async fn create_transaction_endpoint(
    State(state): State<CreateTransactionState>,
    Extension(session): Extension<SessionContext>,
    Form(form): Form<TransactionFormData>,
) -> Response {
    let month = MonthQuery {
        month: Some(form.month.clone()),
    };
    let month = match month.resolve(&state.local_timezone) {
        Ok(month) => month,
        Err(error) => return error.into_alert_response(),
    };

    let amount = match Amount::parse_positive(&form.amount) {
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

    let category_id = match parse_category(form.category_id.as_deref(), &connection) {
        Ok(category_id) => category_id,
        Err(error) => return error.into_alert_response(),
    };

    let period = match get_or_create_period_budget(session.user_id, month, &connection) {
        Ok(period) => period,
        Err(error) => {
            tracing::error!("Could not load the budget for {month}: {error}");
            return Error::RetrievalFailed("the budget for this month".to_owned())
                .into_alert_response();
        }
    };

    let new_transaction = Transaction::build(period.id, amount.as_f64())
        .kind(TransactionKind::from_raw(form.kind.as_deref()))
        .category_id(category_id)
        .note(form.note.as_deref().unwrap_or_default());

    match create_transaction(new_transaction, &connection) {
        Ok(_) => {}
        Err(error @ (Error::InvalidAmount(_) | Error::InvalidCategory(_))) => {
            return error.into_alert_response();
        }
        Err(error) => {
            tracing::error!("Could not create transaction: {error}");
            return error.into_alert_response();
        }
    }

    (
        StatusCode::SEE_OTHER,
        HxRedirect(with_month(endpoints::TRANSACTIONS_VIEW, month)),
        [("hx-trigger", LEDGER_CHANGED_EVENT)],
    )
        .into_response()
}
