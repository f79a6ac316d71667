//! The endpoint that renders the summary card for a month.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::SessionContext,
    ledger::{load_ledger_view, summary_card},
    period::{MonthKey, MonthQuery},
};

/// Fired by every endpoint that changes a month's budget or transactions.
pub const LEDGER_CHANGED_EVENT: &str = "ledger-changed";

/// The state needed to summarize a month.
#[derive(Debug, Clone)]
pub struct LedgerState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for LedgerState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Reject a request for `requested` if the page that sent it has since
/// moved to another month.
///
/// Requests without an `HX-Current-URL` header are never stale.
fn check_not_stale(
    requested: MonthKey,
    headers: &HeaderMap,
    canonical_timezone: &str,
) -> Result<(), Error> {
    let Some(query) = MonthQuery::from_current_url(headers) else {
        return Ok(());
    };

    match query.resolve(canonical_timezone) {
        Ok(selected) if selected != requested => {
            tracing::debug!("Discarding summary for {requested}, the page shows {selected}");
            Err(Error::StalePeriodResponse)
        }
        _ => Ok(()),
    }
}

/// Render the summary card for the month in the `month` query parameter.
///
/// Responds with 204 No Content, so HTMX leaves the page alone, when the
/// page has switched to another month since the request was sent.
pub async fn get_summary_fragment(
    State(state): State<LedgerState>,
    Extension(session): Extension<SessionContext>,
    Query(query): Query<MonthQuery>,
    headers: HeaderMap,
) -> Response {
    let month = match query.resolve(&state.local_timezone) {
        Ok(month) => month,
        Err(error) => return error.into_alert_response(),
    };

    if let Err(error) = check_not_stale(month, &headers, &state.local_timezone) {
        return error.into_alert_response();
    }

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("Could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let view = load_ledger_view(session.user_id, month, &connection);
    summary_card(month, &view.summary()).into_response()
}
