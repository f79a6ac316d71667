use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    alert::Alert,
    auth::SessionContext,
    ledger::LEDGER_CHANGED_EVENT,
    period::get_period_budget,
    transaction::{TransactionId, delete_transaction, get_transaction},
};

/// The state needed to delete a transaction.
#[derive(Debug, Clone)]
pub struct DeleteTransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Delete `transaction_id` if it was recorded in one of `session`'s months.
fn delete_owned_transaction(
    transaction_id: TransactionId,
    session: &SessionContext,
    connection: &Connection,
) -> Result<(), Error> {
    let transaction = match get_transaction(transaction_id, connection) {
        Ok(transaction) => transaction,
        Err(Error::NotFound) => return Err(Error::DeleteMissingTransaction),
        Err(error) => return Err(error),
    };

    match get_period_budget(transaction.period_id, connection) {
        Ok(period) if period.user_id == session.user_id => {}
        Ok(_) | Err(Error::NotFound) => return Err(Error::DeleteMissingTransaction),
        Err(error) => return Err(error),
    }

    delete_transaction(transaction_id, transaction.period_id, connection)
}

/// A route handler for deleting a transaction, responds with an alert.
///
/// Transactions in other users' months are reported as missing.
pub async fn delete_transaction_endpoint(
    State(state): State<DeleteTransactionState>,
    Extension(session): Extension<SessionContext>,
    Path(transaction_id): Path<TransactionId>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("Could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match delete_owned_transaction(transaction_id, &session, &connection) {
        // The status code has to be 200 OK or HTMX will not delete the table row.
        Ok(()) => (
            [("hx-trigger", LEDGER_CHANGED_EVENT)],
            Alert::SuccessSimple {
                message: "Transaction deleted".to_owned(),
            },
        )
            .into_response(),
        Err(Error::DeleteMissingTransaction) => {
            Error::DeleteMissingTransaction.into_alert_response()
        }
        Err(error) => {
            tracing::error!("Could not delete transaction {transaction_id}: {error}");
            error.into_alert_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension,
        extract::{Path, State},
        http::StatusCode,
    };
    use time::Month;

    use crate::{
        Error,
        auth::SessionContext,
        period::{MonthKey, get_or_create_period_budget},
        test_utils::{get_header, get_test_connection, insert_test_user},
        transaction::{
            DeleteTransactionState, Transaction, create_transaction,
            delete_transaction_endpoint, get_transaction,
        },
        user::User,
    };

    fn get_state_with_transaction() -> (DeleteTransactionState, User, i64) {
        let connection = get_test_connection();
        let user = insert_test_user("someone@example.com", &connection);
        let period =
            get_or_create_period_budget(user.id, MonthKey::new(2025, Month::October), &connection)
                .unwrap();
        let transaction =
            create_transaction(Transaction::build(period.id, 12.0), &connection).unwrap();

        let state = DeleteTransactionState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        (state, user, transaction.id)
    }

    #[tokio::test]
    async fn can_delete_transaction() {
        let (state, user, transaction_id) = get_state_with_transaction();

        let response = delete_transaction_endpoint(
            State(state.clone()),
            Extension(SessionContext::from(&user)),
            Path(transaction_id),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(get_header(&response, "hx-trigger"), "ledger-changed");
        assert_eq!(
            get_transaction(transaction_id, &state.db_connection.lock().unwrap()),
            Err(Error::NotFound)
        );
    }

    #[tokio::test]
    async fn deleting_missing_transaction_is_not_found() {
        let (state, user, transaction_id) = get_state_with_transaction();

        let response = delete_transaction_endpoint(
            State(state),
            Extension(SessionContext::from(&user)),
            Path(transaction_id + 1),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn cannot_delete_another_users_transaction() {
        let (state, _, transaction_id) = get_state_with_transaction();
        let intruder =
            insert_test_user("intruder@example.com", &state.db_connection.lock().unwrap());

        let response = delete_transaction_endpoint(
            State(state.clone()),
            Extension(SessionContext::from(&intruder)),
            Path(transaction_id),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(get_transaction(transaction_id, &state.db_connection.lock().unwrap()).is_ok());
    }
}
