//! Tracks what has been loaded for the selected month and decides what the
//! summary card can show.

use rusqlite::Connection;

use crate::{
    Error,
    ledger::{LedgerSummary, summarize},
    period::{MonthKey, PeriodBudget, get_or_create_period_budget},
    transaction::{Transaction, list_transactions},
    user::UserID,
};

#[derive(Debug, Clone, PartialEq)]
enum Load<T> {
    Loading,
    Loaded(T),
    Failed(String),
}

/// What the summary card should display.
#[derive(Debug, Clone, PartialEq)]
pub enum SummaryState {
    /// At least one fetch has not finished yet.
    Loading,
    /// A fetch failed. Holds a message for the user.
    Unavailable(String),
    Ready(LedgerSummary),
}

/// The budget and transactions loaded for the selected month.
///
/// Results are tagged with the month they were requested for. A result for
/// any other month is rejected with [Error::StalePeriodResponse] and leaves
/// the view untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerView {
    selected: MonthKey,
    budget: Load<PeriodBudget>,
    transactions: Load<Vec<Transaction>>,
}

impl LedgerView {
    pub fn new(month: MonthKey) -> Self {
        Self {
            selected: month,
            budget: Load::Loading,
            transactions: Load::Loading,
        }
    }

    pub fn selected(&self) -> MonthKey {
        self.selected
    }

    /// Switch to `month`, forgetting everything loaded so far.
    pub fn select(&mut self, month: MonthKey) {
        *self = Self::new(month);
    }

    /// The loaded budget, if it has arrived.
    pub fn budget(&self) -> Option<&PeriodBudget> {
        match &self.budget {
            Load::Loaded(budget) => Some(budget),
            _ => None,
        }
    }

    /// The loaded transactions, if they have arrived.
    pub fn transactions(&self) -> Option<&[Transaction]> {
        match &self.transactions {
            Load::Loaded(transactions) => Some(transactions),
            _ => None,
        }
    }

    /// Record the result of fetching the budget for `tag`.
    ///
    /// # Errors
    ///
    /// Returns [Error::StalePeriodResponse] if `tag` is not the selected
    /// month, or the budget is for a different month.
    pub fn apply_budget(
        &mut self,
        tag: MonthKey,
        result: Result<PeriodBudget, Error>,
    ) -> Result<(), Error> {
        self.check_tag(tag)?;

        self.budget = match result {
            Ok(budget) if budget.month != tag => return Err(Error::StalePeriodResponse),
            Ok(budget) => Load::Loaded(budget),
            Err(error) => Load::Failed(failure_message(error, "the budget for this month")),
        };

        Ok(())
    }

    /// Record the result of fetching the transactions for `tag`.
    ///
    /// # Errors
    ///
    /// Returns [Error::StalePeriodResponse] if `tag` is not the selected month.
    pub fn apply_transactions(
        &mut self,
        tag: MonthKey,
        result: Result<Vec<Transaction>, Error>,
    ) -> Result<(), Error> {
        self.check_tag(tag)?;

        self.transactions = match result {
            Ok(transactions) => Load::Loaded(transactions),
            Err(error) => Load::Failed(failure_message(error, "the transactions for this month")),
        };

        Ok(())
    }

    /// The summary for the selected month.
    ///
    /// Any failed fetch makes the summary unavailable. It is never computed
    /// over partial data.
    pub fn summary(&self) -> SummaryState {
        match (&self.budget, &self.transactions) {
            (Load::Failed(reason), _) | (_, Load::Failed(reason)) => {
                SummaryState::Unavailable(reason.clone())
            }
            (Load::Loaded(budget), Load::Loaded(transactions)) => SummaryState::Ready(summarize(
                Some(budget.total_budget),
                transactions,
                budget.id,
            )),
            _ => SummaryState::Loading,
        }
    }

    fn check_tag(&self, tag: MonthKey) -> Result<(), Error> {
        if tag == self.selected {
            Ok(())
        } else {
            tracing::debug!(
                "Discarding result for {tag}, {} is selected.",
                self.selected
            );
            Err(Error::StalePeriodResponse)
        }
    }
}

fn failure_message(error: Error, what: &str) -> String {
    match error {
        Error::RetrievalFailed(message) => message,
        error => {
            tracing::error!("Could not load {what}: {error}");
            Error::RetrievalFailed(what.to_owned()).to_string()
        }
    }
}

/// Load the budget and transactions for `month` from the database.
///
/// The transactions are only fetched once the budget is known. If the budget
/// cannot be loaded, the transactions are marked as failed too.
pub fn load_ledger_view(user_id: UserID, month: MonthKey, connection: &Connection) -> LedgerView {
    let mut view = LedgerView::new(month);
    let budget = get_or_create_period_budget(user_id, month, connection);

    let transactions = match &budget {
        Ok(budget) => list_transactions(budget.id, connection),
        Err(_) => Err(Error::RetrievalFailed(
            "the transactions for this month".to_owned(),
        )),
    };

    // Both results are tagged with the month just selected, so neither is stale.
    let _ = view.apply_budget(month, budget);
    let _ = view.apply_transactions(month, transactions);

    view
}
