//! The month's ledger: the summary calculation, tracking what has loaded for
//! the selected month, and the summary card.

mod card;
mod endpoint;
mod summary;
mod view;

pub use card::{SUMMARY_CARD_ID, summary_card};
pub use endpoint::{LEDGER_CHANGED_EVENT, LedgerState, get_summary_fragment};
pub use summary::{LedgerSummary, OVER_BUDGET_WARNING, spending_by_category, summarize};
pub use view::{LedgerView, SummaryState, load_ledger_view};
