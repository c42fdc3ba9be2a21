//! Transaction management for the ledger.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and `NewTransaction` for creating transactions
//! - The `LedgerWriter` that creates single transactions within the balance
//! - Route handlers for creating and listing transactions

pub(crate) mod core;
mod create_endpoint;
mod list_endpoint;
mod writer;

pub use self::core::{NewTransaction, Transaction, TransactionType};
pub use create_endpoint::{TransactionForm, create_transaction_endpoint};
pub use list_endpoint::{TransactionsResponse, get_transactions_endpoint};
pub use writer::LedgerWriter;
