//! Defines the endpoint for listing transactions together with the balance.
use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    balance::Balance,
    stores::{TransactionStore, sqlite::SQLiteTransactionStore},
    transaction::Transaction,
};

/// The state needed to list transactions.
#[derive(Debug, Clone)]
pub struct ListTransactionsState {
    /// The database connection for reading transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ListTransactionsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// All transactions and the balance they add up to.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct TransactionsResponse {
    /// Every transaction in the order they were created.
    pub transactions: Vec<Transaction>,
    /// The balance of `transactions`.
    pub balance: Balance,
}

/// A route handler that returns all transactions and the current balance.
pub async fn get_transactions_endpoint(
    State(state): State<ListTransactionsState>,
) -> Result<Json<TransactionsResponse>, Error> {
    let store = SQLiteTransactionStore::new(state.db_connection);

    let transactions = store.get_all()?;
    let balance = store.get_balance()?;

    Ok(Json(TransactionsResponse {
        transactions,
        balance,
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use rusqlite::Connection;
    use rust_decimal_macros::dec;

    use crate::{
        db::initialize,
        stores::sqlite::{SQLiteCategoryStore, SQLiteTransactionStore},
        transaction::{LedgerWriter, TransactionType},
    };

    use super::{ListTransactionsState, get_transactions_endpoint};

    #[tokio::test]
    async fn lists_transactions_with_balance() {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let connection = Arc::new(Mutex::new(connection));
        let writer = LedgerWriter::new(
            SQLiteCategoryStore::new(connection.clone()),
            SQLiteTransactionStore::new(connection.clone()),
        );
        let salary = writer
            .create_transaction("Salary", dec!(5000), TransactionType::Income, "Job")
            .unwrap();
        let rent = writer
            .create_transaction("Rent", dec!(1200), TransactionType::Outcome, "Housing")
            .unwrap();

        let response = get_transactions_endpoint(State(ListTransactionsState {
            db_connection: connection,
        }))
        .await
        .expect("Could not list transactions");

        assert_eq!(response.transactions, vec![salary, rent]);
        assert_eq!(response.balance.income, dec!(5000));
        assert_eq!(response.balance.outcome, dec!(1200));
        assert_eq!(response.balance.total, dec!(3800));
    }
}
