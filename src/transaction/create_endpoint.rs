//! Defines the endpoint for creating a new transaction.
use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::{
    AppState, Error,
    stores::sqlite::{SQLiteCategoryStore, SQLiteTransactionStore},
    transaction::{LedgerWriter, Transaction, TransactionType},
};

/// The state needed to create a transaction.
#[derive(Debug, Clone)]
pub struct CreateTransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The request body for creating a transaction.
#[derive(Debug, Deserialize)]
pub struct TransactionForm {
    /// Text detailing the transaction.
    pub title: String,
    /// The amount of money, must be greater than zero.
    pub value: Decimal,
    /// Either "income" or "outcome".
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// The title of the category, created if it does not exist yet.
    #[serde(default)]
    pub category: String,
}

/// A route handler for creating a new transaction, responds with the created
/// transaction and `201 Created` on success.
pub async fn create_transaction_endpoint(
    State(state): State<CreateTransactionState>,
    Json(form): Json<TransactionForm>,
) -> Result<(StatusCode, Json<Transaction>), Error> {
    let writer = LedgerWriter::new(
        SQLiteCategoryStore::new(state.db_connection.clone()),
        SQLiteTransactionStore::new(state.db_connection),
    );

    writer
        .create_transaction(
            &form.title,
            form.value,
            form.transaction_type,
            &form.category,
        )
        .map(|transaction| (StatusCode::CREATED, Json(transaction)))
}
