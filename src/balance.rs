//! The balance is derived from the stored transactions and never stored itself.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    stores::{TransactionStore, sqlite::SQLiteTransactionStore},
    transaction::TransactionType,
};

/// The sum of all income, all outcome, and the difference between the two.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// The sum of the values of all income transactions.
    pub income: Decimal,
    /// The sum of the values of all outcome transactions.
    pub outcome: Decimal,
    /// `income - outcome`.
    pub total: Decimal,
}

impl Balance {
    /// Compute the balance of `entries`, pairs of transaction type and value.
    ///
    /// # Errors
    /// Returns [Error::BalanceOverflow] if the income or outcome sum does not
    /// fit in a [Decimal].
    pub fn from_entries<I>(entries: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (TransactionType, Decimal)>,
    {
        entries
            .into_iter()
            .try_fold(Self::default(), |mut balance, (transaction_type, value)| {
                balance.record(transaction_type, value)?;
                Ok(balance)
            })
    }

    /// Add a single transaction to the balance.
    ///
    /// The balance is left unchanged on error.
    ///
    /// # Errors
    /// Returns [Error::BalanceOverflow] if the income or outcome sum would no
    /// longer fit in a [Decimal].
    pub fn record(
        &mut self,
        transaction_type: TransactionType,
        value: Decimal,
    ) -> Result<(), Error> {
        let (income, outcome) = match transaction_type {
            TransactionType::Income => (self.income.checked_add(value), Some(self.outcome)),
            TransactionType::Outcome => (Some(self.income), self.outcome.checked_add(value)),
        };

        let (Some(income), Some(outcome)) = (income, outcome) else {
            return Err(Error::BalanceOverflow);
        };
        let total = income.checked_sub(outcome).ok_or(Error::BalanceOverflow)?;

        *self = Self {
            income,
            outcome,
            total,
        };

        Ok(())
    }

    /// Whether an outcome of `value` can be paid from the balance.
    ///
    /// Spending the entire balance is allowed.
    pub fn covers(&self, value: Decimal) -> bool {
        value <= self.total
    }
}

/// The state needed to get the balance.
#[derive(Debug, Clone)]
pub struct BalanceState {
    /// The database connection for reading transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for BalanceState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler that returns the current balance.
pub async fn get_balance_endpoint(
    State(state): State<BalanceState>,
) -> Result<Json<Balance>, Error> {
    SQLiteTransactionStore::new(state.db_connection)
        .get_balance()
        .map(Json)
}
