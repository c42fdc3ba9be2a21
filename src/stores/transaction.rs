//! Defines the transaction store trait.

use crate::{
    Error,
    balance::Balance,
    database_id::TransactionId,
    transaction::{NewTransaction, Transaction},
};

/// Handles the creation and retrieval of transactions.
pub trait TransactionStore {
    /// Create a new transaction in the store.
    fn create(&self, new_transaction: NewTransaction) -> Result<Transaction, Error>;

    /// Create many transactions in one batch.
    ///
    /// Either every transaction is created or none are. The returned
    /// transactions are in the same order as `new_transactions`.
    fn import(&self, new_transactions: Vec<NewTransaction>) -> Result<Vec<Transaction>, Error>;

    /// Retrieve a transaction from the store.
    fn get(&self, id: TransactionId) -> Result<Transaction, Error>;

    /// Retrieve all transactions in the order they were created.
    fn get_all(&self) -> Result<Vec<Transaction>, Error>;

    /// Sum the income and outcome of every transaction in the store.
    fn get_balance(&self) -> Result<Balance, Error>;
}
