//! Creates single transactions while keeping spending within the balance.

use rust_decimal::Decimal;

use crate::{
    Error,
    category::CategoryResolver,
    stores::{CategoryStore, TransactionStore},
    transaction::{
        NewTransaction, Transaction, TransactionType,
        core::{validate_title, validate_value},
    },
};

/// Creates transactions one at a time.
///
/// Unlike the CSV import, the writer refuses outcome transactions that are
/// larger than the current balance.
#[derive(Debug, Clone)]
pub struct LedgerWriter<C, T> {
    category_resolver: CategoryResolver<C>,
    transaction_store: T,
}

impl<C, T> LedgerWriter<C, T>
where
    C: CategoryStore,
    T: TransactionStore,
{
    /// Create a writer that resolves categories through `category_store` and
    /// saves transactions to `transaction_store`.
    pub fn new(category_store: C, transaction_store: T) -> Self {
        Self {
            category_resolver: CategoryResolver::new(category_store),
            transaction_store,
        }
    }

    /// Create a transaction, resolving `category_title` to a category first.
    ///
    /// The balance is checked before anything is written, so a rejected
    /// transaction leaves no new category behind.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::EmptyTransactionTitle] or [Error::NonPositiveValue] if the
    ///   fields are invalid,
    /// - [Error::InsufficientBalance] if an outcome is larger than the balance total,
    /// - [Error::BalanceOverflow] if the transaction would push the income or
    ///   outcome sum past the largest decimal,
    /// - or any error from the stores unchanged.
    pub fn create_transaction(
        &self,
        title: &str,
        value: Decimal,
        transaction_type: TransactionType,
        category_title: &str,
    ) -> Result<Transaction, Error> {
        let title = validate_title(title)?;
        let value = validate_value(value)?;

        let mut balance = self.transaction_store.get_balance()?;

        if transaction_type == TransactionType::Outcome && !balance.covers(value) {
            tracing::debug!(
                "Rejected outcome \"{title}\" of {value} with a balance of {}",
                balance.total
            );
            return Err(Error::InsufficientBalance {
                value,
                total: balance.total,
            });
        }

        balance.record(transaction_type, value)?;

        let category = self.category_resolver.resolve(category_title)?;
        let new_transaction = NewTransaction::new(&title, value, transaction_type, category)?;
        let transaction = self.transaction_store.create(new_transaction)?;

        tracing::info!(
            "Created {} transaction {} \"{}\" of {}",
            transaction.transaction_type,
            transaction.id,
            transaction.title,
            transaction.value
        );

        Ok(transaction)
    }
}
