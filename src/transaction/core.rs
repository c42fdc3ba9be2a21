//! Defines the core data models for transactions.

use std::{fmt::Display, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Error, category::Category, database_id::TransactionId};

// ============================================================================
// MODELS
// ============================================================================

/// Whether money was earned or spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money coming in, e.g. a salary.
    Income,
    /// Money going out, e.g. rent.
    Outcome,
}

impl TransactionType {
    /// The lowercase name used in requests, CSV files and the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Outcome => "outcome",
        }
    }
}

impl FromStr for TransactionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(TransactionType::Income),
            "outcome" => Ok(TransactionType::Outcome),
            other => Err(Error::InvalidTransactionType(other.to_owned())),
        }
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An income or outcome, i.e. an event where money was either earned or spent.
///
/// Transactions are created once, either one at a time or in bulk from a CSV
/// file, and never change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// A text description of what the transaction was for.
    pub title: String,
    /// The amount of money earned or spent, always greater than zero.
    pub value: Decimal,
    /// Whether the money was earned or spent.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// The category the transaction belongs to.
    pub category: Category,
}

/// A validated transaction that has not been stored yet.
///
/// The category must already exist in the store, which is why it is a
/// [Category] rather than a title.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    title: String,
    value: Decimal,
    transaction_type: TransactionType,
    category: Category,
}

impl NewTransaction {
    /// Validate the fields for a transaction.
    ///
    /// `title` is trimmed before it is checked.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::EmptyTransactionTitle] if `title` is empty or just whitespace,
    /// - or [Error::NonPositiveValue] if `value` is zero or negative.
    pub fn new(
        title: &str,
        value: Decimal,
        transaction_type: TransactionType,
        category: Category,
    ) -> Result<Self, Error> {
        Ok(Self {
            title: validate_title(title)?,
            value: validate_value(value)?,
            transaction_type,
            category,
        })
    }

    /// The trimmed title of the transaction.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The value of the transaction.
    pub fn value(&self) -> Decimal {
        self.value
    }

    /// Whether the transaction is income or outcome.
    pub fn transaction_type(&self) -> TransactionType {
        self.transaction_type
    }

    /// The category the transaction will belong to.
    pub fn category(&self) -> &Category {
        &self.category
    }

    /// Attach the ID assigned by the store.
    pub fn into_transaction(self, id: TransactionId) -> Transaction {
        Transaction {
            id,
            title: self.title,
            value: self.value,
            transaction_type: self.transaction_type,
            category: self.category,
        }
    }
}

// ============================================================================
// VALIDATION
// ============================================================================

/// Trim `title` and check that something is left.
///
/// # Errors
/// Returns [Error::EmptyTransactionTitle] if `title` is empty or just whitespace.
pub fn validate_title(title: &str) -> Result<String, Error> {
    let title = title.trim();

    if title.is_empty() {
        Err(Error::EmptyTransactionTitle)
    } else {
        Ok(title.to_owned())
    }
}

/// Check that `value` is strictly positive.
///
/// # Errors
/// Returns [Error::NonPositiveValue] if `value` is zero or negative.
pub fn validate_value(value: Decimal) -> Result<Decimal, Error> {
    if value > Decimal::ZERO {
        Ok(value)
    } else {
        Err(Error::NonPositiveValue(value))
    }
}

/// Parse a transaction value from text, e.g. a CSV cell.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidValue] if `text` is not a decimal number,
/// - or [Error::NonPositiveValue] if the number is zero or negative.
pub fn parse_value(text: &str) -> Result<Decimal, Error> {
    let value = Decimal::from_str(text).map_err(|_| Error::InvalidValue(text.to_owned()))?;

    validate_value(value)
}

// ============================================================================
// TESTS
// ============================================================================
