//! Implements a SQLite backed transaction store.
use std::sync::{Arc, Mutex};

use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use rust_decimal::Decimal;

use crate::{
    Error,
    balance::Balance,
    database_id::TransactionId,
    db::{CreateTable, MapRow},
    stores::{TransactionStore, sqlite::SQLiteCategoryStore, sqlite::parse_text_column},
    transaction::{NewTransaction, Transaction, TransactionType},
};

const SELECT_TRANSACTION: &str = "SELECT t.id, t.title, t.value, t.type, c.id, c.title
     FROM \"transaction\" t
     INNER JOIN category c ON c.id = t.category_id";

/// Stores transactions in a SQLite database.
///
/// Note that because a transaction depends on the [Category](crate::category::Category)
/// model, the category table must be set up in the same database.
#[derive(Debug, Clone)]
pub struct SQLiteTransactionStore {
    connection: Arc<Mutex<Connection>>,
}

impl SQLiteTransactionStore {
    /// Create a new store for the SQLite `connection`.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }
}

impl TransactionStore for SQLiteTransactionStore {
    /// Create a new transaction in the database.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::InvalidCategory] if the category does not exist in the database,
    /// - or [Error::SqlError] if there is some other SQL error.
    fn create(&self, new_transaction: NewTransaction) -> Result<Transaction, Error> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        insert_transaction(new_transaction, &connection)
    }

    /// Create many transactions inside a single SQL transaction.
    ///
    /// If any insert fails, nothing is written.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::InvalidCategory] if a category does not exist in the database,
    /// - or [Error::SqlError] if there is some other SQL error.
    fn import(&self, new_transactions: Vec<NewTransaction>) -> Result<Vec<Transaction>, Error> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        let tx = connection.unchecked_transaction()?;

        let transactions = new_transactions
            .into_iter()
            .map(|new_transaction| insert_transaction(new_transaction, &tx))
            .collect::<Result<Vec<_>, _>>()?;

        tx.commit()?;

        Ok(transactions)
    }

    /// Retrieve a transaction in the database by its `id`.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::NotFound] if `id` does not refer to a valid transaction,
    /// - or [Error::SqlError] there is some other SQL error.
    fn get(&self, id: TransactionId) -> Result<Transaction, Error> {
        let transaction = self
            .connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?
            .prepare(&format!("{SELECT_TRANSACTION} WHERE t.id = :id"))?
            .query_row(&[(":id", &id)], Self::map_row)?;

        Ok(transaction)
    }

    /// Retrieve all transactions in the database in the order they were created.
    ///
    /// # Errors
    /// This function will return a [Error::SqlError] there is a SQL error.
    fn get_all(&self) -> Result<Vec<Transaction>, Error> {
        self.connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?
            .prepare(&format!("{SELECT_TRANSACTION} ORDER BY t.id ASC"))?
            .query_map([], Self::map_row)?
            .map(|maybe_transaction| maybe_transaction.map_err(|error| error.into()))
            .collect()
    }

    /// Sum the values of all transactions in the database.
    ///
    /// Values are stored as text and summed as decimals so that no rounding
    /// error creeps into the balance.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::BalanceOverflow] if the stored values sum past the largest decimal,
    /// - or [Error::SqlError] if there is a SQL error.
    fn get_balance(&self) -> Result<Balance, Error> {
        let entries = self
            .connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?
            .prepare("SELECT type, value FROM \"transaction\"")?
            .query_map([], |row| Ok((row.get(0)?, parse_text_column(row, 1)?)))?
            .collect::<Result<Vec<(TransactionType, Decimal)>, _>>()?;

        Balance::from_entries(entries)
    }
}

fn insert_transaction(
    new_transaction: NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let category_id = new_transaction.category().id;

    let id = connection
        .prepare_cached(
            "INSERT INTO \"transaction\" (title, value, type, category_id)
             VALUES (?1, ?2, ?3, ?4)
             RETURNING id",
        )?
        .query_row(
            (
                new_transaction.title(),
                new_transaction.value().to_string(),
                new_transaction.transaction_type(),
                category_id,
            ),
            |row| row.get(0),
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::InvalidCategory(category_id),
            error => error.into(),
        })?;

    Ok(new_transaction.into_transaction(id))
}

impl ToSql for TransactionType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

impl CreateTable for SQLiteTransactionStore {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                value TEXT NOT NULL,
                type TEXT NOT NULL CHECK (type IN ('income', 'outcome')),
                category_id INTEGER NOT NULL,
                FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE RESTRICT
                )",
            (),
        )?;

        Ok(())
    }
}

impl MapRow for SQLiteTransactionStore {
    type ReturnType = Transaction;

    fn map_row_with_offset(row: &Row, offset: usize) -> Result<Self::ReturnType, rusqlite::Error> {
        let id = row.get(offset)?;
        let title = row.get(offset + 1)?;
        let value = parse_text_column(row, offset + 2)?;
        let transaction_type = row.get(offset + 3)?;
        let category = SQLiteCategoryStore::map_row_with_offset(row, offset + 4)?;

        Ok(Transaction {
            id,
            title,
            value,
            transaction_type,
            category,
        })
    }
}
