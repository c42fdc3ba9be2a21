//! SQLite backed implementations of the store traits.
//!
//! The stores share a single connection, so they see each other's writes and
//! foreign keys between categories and transactions are enforced.

mod category;
mod transaction;

pub use category::SQLiteCategoryStore;
pub use transaction::SQLiteTransactionStore;

use std::str::FromStr;

use rusqlite::{Row, types::Type};

/// Read the text column at `index` and parse it into `T`.
///
/// Used for values such as decimals that are stored as text to keep them exact.
fn parse_text_column<T>(row: &Row, index: usize) -> Result<T, rusqlite::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: String = row.get(index)?;

    text.parse()
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error)))
}
