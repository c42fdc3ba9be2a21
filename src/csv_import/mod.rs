//! Bulk import of transactions from CSV files.

mod csv;
mod import_endpoint;
mod import_transactions;

pub use self::csv::{CsvRecord, complete_records, parse_records};
pub use import_endpoint::{ImportResponse, import_transactions_endpoint};
pub use import_transactions::{ImportReport, TransactionImporter};
