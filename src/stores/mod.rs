//! Contains traits and implementations for objects that store the domain models.
//!
//! Services receive their stores at construction, so the SQLite implementations in
//! [sqlite] can be swapped out for other implementations in tests.

mod category;
mod transaction;

pub mod sqlite;

pub use category::CategoryStore;
pub use transaction::TransactionStore;
