//! The API endpoints URIs.

/// The route for creating and listing transactions.
pub const TRANSACTIONS: &str = "/transactions";
/// The route for importing transactions from a CSV file.
pub const IMPORT: &str = "/transactions/import";
/// The route for listing categories.
pub const CATEGORIES: &str = "/categories";
/// The route for getting the current balance.
pub const BALANCE: &str = "/balance";
