//! Defines the app level error type and conversions to JSON error responses.
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde_json::json;

use crate::database_id::CategoryId;

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// An empty string was used as the title of a transaction.
    #[error("transaction title cannot be empty")]
    EmptyTransactionTitle,

    /// An empty string was used to create a category title.
    #[error("category title cannot be empty")]
    EmptyCategoryTitle,

    /// A transaction value must be strictly greater than zero.
    #[error("{0} is not a valid transaction value, the value must be greater than zero")]
    NonPositiveValue(Decimal),

    /// The transaction type was neither "income" nor "outcome".
    #[error("\"{0}\" is not a valid transaction type, expected \"income\" or \"outcome\"")]
    InvalidTransactionType(String),

    /// The text could not be parsed as a decimal number.
    #[error("\"{0}\" is not a valid decimal number")]
    InvalidValue(String),

    /// A row in an imported CSV file passed the completeness check but holds
    /// a transaction type or value that cannot be stored.
    ///
    /// `line` is the 1-based line number in the source file.
    #[error("invalid CSV row on line {line}: {reason}")]
    InvalidCSVRow {
        /// The line the row starts on.
        line: u64,
        /// Why the row was rejected.
        reason: String,
    },

    /// The multipart form could not be parsed.
    #[error("could not parse multipart form: {0}")]
    MultipartError(String),

    /// The multipart form did not contain a CSV file.
    #[error("file is not a CSV")]
    NotCSV,

    /// An outcome transaction would spend more than the current balance.
    #[error("you do not have enough balance: tried to spend {value} but the balance is {total}")]
    InsufficientBalance {
        /// The value of the rejected outcome transaction.
        value: Decimal,
        /// The balance total at the time of the check.
        total: Decimal,
    },

    /// Adding a transaction would push the income or outcome sum past the
    /// largest value a decimal can hold.
    #[error("the balance would exceed the largest supported amount")]
    BalanceOverflow,

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// A category with the same title already exists.
    ///
    /// Resolution checks for an existing category before creating one, so this
    /// only happens when another call created the category in between.
    #[error("the category \"{0}\" already exists in the database")]
    DuplicateCategoryTitle(String),

    /// The category ID used to create a transaction did not match a valid category.
    #[error("the category ID {0} does not refer to a valid category")]
    InvalidCategory(CategoryId),

    /// A candidate transaction referenced a category title that was not in the
    /// resolved category pool.
    #[error("could not resolve the category \"{0}\"")]
    UnresolvedCategory(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// Reading the import source failed.
    ///
    /// Holds the string form of the underlying I/O error.
    #[error("could not read the import source: {0}")]
    Io(String),

    /// The import succeeded but the source file could not be deleted afterwards.
    #[error("could not delete the import source \"{path}\": {reason}")]
    CleanupFailed {
        /// The path of the file that should have been deleted.
        path: String,
        /// The string form of the underlying I/O error.
        reason: String,
    },
}

/// The broad classes of [Error] that callers react to differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required field is missing or holds an invalid value.
    Validation,
    /// An outcome transaction exceeds the current balance.
    InsufficientBalance,
    /// The database could not complete a read or write.
    Storage,
    /// The import source could not be read or cleaned up.
    Io,
}

impl Error {
    /// The class of error this is.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::EmptyTransactionTitle
            | Error::EmptyCategoryTitle
            | Error::NonPositiveValue(_)
            | Error::InvalidTransactionType(_)
            | Error::InvalidValue(_)
            | Error::InvalidCSVRow { .. }
            | Error::MultipartError(_)
            | Error::NotCSV
            | Error::BalanceOverflow => ErrorKind::Validation,
            Error::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            Error::NotFound
            | Error::DuplicateCategoryTitle(_)
            | Error::InvalidCategory(_)
            | Error::UnresolvedCategory(_)
            | Error::SqlError(_)
            | Error::DatabaseLockError => ErrorKind::Storage,
            Error::Io(_) | Error::CleanupFailed { .. } => ErrorKind::Io,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::Io(value.to_string())
    }
}

impl From<csv::Error> for Error {
    fn from(value: csv::Error) -> Self {
        let line = value.position().map(|position| position.line());

        match value.into_kind() {
            csv::ErrorKind::Io(error) => error.into(),
            kind => Error::InvalidCSVRow {
                line: line.unwrap_or_default(),
                reason: format!("{kind:?}"),
            },
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match self.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::InsufficientBalance => StatusCode::BAD_REQUEST,
            ErrorKind::Storage if matches!(self, Error::NotFound) => StatusCode::NOT_FOUND,
            ErrorKind::Storage | ErrorKind::Io => {
                tracing::error!("An unexpected error occurred: {}", self);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        // Internal details are only shown for errors the client can act on.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "An unexpected error occurred, check the server logs for more details.".to_owned()
        } else {
            self.to_string()
        };

        (
            status,
            Json(json!({
                "status": "error",
                "message": message,
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::{body, http::StatusCode, response::IntoResponse};
    use rust_decimal_macros::dec;

    use super::{Error, ErrorKind};

    #[test]
    fn query_returned_no_rows_maps_to_not_found() {
        let error: Error = rusqlite::Error::QueryReturnedNoRows.into();

        assert_eq!(error, Error::NotFound);
    }

    #[test]
    fn io_error_is_io_kind() {
        let error: Error = std::io::Error::other("disk on fire").into();

        assert_eq!(error.kind(), ErrorKind::Io);
        assert_eq!(error, Error::Io("disk on fire".to_owned()));
    }

    #[test]
    fn insufficient_balance_is_its_own_kind() {
        let error = Error::InsufficientBalance {
            value: dec!(10),
            total: dec!(5),
        };

        assert_eq!(error.kind(), ErrorKind::InsufficientBalance);
    }

    #[tokio::test]
    async fn insufficient_balance_renders_bad_request_with_message() {
        let response = Error::InsufficientBalance {
            value: dec!(10),
            total: dec!(5),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Could not read response body");
        let json: serde_json::Value =
            serde_json::from_slice(&body).expect("Could not parse response body as JSON");
        assert_eq!(json["status"], "error");
        assert!(
            json["message"]
                .as_str()
                .is_some_and(|message| message.contains("not have enough balance")),
            "got message {}",
            json["message"]
        );
    }

    #[tokio::test]
    async fn storage_errors_hide_details() {
        let response = Error::DatabaseLockError.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Could not read response body");
        let json: serde_json::Value =
            serde_json::from_slice(&body).expect("Could not parse response body as JSON");
        assert!(
            !json["message"]
                .as_str()
                .is_some_and(|message| message.contains("lock")),
        );
    }

    #[test]
    fn balance_overflow_renders_bad_request() {
        let error = Error::BalanceOverflow;

        assert_eq!(error.kind(), ErrorKind::Validation);
        assert_eq!(error.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn not_found_renders_404() {
        let response = Error::NotFound.into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
