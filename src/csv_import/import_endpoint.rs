//! Defines the route handler for uploading a CSV file of transactions.

use std::{
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
    time::{SystemTime, UNIX_EPOCH},
};

use axum::{
    Json,
    extract::{FromRef, Multipart, State, multipart::Field},
    http::StatusCode,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tokio::{fs::File, io::AsyncWriteExt};

use crate::{
    AppState, Error,
    csv_import::TransactionImporter,
    stores::sqlite::{SQLiteCategoryStore, SQLiteTransactionStore},
    transaction::Transaction,
};

/// The state needed to import transactions.
#[derive(Debug, Clone)]
pub struct ImportState {
    /// The database connection for saving categories and transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The directory uploaded files are written to before they are imported.
    pub upload_dir: PathBuf,
}

impl FromRef<AppState> for ImportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            upload_dir: state.upload_dir.clone(),
        }
    }
}

/// The response body for a successful import.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct ImportResponse {
    /// The imported transactions in file order.
    pub transactions: Vec<Transaction>,
    /// Why the uploaded file could not be deleted, if it could not.
    pub cleanup_error: Option<String>,
}

/// A route handler for importing transactions from an uploaded CSV file.
///
/// Only the first field of the form is read. The file is saved to the upload
/// directory, imported, and deleted once the import has succeeded.
pub async fn import_transactions_endpoint(
    State(state): State<ImportState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ImportResponse>), Error> {
    let field = multipart
        .next_field()
        .await
        .map_err(|error| Error::MultipartError(error.to_string()))?
        .ok_or_else(|| Error::MultipartError("the form did not contain a file".to_owned()))?;

    let path = save_csv_field(field, &state.upload_dir).await?;

    let importer = TransactionImporter::new(
        SQLiteCategoryStore::new(state.db_connection.clone()),
        SQLiteTransactionStore::new(state.db_connection),
    );
    let report = importer.import_file(&path)?;

    Ok((
        StatusCode::CREATED,
        Json(ImportResponse {
            transactions: report.transactions,
            cleanup_error: report.cleanup_error.map(|error| error.to_string()),
        }),
    ))
}

fn is_csv_field(field: &Field<'_>) -> bool {
    let has_csv_type = field.content_type() == Some("text/csv");
    let has_csv_extension = field
        .file_name()
        .is_some_and(|file_name| file_name.to_lowercase().ends_with(".csv"));

    has_csv_type || has_csv_extension
}

/// Stream `field` into a new file in `upload_dir` and return its path.
///
/// The file is removed again if the upload cannot be read to the end.
async fn save_csv_field(mut field: Field<'_>, upload_dir: &Path) -> Result<PathBuf, Error> {
    if !is_csv_field(&field) {
        tracing::debug!(
            "Rejected upload with content type {:?} and file name {:?}",
            field.content_type(),
            field.file_name()
        );
        return Err(Error::NotCSV);
    }

    let path = upload_dir.join(unique_upload_name());

    match write_field_to_file(&mut field, &path).await {
        Ok(byte_count) => {
            tracing::debug!("Saved {byte_count} byte upload to {}", path.display());
            Ok(path)
        }
        Err(error) => {
            if let Err(remove_error) = tokio::fs::remove_file(&path).await {
                tracing::warn!(
                    "Could not delete partial upload {}: {remove_error}",
                    path.display()
                );
            }

            Err(error)
        }
    }
}

/// Stream the chunks of `field` into a new file at `path`, returning the
/// number of bytes written.
async fn write_field_to_file(field: &mut Field<'_>, path: &Path) -> Result<usize, Error> {
    let mut file = File::create(path).await?;
    let mut byte_count = 0;

    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|error| Error::MultipartError(error.to_string()))?
    {
        byte_count += chunk.len();
        file.write_all(&chunk).await?;
    }

    file.flush().await?;

    Ok(byte_count)
}

fn unique_upload_name() -> String {
    static UPLOAD_COUNT: AtomicU64 = AtomicU64::new(0);

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_nanos())
        .unwrap_or_default();
    let count = UPLOAD_COUNT.fetch_add(1, Ordering::Relaxed);

    format!("import-{nanos}-{count}.csv")
}
