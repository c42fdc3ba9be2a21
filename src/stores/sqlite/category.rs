//! Implements a SQLite backed category store.

use std::sync::{Arc, Mutex};

use rusqlite::{Connection, Row, params_from_iter};

use crate::{
    Error,
    category::{Category, CategoryTitle},
    db::{CreateTable, MapRow},
    stores::CategoryStore,
};

/// The most titles bound to a single `IN (...)` query.
const MAX_TITLES_PER_QUERY: usize = 500;

/// Creates and retrieves transaction categories to/from a SQLite database.
#[derive(Debug, Clone)]
pub struct SQLiteCategoryStore {
    connection: Arc<Mutex<Connection>>,
}

impl SQLiteCategoryStore {
    /// Create a new category store with a SQLite database.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }
}

impl CategoryStore for SQLiteCategoryStore {
    /// Create a category in the database.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::DuplicateCategoryTitle] if a category with `title` already exists,
    /// - or [Error::SqlError] if there is some other SQL error.
    fn create(&self, title: CategoryTitle) -> Result<Category, Error> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        insert_category(title, &connection)
    }

    /// Create categories for all of `titles` inside a single SQL transaction.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::DuplicateCategoryTitle] if any title already exists or
    ///   appears twice in `titles`, in which case no categories are created,
    /// - or [Error::SqlError] if there is some other SQL error.
    fn create_many(&self, titles: Vec<CategoryTitle>) -> Result<Vec<Category>, Error> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        let tx = connection.unchecked_transaction()?;

        let categories = titles
            .into_iter()
            .map(|title| insert_category(title, &tx))
            .collect::<Result<Vec<_>, _>>()?;

        tx.commit()?;

        Ok(categories)
    }

    /// Retrieve the category with exactly `title`.
    ///
    /// # Errors
    /// This function will return an error if there is an SQL error.
    fn get_by_title(&self, title: &CategoryTitle) -> Result<Option<Category>, Error> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        let result = connection
            .prepare("SELECT id, title FROM category WHERE title = :title;")?
            .query_row(&[(":title", title.as_ref())], Self::map_row);

        match result {
            Ok(category) => Ok(Some(category)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    /// Retrieve the categories whose titles are in `titles`, ordered by ID.
    ///
    /// # Errors
    /// This function will return an error if there is an SQL error.
    fn get_by_titles(&self, titles: &[CategoryTitle]) -> Result<Vec<Category>, Error> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        let mut categories = Vec::new();

        for chunk in titles.chunks(MAX_TITLES_PER_QUERY) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let query =
                format!("SELECT id, title FROM category WHERE title IN ({placeholders}) ORDER BY id;");

            let rows = connection
                .prepare(&query)?
                .query_map(
                    params_from_iter(chunk.iter().map(|title| title.as_ref())),
                    Self::map_row,
                )?
                .collect::<Result<Vec<_>, _>>()?;

            categories.extend(rows);
        }

        Ok(categories)
    }

    /// Retrieve all categories ordered alphabetically by title.
    ///
    /// # Errors
    /// This function will return an error if there is an SQL error.
    fn get_all(&self) -> Result<Vec<Category>, Error> {
        self.connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?
            .prepare("SELECT id, title FROM category ORDER BY title ASC;")?
            .query_map([], Self::map_row)?
            .map(|maybe_category| maybe_category.map_err(|error| error.into()))
            .collect()
    }
}

fn insert_category(title: CategoryTitle, connection: &Connection) -> Result<Category, Error> {
    connection
        .execute("INSERT INTO category (title) VALUES (?1);", (title.as_ref(),))
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                _,
            ) => Error::DuplicateCategoryTitle(title.to_string()),
            error => error.into(),
        })?;

    let id = connection.last_insert_rowid();

    Ok(Category { id, title })
}

impl CreateTable for SQLiteCategoryStore {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute_batch(
            "CREATE TABLE IF NOT EXISTS category (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL UNIQUE
            );",
        )?;

        Ok(())
    }
}

impl MapRow for SQLiteCategoryStore {
    type ReturnType = Category;

    fn map_row_with_offset(row: &Row, offset: usize) -> Result<Self::ReturnType, rusqlite::Error> {
        let id = row.get(offset)?;

        let raw_title: String = row.get(offset + 1)?;
        let title = CategoryTitle::new_unchecked(&raw_title);

        Ok(Self::ReturnType { id, title })
    }
}
