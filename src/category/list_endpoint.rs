//! Defines the endpoint for listing categories.
use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    category::Category,
    stores::{CategoryStore, sqlite::SQLiteCategoryStore},
};

/// The state needed to list categories.
#[derive(Debug, Clone)]
pub struct CategoriesState {
    /// The database connection for reading categories.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CategoriesState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler that returns all categories ordered by title.
pub async fn get_categories_endpoint(
    State(state): State<CategoriesState>,
) -> Result<Json<Vec<Category>>, Error> {
    SQLiteCategoryStore::new(state.db_connection)
        .get_all()
        .map(Json)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use rusqlite::Connection;

    use crate::{
        category::CategoryTitle,
        db::initialize,
        stores::{CategoryStore, sqlite::SQLiteCategoryStore},
    };

    use super::{CategoriesState, get_categories_endpoint};

    #[tokio::test]
    async fn lists_categories_alphabetically() {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let connection = Arc::new(Mutex::new(connection));
        let store = SQLiteCategoryStore::new(connection.clone());
        let rent = store.create(CategoryTitle::new_unchecked("Rent")).unwrap();
        let food = store.create(CategoryTitle::new_unchecked("Food")).unwrap();

        let categories = get_categories_endpoint(State(CategoriesState {
            db_connection: connection,
        }))
        .await
        .expect("Could not list categories");

        assert_eq!(categories.0, vec![food, rent]);
    }
}
