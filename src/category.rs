//! This file defines the `Category` type and the types needed to create a category.
//! Every transaction belongs to exactly one category.

mod list_endpoint;
mod resolver;

pub use list_endpoint::get_categories_endpoint;
pub use resolver::CategoryResolver;

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{Error, database_id::CategoryId};

/// The title of the category that transactions without a category are filed under.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// The title of a category.
///
/// Titles are trimmed and never empty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct CategoryTitle(String);

impl CategoryTitle {
    /// Create a category title from `title` with surrounding whitespace removed.
    ///
    /// # Errors
    ///
    /// This function will return an error if `title` is empty or just whitespace.
    pub fn new(title: &str) -> Result<Self, Error> {
        let title = title.trim();

        if title.is_empty() {
            Err(Error::EmptyCategoryTitle)
        } else {
            Ok(Self(title.to_owned()))
        }
    }

    /// Create a category title, falling back to [UNCATEGORIZED] when `title`
    /// is empty or just whitespace.
    pub fn or_uncategorized(title: &str) -> Self {
        Self::new(title).unwrap_or_else(|_| Self::uncategorized())
    }

    /// The title of the default category.
    pub fn uncategorized() -> Self {
        Self(UNCATEGORIZED.to_owned())
    }

    /// Create a category title without validation.
    ///
    /// The caller should ensure that the string is trimmed and not empty.
    pub fn new_unchecked(title: &str) -> Self {
        Self(title.to_owned())
    }
}

impl AsRef<str> for CategoryTitle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for CategoryTitle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A category for income and outcome transactions, e.g., 'Groceries', 'Rent', 'Salary'.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct Category {
    /// The ID of the category.
    pub id: CategoryId,
    /// The unique title of the category.
    pub title: CategoryTitle,
}
