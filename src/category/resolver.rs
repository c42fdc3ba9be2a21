//! Finds the category for a title, creating it on first use.

use crate::{
    Error,
    category::{Category, CategoryTitle},
    stores::CategoryStore,
};

/// Maps category titles to stored categories.
#[derive(Debug, Clone)]
pub struct CategoryResolver<C> {
    category_store: C,
}

impl<C: CategoryStore> CategoryResolver<C> {
    /// Create a resolver that reads and writes categories through `category_store`.
    pub fn new(category_store: C) -> Self {
        Self { category_store }
    }

    /// Get the category titled `title`, creating it if it does not exist yet.
    ///
    /// `title` is trimmed, and an empty title resolves to the
    /// [UNCATEGORIZED](crate::category::UNCATEGORIZED) category.
    ///
    /// # Errors
    /// Returns any error from the store unchanged, including
    /// [Error::DuplicateCategoryTitle] if another caller created the category
    /// between the lookup and the insert.
    pub fn resolve(&self, title: &str) -> Result<Category, Error> {
        let title = CategoryTitle::or_uncategorized(title);

        if let Some(category) = self.category_store.get_by_title(&title)? {
            return Ok(category);
        }

        let category = self.category_store.create(title)?;
        tracing::debug!("Created category {} \"{}\"", category.id, category.title);

        Ok(category)
    }
}
