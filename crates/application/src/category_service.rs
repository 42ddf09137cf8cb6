use store::CategoryRepository;

use crate::Result;

/// Read access to product categories.
#[derive(Clone)]
pub struct CategoryService<S> {
    store: S,
}

impl<S: CategoryRepository> CategoryService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Names of the categories that have at least one product, sorted.
    #[tracing::instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<String>> {
        Ok(self.store.list_all_categories().await?)
    }
}
