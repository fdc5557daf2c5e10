use async_trait::async_trait;
use claim_core::db::{DbConfig, RepositoryFactory};
use claim_core::{ClaimRepository, RepositoryError};

use crate::repository::SqliteRepository;

/// [`RepositoryFactory`] for the `"sqlite"` backend.
///
/// ```rust,no_run
/// use claim_core::db::RepositoryRegistry;
/// use claim_db_sqlite::SqliteRepositoryFactory;
///
/// let mut registry = RepositoryRegistry::new();
/// registry.register(Box::new(SqliteRepositoryFactory));
/// ```
pub struct SqliteRepositoryFactory;

#[async_trait]
impl RepositoryFactory for SqliteRepositoryFactory {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    /// Opens `config.connection_string` (a file path, a `sqlite:` URL or
    /// `:memory:`) and brings the schema up to date.
    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn ClaimRepository>, RepositoryError> {
        let repo = SqliteRepository::new(&config.connection_string)
            .await
            .map_err(|e| RepositoryError::Connection(format!("{e:#}")))?;
        repo.run_migrations()
            .await
            .map_err(|e| RepositoryError::Database(format!("{e:#}")))?;
        Ok(Box::new(repo))
    }
}
