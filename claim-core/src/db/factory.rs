use std::collections::HashMap;

use async_trait::async_trait;

use super::repository::{ClaimRepository, RepositoryError};

/// Where and how to open the claims store.
///
/// `backend` selects a registered [`RepositoryFactory`] by name and
/// `connection_string` is handed to it untouched.
///
/// | backend    | connection_string examples          |
/// |------------|-------------------------------------|
/// | `sqlite`   | `claims.db`, `:memory:`             |
/// | `memory`   | ignored                             |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub backend: String,
    pub connection_string: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            connection_string: ":memory:".to_string(),
        }
    }
}

/// Opens a [`ClaimRepository`] for one storage backend.
#[async_trait]
pub trait RepositoryFactory: Send + Sync {
    /// Lowercase name used as the `backend` value in [`DbConfig`].
    fn backend_name(&self) -> &'static str;

    /// Opens the store and returns a repository ready for use, schema
    /// included.
    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn ClaimRepository>, RepositoryError>;
}

/// Backend factories keyed by name.
pub struct RepositoryRegistry {
    factories: HashMap<&'static str, Box<dyn RepositoryFactory>>,
}

impl RepositoryRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Adds a factory, replacing any earlier one with the same name.
    pub fn register(
        &mut self,
        factory: Box<dyn RepositoryFactory>,
    ) {
        self.factories.insert(factory.backend_name(), factory);
    }

    /// Registered backend names in alphabetical order.
    pub fn available_backends(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Opens a repository with the factory named by `config.backend`.
    ///
    /// Returns [`RepositoryError::Configuration`] when no such factory is
    /// registered; factory errors are passed through.
    pub async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn ClaimRepository>, RepositoryError> {
        let factory = self
            .factories
            .get(config.backend.as_str())
            .ok_or_else(|| {
                RepositoryError::Configuration(format!(
                    "unknown backend '{}'; available: {:?}",
                    config.backend,
                    self.available_backends()
                ))
            })?;

        factory.create(config).await
    }
}

impl Default for RepositoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use crate::db::memory::MemoryRepository;
    use crate::models::NewProject;

    use super::*;

    // ── test factories ───────────────────────────────────────────────────
    /// Counts how often `create` is reached and hands out empty in-memory
    /// repositories.
    struct CountingFactory {
        name: &'static str,
        opened: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl RepositoryFactory for CountingFactory {
        fn backend_name(&self) -> &'static str {
            self.name
        }

        async fn create(
            &self,
            _config: &DbConfig,
        ) -> Result<Box<dyn ClaimRepository>, RepositoryError> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(MemoryRepository::new()))
        }
    }

    struct UnreachableFactory;

    #[async_trait]
    impl RepositoryFactory for UnreachableFactory {
        fn backend_name(&self) -> &'static str {
            "unreachable"
        }

        async fn create(
            &self,
            config: &DbConfig,
        ) -> Result<Box<dyn ClaimRepository>, RepositoryError> {
            Err(RepositoryError::Connection(format!(
                "cannot reach {}",
                config.connection_string
            )))
        }
    }

    fn counting(name: &'static str) -> (Box<dyn RepositoryFactory>, Arc<AtomicUsize>) {
        let opened = Arc::new(AtomicUsize::new(0));
        (
            Box::new(CountingFactory {
                name,
                opened: opened.clone(),
            }),
            opened,
        )
    }

    fn config(backend: &str) -> DbConfig {
        DbConfig {
            backend: backend.to_string(),
            connection_string: "claims.db".to_string(),
        }
    }

    // ── DbConfig ─────────────────────────────────────────────────────────
    #[test]
    fn default_config_is_in_memory_sqlite() {
        let cfg = DbConfig::default();

        assert_eq!(cfg.backend, "sqlite");
        assert_eq!(cfg.connection_string, ":memory:");
    }

    // ── registration ─────────────────────────────────────────────────────
    #[test]
    fn empty_registry_lists_no_backends() {
        assert!(RepositoryRegistry::default().available_backends().is_empty());
    }

    #[test]
    fn backends_are_listed_alphabetically() {
        let mut reg = RepositoryRegistry::new();
        reg.register(counting("sqlite").0);
        reg.register(counting("memory").0);

        assert_eq!(reg.available_backends(), vec!["memory", "sqlite"]);
    }

    #[tokio::test]
    async fn re_registering_a_name_replaces_the_factory() {
        let mut reg = RepositoryRegistry::new();
        let (first, first_opened) = counting("sqlite");
        let (second, second_opened) = counting("sqlite");
        reg.register(first);
        reg.register(second);

        reg.create(&config("sqlite")).await.unwrap();

        assert_eq!(reg.available_backends(), vec!["sqlite"]);
        assert_eq!(first_opened.load(Ordering::SeqCst), 0);
        assert_eq!(second_opened.load(Ordering::SeqCst), 1);
    }

    // ── dispatch ─────────────────────────────────────────────────────────
    #[tokio::test]
    async fn create_routes_to_the_named_backend_only() {
        let mut reg = RepositoryRegistry::new();
        let (sqlite, sqlite_opened) = counting("sqlite");
        let (memory, memory_opened) = counting("memory");
        reg.register(sqlite);
        reg.register(memory);

        reg.create(&config("memory")).await.unwrap();

        assert_eq!(sqlite_opened.load(Ordering::SeqCst), 0);
        assert_eq!(memory_opened.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn created_repository_is_usable() {
        let mut reg = RepositoryRegistry::new();
        reg.register(counting("memory").0);

        let repo = reg.create(&config("memory")).await.unwrap();
        let project = repo
            .create_project(NewProject::new("Depot fit-out", dec!(250000)))
            .await
            .unwrap();

        assert_eq!(repo.get_project(project.id).await.unwrap(), project);
    }

    #[tokio::test]
    async fn unknown_backend_names_requested_and_available() {
        let mut reg = RepositoryRegistry::new();
        reg.register(counting("sqlite").0);

        match reg.create(&config("postgres")).await {
            Err(RepositoryError::Configuration(msg)) => {
                assert!(msg.contains("postgres"), "missing requested backend: {msg}");
                assert!(msg.contains("sqlite"), "missing available backend: {msg}");
            }
            Err(other) => panic!("expected Configuration error, got {other:?}"),
            Ok(_) => panic!("expected Configuration error, got a repository"),
        }
    }

    #[tokio::test]
    async fn factory_errors_are_passed_through() {
        let mut reg = RepositoryRegistry::new();
        reg.register(Box::new(UnreachableFactory));

        let err = reg.create(&config("unreachable")).await.err();

        assert_eq!(
            err,
            Some(RepositoryError::Connection("cannot reach claims.db".to_string()))
        );
    }
}
