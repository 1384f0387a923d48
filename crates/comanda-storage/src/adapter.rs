// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the conversation and catalog stores.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use comanda_config::model::StorageConfig;
use comanda_core::{
    AdapterType, CatalogProduct, CatalogStore, ChatTurn, ComandaError, ConversationStore,
    ConversationSummary, HealthStatus, MatchPredicates, NewProduct, PluginAdapter,
};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates to the typed query modules. The
/// database is opened lazily by [`SqliteStorage::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// The connection is not opened until [`SqliteStorage::initialize`] is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Create and initialize in one step.
    pub async fn open(config: StorageConfig) -> Result<Self, ComandaError> {
        let storage = Self::new(config);
        storage.initialize().await?;
        Ok(storage)
    }

    /// Open the database, apply pragmas and run migrations.
    pub async fn initialize(&self) -> Result<(), ComandaError> {
        let db =
            Database::open_with_options(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| ComandaError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    fn db(&self) -> Result<&Database, ComandaError> {
        self.db.get().ok_or_else(|| ComandaError::Storage {
            source: "storage not initialized, call initialize() first".into(),
        })
    }

    async fn checkpoint(&self, db: &Database) -> Result<(), ComandaError> {
        if !self.config.wal_mode {
            return Ok(());
        }
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, ComandaError> {
        let db = match self.db() {
            Ok(db) => db,
            Err(e) => return Ok(HealthStatus::Unhealthy(e.to_string())),
        };
        let ping = db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await;
        Ok(match ping {
            Ok(()) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        })
    }

    async fn shutdown(&self) -> Result<(), ComandaError> {
        if let Some(db) = self.db.get() {
            self.checkpoint(db).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for SqliteStorage {
    async fn append(&self, conversation_id: &str, turn: &ChatTurn) -> Result<(), ComandaError> {
        queries::messages::append_message(self.db()?, conversation_id, turn).await
    }

    async fn append_pair(
        &self,
        conversation_id: &str,
        user: &ChatTurn,
        assistant: &ChatTurn,
    ) -> Result<(), ComandaError> {
        let pair = [user.clone(), assistant.clone()];
        queries::messages::append_messages(self.db()?, conversation_id, &pair).await
    }

    async fn list(&self, conversation_id: &str) -> Result<Vec<ChatTurn>, ComandaError> {
        queries::messages::get_messages(self.db()?, conversation_id).await
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, ComandaError> {
        queries::messages::list_conversations(self.db()?).await
    }
}

#[async_trait]
impl CatalogStore for SqliteStorage {
    async fn find_matching(
        &self,
        predicates: &MatchPredicates,
    ) -> Result<Option<CatalogProduct>, ComandaError> {
        queries::products::find_matching(self.db()?, predicates).await
    }

    async fn create(&self, product: &NewProduct) -> Result<CatalogProduct, ComandaError> {
        let created = queries::products::insert_product(self.db()?, product).await?;
        debug!(id = created.id, product = %created.product_name, "catalog product created");
        Ok(created)
    }

    async fn get(&self, id: i64) -> Result<Option<CatalogProduct>, ComandaError> {
        queries::products::get_product(self.db()?, id).await
    }

    async fn list(&self) -> Result<Vec<CatalogProduct>, ComandaError> {
        queries::products::list_products(self.db()?).await
    }

    async fn update(&self, id: i64, product: &NewProduct) -> Result<CatalogProduct, ComandaError> {
        queries::products::update_product(self.db()?, id, product).await
    }

    async fn delete(&self, id: i64) -> Result<(), ComandaError> {
        queries::products::delete_product(self.db()?, id).await?;
        debug!(id, "catalog product deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use comanda_core::ErrorKind;

    fn config(dir: &tempfile::TempDir) -> StorageConfig {
        StorageConfig {
            database_path: dir.path().join("adapter.db").display().to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn uninitialized_storage_reports_errors() {
        let dir = tempfile::tempdir().unwrap();
        let storage = SqliteStorage::new(config(&dir));
        let err = ConversationStore::list(&storage, "c").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(matches!(
            storage.health_check().await.unwrap(),
            HealthStatus::Unhealthy(_)
        ));
    }

    #[tokio::test]
    async fn double_initialize_fails() {
        let dir = tempfile::tempdir().unwrap();
        let storage = SqliteStorage::open(config(&dir)).await.unwrap();
        assert!(storage.initialize().await.is_err());
        assert_eq!(storage.health_check().await.unwrap(), HealthStatus::Healthy);
        storage.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn stores_work_through_trait_objects() {
        let dir = tempfile::tempdir().unwrap();
        let storage = std::sync::Arc::new(SqliteStorage::open(config(&dir)).await.unwrap());
        let conversations: std::sync::Arc<dyn ConversationStore> = storage.clone();
        let catalog: std::sync::Arc<dyn CatalogStore> = storage.clone();

        conversations.append("c1", &ChatTurn::user("hi")).await.unwrap();
        assert_eq!(conversations.list("c1").await.unwrap().len(), 1);
        assert_eq!(conversations.list_conversations().await.unwrap()[0].id, "c1");

        let p = catalog
            .create(&NewProduct {
                product_name: "Vape".into(),
                flavor: String::new(),
                quantity: 1,
            })
            .await
            .unwrap();
        assert_eq!(catalog.get(p.id).await.unwrap().unwrap().product_name, "vape");
        assert_eq!(catalog.list().await.unwrap().len(), 1);
        catalog.delete(p.id).await.unwrap();
        assert!(catalog.list().await.unwrap().is_empty());
    }
}
