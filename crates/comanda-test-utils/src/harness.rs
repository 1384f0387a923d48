// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end pipeline tests.
//!
//! `TestHarness` wires an [`OrderPipeline`] to a mock backend and a temp
//! SQLite database. Seed the catalog, script the backend, then drive turns
//! with `send_at()`.

use std::sync::Arc;
use std::time::Duration;

use comanda_agent::{OrderPipeline, PipelineSettings, TurnOutcome};
use comanda_config::model::StorageConfig;
use comanda_context::{ConversationAssembler, DynamicZone, StaticZone};
use comanda_core::{CatalogProduct, CatalogStore, ComandaError, NewProduct};
use comanda_extract::TemporalContext;
use comanda_storage::SqliteStorage;

use crate::mock_provider::MockProvider;

/// Builder for creating test environments.
pub struct TestHarnessBuilder {
    provider: MockProvider,
    system_prompt: String,
    max_history_turns: Option<usize>,
    backend_timeout: Duration,
    catalog: Vec<NewProduct>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            provider: MockProvider::new(),
            system_prompt: "You take product orders for a test shop.".to_string(),
            max_history_turns: None,
            backend_timeout: Duration::from_secs(5),
            catalog: Vec::new(),
        }
    }

    pub fn with_provider(mut self, provider: MockProvider) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_max_history_turns(mut self, turns: usize) -> Self {
        self.max_history_turns = Some(turns);
        self
    }

    pub fn with_backend_timeout(mut self, timeout: Duration) -> Self {
        self.backend_timeout = timeout;
        self
    }

    /// Seed a catalog record (stored lowercased).
    pub fn with_product(mut self, name: &str, flavor: &str, quantity: u32) -> Self {
        self.catalog.push(NewProduct {
            product_name: name.to_string(),
            flavor: flavor.to_string(),
            quantity,
        });
        self
    }

    pub async fn build(self) -> Result<TestHarness, ComandaError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| ComandaError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");

        let storage = SqliteStorage::new(StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        });
        storage.initialize().await?;
        let storage = Arc::new(storage);

        let mut seeded = Vec::with_capacity(self.catalog.len());
        for product in &self.catalog {
            seeded.push(storage.create(product).await?);
        }

        let provider = Arc::new(self.provider);
        let assembler = ConversationAssembler::with_zones(
            StaticZone::from_prompt(self.system_prompt),
            DynamicZone::new(self.max_history_turns),
        );
        let settings = PipelineSettings {
            model: "mock-model".to_string(),
            max_tokens: 256,
            backend_timeout: self.backend_timeout,
            catalog_timeout: Duration::from_secs(5),
        };
        let pipeline = Arc::new(OrderPipeline::new(
            provider.clone(),
            storage.clone(),
            storage.clone(),
            assembler,
            settings,
        ));

        Ok(TestHarness {
            provider,
            storage,
            pipeline,
            catalog: seeded,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with a mock backend and temp storage.
pub struct TestHarness {
    pub provider: Arc<MockProvider>,
    /// SQLite storage (temp DB, cleaned up on drop).
    pub storage: Arc<SqliteStorage>,
    pub pipeline: Arc<OrderPipeline>,
    /// Catalog records seeded by the builder, in insertion order.
    pub catalog: Vec<CatalogProduct>,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Run a turn with the reference instant pinned to `ctx`.
    pub async fn send_at(
        &self,
        ctx: TemporalContext,
        conversation_id: Option<&str>,
        text: &str,
    ) -> Result<TurnOutcome, ComandaError> {
        self.pipeline.handle_turn_at(ctx, conversation_id, text).await
    }
}
