// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Product catalog store.

use async_trait::async_trait;

use crate::error::ComandaError;
use crate::types::{CatalogProduct, MatchPredicates, NewProduct};

/// Persistent product catalog with OR-predicate lookup.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Returns the lowest-id record satisfying any specified predicate.
    ///
    /// `Ok(None)` means no record matched; an empty predicate set matches
    /// nothing. Errors mean the catalog could not be queried.
    async fn find_matching(
        &self,
        predicates: &MatchPredicates,
    ) -> Result<Option<CatalogProduct>, ComandaError>;

    async fn create(&self, product: &NewProduct) -> Result<CatalogProduct, ComandaError>;

    async fn get(&self, id: i64) -> Result<Option<CatalogProduct>, ComandaError>;

    /// All records, ascending by id.
    async fn list(&self) -> Result<Vec<CatalogProduct>, ComandaError>;

    /// Replaces the record's fields. [`ComandaError::NotFound`] if absent.
    async fn update(&self, id: i64, product: &NewProduct) -> Result<CatalogProduct, ComandaError>;

    /// Removes the record. [`ComandaError::NotFound`] if absent.
    async fn delete(&self, id: i64) -> Result<(), ComandaError>;
}
