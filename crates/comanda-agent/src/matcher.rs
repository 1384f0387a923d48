// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Catalog matching for extracted orders.
//!
//! Each line item becomes a permissive OR predicate over name, flavor and
//! quantity. The store breaks ties by lowest identifier; items are tried
//! in order and the first item with a match decides the order's outcome.

use std::sync::Arc;
use std::time::Duration;

use comanda_core::{
    CatalogProduct, CatalogStore, ComandaError, ExtractedOrder, LineItem, MatchPredicates,
};
use serde::Serialize;
use tracing::debug;

/// Whether an order resolved to a catalog product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    Found(CatalogProduct),
    NotFound,
}

impl MatchOutcome {
    pub fn product(&self) -> Option<&CatalogProduct> {
        match self {
            Self::Found(product) => Some(product),
            Self::NotFound => None,
        }
    }

    pub fn into_product(self) -> Option<CatalogProduct> {
        match self {
            Self::Found(product) => Some(product),
            Self::NotFound => None,
        }
    }
}

/// The catalog answer for a single line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemMatch {
    pub item: LineItem,
    pub product: Option<CatalogProduct>,
}

/// Resolves line items against a [`CatalogStore`] under a lookup timeout.
pub struct CatalogMatcher {
    catalog: Arc<dyn CatalogStore>,
    timeout: Duration,
}

impl CatalogMatcher {
    pub fn new(catalog: Arc<dyn CatalogStore>, timeout: Duration) -> Self {
        Self { catalog, timeout }
    }

    /// Look up one item. Items with no specified field never match.
    pub async fn match_item(&self, item: &LineItem) -> Result<Option<CatalogProduct>, ComandaError> {
        let predicates = MatchPredicates::from_line_item(item);
        if predicates.is_empty() {
            return Ok(None);
        }

        let found = tokio::time::timeout(self.timeout, self.catalog.find_matching(&predicates))
            .await
            .map_err(|_| {
                ComandaError::Timeout {
                    duration: self.timeout,
                }
                .into_catalog()
            })?
            .map_err(ComandaError::into_catalog)?;

        debug!(
            product = item.product_name.as_str(),
            matched_id = found.as_ref().map(|p| p.id),
            "catalog lookup"
        );
        Ok(found)
    }

    /// Match every item, preserving order.
    pub async fn match_items(&self, items: &[LineItem]) -> Result<Vec<ItemMatch>, ComandaError> {
        let mut matches = Vec::with_capacity(items.len());
        for item in items {
            let product = self.match_item(item).await?;
            matches.push(ItemMatch {
                item: item.clone(),
                product,
            });
        }
        Ok(matches)
    }

    /// Match an order: the first item with a catalog hit wins.
    pub async fn match_order(&self, order: &ExtractedOrder) -> Result<MatchOutcome, ComandaError> {
        for item in &order.items {
            if let Some(product) = self.match_item(item).await? {
                return Ok(MatchOutcome::Found(product));
            }
        }
        Ok(MatchOutcome::NotFound)
    }
}

/// The order-level outcome implied by per-item results.
pub fn first_match(matches: &[ItemMatch]) -> MatchOutcome {
    matches
        .iter()
        .find_map(|m| m.product.clone())
        .map_or(MatchOutcome::NotFound, MatchOutcome::Found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use comanda_core::{ErrorKind, NewProduct};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory catalog applying the same OR filter as the SQLite store.
    struct MemoryCatalog {
        products: Vec<CatalogProduct>,
        lookups: AtomicUsize,
    }

    impl MemoryCatalog {
        fn new(products: Vec<CatalogProduct>) -> Self {
            Self {
                products,
                lookups: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CatalogStore for MemoryCatalog {
        async fn find_matching(
            &self,
            p: &MatchPredicates,
        ) -> Result<Option<CatalogProduct>, ComandaError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            let mut hits: Vec<_> = self
                .products
                .iter()
                .filter(|c| {
                    p.product_name.as_deref() == Some(c.product_name.as_str())
                        || p.flavor.as_deref() == Some(c.flavor.as_str())
                        || p.quantity == Some(c.quantity)
                })
                .cloned()
                .collect();
            hits.sort_by_key(|c| c.id);
            Ok(hits.into_iter().next())
        }

        async fn create(&self, _: &NewProduct) -> Result<CatalogProduct, ComandaError> {
            unreachable!()
        }

        async fn get(&self, _: i64) -> Result<Option<CatalogProduct>, ComandaError> {
            unreachable!()
        }

        async fn list(&self) -> Result<Vec<CatalogProduct>, ComandaError> {
            Ok(self.products.clone())
        }

        async fn update(&self, _: i64, _: &NewProduct) -> Result<CatalogProduct, ComandaError> {
            unreachable!()
        }

        async fn delete(&self, _: i64) -> Result<(), ComandaError> {
            unreachable!()
        }
    }

    struct BrokenCatalog;

    #[async_trait]
    impl CatalogStore for BrokenCatalog {
        async fn find_matching(
            &self,
            _: &MatchPredicates,
        ) -> Result<Option<CatalogProduct>, ComandaError> {
            Err(ComandaError::Storage {
                source: "no such table: products".into(),
            })
        }

        async fn create(&self, _: &NewProduct) -> Result<CatalogProduct, ComandaError> {
            unreachable!()
        }

        async fn get(&self, _: i64) -> Result<Option<CatalogProduct>, ComandaError> {
            unreachable!()
        }

        async fn list(&self) -> Result<Vec<CatalogProduct>, ComandaError> {
            unreachable!()
        }

        async fn update(&self, _: i64, _: &NewProduct) -> Result<CatalogProduct, ComandaError> {
            unreachable!()
        }

        async fn delete(&self, _: i64) -> Result<(), ComandaError> {
            unreachable!()
        }
    }

    fn product(id: i64, name: &str, flavor: &str, quantity: u32) -> CatalogProduct {
        CatalogProduct {
            id,
            product_name: name.into(),
            flavor: flavor.into(),
            quantity,
        }
    }

    fn matcher(catalog: impl CatalogStore + 'static) -> CatalogMatcher {
        CatalogMatcher::new(Arc::new(catalog), Duration::from_secs(1))
    }

    fn order(items: Vec<LineItem>) -> ExtractedOrder {
        ExtractedOrder {
            items,
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            time: String::new(),
        }
    }

    #[tokio::test]
    async fn vape_matches_and_unknown_does_not() {
        let m = matcher(MemoryCatalog::new(vec![product(1, "vape", "", 1)]));

        let found = m.match_order(&order(vec![LineItem::new("vape")])).await.unwrap();
        assert_eq!(found, MatchOutcome::Found(product(1, "vape", "", 1)));

        let missing = m
            .match_order(&order(vec![LineItem::new("unknown").with_quantity(5)]))
            .await
            .unwrap();
        assert_eq!(missing, MatchOutcome::NotFound);
    }

    #[tokio::test]
    async fn lowest_id_wins_ties() {
        let m = matcher(MemoryCatalog::new(vec![
            product(4, "juice", "mango", 2),
            product(2, "juice", "strawberry", 1),
        ]));
        let outcome = m.match_order(&order(vec![LineItem::new("juice")])).await.unwrap();
        assert_eq!(outcome.product().map(|p| p.id), Some(2));
    }

    #[tokio::test]
    async fn first_item_with_a_match_decides() {
        let m = matcher(MemoryCatalog::new(vec![
            product(1, "vape", "", 1),
            product(2, "juice", "strawberry", 3),
        ]));
        let items = vec![
            LineItem::new("gum").with_quantity(9),
            LineItem::new("juice").with_flavor("strawberry").with_quantity(3),
            LineItem::new("vape"),
        ];
        let matches = m.match_items(&items).await.unwrap();
        assert_eq!(matches.len(), 3);
        assert!(matches[0].product.is_none());
        assert_eq!(first_match(&matches).into_product().map(|p| p.id), Some(2));
        assert_eq!(
            m.match_order(&order(items)).await.unwrap().product().map(|p| p.id),
            Some(2)
        );
    }

    #[tokio::test]
    async fn item_without_specified_fields_skips_lookup() {
        let catalog = Arc::new(MemoryCatalog::new(vec![product(1, "vape", "", 1)]));
        let m = CatalogMatcher::new(catalog.clone(), Duration::from_secs(1));
        let blank = LineItem::new("").with_quantity(0);
        assert!(m.match_item(&blank).await.unwrap().is_none());
        assert_eq!(catalog.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn store_failure_is_catalog_unavailable_not_not_found() {
        let m = matcher(BrokenCatalog);
        let err = m
            .match_order(&order(vec![LineItem::new("vape")]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CatalogUnavailable);
    }

    #[tokio::test]
    async fn empty_order_is_not_found() {
        let m = matcher(MemoryCatalog::new(vec![product(1, "vape", "", 1)]));
        assert_eq!(
            m.match_order(&order(Vec::new())).await.unwrap(),
            MatchOutcome::NotFound
        );
    }
}
