// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `comanda catalog` subcommands.

use comanda_config::ComandaConfig;
use comanda_core::{CatalogStore, ComandaError, NewProduct, PluginAdapter};
use comanda_storage::SqliteStorage;

pub async fn add(
    config: &ComandaConfig,
    product_name: String,
    flavor: String,
    quantity: u32,
) -> Result<(), ComandaError> {
    let storage = SqliteStorage::open(config.storage.clone()).await?;
    let product = storage
        .create(&NewProduct {
            product_name,
            flavor,
            quantity,
        })
        .await?;
    println!(
        "added #{}: {} {} x{}",
        product.id, product.product_name, product.flavor, product.quantity
    );
    storage.shutdown().await
}

pub async fn list(config: &ComandaConfig) -> Result<(), ComandaError> {
    let storage = SqliteStorage::open(config.storage.clone()).await?;
    let products = CatalogStore::list(&storage).await?;
    if products.is_empty() {
        println!("catalog is empty");
    }
    for p in products {
        println!("{:>5}  {:<24} {:<16} {}", p.id, p.product_name, p.flavor, p.quantity);
    }
    storage.shutdown().await
}

pub async fn remove(config: &ComandaConfig, id: i64) -> Result<(), ComandaError> {
    let storage = SqliteStorage::open(config.storage.clone()).await?;
    storage.delete(id).await?;
    println!("removed #{id}");
    storage.shutdown().await
}
