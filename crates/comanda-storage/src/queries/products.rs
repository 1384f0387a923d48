// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Product catalog CRUD and predicate lookup.

use comanda_core::{CatalogProduct, ComandaError, MatchPredicates, NewProduct};
use rusqlite::{OptionalExtension, Row, params};

use crate::database::{Database, map_tr_err, now_timestamp};

const PRODUCT_COLUMNS: &str = "id, product_name, flavor, quantity";

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<CatalogProduct> {
    Ok(CatalogProduct {
        id: row.get(0)?,
        product_name: row.get(1)?,
        flavor: row.get(2)?,
        quantity: row.get(3)?,
    })
}

fn not_found(id: i64) -> ComandaError {
    ComandaError::NotFound {
        entity: "product".to_string(),
        id: id.to_string(),
    }
}

/// First record (lowest id) matching any of the specified predicates.
///
/// Unspecified predicates bind as NULL and drop out of the OR filter.
pub async fn find_matching(
    db: &Database,
    predicates: &MatchPredicates,
) -> Result<Option<CatalogProduct>, ComandaError> {
    if predicates.is_empty() {
        return Ok(None);
    }
    let MatchPredicates {
        product_name,
        flavor,
        quantity,
    } = predicates.clone();

    db.connection()
        .call(move |conn| -> Result<Option<CatalogProduct>, rusqlite::Error> {
            conn.query_row(
                &format!(
                    "SELECT {PRODUCT_COLUMNS} FROM products
                     WHERE (?1 IS NOT NULL AND product_name = ?1)
                        OR (?2 IS NOT NULL AND flavor = ?2)
                        OR (?3 IS NOT NULL AND quantity = ?3)
                     ORDER BY id ASC LIMIT 1"
                ),
                params![product_name, flavor, quantity],
                product_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Insert a product. Text fields are stored trimmed and lowercased.
pub async fn insert_product(
    db: &Database,
    product: &NewProduct,
) -> Result<CatalogProduct, ComandaError> {
    product.validate()?;
    let NewProduct {
        product_name,
        flavor,
        quantity,
    } = product.normalized();
    let now = now_timestamp();

    db.connection()
        .call(move |conn| -> Result<CatalogProduct, rusqlite::Error> {
            conn.execute(
                "INSERT INTO products (product_name, flavor, quantity, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![product_name, flavor, quantity, now],
            )?;
            Ok(CatalogProduct {
                id: conn.last_insert_rowid(),
                product_name,
                flavor,
                quantity,
            })
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_product(db: &Database, id: i64) -> Result<Option<CatalogProduct>, ComandaError> {
    db.connection()
        .call(move |conn| -> Result<Option<CatalogProduct>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"),
                params![id],
                product_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list_products(db: &Database) -> Result<Vec<CatalogProduct>, ComandaError> {
    db.connection()
        .call(|conn| -> Result<Vec<CatalogProduct>, rusqlite::Error> {
            let mut stmt =
                conn.prepare(&format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id ASC"))?;
            let rows = stmt.query_map([], product_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Replace a product's fields. [`ComandaError::NotFound`] if the id is unknown.
pub async fn update_product(
    db: &Database,
    id: i64,
    product: &NewProduct,
) -> Result<CatalogProduct, ComandaError> {
    product.validate()?;
    let NewProduct {
        product_name,
        flavor,
        quantity,
    } = product.normalized();
    let now = now_timestamp();

    let updated = db
        .connection()
        .call(move |conn| -> Result<Option<CatalogProduct>, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE products SET product_name = ?1, flavor = ?2, quantity = ?3, updated_at = ?4
                 WHERE id = ?5",
                params![product_name, flavor, quantity, now, id],
            )?;
            Ok((changed > 0).then_some(CatalogProduct {
                id,
                product_name,
                flavor,
                quantity,
            }))
        })
        .await
        .map_err(map_tr_err)?;

    updated.ok_or_else(|| not_found(id))
}

/// Delete a product. [`ComandaError::NotFound`] if the id is unknown.
pub async fn delete_product(db: &Database, id: i64) -> Result<(), ComandaError> {
    let changed = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute("DELETE FROM products WHERE id = ?1", params![id])
        })
        .await
        .map_err(map_tr_err)?;

    if changed == 0 {
        return Err(not_found(id));
    }
    Ok(())
}
