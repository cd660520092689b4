//! The asset shop: spend earned coins on island cosmetics.
//!
//! Purchases check the balance, debit it, and upsert the inventory row for
//! that asset (buying the same asset again bumps its quantity). Placement
//! pins an owned item to island coordinates.

use log::info;
use rusqlite::{params, Row};

use crate::error::{Result, ShopError};
use crate::storage::{AssetDef, Database, InventoryItem};

/// Register a purchasable asset, returning its id. The shipped catalog is
/// seeded by the host app.
pub async fn add_asset(
    db: &Database,
    name: &str,
    price: i64,
    kind: &str,
    icon: &str,
    description: &str,
) -> Result<i64> {
    let name = name.to_owned();
    let kind = kind.to_owned();
    let icon = icon.to_owned();
    let description = description.to_owned();
    Ok(db
        .execute(move |conn| {
            conn.execute(
                "INSERT INTO virtual_assets (name, price, kind, icon, description)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![name, price, kind, icon, description],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await?)
}

/// All purchasable assets.
pub async fn catalog(db: &Database) -> Result<Vec<AssetDef>> {
    Ok(db
        .execute(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ASSET_COLUMNS} FROM virtual_assets ORDER BY price, id"
            ))?;
            let rows = stmt.query_map([], asset_from_row)?;
            let mut assets = Vec::new();
            for asset in rows {
                assets.push(asset?);
            }
            Ok(assets)
        })
        .await?)
}

pub async fn asset_by_id(db: &Database, asset_id: i64) -> Result<Option<AssetDef>> {
    Ok(db
        .execute(move |conn| {
            match conn.query_row(
                &format!("SELECT {ASSET_COLUMNS} FROM virtual_assets WHERE id = ?1"),
                params![asset_id],
                asset_from_row,
            ) {
                Ok(asset) => Ok(Some(asset)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(err) => Err(err.into()),
            }
        })
        .await?)
}

/// Everything the user owns.
pub async fn inventory(db: &Database, user_id: i64) -> Result<Vec<InventoryItem>> {
    fetch_inventory(db, user_id, false).await
}

/// Owned items currently placed on the island.
pub async fn placed(db: &Database, user_id: i64) -> Result<Vec<InventoryItem>> {
    fetch_inventory(db, user_id, true).await
}

/// Buy `asset_id` for `user_id`.
///
/// Fails with [`ShopError::InsufficientFunds`] when the balance does not
/// cover the price, leaving both the balance and the inventory untouched.
pub async fn purchase(db: &Database, user_id: i64, asset_id: i64) -> Result<InventoryItem> {
    let asset = asset_by_id(db, asset_id)
        .await?
        .ok_or(ShopError::UnknownAsset(asset_id))?;
    let user = db
        .fetch_user(user_id)
        .await?
        .ok_or(ShopError::UnknownUser(user_id))?;
    if user.coins < asset.price {
        return Err(ShopError::InsufficientFunds {
            price: asset.price,
            balance: user.coins,
        }
        .into());
    }

    db.debit_coins(user_id, asset.price).await?;
    let item = db
        .execute(move |conn| {
            conn.execute(
                "INSERT INTO user_inventory (user_id, asset_id, quantity, placed)
                 VALUES (?1, ?2, 1, 0)
                 ON CONFLICT (user_id, asset_id) DO UPDATE SET quantity = quantity + 1",
                params![user_id, asset_id],
            )?;
            conn.query_row(
                &format!(
                    "SELECT {INVENTORY_COLUMNS} FROM user_inventory
                     WHERE user_id = ?1 AND asset_id = ?2"
                ),
                params![user_id, asset_id],
                inventory_from_row,
            )
            .map_err(Into::into)
        })
        .await?;
    info!("purchased '{}' for {} coins", asset.name, asset.price);
    Ok(item)
}

/// Place an owned item on the island at `(x, y)`.
pub async fn place(db: &Database, item_id: i64, x: f64, y: f64) -> Result<()> {
    let affected = db
        .execute(move |conn| {
            Ok(conn.execute(
                "UPDATE user_inventory SET placed = 1, pos_x = ?1, pos_y = ?2 WHERE id = ?3",
                params![x, y, item_id],
            )?)
        })
        .await?;
    if affected == 0 {
        return Err(ShopError::UnknownItem(item_id).into());
    }
    Ok(())
}

/// Take an item off the island, keeping it in the inventory.
pub async fn unplace(db: &Database, item_id: i64) -> Result<()> {
    let affected = db
        .execute(move |conn| {
            Ok(conn.execute(
                "UPDATE user_inventory SET placed = 0, pos_x = NULL, pos_y = NULL WHERE id = ?1",
                params![item_id],
            )?)
        })
        .await?;
    if affected == 0 {
        return Err(ShopError::UnknownItem(item_id).into());
    }
    Ok(())
}

async fn fetch_inventory(db: &Database, user_id: i64, placed_only: bool) -> Result<Vec<InventoryItem>> {
    Ok(db
        .execute(move |conn| {
            let filter = if placed_only { " AND placed = 1" } else { "" };
            let mut stmt = conn.prepare(&format!(
                "SELECT {INVENTORY_COLUMNS} FROM user_inventory
                 WHERE user_id = ?1{filter} ORDER BY id"
            ))?;
            let rows = stmt.query_map(params![user_id], inventory_from_row)?;
            let mut items = Vec::new();
            for item in rows {
                items.push(item?);
            }
            Ok(items)
        })
        .await?)
}

const ASSET_COLUMNS: &str = "id, name, price, kind, icon, description";
const INVENTORY_COLUMNS: &str = "id, user_id, asset_id, quantity, placed, pos_x, pos_y";

fn asset_from_row(row: &Row) -> rusqlite::Result<AssetDef> {
    Ok(AssetDef {
        id: row.get(0)?,
        name: row.get(1)?,
        price: row.get(2)?,
        kind: row.get(3)?,
        icon: row.get(4)?,
        description: row.get(5)?,
    })
}

fn inventory_from_row(row: &Row) -> rusqlite::Result<InventoryItem> {
    Ok(InventoryItem {
        id: row.get(0)?,
        user_id: row.get(1)?,
        asset_id: row.get(2)?,
        quantity: row.get(3)?,
        placed: row.get(4)?,
        pos_x: row.get(5)?,
        pos_y: row.get(6)?,
    })
}
