use bevy::prelude::*;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::path::Path;

use super::repo::{DRINK_ITEM_TYPE, ItemRow, ProfileRow, ProfileStore, StoreError};
use crate::config::tuning::SeedProfile;
use crate::game::catalog::Catalog;

const CATALOG_FINGERPRINT_KEY: &str = "catalog_fingerprint";

/// Outcome of rewriting legacy `item_name` values to catalog ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdMigrationReport {
    /// The stored fingerprint already matched; nothing was scanned.
    pub skipped: bool,
    pub renamed: u32,
    /// Rows matching no catalog entry, left untouched.
    pub orphaned: Vec<String>,
}

/// SQLite-backed profile store (Bevy Resource).
#[derive(Resource, Clone)]
pub struct SqliteProfileStore {
    pool: SqlitePool,
}

fn to_u32(value: i64) -> u32 {
    value.clamp(0, u32::MAX as i64) as u32
}

impl SqliteProfileStore {
    pub async fn new(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        Self::with_pool(pool).await
    }

    /// Private database living as long as the store. Used by tests.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        // Run migrations
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Make sure every configured player can log in.
    pub async fn seed_profiles(&self, seeds: &[SeedProfile]) -> Result<(), StoreError> {
        for seed in seeds {
            let username = seed.username.trim().to_lowercase();
            if username.is_empty() {
                continue;
            }
            self.create_profile(&username, seed.balance).await?;
        }
        Ok(())
    }

    /// Rewrite rows whose `item_name` holds a display name to the stable catalog id,
    /// merging quantities into an existing id row. Runs only when the catalog changed.
    pub async fn migrate_item_ids(&self, catalog: &Catalog) -> Result<IdMigrationReport, StoreError> {
        let fingerprint = catalog.fingerprint();
        let stored: Option<(String,)> =
            sqlx::query_as(r#"SELECT value FROM store_meta WHERE key = ?"#)
                .bind(CATALOG_FINGERPRINT_KEY)
                .fetch_optional(&self.pool)
                .await?;
        if stored.is_some_and(|(value,)| value == fingerprint) {
            return Ok(IdMigrationReport {
                skipped: true,
                ..Default::default()
            });
        }

        let mut report = IdMigrationReport::default();
        let mut tx = self.pool.begin().await?;

        let rows: Vec<(String, String, String, i64, Option<String>)> = sqlx::query_as(
            r#"SELECT profile_id, item_type, item_name, quantity, image_url
               FROM inventory_items ORDER BY profile_id, item_name"#,
        )
        .fetch_all(&mut *tx)
        .await?;

        for (profile_id, item_type, item_name, quantity, image_url) in rows {
            if catalog.get(&item_name).is_some() {
                continue;
            }
            let Some(item) = catalog.match_legacy_name(&item_name) else {
                warn!("Inventory row '{item_name}' of {profile_id} matches no catalog entry");
                report.orphaned.push(item_name);
                continue;
            };

            sqlx::query(
                r#"INSERT INTO inventory_items (profile_id, item_name, item_type, quantity, image_url)
                   VALUES (?, ?, ?, ?, ?)
                   ON CONFLICT (profile_id, item_type, item_name)
                   DO UPDATE SET quantity = inventory_items.quantity + excluded.quantity"#,
            )
            .bind(&profile_id)
            .bind(&item.id)
            .bind(&item_type)
            .bind(quantity)
            .bind(image_url.as_deref().unwrap_or(&item.image_ref))
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"DELETE FROM inventory_items
                   WHERE profile_id = ? AND item_type = ? AND item_name = ?"#,
            )
            .bind(&profile_id)
            .bind(&item_type)
            .bind(&item_name)
            .execute(&mut *tx)
            .await?;

            report.renamed += 1;
        }

        sqlx::query(
            r#"INSERT INTO store_meta (key, value) VALUES (?, ?)
               ON CONFLICT (key) DO UPDATE SET value = excluded.value"#,
        )
        .bind(CATALOG_FINGERPRINT_KEY)
        .bind(&fingerprint)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(
            "Item id migration: {} renamed, {} orphaned",
            report.renamed,
            report.orphaned.len()
        );
        Ok(report)
    }
}

impl ProfileStore for SqliteProfileStore {
    async fn find_profile_by_username(&self, username: &str) -> Result<Option<ProfileRow>, StoreError> {
        let row: Option<(String, String, i64)> = sqlx::query_as(
            r#"SELECT id, username, wallet_balance FROM profiles WHERE username = ?"#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, username, balance)| ProfileRow {
            id,
            username,
            wallet_balance: to_u32(balance),
        }))
    }

    async fn create_profile(&self, username: &str, balance: u32) -> Result<ProfileRow, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query(
            r#"INSERT INTO profiles (id, username, wallet_balance) VALUES (?, ?, ?)
               ON CONFLICT (username) DO NOTHING"#,
        )
        .bind(&id)
        .bind(username)
        .bind(balance as i64)
        .execute(&self.pool)
        .await?;

        self.find_profile_by_username(username)
            .await?
            .ok_or_else(|| StoreError::ProfileNotFound(username.to_string()))
    }

    async fn get_balance(&self, owner_id: &str) -> Result<u32, StoreError> {
        let row: Option<(i64,)> =
            sqlx::query_as(r#"SELECT wallet_balance FROM profiles WHERE id = ?"#)
                .bind(owner_id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(balance,)| to_u32(balance))
            .ok_or_else(|| StoreError::ProfileNotFound(owner_id.to_string()))
    }

    async fn set_balance(&self, owner_id: &str, balance: u32) -> Result<(), StoreError> {
        let result = sqlx::query(r#"UPDATE profiles SET wallet_balance = ? WHERE id = ?"#)
            .bind(balance as i64)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ProfileNotFound(owner_id.to_string()));
        }
        Ok(())
    }

    async fn list_items(&self, owner_id: &str, item_type: &str) -> Result<Vec<ItemRow>, StoreError> {
        let rows: Vec<(String, String, i64, Option<String>)> = sqlx::query_as(
            r#"SELECT item_name, item_type, quantity, image_url
               FROM inventory_items
               WHERE profile_id = ? AND item_type = ? AND quantity > 0
               ORDER BY item_name"#,
        )
        .bind(owner_id)
        .bind(item_type)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(item_name, item_type, quantity, image_url)| ItemRow {
                item_name,
                item_type,
                quantity: to_u32(quantity),
                image_url,
            })
            .collect())
    }

    async fn find_item(
        &self,
        owner_id: &str,
        item_name: &str,
        item_type: &str,
    ) -> Result<Option<ItemRow>, StoreError> {
        let row: Option<(String, String, i64, Option<String>)> = sqlx::query_as(
            r#"SELECT item_name, item_type, quantity, image_url
               FROM inventory_items
               WHERE profile_id = ? AND item_type = ? AND item_name = ?"#,
        )
        .bind(owner_id)
        .bind(item_type)
        .bind(item_name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(item_name, item_type, quantity, image_url)| ItemRow {
            item_name,
            item_type,
            quantity: to_u32(quantity),
            image_url,
        }))
    }

    async fn upsert_item(
        &self,
        owner_id: &str,
        item_name: &str,
        quantity: u32,
        image_url: Option<&str>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO inventory_items (profile_id, item_name, item_type, quantity, image_url)
               VALUES (?, ?, ?, ?, ?)
               ON CONFLICT (profile_id, item_type, item_name)
               DO UPDATE SET quantity = excluded.quantity,
                             image_url = COALESCE(excluded.image_url, inventory_items.image_url)"#,
        )
        .bind(owner_id)
        .bind(item_name)
        .bind(DRINK_ITEM_TYPE)
        .bind(quantity as i64)
        .bind(image_url)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
