use std::future::Future;

use thiserror::Error;

/// `item_type` used for every row the gacha writes.
pub const DRINK_ITEM_TYPE: &str = "drink";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRow {
    pub id: String,
    pub username: String,
    pub wallet_balance: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRow {
    /// Catalog id (legacy rows may still hold a display name until migrated).
    pub item_name: String,
    pub item_type: String,
    pub quantity: u32,
    pub image_url: Option<String>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("profile '{0}' not found")]
    ProfileNotFound(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Unavailable(_) => true,
            StoreError::Database(e) => match e {
                sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::WorkerCrashed => true,
                sqlx::Error::Database(db) => {
                    let msg = db.message().to_lowercase();
                    msg.contains("locked") || msg.contains("busy")
                }
                _ => false,
            },
            StoreError::Migrate(_) | StoreError::ProfileNotFound(_) => false,
        }
    }
}

/// Profile/inventory backend the gacha core talks to.
/// Quantities are always written as absolute values so a repeated write is harmless.
pub trait ProfileStore: Send + Sync {
    fn find_profile_by_username(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Option<ProfileRow>, StoreError>> + Send;

    /// Create a profile, or return the existing one with that username.
    fn create_profile(
        &self,
        username: &str,
        balance: u32,
    ) -> impl Future<Output = Result<ProfileRow, StoreError>> + Send;

    fn get_balance(&self, owner_id: &str) -> impl Future<Output = Result<u32, StoreError>> + Send;

    fn set_balance(
        &self,
        owner_id: &str,
        balance: u32,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn list_items(
        &self,
        owner_id: &str,
        item_type: &str,
    ) -> impl Future<Output = Result<Vec<ItemRow>, StoreError>> + Send;

    fn find_item(
        &self,
        owner_id: &str,
        item_name: &str,
        item_type: &str,
    ) -> impl Future<Output = Result<Option<ItemRow>, StoreError>> + Send;

    /// Insert or overwrite the `(owner, item_name, item_type)` row with `quantity`.
    fn upsert_item(
        &self,
        owner_id: &str,
        item_name: &str,
        quantity: u32,
        image_url: Option<&str>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}
