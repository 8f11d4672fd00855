use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::repo::{DRINK_ITEM_TYPE, ItemRow, ProfileRow, ProfileStore, StoreError};

#[derive(Default)]
struct MemoryState {
    profiles: Vec<ProfileRow>,
    /// Keyed by (profile_id, item_type, item_name).
    items: HashMap<(String, String, String), ItemRow>,
    fail_next_writes: u32,
    drop_next_acks: u32,
    writes: u32,
}

/// Profile store kept in memory. Can be told to fail writes, or to apply a
/// write and then report failure (a lost acknowledgement).
#[derive(Clone, Default)]
pub struct MemoryProfileStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A panicked test thread must not wedge every other caller.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Reject the next `n` writes before applying them.
    pub fn fail_next_writes(&self, n: u32) {
        self.lock().fail_next_writes = n;
    }

    /// Apply the next `n` writes but report them as failed.
    pub fn drop_next_acks(&self, n: u32) {
        self.lock().drop_next_acks = n;
    }

    /// Number of writes that reached the data.
    pub fn applied_writes(&self) -> u32 {
        self.lock().writes
    }

    /// Place a row directly, bypassing failure injection.
    pub fn insert_raw_item(&self, owner_id: &str, row: ItemRow) {
        let key = (owner_id.to_string(), row.item_type.clone(), row.item_name.clone());
        self.lock().items.insert(key, row);
    }

    fn write<T>(&self, apply: impl FnOnce(&mut MemoryState) -> Result<T, StoreError>) -> Result<T, StoreError> {
        let mut state = self.lock();
        if state.fail_next_writes > 0 {
            state.fail_next_writes -= 1;
            return Err(StoreError::Unavailable("injected write failure".into()));
        }
        let value = apply(&mut state)?;
        state.writes += 1;
        if state.drop_next_acks > 0 {
            state.drop_next_acks -= 1;
            return Err(StoreError::Unavailable("injected lost acknowledgement".into()));
        }
        Ok(value)
    }
}

impl ProfileStore for MemoryProfileStore {
    async fn find_profile_by_username(&self, username: &str) -> Result<Option<ProfileRow>, StoreError> {
        Ok(self
            .lock()
            .profiles
            .iter()
            .find(|p| p.username == username)
            .cloned())
    }

    async fn create_profile(&self, username: &str, balance: u32) -> Result<ProfileRow, StoreError> {
        self.write(|state| {
            if let Some(existing) = state.profiles.iter().find(|p| p.username == username) {
                return Ok(existing.clone());
            }
            let row = ProfileRow {
                id: uuid::Uuid::new_v4().to_string(),
                username: username.to_string(),
                wallet_balance: balance,
            };
            state.profiles.push(row.clone());
            Ok(row)
        })
    }

    async fn get_balance(&self, owner_id: &str) -> Result<u32, StoreError> {
        self.lock()
            .profiles
            .iter()
            .find(|p| p.id == owner_id)
            .map(|p| p.wallet_balance)
            .ok_or_else(|| StoreError::ProfileNotFound(owner_id.to_string()))
    }

    async fn set_balance(&self, owner_id: &str, balance: u32) -> Result<(), StoreError> {
        self.write(|state| {
            let profile = state
                .profiles
                .iter_mut()
                .find(|p| p.id == owner_id)
                .ok_or_else(|| StoreError::ProfileNotFound(owner_id.to_string()))?;
            profile.wallet_balance = balance;
            Ok(())
        })
    }

    async fn list_items(&self, owner_id: &str, item_type: &str) -> Result<Vec<ItemRow>, StoreError> {
        let mut rows: Vec<ItemRow> = self
            .lock()
            .items
            .iter()
            .filter(|((owner, kind, _), row)| owner == owner_id && kind == item_type && row.quantity > 0)
            .map(|(_, row)| row.clone())
            .collect();
        rows.sort_by(|a, b| a.item_name.cmp(&b.item_name));
        Ok(rows)
    }

    async fn find_item(
        &self,
        owner_id: &str,
        item_name: &str,
        item_type: &str,
    ) -> Result<Option<ItemRow>, StoreError> {
        let key = (owner_id.to_string(), item_type.to_string(), item_name.to_string());
        Ok(self.lock().items.get(&key).cloned())
    }

    async fn upsert_item(
        &self,
        owner_id: &str,
        item_name: &str,
        quantity: u32,
        image_url: Option<&str>,
    ) -> Result<(), StoreError> {
        self.write(|state| {
            let key = (
                owner_id.to_string(),
                DRINK_ITEM_TYPE.to_string(),
                item_name.to_string(),
            );
            state.items.insert(
                key,
                ItemRow {
                    item_name: item_name.to_string(),
                    item_type: DRINK_ITEM_TYPE.to_string(),
                    quantity,
                    image_url: image_url.map(str::to_string),
                },
            );
            Ok(())
        })
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_profile__is_idempotent_on_username() {
        let store = MemoryProfileStore::new();

        let first = store.create_profile("wonho1919", 100).await.unwrap();
        let again = store.create_profile("wonho1919", 5).await.unwrap();

        assert_eq!(first, again);
        assert_eq!(store.get_balance(&first.id).await.unwrap(), 100);
    }

    #[tokio::test]
    async fn upsert_item__overwrites_single_row() {
        let store = MemoryProfileStore::new();
        let owner = store.create_profile("p", 0).await.unwrap().id;

        store.upsert_item(&owner, "fanta-apito", 1, None).await.unwrap();
        store.upsert_item(&owner, "fanta-apito", 2, None).await.unwrap();

        let rows = store.list_items(&owner, DRINK_ITEM_TYPE).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].quantity, 2);
    }

    #[tokio::test]
    async fn drop_next_acks__applies_then_errors() {
        let store = MemoryProfileStore::new();
        let owner = store.create_profile("p", 0).await.unwrap().id;
        store.drop_next_acks(1);

        let result = store.set_balance(&owner, 42).await;

        assert!(result.is_err());
        assert_eq!(store.get_balance(&owner).await.unwrap(), 42);
    }
}
