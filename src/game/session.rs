use bevy::prelude::*;
use rand::Rng;
use thiserror::Error;

use super::catalog::{Catalog, CatalogLookupMiss};
use super::draw::{DrawEngine, DrawError, DrawOutcome, Wallet};
use super::inventory::{Inventory, InventoryEntry};
use crate::storage::local_state::PlayerStateBlob;
use crate::storage::reconcile::PersistJob;
use crate::storage::repo::{DRINK_ITEM_TYPE, ItemRow, ProfileRow, ProfileStore, StoreError};

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("enter a username")]
    EmptyUsername,
    #[error("user not found")]
    UserNotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOwner {
    /// Local save file only.
    Offline,
    Profile { id: String, username: String },
}

/// What has to be written after a session mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Commit {
    Nothing,
    SaveLocal(PlayerStateBlob),
    Remote(Vec<PersistJob>),
}

/// Wallet, bag and spin guard of whoever is playing.
#[derive(Resource, Debug)]
pub struct PlayerSession {
    owner: SessionOwner,
    wallet: Wallet,
    inventory: Inventory,
    engine: DrawEngine,
    pending: Option<DrawOutcome>,
}

/// Map stored references onto catalog ids. Display-name leftovers are
/// matched loosely, everything else is reported and skipped.
fn resolve_entries(
    catalog: &Catalog,
    stored: impl IntoIterator<Item = (String, u32)>,
) -> (Vec<InventoryEntry>, Vec<CatalogLookupMiss>) {
    let mut entries = Vec::new();
    let mut misses = Vec::new();
    for (name, quantity) in stored {
        let resolved = catalog
            .resolve_stored(&name)
            .or_else(|miss| catalog.match_legacy_name(&name).ok_or(miss));
        match resolved {
            Ok(item) => entries.push(InventoryEntry {
                item_id: item.id.clone(),
                quantity,
            }),
            Err(miss) => {
                warn!("{miss}, skipping");
                misses.push(miss);
            }
        }
    }
    (entries, misses)
}

impl PlayerSession {
    pub fn offline(
        blob: PlayerStateBlob,
        catalog: &Catalog,
        no_reward_percent: f64,
    ) -> (Self, Vec<CatalogLookupMiss>) {
        let stored = blob.drinks.into_iter().map(|e| (e.item_id, e.quantity));
        let (entries, misses) = resolve_entries(catalog, stored);
        let session = Self {
            owner: SessionOwner::Offline,
            wallet: Wallet::new(blob.coins),
            inventory: Inventory::from_entries(entries),
            engine: DrawEngine::new(no_reward_percent),
            pending: None,
        };
        (session, misses)
    }

    pub fn from_profile(
        profile: ProfileRow,
        rows: Vec<ItemRow>,
        catalog: &Catalog,
        no_reward_percent: f64,
    ) -> (Self, Vec<CatalogLookupMiss>) {
        let stored = rows
            .into_iter()
            .filter(|row| row.item_type == DRINK_ITEM_TYPE)
            .map(|row| (row.item_name, row.quantity));
        let (entries, misses) = resolve_entries(catalog, stored);
        let session = Self {
            owner: SessionOwner::Profile {
                id: profile.id,
                username: profile.username,
            },
            wallet: Wallet::new(profile.wallet_balance),
            inventory: Inventory::from_entries(entries),
            engine: DrawEngine::new(no_reward_percent),
            pending: None,
        };
        (session, misses)
    }

    pub fn owner(&self) -> &SessionOwner {
        &self.owner
    }

    pub fn username(&self) -> Option<&str> {
        match &self.owner {
            SessionOwner::Profile { username, .. } => Some(username),
            SessionOwner::Offline => None,
        }
    }

    pub fn wallet(&self) -> Wallet {
        self.wallet
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn is_spinning(&self) -> bool {
        self.engine.is_spinning()
    }

    pub fn can_spin(&self, cost: u32) -> bool {
        !self.is_spinning() && self.wallet.can_afford(cost)
    }

    /// Pay for a spin. The outcome is held back until [`Self::settle`].
    pub fn spin<R: Rng + ?Sized>(
        &mut self,
        cost: u32,
        catalog: &Catalog,
        rng: &mut R,
    ) -> Result<(DrawOutcome, Commit), DrawError> {
        let outcome = self
            .engine
            .attempt_draw(&mut self.wallet, cost, catalog, rng)?;
        self.pending = Some(outcome.clone());

        let commit = match &self.owner {
            SessionOwner::Offline => Commit::SaveLocal(self.to_blob()),
            SessionOwner::Profile { id, .. } => Commit::Remote(vec![PersistJob::Balance {
                owner_id: id.clone(),
                balance: self.wallet.balance,
            }]),
        };
        Ok((outcome, commit))
    }

    /// Apply the held outcome and release the spin guard.
    pub fn settle(&mut self) -> Option<(DrawOutcome, Commit)> {
        let outcome = self.pending.take()?;
        self.engine.finish_spin();

        let (next, delta) = self.inventory.apply_outcome(&outcome);
        self.inventory = next;

        let commit = match (&self.owner, delta) {
            (_, None) => Commit::Nothing,
            (SessionOwner::Offline, Some(_)) => Commit::SaveLocal(self.to_blob()),
            (SessionOwner::Profile { id, .. }, Some(delta)) => {
                Commit::Remote(vec![PersistJob::Item {
                    owner_id: id.clone(),
                    delta,
                }])
            }
        };
        Some((outcome, commit))
    }

    pub fn to_blob(&self) -> PlayerStateBlob {
        PlayerStateBlob {
            coins: self.wallet.balance,
            drinks: self.inventory.entries().to_vec(),
            collection: self.inventory.collection().iter().cloned().collect(),
        }
    }
}

/// Look a player up by username, trimmed and lower-cased.
pub async fn login<S: ProfileStore>(store: &S, raw_username: &str) -> Result<ProfileRow, LoginError> {
    let username = raw_username.trim().to_lowercase();
    if username.is_empty() {
        return Err(LoginError::EmptyUsername);
    }
    store
        .find_profile_by_username(&username)
        .await?
        .ok_or(LoginError::UserNotFound)
}

/// Build a session from the store's current balance and inventory.
pub async fn open_profile_session<S: ProfileStore>(
    store: &S,
    mut profile: ProfileRow,
    catalog: &Catalog,
    no_reward_percent: f64,
) -> Result<(PlayerSession, Vec<CatalogLookupMiss>), StoreError> {
    profile.wallet_balance = store.get_balance(&profile.id).await?;
    let rows = store.list_items(&profile.id, DRINK_ITEM_TYPE).await?;
    Ok(PlayerSession::from_profile(profile, rows, catalog, no_reward_percent))
}
