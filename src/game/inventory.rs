use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::catalog::Catalog;
use super::draw::DrawOutcome;

/// One owned drink stack. `quantity` is at least 1 for every stored entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    #[serde(rename = "drinkId")]
    pub item_id: String,
    pub quantity: u32,
}

/// A won item that still has to reach the profile store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryDelta {
    pub item_id: String,
    pub image_ref: String,
    /// Quantity held locally after the win was applied.
    pub local_quantity: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionProgress {
    pub collected: usize,
    pub total: usize,
}

impl CollectionProgress {
    pub fn percent(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        self.collected as f32 / self.total as f32 * 100.0
    }
}

/// Player bag: at most one entry per item id, plus the derived collection set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    entries: Vec<InventoryEntry>,
    collection: BTreeSet<String>,
}

impl Inventory {
    /// Build from possibly messy rows: duplicates are merged and empty stacks dropped.
    pub fn from_entries(entries: impl IntoIterator<Item = InventoryEntry>) -> Self {
        let mut inventory = Self::default();
        for entry in entries {
            if entry.quantity == 0 {
                continue;
            }
            match inventory.entry_mut(&entry.item_id) {
                Some(existing) => existing.quantity = existing.quantity.saturating_add(entry.quantity),
                None => {
                    inventory.collection.insert(entry.item_id.clone());
                    inventory.entries.push(entry);
                }
            }
        }
        inventory
    }

    pub fn entries(&self) -> &[InventoryEntry] {
        &self.entries
    }

    pub fn collection(&self) -> &BTreeSet<String> {
        &self.collection
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn quantity_of(&self, item_id: &str) -> u32 {
        self.entries
            .iter()
            .find(|e| e.item_id == item_id)
            .map_or(0, |e| e.quantity)
    }

    pub fn has_collected(&self, item_id: &str) -> bool {
        self.collection.contains(item_id)
    }

    pub fn collection_progress(&self, catalog: &Catalog) -> CollectionProgress {
        CollectionProgress {
            collected: self
                .collection
                .iter()
                .filter(|id| catalog.get(id).is_some())
                .count(),
            total: catalog.len(),
        }
    }

    /// Merge a settled outcome. Pure: `self` is left as it was.
    pub fn apply_outcome(&self, outcome: &DrawOutcome) -> (Inventory, Option<InventoryDelta>) {
        let Some(item) = outcome.item() else {
            return (self.clone(), None);
        };

        let mut next = self.clone();
        let local_quantity = match next.entry_mut(&item.id) {
            Some(entry) => {
                entry.quantity = entry.quantity.saturating_add(1);
                entry.quantity
            }
            None => {
                next.entries.push(InventoryEntry {
                    item_id: item.id.clone(),
                    quantity: 1,
                });
                next.collection.insert(item.id.clone());
                1
            }
        };

        let delta = InventoryDelta {
            item_id: item.id.clone(),
            image_ref: item.image_ref.clone(),
            local_quantity,
        };
        (next, Some(delta))
    }

    fn entry_mut(&mut self, item_id: &str) -> Option<&mut InventoryEntry> {
        self.entries.iter_mut().find(|e| e.item_id == item_id)
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;

    fn won(catalog: &Catalog, id: &str) -> DrawOutcome {
        DrawOutcome::Won(catalog.get(id).unwrap().clone())
    }

    #[test]
    fn apply_outcome__no_reward_changes_nothing() {
        let inventory = Inventory::from_entries([InventoryEntry {
            item_id: "fanta-apito".into(),
            quantity: 2,
        }]);

        let (next, delta) = inventory.apply_outcome(&DrawOutcome::NoReward);

        assert_eq!(next, inventory);
        assert_eq!(delta, None);
    }

    #[test]
    fn apply_outcome__first_win_unlocks_collection() {
        let catalog = Catalog::with_defaults();
        let inventory = Inventory::default();

        let (next, delta) = inventory.apply_outcome(&won(&catalog, "fanta-academia"));

        assert_eq!(next.quantity_of("fanta-academia"), 1);
        assert!(next.has_collected("fanta-academia"));
        assert_eq!(delta.unwrap().local_quantity, 1);
        assert!(inventory.is_empty());
    }

    #[test]
    fn apply_outcome__repeat_win_increments_without_new_entry() {
        let catalog = Catalog::with_defaults();
        let outcome = won(&catalog, "fanta-academia");
        let (once, _) = Inventory::default().apply_outcome(&outcome);

        let (twice, delta) = once.apply_outcome(&outcome);

        assert_eq!(twice.entries().len(), 1);
        assert_eq!(twice.quantity_of("fanta-academia"), 2);
        assert_eq!(twice.collection().len(), 1);
        assert_eq!(delta.unwrap().local_quantity, 2);
    }

    #[test]
    fn from_entries__merges_duplicates_and_drops_empty() {
        let inventory = Inventory::from_entries([
            InventoryEntry { item_id: "fanta-apito".into(), quantity: 1 },
            InventoryEntry { item_id: "fanta-academia".into(), quantity: 0 },
            InventoryEntry { item_id: "fanta-apito".into(), quantity: 3 },
        ]);

        assert_eq!(inventory.entries().len(), 1);
        assert_eq!(inventory.quantity_of("fanta-apito"), 4);
        assert!(!inventory.has_collected("fanta-academia"));
    }

    #[test]
    fn collection__always_matches_entries_and_fits_catalog() {
        let catalog = Catalog::with_defaults();
        let mut inventory = Inventory::default();
        let ids = ["fanta-apito", "fanta-academia", "fanta-apito", "fanta-cafe-brasil", "fanta-apito"];

        for id in ids {
            inventory = inventory.apply_outcome(&won(&catalog, id)).0;
            inventory = inventory.apply_outcome(&DrawOutcome::NoReward).0;

            let from_entries: BTreeSet<String> =
                inventory.entries().iter().map(|e| e.item_id.clone()).collect();
            assert_eq!(&from_entries, inventory.collection());
            assert!(inventory.collection().len() <= catalog.len());
            assert!(inventory.entries().iter().all(|e| e.quantity >= 1));
        }

        let progress = inventory.collection_progress(&catalog);
        assert_eq!(progress, CollectionProgress { collected: 3, total: 4 });
        assert_eq!(progress.percent(), 75.0);
    }
}
