use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Display tier of a drink. Has no effect on drop odds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Rarity {
    #[default]
    Common,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    pub fn label(self) -> &'static str {
        match self {
            Rarity::Common => "Common",
            Rarity::Rare => "Rare",
            Rarity::Epic => "Epic",
            Rarity::Legendary => "Legendary",
        }
    }
}

/// Immutable description of an obtainable drink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: String,
    pub name: String,
    pub image_ref: String,
    pub health: u32,
    pub thirst: u32,
    pub rarity: Rarity,
    pub phrases: Vec<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("duplicate catalog id '{0}'")]
    DuplicateId(String),
}

/// A stored item reference that matches no catalog id.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("stored item '{stored}' matches no catalog entry")]
pub struct CatalogLookupMiss {
    pub stored: String,
}

/// Ordered table of every drink the machine can hand out.
/// Positions are stable and double as grid slots for the reveal.
#[derive(Resource, Debug, Clone, Default)]
pub struct Catalog {
    items: Vec<CatalogItem>,
}

impl Catalog {
    pub fn new(items: Vec<CatalogItem>) -> Result<Self, CatalogError> {
        for (i, item) in items.iter().enumerate() {
            if items[..i].iter().any(|other| other.id == item.id) {
                return Err(CatalogError::DuplicateId(item.id.clone()));
            }
        }
        Ok(Self { items })
    }

    /// The four tavern drinks.
    pub fn with_defaults() -> Self {
        fn drink(
            id: &str,
            name: &str,
            health: u32,
            thirst: u32,
            rarity: Rarity,
            phrases: &[&str],
        ) -> CatalogItem {
            CatalogItem {
                id: id.into(),
                name: name.into(),
                image_ref: format!("drinks/{id}.png"),
                health,
                thirst,
                rarity,
                phrases: phrases.iter().map(|p| p.to_string()).collect(),
            }
        }

        Self {
            items: vec![
                drink(
                    "fanta-noz-esquilo",
                    "Fanta Noz de Esquilo",
                    15,
                    25,
                    Rarity::Common,
                    &[
                        "Squirrels everywhere are jealous.",
                        "Nutty, fizzy and slightly suspicious.",
                    ],
                ),
                drink(
                    "fanta-cafe-brasil",
                    "Fanta Café do Brasil",
                    10,
                    30,
                    Rarity::Rare,
                    &[
                        "Wakes up the whole tavern.",
                        "Brewed strong, served cold.",
                    ],
                ),
                drink(
                    "fanta-academia",
                    "Fanta Academia",
                    20,
                    20,
                    Rarity::Epic,
                    &[
                        "Leg day in a can.",
                        "The bard swears it doubled his reps.",
                    ],
                ),
                drink(
                    "fanta-apito",
                    "Fanta Apito",
                    25,
                    35,
                    Rarity::Legendary,
                    &[
                        "You hear a whistle in the distance...",
                        "The referee's secret reserve.",
                    ],
                ),
            ],
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    pub fn at(&self, index: usize) -> Option<&CatalogItem> {
        self.items.get(index)
    }

    pub fn get(&self, id: &str) -> Option<&CatalogItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    /// Resolve an `item_name` column value. Only exact ids are accepted.
    pub fn resolve_stored(&self, stored: &str) -> Result<&CatalogItem, CatalogLookupMiss> {
        self.get(stored).ok_or_else(|| CatalogLookupMiss {
            stored: stored.to_string(),
        })
    }

    /// Match a legacy row that stored a display name (or a mangled id).
    /// Used by the id migration and when loading older saves.
    pub fn match_legacy_name(&self, stored: &str) -> Option<&CatalogItem> {
        let key = normalize_key(stored);
        if key.is_empty() {
            return None;
        }
        self.items
            .iter()
            .find(|item| normalize_key(&item.id) == key || normalize_key(&item.name) == key)
    }

    /// SHA-256 over the ordered ids. Changes whenever an id is added, removed or renamed.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for item in &self.items {
            hasher.update(item.id.as_bytes());
            hasher.update(b"\n");
        }
        hex::encode(hasher.finalize())
    }
}

/// Lowercase, strip Portuguese accents, and join words with single hyphens.
fn normalize_key(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.trim().chars().flat_map(char::to_lowercase) {
        let mapped = match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'ê' | 'è' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            c if c.is_whitespace() || c == '_' || c == '-' => '-',
            c => c,
        };
        if mapped == '-' && (out.is_empty() || out.ends_with('-')) {
            continue;
        }
        out.push(mapped);
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}
