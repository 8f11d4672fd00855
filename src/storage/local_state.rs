use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::game::inventory::InventoryEntry;

#[derive(Debug, Error)]
pub enum LocalStateError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed json in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Offline save: `{ "coins", "drinks": [{ "drinkId", "quantity" }], "collection" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStateBlob {
    pub coins: u32,
    #[serde(default)]
    pub drinks: Vec<InventoryEntry>,
    /// Written for older readers; ignored on load in favour of `drinks`.
    #[serde(default)]
    pub collection: Vec<String>,
}

impl PlayerStateBlob {
    pub fn fresh(starting_coins: u32) -> Self {
        Self {
            coins: starting_coins,
            drinks: Vec::new(),
            collection: Vec::new(),
        }
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Option<T>, LocalStateError> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path).map_err(|source| LocalStateError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|source| LocalStateError::Json {
            path: path.to_path_buf(),
            source,
        })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), LocalStateError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| LocalStateError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let json = serde_json::to_string_pretty(value).map_err(|source| LocalStateError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, json).map_err(|source| LocalStateError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Location of the offline save.
#[derive(Resource, Debug, Clone)]
pub struct LocalStateFile {
    path: PathBuf,
}

impl LocalStateFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join("gacha_state.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<PlayerStateBlob>, LocalStateError> {
        read_json(&self.path)
    }

    /// Missing or unreadable saves start a fresh wallet.
    pub fn load_or_default(&self, starting_coins: u32) -> PlayerStateBlob {
        match self.load() {
            Ok(Some(blob)) => blob,
            Ok(None) => PlayerStateBlob::fresh(starting_coins),
            Err(e) => {
                warn!("{e}, starting a fresh save");
                PlayerStateBlob::fresh(starting_coins)
            }
        }
    }

    pub fn save(&self, blob: &PlayerStateBlob) -> Result<(), LocalStateError> {
        write_json(&self.path, blob)
    }
}

/// Login kept across restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RememberedLogin {
    pub id: String,
    pub username: String,
}

#[derive(Resource, Debug, Clone)]
pub struct RememberedLoginFile {
    path: PathBuf,
}

impl RememberedLoginFile {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            path: dir.join("session.json"),
        }
    }

    pub fn load(&self) -> Option<RememberedLogin> {
        match read_json(&self.path) {
            Ok(login) => login,
            Err(e) => {
                warn!("{e}, ignoring remembered login");
                None
            }
        }
    }

    pub fn save(&self, login: &RememberedLogin) -> Result<(), LocalStateError> {
        write_json(&self.path, login)
    }

    pub fn clear(&self) -> Result<(), LocalStateError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(LocalStateError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("taverna_state_{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn load_or_default__missing_file_gives_fresh_wallet() {
        let dir = scratch_dir();
        let file = LocalStateFile::in_dir(&dir);

        let blob = file.load_or_default(100);

        assert_eq!(blob, PlayerStateBlob::fresh(100));
    }

    #[test]
    fn save__round_trips_wire_field_names() {
        let dir = scratch_dir();
        let file = LocalStateFile::in_dir(&dir);
        let blob = PlayerStateBlob {
            coins: 75,
            drinks: vec![InventoryEntry {
                item_id: "fanta-apito".into(),
                quantity: 2,
            }],
            collection: vec!["fanta-apito".into()],
        };

        file.save(&blob).unwrap();
        let raw = std::fs::read_to_string(file.path()).unwrap();
        let loaded = file.load().unwrap();

        assert!(raw.contains("\"drinkId\": \"fanta-apito\""));
        assert_eq!(loaded, Some(blob));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn load_or_default__corrupt_file_falls_back() {
        let dir = scratch_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let file = LocalStateFile::in_dir(&dir);
        std::fs::write(file.path(), "{ coins: ").unwrap();

        assert!(matches!(file.load(), Err(LocalStateError::Json { .. })));
        assert_eq!(file.load_or_default(10).coins, 10);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn remembered_login__save_load_clear() {
        let dir = scratch_dir();
        let file = RememberedLoginFile::in_dir(&dir);
        let login = RememberedLogin {
            id: "p1".into(),
            username: "wonho1919".into(),
        };

        file.save(&login).unwrap();
        assert_eq!(file.load(), Some(login));
        file.clear().unwrap();
        file.clear().unwrap();

        assert_eq!(file.load(), None);
        let _ = std::fs::remove_dir_all(dir);
    }
}
