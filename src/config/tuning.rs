use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::game::reveal::RevealTiming;
use crate::storage::retry::RetryPolicy;

/// A profile created on startup when the database has no row for it yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeedProfile {
    pub username: String,
    pub balance: u32,
}

/// All tunable gacha parameters, loaded from tuning.ron.
#[derive(Debug, Clone, Resource, Serialize, Deserialize)]
pub struct Tuning {
    /// Coins debited per spin.
    pub gacha_cost: u32,
    /// Chance in percent that a spin yields nothing.
    pub no_reward_percent: f64,
    /// Coins granted to a fresh offline save.
    pub starting_coins: u32,
    pub reveal_start_interval_ms: u64,
    /// Multiplier applied to the highlight interval after every step. Must be > 1.
    pub reveal_acceleration: f64,
    pub reveal_ceiling_ms: u64,
    /// Pause between the settle frame and the inventory update.
    pub settle_delay_ms: u64,
    pub retry_max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub toast_secs: f32,
    pub seed_profiles: Vec<SeedProfile>,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            gacha_cost: 25,
            no_reward_percent: 40.0,
            starting_coins: 100,
            reveal_start_interval_ms: 50,
            reveal_acceleration: 1.08,
            reveal_ceiling_ms: 300,
            settle_delay_ms: 500,
            retry_max_attempts: 4,
            retry_base_delay_ms: 200,
            retry_max_delay_ms: 3000,
            toast_secs: 3.5,
            seed_profiles: vec![SeedProfile {
                username: "wonho1919".into(),
                balance: 100,
            }],
        }
    }
}

impl Tuning {
    /// Get the data directory for tuning, save and database files.
    pub fn data_dir() -> PathBuf {
        let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        base.join("taverna_gacha")
    }

    /// Path to the tuning file.
    pub fn file_path() -> PathBuf {
        Self::data_dir().join("tuning.ron")
    }

    /// Load from file, or create default if not found.
    pub fn load_or_default() -> Self {
        Self::load_or_default_at(&Self::file_path())
    }

    pub fn load_or_default_at(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(contents) => match ron::from_str(&contents) {
                    Ok(tuning) => return tuning,
                    Err(e) => {
                        warn!("Failed to parse tuning.ron: {e}, using defaults");
                    }
                },
                Err(e) => {
                    warn!("Failed to read tuning.ron: {e}, using defaults");
                }
            }
        }
        let tuning = Self::default();
        tuning.save_at(path);
        tuning
    }

    fn save_at(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let pretty = ron::ser::PrettyConfig::default();
        match ron::ser::to_string_pretty(self, pretty) {
            Ok(s) => {
                if let Err(e) = std::fs::write(path, s) {
                    warn!("Failed to write tuning.ron: {e}");
                }
            }
            Err(e) => {
                warn!("Failed to serialize tuning: {e}");
            }
        }
    }

    /// Reload from file (called by key press).
    pub fn reload(&mut self) {
        *self = Self::load_or_default();
        info!("Tuning reloaded");
    }

    pub fn reveal_timing(&self) -> RevealTiming {
        RevealTiming {
            start_interval: Duration::from_millis(self.reveal_start_interval_ms),
            acceleration: self.reveal_acceleration,
            ceiling: Duration::from_millis(self.reveal_ceiling_ms),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_max_attempts,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
        }
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}
