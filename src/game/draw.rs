use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::catalog::{Catalog, CatalogItem};

/// Used when the configured no-reward rate is not a number.
pub const DEFAULT_NO_REWARD_PERCENT: f64 = 40.0;

/// Spendable coins. Unsigned, so the balance can never go negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Wallet {
    pub balance: u32,
}

impl Wallet {
    pub fn new(balance: u32) -> Self {
        Self { balance }
    }

    pub fn can_afford(&self, cost: u32) -> bool {
        self.balance >= cost
    }
}

/// Result of one paid spin.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOutcome {
    NoReward,
    Won(CatalogItem),
}

impl DrawOutcome {
    pub fn won(&self) -> bool {
        matches!(self, DrawOutcome::Won(_))
    }

    pub fn item(&self) -> Option<&CatalogItem> {
        match self {
            DrawOutcome::Won(item) => Some(item),
            DrawOutcome::NoReward => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DrawError {
    #[error("insufficient funds: balance {balance}, cost {cost}")]
    InsufficientFunds { balance: u32, cost: u32 },
    #[error("a spin is already in progress")]
    SpinInProgress,
    #[error("the catalog is empty")]
    EmptyCatalog,
}

/// Odds and the in-flight guard for one player session.
#[derive(Debug, Clone)]
pub struct DrawEngine {
    no_reward_percent: f64,
    spinning: bool,
}

impl DrawEngine {
    pub fn new(no_reward_percent: f64) -> Self {
        let no_reward_percent = if no_reward_percent.is_finite() {
            no_reward_percent.clamp(0.0, 100.0)
        } else {
            DEFAULT_NO_REWARD_PERCENT
        };
        Self {
            no_reward_percent,
            spinning: false,
        }
    }

    pub fn is_spinning(&self) -> bool {
        self.spinning
    }

    /// Debit `cost` and sample an outcome in one step.
    /// On any error the wallet and the guard are left untouched.
    pub fn attempt_draw<R: Rng + ?Sized>(
        &mut self,
        wallet: &mut Wallet,
        cost: u32,
        catalog: &Catalog,
        rng: &mut R,
    ) -> Result<DrawOutcome, DrawError> {
        if self.spinning {
            return Err(DrawError::SpinInProgress);
        }
        if !wallet.can_afford(cost) {
            return Err(DrawError::InsufficientFunds {
                balance: wallet.balance,
                cost,
            });
        }
        if catalog.is_empty() {
            return Err(DrawError::EmptyCatalog);
        }

        let outcome = sample_outcome(self.no_reward_percent, catalog, rng);
        wallet.balance -= cost;
        self.spinning = true;
        Ok(outcome)
    }

    /// Release the guard once the reveal has settled and the outcome was applied.
    pub fn finish_spin(&mut self) {
        self.spinning = false;
    }
}

fn sample_outcome<R: Rng + ?Sized>(
    no_reward_percent: f64,
    catalog: &Catalog,
    rng: &mut R,
) -> DrawOutcome {
    let roll: f64 = rng.random_range(0.0..100.0);
    if roll < no_reward_percent {
        return DrawOutcome::NoReward;
    }
    let index = rng.random_range(0..catalog.len());
    match catalog.at(index) {
        Some(item) => DrawOutcome::Won(item.clone()),
        None => DrawOutcome::NoReward,
    }
}
