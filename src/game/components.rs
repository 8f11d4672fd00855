use bevy::prelude::*;

// ── Screen state ────────────────────────────────────────────────────

#[derive(States, Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Screen {
    #[default]
    Login,
    Gacha,
    Collection,
}

// ── Marker components ───────────────────────────────────────────────

/// Grid cell of the reveal; `.0` is the catalog position it shows.
#[derive(Component, Debug, Clone, Copy)]
pub struct RevealCell(pub usize);

#[derive(Component)]
pub struct SpinButton;

#[derive(Component)]
pub struct BalanceLabel;

#[derive(Component)]
pub struct BagLabel;

#[derive(Component)]
pub struct StatusLabel;
