use bevy::prelude::*;

use super::draw::DrawOutcome;

/// Spin button pressed (or Space on the gacha screen).
#[derive(Message, Debug, Clone, Copy, Default)]
pub struct SpinRequested;

/// The reveal highlight moved to a grid slot.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightMoved {
    pub index: usize,
    pub generation: u64,
}

/// The reveal stopped on its final slot. The outcome is applied after the settle delay.
#[derive(Message, Debug, Clone)]
pub struct RevealSettled {
    pub index: usize,
    pub outcome: DrawOutcome,
}

/// Session was swapped or dropped (login, offline start, sign out).
#[derive(Message, Debug, Clone, Copy, Default)]
pub struct SessionChanged;
