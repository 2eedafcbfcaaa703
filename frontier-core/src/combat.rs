//! Canonical combat state.
//!
//! One shape, used everywhere: saves, sessions, and narrative updates all
//! speak this struct directly. Older save formats that stored combat as
//! loose fields are migrated at the persistence boundary (see `persist`).

use crate::update::NarrativeUpdate;
use serde::{Deserialize, Serialize};

/// Whose turn it is within an active combat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnOwner {
    #[default]
    Player,
    Opponent,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombatState {
    pub active: bool,
    pub opponent: Option<String>,
    pub turn: TurnOwner,
}

impl CombatState {
    /// Combat just triggered; the player acts first.
    pub fn engaged(opponent: Option<String>) -> Self {
        Self {
            active: true,
            opponent,
            turn: TurnOwner::Player,
        }
    }

    /// Combat state implied by a narrative update, if any.
    pub fn from_update(update: &NarrativeUpdate) -> Option<Self> {
        update
            .combat_triggered
            .then(|| Self::engaged(update.opponent.clone()))
    }

    pub fn end(&mut self) {
        *self = Self::default();
    }
}
