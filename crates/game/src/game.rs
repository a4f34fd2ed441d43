use serde::{Serialize, Serializer};

use treasure_core::{Entity, GameId, GlobalId};

use crate::spot::HidingSpot;

/// Aggregate root: a treasure search game.
///
/// Snapshot value; the store owns the live copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    id: GameId,
    turns_remaining: u32,
}

impl Game {
    pub fn new(id: GameId, turns_remaining: u32) -> Self {
        Self {
            id,
            turns_remaining,
        }
    }

    pub fn id_typed(&self) -> GameId {
        self.id
    }

    pub fn turns_remaining(&self) -> u32 {
        self.turns_remaining
    }

    /// Spend one turn. Never goes below zero.
    pub(crate) fn spend_turn(&mut self) {
        self.turns_remaining = self.turns_remaining.saturating_sub(1);
    }
}

impl Entity for Game {
    const TYPE_TAG: &'static str = "Game";
    type Id = GameId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GameWire {
    id: GlobalId,
    turns_remaining: u32,
}

impl Serialize for Game {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        GameWire {
            id: self.global_id(),
            turns_remaining: self.turns_remaining,
        }
        .serialize(serializer)
    }
}

/// Where a game stands, as seen from the revealed board.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    InProgress,
    Won,
    Lost,
}

impl GameStatus {
    /// A revealed treasure wins even if the last turn was spent finding it.
    pub fn of(game: &Game, spots: &[HidingSpot]) -> Self {
        if spots.iter().any(|s| s.has_treasure() == Some(true)) {
            GameStatus::Won
        } else if game.turns_remaining() == 0 {
            GameStatus::Lost
        } else {
            GameStatus::InProgress
        }
    }

    pub fn is_over(self) -> bool {
        !matches!(self, GameStatus::InProgress)
    }
}
