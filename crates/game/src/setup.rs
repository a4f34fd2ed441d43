//! Initial board configuration.

use rand::Rng;

use treasure_core::{GraphError, GraphResult};

pub const ENV_SPOTS: &str = "TREASURE_SPOTS";
pub const ENV_TURNS: &str = "TREASURE_TURNS";
pub const ENV_TREASURE_INDEX: &str = "TREASURE_INDEX";

/// How a fresh game is laid out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSetup {
    /// Number of hiding spots on the board.
    pub spots: u32,
    /// Turns the player starts with.
    pub turns: u32,
    /// Position of the treasure. `None` picks one at random.
    pub treasure: Option<u32>,
}

impl Default for GameSetup {
    fn default() -> Self {
        Self {
            spots: 9,
            turns: 3,
            treasure: None,
        }
    }
}

impl GameSetup {
    pub fn with_spots(mut self, spots: u32) -> Self {
        self.spots = spots;
        self
    }

    pub fn with_turns(mut self, turns: u32) -> Self {
        self.turns = turns;
        self
    }

    pub fn with_treasure_at(mut self, index: u32) -> Self {
        self.treasure = Some(index);
        self
    }

    /// Read overrides from `TREASURE_SPOTS`, `TREASURE_TURNS` and `TREASURE_INDEX`.
    pub fn from_env() -> GraphResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> GraphResult<Self> {
        let mut setup = Self::default();
        if let Some(spots) = parse_u32(&lookup, ENV_SPOTS)? {
            setup.spots = spots;
        }
        if let Some(turns) = parse_u32(&lookup, ENV_TURNS)? {
            setup.turns = turns;
        }
        setup.treasure = parse_u32(&lookup, ENV_TREASURE_INDEX)?;
        Ok(setup)
    }

    /// Validate and settle the treasure position.
    pub fn treasure_index(&self) -> GraphResult<u32> {
        if self.spots == 0 {
            return Err(GraphError::invalid_argument("a board needs at least one hiding spot"));
        }
        match self.treasure {
            Some(index) if index >= self.spots => Err(GraphError::invalid_argument(format!(
                "treasure index {index} is outside a board of {} spots",
                self.spots
            ))),
            Some(index) => Ok(index),
            None => Ok(rand::rng().random_range(0..self.spots)),
        }
    }
}

fn parse_u32(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> GraphResult<Option<u32>> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|e| GraphError::invalid_argument(format!("{key}={raw:?}: {e}"))),
    }
}
