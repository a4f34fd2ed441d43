//! Game state store boundary.
//!
//! The graph layer only talks to the board through `GameStore`. The in-memory
//! implementation holds a single game for the lifetime of a session.

use std::sync::{Arc, PoisonError, RwLock};

use treasure_core::{GameId, GraphError, GraphResult, HidingSpotId};

use crate::game::Game;
use crate::setup::GameSetup;
use crate::spot::HidingSpot;

/// Local id of the singleton game.
pub const GAME_ID: GameId = GameId::new(1);

/// Authoritative state after a spot check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub game: Game,
    pub hiding_spot: HidingSpot,
    /// `false` when the spot had already been checked.
    pub newly_checked: bool,
}

/// Read/mutate access to the board.
pub trait GameStore: Send + Sync {
    /// The singleton game. Always present once the store exists.
    fn game(&self) -> Game;

    fn game_by_id(&self, id: GameId) -> Option<Game>;

    fn hiding_spot(&self, id: HidingSpotId) -> Option<HidingSpot>;

    /// All spots in creation order.
    fn hiding_spots(&self) -> Vec<HidingSpot>;

    /// Reveal a spot and spend a turn, atomically.
    ///
    /// Fails with `NotFound` (and changes nothing) when the spot does not exist.
    fn check_hiding_spot(&self, id: HidingSpotId) -> GraphResult<CheckOutcome>;
}

impl<S> GameStore for Arc<S>
where
    S: GameStore + ?Sized,
{
    fn game(&self) -> Game {
        (**self).game()
    }

    fn game_by_id(&self, id: GameId) -> Option<Game> {
        (**self).game_by_id(id)
    }

    fn hiding_spot(&self, id: HidingSpotId) -> Option<HidingSpot> {
        (**self).hiding_spot(id)
    }

    fn hiding_spots(&self) -> Vec<HidingSpot> {
        (**self).hiding_spots()
    }

    fn check_hiding_spot(&self, id: HidingSpotId) -> GraphResult<CheckOutcome> {
        (**self).check_hiding_spot(id)
    }
}

#[derive(Debug)]
struct Board {
    game: Game,
    spots: Vec<HidingSpot>,
}

/// In-memory board for a single session.
#[derive(Debug)]
pub struct InMemoryGameStore {
    board: RwLock<Board>,
}

impl InMemoryGameStore {
    pub fn new(setup: &GameSetup) -> GraphResult<Self> {
        let treasure = setup.treasure_index()?;
        let spots = (0..setup.spots)
            .map(|i| HidingSpot::new(HidingSpotId::new(i), i == treasure))
            .collect();

        Ok(Self {
            board: RwLock::new(Board {
                game: Game::new(GAME_ID, setup.turns),
                spots,
            }),
        })
    }

    fn read<T>(&self, f: impl FnOnce(&Board) -> T) -> T {
        // Writers never panic mid-update, so a poisoned board is still consistent.
        let board = self.board.read().unwrap_or_else(PoisonError::into_inner);
        f(&board)
    }
}

impl GameStore for InMemoryGameStore {
    fn game(&self) -> Game {
        self.read(|b| b.game.clone())
    }

    fn game_by_id(&self, id: GameId) -> Option<Game> {
        self.read(|b| (b.game.id_typed() == id).then(|| b.game.clone()))
    }

    fn hiding_spot(&self, id: HidingSpotId) -> Option<HidingSpot> {
        self.read(|b| b.spots.get(id.get() as usize).cloned())
    }

    fn hiding_spots(&self) -> Vec<HidingSpot> {
        self.read(|b| b.spots.clone())
    }

    fn check_hiding_spot(&self, id: HidingSpotId) -> GraphResult<CheckOutcome> {
        let mut board = self
            .board
            .write()
            .map_err(|_| GraphError::transport("game store lock poisoned"))?;
        let Board { game, spots } = &mut *board;

        let spot = spots
            .get_mut(id.get() as usize)
            .ok_or_else(|| GraphError::not_found(format!("hiding spot {id}")))?;

        let newly_checked = spot.check();
        game.spend_turn();

        Ok(CheckOutcome {
            game: game.clone(),
            hiding_spot: spot.clone(),
            newly_checked,
        })
    }
}
