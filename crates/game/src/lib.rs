//! Treasure hunt game state (the store the graph layer reads and mutates).
//!
//! Plain domain state plus an in-memory store; no IO, no async.

pub mod game;
pub mod setup;
pub mod spot;
pub mod store;

pub use game::{Game, GameStatus};
pub use setup::GameSetup;
pub use spot::HidingSpot;
pub use store::{CheckOutcome, GAME_ID, GameStore, InMemoryGameStore};
