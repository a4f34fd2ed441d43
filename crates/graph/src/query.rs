//! Read entry points: `node(id)`, `game`, and the paginated hiding spots.

use tracing::debug;

use treasure_core::{GlobalId, GraphResult};
use treasure_game::{Game, GameStatus, GameStore, HidingSpot};

use crate::connection::{Connection, ConnectionArgs, connection_from_slice};
use crate::node::{IdentityRegistry, Node};

#[derive(Debug)]
pub struct QueryRoot<S> {
    registry: IdentityRegistry<S>,
}

impl<S: GameStore> QueryRoot<S> {
    pub fn new(store: S) -> Self {
        Self {
            registry: IdentityRegistry::new(store),
        }
    }

    pub fn registry(&self) -> &IdentityRegistry<S> {
        &self.registry
    }

    /// Resolve a global reference to a node.
    ///
    /// A reference that does not decode is an error; one that decodes but
    /// points at nothing is `Ok(None)`.
    pub fn fetch(&self, global_ref: &str) -> GraphResult<Option<Node>> {
        let id = GlobalId::decode(global_ref)?;
        let node = self.registry.resolve(&id);
        if node.is_none() {
            debug!(
                type_tag = id.type_tag(),
                local_id = id.local_id(),
                "reference resolved to nothing"
            );
        }
        Ok(node)
    }

    /// The singleton game.
    pub fn fetch_game(&self) -> Game {
        self.registry.store().game()
    }

    /// The game's hiding spots, windowed by `args`.
    pub fn hiding_spots(&self, args: &ConnectionArgs) -> GraphResult<Connection<HidingSpot>> {
        connection_from_slice(&self.registry.store().hiding_spots(), args)
    }

    pub fn game_status(&self) -> GameStatus {
        let store = self.registry.store();
        GameStatus::of(&store.game(), &store.hiding_spots())
    }
}
