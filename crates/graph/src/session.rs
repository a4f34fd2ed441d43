//! One player's session: a board, a client store, and the engine between them.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;
use tracing::info;

use treasure_core::{Entity, GraphResult, HidingSpotId};
use treasure_game::{Game, GameSetup, GameStatus, GameStore, HidingSpot, InMemoryGameStore};

use crate::client::ClientStore;
use crate::config::EngineConfig;
use crate::connection::{Connection, ConnectionArgs};
use crate::engine::{MutationEngine, PendingMutation};
use crate::field::Selection;
use crate::mutation::{MutationRequest, MutationTransition};
use crate::node::Node;
use crate::query::QueryRoot;
use crate::transport::{InProcessTransport, Transport};

pub type SharedStore = Arc<InMemoryGameStore>;

pub struct Session<T = InProcessTransport<SharedStore>> {
    query: QueryRoot<SharedStore>,
    client: Arc<Mutex<ClientStore>>,
    engine: MutationEngine<T>,
}

impl Session {
    /// Set up a fresh board and an in-process transport configured from `config`.
    pub fn start(setup: &GameSetup, config: &EngineConfig) -> GraphResult<Self> {
        let store = Arc::new(InMemoryGameStore::new(setup)?);
        let transport = InProcessTransport::from_config(Arc::clone(&store), config);
        Ok(Self::with_transport(store, transport, config))
    }
}

impl<T: Transport> Session<T> {
    pub fn with_transport(store: SharedStore, transport: T, config: &EngineConfig) -> Self {
        let game = store.game();
        info!(
            game_id = %game.global_id(),
            turns = game.turns_remaining(),
            spots = store.hiding_spots().len(),
            "session started"
        );

        let client = Arc::new(Mutex::new(ClientStore::new()));
        let engine = MutationEngine::new(
            game.global_id(),
            Arc::new(transport),
            Arc::clone(&client),
            config,
        );
        Self {
            query: QueryRoot::new(store),
            client,
            engine,
        }
    }

    pub fn query(&self) -> &QueryRoot<SharedStore> {
        &self.query
    }

    pub fn engine(&self) -> &MutationEngine<T> {
        &self.engine
    }

    /// Run `f` against the client store. Do not hold on to what it borrows.
    pub fn read_client<R>(&self, f: impl FnOnce(&ClientStore) -> R) -> R {
        let client = self.client.lock().unwrap_or_else(PoisonError::into_inner);
        f(&client)
    }

    /// Fetch the game and remember `selection` as watched on the client.
    pub fn watch_game(&self, selection: &Selection) -> Game {
        let game = self.query.fetch_game();
        self.observe(&Node::Game(game.clone()), selection);
        game
    }

    /// Fetch a page of hiding spots and watch `selection` on each of them.
    pub fn watch_hiding_spots(
        &self,
        args: &ConnectionArgs,
        selection: &Selection,
    ) -> GraphResult<Connection<HidingSpot>> {
        let page = self.query.hiding_spots(args)?;
        for spot in page.nodes() {
            self.observe(&Node::HidingSpot(spot.clone()), selection);
        }
        Ok(page)
    }

    pub fn check_spot(&self, hiding_spot: HidingSpotId) -> PendingMutation {
        self.engine.invoke(MutationRequest::check_spot(hiding_spot))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MutationTransition> {
        self.engine.subscribe()
    }

    pub fn status(&self) -> GameStatus {
        self.query.game_status()
    }

    /// Settle every in-flight mutation, then end the session.
    pub async fn shutdown(self) -> GameStatus {
        self.engine.drain().await;
        let status = self.status();
        info!(?status, turns = self.query.fetch_game().turns_remaining(), "session ended");
        status
    }

    fn observe(&self, node: &Node, selection: &Selection) {
        self.client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .observe(node, selection);
    }
}
