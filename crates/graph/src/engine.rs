//! Mutation execution pipeline (client-side orchestration).
//!
//! ```text
//! invoke(request)
//!   ↓
//! 1. Predict optimistic payload from client-visible state, layer it on the client store
//!   ↓                                                         (→ Pending)
//! 2. Queue behind the previous mutation with the same conflict key
//!   ↓                                                         (→ Dispatched)
//! 3. Deliver through the transport (authoritative transition)
//!   ↓
//! 4. Intersect the kind's impact set with the client's watched fields
//!   ↓
//! 5. Commit reconciled values, drop the prediction             (→ Reconciled)
//!    or roll the prediction back on error                      (→ Failed)
//! ```
//!
//! Dispatch is the only suspension point. Everything that touches the client
//! store runs synchronously under its lock.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

use treasure_core::{GlobalId, GraphError, GraphResult};

use crate::client::ClientStore;
use crate::config::EngineConfig;
use crate::field::Payload;
use crate::mutation::{
    ConflictKey, MutationId, MutationKind, MutationRequest, MutationResponse, MutationState,
    MutationTransition,
};
use crate::node::NodeType;
use crate::transport::Transport;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A mutation that has been invoked but may not have settled yet.
#[derive(Debug)]
pub struct PendingMutation {
    id: MutationId,
    kind: MutationKind,
    conflict_key: ConflictKey,
    optimistic: Payload,
    result: oneshot::Receiver<GraphResult<Payload>>,
}

impl PendingMutation {
    pub fn id(&self) -> MutationId {
        self.id
    }

    pub fn kind(&self) -> MutationKind {
        self.kind
    }

    pub fn conflict_key(&self) -> &ConflictKey {
        &self.conflict_key
    }

    /// The prediction shown to the client before the server answers.
    pub fn optimistic(&self) -> &Payload {
        &self.optimistic
    }

    /// Wait for the authoritative outcome: impact ∩ watched on success.
    pub async fn settle(self) -> GraphResult<Payload> {
        self.result
            .await
            .unwrap_or_else(|_| Err(GraphError::transport("mutation task ended without a result")))
    }
}

#[derive(Debug, Clone)]
struct Emitter {
    tx: broadcast::Sender<MutationTransition>,
    mutation_id: MutationId,
    kind: MutationKind,
    conflict_key: ConflictKey,
}

impl Emitter {
    fn emit(&self, state: MutationState, error: Option<&GraphError>) {
        // No subscribers is fine.
        let _ = self.tx.send(MutationTransition {
            mutation_id: self.mutation_id,
            kind: self.kind,
            conflict_key: self.conflict_key.clone(),
            state,
            error: error.map(|e| e.code().to_string()),
            occurred_at: Utc::now(),
        });
    }
}

/// Executes mutations against a transport on behalf of one client store.
///
/// `invoke` must be called from within a Tokio runtime. Dropping the engine
/// detaches in-flight mutations instead of aborting them; they still settle.
pub struct MutationEngine<T> {
    game: GlobalId,
    transport: Arc<T>,
    client: Arc<Mutex<ClientStore>>,
    /// Completion signal of the most recently submitted mutation per key.
    queue_tails: Mutex<HashMap<ConflictKey, oneshot::Receiver<()>>>,
    tasks: Mutex<JoinSet<()>>,
    transitions: broadcast::Sender<MutationTransition>,
}

impl<T> core::fmt::Debug for MutationEngine<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MutationEngine")
            .field("game", &self.game)
            .field("queued_keys", &lock(&self.queue_tails).len())
            .finish_non_exhaustive()
    }
}

impl<T> Drop for MutationEngine<T> {
    fn drop(&mut self) {
        let tasks = self.tasks.get_mut().unwrap_or_else(PoisonError::into_inner);
        if !tasks.is_empty() {
            debug!(in_flight = tasks.len(), "detaching unsettled mutations");
        }
        tasks.detach_all();
    }
}

impl<T: Transport> MutationEngine<T> {
    pub fn new(
        game: GlobalId,
        transport: Arc<T>,
        client: Arc<Mutex<ClientStore>>,
        config: &EngineConfig,
    ) -> Self {
        let (transitions, _) = broadcast::channel(config.transition_capacity.max(1));
        Self {
            game,
            transport,
            client,
            queue_tails: Mutex::new(HashMap::new()),
            tasks: Mutex::new(JoinSet::new()),
            transitions,
        }
    }

    /// Receive every state transition from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<MutationTransition> {
        self.transitions.subscribe()
    }

    /// Start a mutation.
    ///
    /// The optimistic payload is applied to the client store before this
    /// returns; the authoritative result arrives through
    /// [`PendingMutation::settle`].
    pub fn invoke(&self, request: MutationRequest) -> PendingMutation {
        let mutation_id = Uuid::now_v7();
        let kind = request.kind();
        let conflict_key = request.conflict_key(&self.game);
        let targets = request.targets(&self.game);

        let optimistic = {
            let mut client = lock(&self.client);
            let payload = request.optimistic(&self.game, &client);
            client.apply_optimistic(mutation_id, payload.clone());
            payload
        };

        let emitter = Emitter {
            tx: self.transitions.clone(),
            mutation_id,
            kind,
            conflict_key: conflict_key.clone(),
        };
        emitter.emit(MutationState::Pending, None);

        let (done_tx, done_rx) = oneshot::channel::<()>();
        let prior = lock(&self.queue_tails).insert(conflict_key.clone(), done_rx);
        if prior.is_some() {
            debug!(%mutation_id, %kind, key = %conflict_key, "queued behind unsettled mutation");
        }

        let (result_tx, result_rx) = oneshot::channel();
        let transport = Arc::clone(&self.transport);
        let client = Arc::clone(&self.client);

        let task = async move {
            if let Some(prior) = prior {
                // A dropped sender also means the earlier mutation has settled.
                let _ = prior.await;
            }

            emitter.emit(MutationState::Dispatched, None);
            debug!(%mutation_id, %kind, "dispatching mutation");

            let result = match transport.deliver(&request).await {
                Ok(response) => {
                    let payload = reconcile(&client, mutation_id, kind, targets, &response);
                    info!(%mutation_id, %kind, fields = payload.len(), "mutation reconciled");
                    emitter.emit(MutationState::Reconciled, None);
                    Ok(payload)
                }
                Err(err) => {
                    lock(&client).rollback(mutation_id);
                    warn!(
                        %mutation_id,
                        %kind,
                        error = %err,
                        "mutation failed; optimistic update rolled back"
                    );
                    emitter.emit(MutationState::Failed, Some(&err));
                    Err(err)
                }
            };

            drop(done_tx);
            let _ = result_tx.send(result);
        };

        {
            let mut tasks = lock(&self.tasks);
            while tasks.try_join_next().is_some() {}
            tasks.spawn(task);
        }

        PendingMutation {
            id: mutation_id,
            kind,
            conflict_key,
            optimistic,
            result: result_rx,
        }
    }

    /// Wait until every mutation invoked so far has settled.
    pub async fn drain(&self) {
        let mut tasks = std::mem::take(&mut *lock(&self.tasks));
        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                warn!(error = %err, "mutation task did not complete");
            }
        }
    }
}

/// Keep only the impacted fields the client is watching, read from the
/// authoritative response, and commit them over the prediction.
fn reconcile(
    client: &Mutex<ClientStore>,
    mutation_id: MutationId,
    kind: MutationKind,
    targets: BTreeMap<NodeType, GlobalId>,
    response: &MutationResponse,
) -> Payload {
    let mut client = lock(client);
    let mut payload = Payload::new(targets);

    for &field in kind.impact_set() {
        let Some(record) = payload.target(field.owner()) else {
            continue;
        };
        if !client.is_watching(record, field) {
            continue;
        }
        if let Some(value) = response.node(field.owner()).and_then(|n| n.value(field)) {
            payload.set(field, value);
        }
    }

    client.commit(mutation_id, &payload);
    payload
}
