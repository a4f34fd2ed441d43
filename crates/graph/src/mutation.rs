//! Mutation kinds, their inputs, and the lifecycle records the engine emits.
//!
//! ## Lifecycle
//!
//! ```text
//! Pending ──▶ Dispatched ──▶ Reconciled
//!                      └───▶ Failed (optimistic values rolled back)
//! ```
//!
//! A mutation stays `Pending` while an earlier mutation with the same conflict
//! key is unsettled.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use treasure_core::{Entity, GlobalId, GraphError, GraphResult, HidingSpotId};
use treasure_game::{GameStore, HidingSpot};

use crate::client::ClientStore;
use crate::field::{Field, Payload};
use crate::node::{Node, NodeType};

pub type MutationId = Uuid;

/// The closed set of mutations the graph accepts.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MutationKind {
    CheckSpot,
}

impl MutationKind {
    pub fn name(self) -> &'static str {
        match self {
            MutationKind::CheckSpot => "checkSpot",
        }
    }

    /// Every field this kind of mutation may change, declared up front.
    ///
    /// Fields outside this set are never refreshed by the mutation, even if
    /// they happen to change.
    pub fn impact_set(self) -> &'static [Field] {
        match self {
            MutationKind::CheckSpot => &[
                Field::HidingSpotHasBeenChecked,
                Field::HidingSpotHasTreasure,
                Field::GameTurnsRemaining,
            ],
        }
    }
}

impl core::fmt::Display for MutationKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Mutations sharing a key are applied one at a time, in submission order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ConflictKey(String);

impl ConflictKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for ConflictKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Input of `checkSpot`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckSpotInput {
    pub hiding_spot_local_id: HidingSpotId,
}

impl CheckSpotInput {
    pub fn new(hiding_spot_local_id: HidingSpotId) -> Self {
        Self {
            hiding_spot_local_id,
        }
    }

    /// Build the input from a hiding spot's global reference.
    pub fn from_global_ref(global_ref: &str) -> GraphResult<Self> {
        let id = GlobalId::decode(global_ref)?;
        if id.type_tag() != HidingSpot::TYPE_TAG {
            return Err(GraphError::malformed_reference(format!(
                "expected a {} reference, got {}",
                HidingSpot::TYPE_TAG,
                id.type_tag()
            )));
        }
        Ok(Self::new(id.local_id().parse()?))
    }

    fn hiding_spot_ref(&self) -> GlobalId {
        GlobalId::new(HidingSpot::TYPE_TAG, self.hiding_spot_local_id.to_string())
    }
}

/// A mutation invocation: kind plus input fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "input", rename_all = "camelCase")]
pub enum MutationRequest {
    CheckSpot(CheckSpotInput),
}

impl MutationRequest {
    pub fn check_spot(hiding_spot_local_id: HidingSpotId) -> Self {
        MutationRequest::CheckSpot(CheckSpotInput::new(hiding_spot_local_id))
    }

    pub fn kind(&self) -> MutationKind {
        match self {
            MutationRequest::CheckSpot(_) => MutationKind::CheckSpot,
        }
    }

    pub fn conflict_key(&self, game: &GlobalId) -> ConflictKey {
        match self {
            MutationRequest::CheckSpot(_) => ConflictKey(format!("check_{}", game.encode())),
        }
    }

    /// The records this mutation touches, by type.
    pub fn targets(&self, game: &GlobalId) -> BTreeMap<NodeType, GlobalId> {
        match self {
            MutationRequest::CheckSpot(input) => BTreeMap::from([
                (NodeType::Game, game.clone()),
                (NodeType::HidingSpot, input.hiding_spot_ref()),
            ]),
        }
    }

    /// Best-effort prediction from what the client can currently see.
    pub fn optimistic(&self, game: &GlobalId, client: &ClientStore) -> Payload {
        let mut payload = Payload::new(self.targets(game));
        match self {
            MutationRequest::CheckSpot(_) => {
                payload.set(Field::HidingSpotHasBeenChecked, Value::Bool(true));

                let visible_turns = client
                    .read(game, Field::GameTurnsRemaining)
                    .and_then(|v| v.as_u64());
                if let Some(turns) = visible_turns {
                    payload.set(Field::GameTurnsRemaining, Value::from(turns.saturating_sub(1)));
                }
            }
        }
        payload
    }

    /// Authoritative transition against the store (the server side).
    pub fn perform<S>(&self, store: &S) -> GraphResult<MutationResponse>
    where
        S: GameStore + ?Sized,
    {
        match self {
            MutationRequest::CheckSpot(input) => {
                let outcome = store.check_hiding_spot(input.hiding_spot_local_id)?;
                Ok(MutationResponse {
                    nodes: vec![Node::HidingSpot(outcome.hiding_spot), Node::Game(outcome.game)],
                })
            }
        }
    }
}

/// Post-mutation state of every record a mutation may have changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationResponse {
    pub nodes: Vec<Node>,
}

impl MutationResponse {
    pub fn node(&self, node_type: NodeType) -> Option<&Node> {
        self.nodes.iter().find(|n| n.node_type() == node_type)
    }
}

/// Where a mutation is in its lifecycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationState {
    /// Optimistic value visible; not yet sent.
    Pending,
    /// Sent; waiting on the transport.
    Dispatched,
    /// Authoritative values merged into the client store.
    Reconciled,
    /// Error surfaced; optimistic values rolled back.
    Failed,
}

impl MutationState {
    pub fn is_settled(self) -> bool {
        matches!(self, MutationState::Reconciled | MutationState::Failed)
    }
}

/// One state change of one mutation, broadcast to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationTransition {
    pub mutation_id: MutationId,
    pub kind: MutationKind,
    pub conflict_key: ConflictKey,
    pub state: MutationState,
    /// Error code when `state` is `Failed`.
    pub error: Option<String>,
    pub occurred_at: DateTime<Utc>,
}
