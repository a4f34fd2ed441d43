//! Global object identity: the closed set of node types and the registry that
//! maps references back to live entities.

use serde::Serialize;
use serde_json::Value;

use treasure_core::{Entity, GameId, GlobalId, GraphResult, HidingSpotId};
use treasure_game::{Game, GameStore, HidingSpot};

use crate::field::Field;

/// Every entity the graph exposes by reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "__typename")]
pub enum Node {
    Game(Game),
    HidingSpot(HidingSpot),
}

/// Type tag of a [`Node`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum NodeType {
    Game,
    HidingSpot,
}

impl NodeType {
    pub fn tag(self) -> &'static str {
        match self {
            NodeType::Game => Game::TYPE_TAG,
            NodeType::HidingSpot => HidingSpot::TYPE_TAG,
        }
    }

    /// `None` for tags outside the schema.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            t if t == Game::TYPE_TAG => Some(NodeType::Game),
            t if t == HidingSpot::TYPE_TAG => Some(NodeType::HidingSpot),
            _ => None,
        }
    }

    /// Key under which this type's fields appear in a payload.
    pub fn payload_key(self) -> &'static str {
        match self {
            NodeType::Game => "game",
            NodeType::HidingSpot => "hidingSpot",
        }
    }
}

impl core::fmt::Display for NodeType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.tag())
    }
}

impl Node {
    /// The node's declared type.
    pub fn node_type(&self) -> NodeType {
        match self {
            Node::Game(_) => NodeType::Game,
            Node::HidingSpot(_) => NodeType::HidingSpot,
        }
    }

    pub fn global_id(&self) -> GlobalId {
        match self {
            Node::Game(game) => game.global_id(),
            Node::HidingSpot(spot) => spot.global_id(),
        }
    }

    /// Current value of `field`, or `None` if the field belongs to another type.
    pub fn value(&self, field: Field) -> Option<Value> {
        match (self, field) {
            (Node::Game(game), Field::GameId) => Some(Value::String(game.global_id().encode())),
            (Node::Game(game), Field::GameTurnsRemaining) => {
                Some(Value::from(game.turns_remaining()))
            }
            (Node::HidingSpot(spot), Field::HidingSpotId) => {
                Some(Value::String(spot.global_id().encode()))
            }
            (Node::HidingSpot(spot), Field::HidingSpotHasBeenChecked) => {
                Some(Value::Bool(spot.has_been_checked()))
            }
            (Node::HidingSpot(spot), Field::HidingSpotHasTreasure) => {
                Some(spot.has_treasure().map_or(Value::Null, Value::Bool))
            }
            _ => None,
        }
    }

    pub fn as_game(&self) -> Option<&Game> {
        match self {
            Node::Game(game) => Some(game),
            Node::HidingSpot(_) => None,
        }
    }

    pub fn as_hiding_spot(&self) -> Option<&HidingSpot> {
        match self {
            Node::HidingSpot(spot) => Some(spot),
            Node::Game(_) => None,
        }
    }
}

impl From<Game> for Node {
    fn from(value: Game) -> Self {
        Node::Game(value)
    }
}

impl From<HidingSpot> for Node {
    fn from(value: HidingSpot) -> Self {
        Node::HidingSpot(value)
    }
}

/// Maps global references to entities in the store.
#[derive(Debug)]
pub struct IdentityRegistry<S> {
    store: S,
}

impl<S> IdentityRegistry<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Encode a reference for `(type, local_id)`.
    pub fn encode(node_type: NodeType, local_id: &str) -> String {
        treasure_core::id::encode(node_type.tag(), local_id)
    }

    /// Decode a reference into its type tag and local id.
    pub fn decode(global_ref: &str) -> GraphResult<GlobalId> {
        GlobalId::decode(global_ref)
    }

    pub fn classify(node: &Node) -> NodeType {
        node.node_type()
    }
}

impl<S: GameStore> IdentityRegistry<S> {
    /// Look up the entity a reference points at.
    ///
    /// Unknown type tags, unparsable or non-canonical local ids (`"01"`,
    /// `"+3"`) and missing entities all resolve to `None`.
    pub fn resolve(&self, id: &GlobalId) -> Option<Node> {
        match NodeType::from_tag(id.type_tag())? {
            NodeType::Game => {
                let local = canonical::<GameId>(id.local_id())?;
                self.store.game_by_id(local).map(Node::Game)
            }
            NodeType::HidingSpot => {
                let local = canonical::<HidingSpotId>(id.local_id())?;
                self.store.hiding_spot(local).map(Node::HidingSpot)
            }
        }
    }
}

/// Parse a local id, accepting only the spelling `encode` would produce.
fn canonical<I>(local_id: &str) -> Option<I>
where
    I: core::str::FromStr + core::fmt::Display,
{
    let parsed = local_id.parse::<I>().ok()?;
    (parsed.to_string() == local_id).then_some(parsed)
}
