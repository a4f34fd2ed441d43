//! Field selections and field-level payloads.
//!
//! A [`Selection`] is what a query asked for (the watched set when recorded
//! in the client store). A [`Payload`] carries field values for the records a
//! mutation touched.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use treasure_core::GlobalId;

use crate::node::NodeType;

/// A scalar field of a node type.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    GameId,
    GameTurnsRemaining,
    HidingSpotId,
    HidingSpotHasBeenChecked,
    HidingSpotHasTreasure,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::GameId,
        Field::GameTurnsRemaining,
        Field::HidingSpotId,
        Field::HidingSpotHasBeenChecked,
        Field::HidingSpotHasTreasure,
    ];

    /// The node type this field lives on.
    pub fn owner(self) -> NodeType {
        match self {
            Field::GameId | Field::GameTurnsRemaining => NodeType::Game,
            Field::HidingSpotId
            | Field::HidingSpotHasBeenChecked
            | Field::HidingSpotHasTreasure => {
                NodeType::HidingSpot
            }
        }
    }

    /// Wire name within the owning type.
    pub fn name(self) -> &'static str {
        match self {
            Field::GameId | Field::HidingSpotId => "id",
            Field::GameTurnsRemaining => "turnsRemaining",
            Field::HidingSpotHasBeenChecked => "hasBeenChecked",
            Field::HidingSpotHasTreasure => "hasTreasure",
        }
    }

    /// Dotted path, e.g. `game.turnsRemaining`.
    pub fn path(self) -> String {
        format!("{}.{}", self.owner().payload_key(), self.name())
    }

    pub fn from_path(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.path() == path)
    }
}

impl core::fmt::Display for Field {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.path())
    }
}

/// Set of fields a query requested.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    fields: BTreeSet<Field>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of(fields: impl IntoIterator<Item = Field>) -> Self {
        Self {
            fields: fields.into_iter().collect(),
        }
    }

    /// Every scalar field of one node type.
    pub fn all_of(node_type: NodeType) -> Self {
        Self::of(Field::ALL.into_iter().filter(|f| f.owner() == node_type))
    }

    pub fn with(mut self, field: Field) -> Self {
        self.fields.insert(field);
        self
    }

    pub fn contains(&self, field: Field) -> bool {
        self.fields.contains(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = Field> + '_ {
        self.fields.iter().copied()
    }

    /// Fields of `self` that apply to `node_type`.
    pub fn for_type(&self, node_type: NodeType) -> impl Iterator<Item = Field> + '_ {
        self.iter().filter(move |f| f.owner() == node_type)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<Field> for Selection {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        Self::of(iter)
    }
}

/// Field values for the records a mutation touched.
///
/// Each node type appears at most once: `targets` names the record, `values`
/// holds the fields present for it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payload {
    targets: BTreeMap<NodeType, GlobalId>,
    values: BTreeMap<Field, Value>,
}

impl Payload {
    pub fn new(targets: BTreeMap<NodeType, GlobalId>) -> Self {
        Self {
            targets,
            values: BTreeMap::new(),
        }
    }

    /// Record the value of `field`. Ignored when the payload has no record of
    /// the field's owning type.
    pub fn set(&mut self, field: Field, value: Value) {
        if self.targets.contains_key(&field.owner()) {
            self.values.insert(field, value);
        }
    }

    pub fn get(&self, field: Field) -> Option<&Value> {
        self.values.get(&field)
    }

    pub fn target(&self, node_type: NodeType) -> Option<&GlobalId> {
        self.targets.get(&node_type)
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.values.keys().copied()
    }

    /// `(record, field, value)` triples.
    pub fn entries(&self) -> impl Iterator<Item = (&GlobalId, Field, &Value)> + '_ {
        self.values.iter().filter_map(|(field, value)| {
            self.targets
                .get(&field.owner())
                .map(|record| (record, *field, value))
        })
    }

    pub fn touches(&self, record: &GlobalId) -> bool {
        self.entries().any(|(r, _, _)| r == record)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Nested JSON shape: `{"game": {"id": .., "turnsRemaining": ..}, "hidingSpot": {..}}`.
    pub fn to_json(&self) -> Value {
        let mut root = Map::new();
        for (node_type, id) in &self.targets {
            let mut record = Map::new();
            record.insert("id".to_string(), Value::String(id.encode()));
            for (field, value) in self.values.iter().filter(|(f, _)| f.owner() == *node_type) {
                record.insert(field.name().to_string(), value.clone());
            }
            root.insert(node_type.payload_key().to_string(), Value::Object(record));
        }
        Value::Object(root)
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn paths_round_trip() {
        for field in Field::ALL {
            assert_eq!(Field::from_path(&field.path()), Some(field));
        }
        assert_eq!(Field::GameTurnsRemaining.path(), "game.turnsRemaining");
        assert_eq!(Field::from_path("game.hidingSpots"), None);
    }

    #[test]
    fn all_of_picks_one_type() {
        let selection = Selection::all_of(NodeType::HidingSpot);
        assert_eq!(selection.len(), 3);
        assert!(selection.iter().all(|f| f.owner() == NodeType::HidingSpot));
    }

    #[test]
    fn payload_ignores_fields_without_a_target() {
        let mut payload = Payload::new(BTreeMap::from([(
            NodeType::Game,
            GlobalId::new("Game", "1"),
        )]));
        payload.set(Field::GameTurnsRemaining, json!(2));
        payload.set(Field::HidingSpotHasBeenChecked, json!(true));

        assert_eq!(payload.len(), 1);
        assert_eq!(payload.get(Field::HidingSpotHasBeenChecked), None);
    }

    #[test]
    fn payload_renders_nested_json() {
        let mut payload = Payload::new(BTreeMap::from([
            (NodeType::Game, GlobalId::new("Game", "1")),
            (NodeType::HidingSpot, GlobalId::new("HidingSpot", "3")),
        ]));
        payload.set(Field::GameTurnsRemaining, json!(8));
        payload.set(Field::HidingSpotHasBeenChecked, json!(true));

        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "game": {"id": "R2FtZTox", "turnsRemaining": 8},
                "hidingSpot": {"id": "SGlkaW5nU3BvdDoz", "hasBeenChecked": true},
            })
        );
    }
}
