//! Client-visible record store.
//!
//! Holds the field values the client has fetched, remembers which fields each
//! record's queries asked for (the watched set), and layers optimistic
//! predictions on top until their mutation settles.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde_json::Value;

use treasure_core::GlobalId;

use crate::field::{Field, Payload, Selection};
use crate::mutation::MutationId;
use crate::node::Node;

#[derive(Debug, Clone, Default)]
struct Record {
    values: BTreeMap<Field, Value>,
    watched: BTreeSet<Field>,
}

#[derive(Debug, Clone)]
struct OptimisticLayer {
    mutation_id: MutationId,
    patch: Payload,
}

/// Client-side cache of fetched records.
#[derive(Debug, Default)]
pub struct ClientStore {
    records: HashMap<GlobalId, Record>,
    /// Oldest first; later layers shadow earlier ones.
    layers: Vec<OptimisticLayer>,
}

impl ClientStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the fields `selection` requested from `node` and start watching them.
    ///
    /// Fields that belong to another node type are ignored.
    pub fn observe(&mut self, node: &Node, selection: &Selection) {
        let record = self.records.entry(node.global_id()).or_default();
        for field in selection.for_type(node.node_type()) {
            if let Some(value) = node.value(field) {
                record.values.insert(field, value);
                record.watched.insert(field);
            }
        }
    }

    /// Value as the client currently sees it, optimistic layers included.
    pub fn read(&self, record: &GlobalId, field: Field) -> Option<Value> {
        let optimistic = self.layers.iter().rev().find_map(|layer| {
            layer
                .patch
                .entries()
                .find(|(r, f, _)| *r == record && *f == field)
                .map(|(_, _, v)| v.clone())
        });
        optimistic.or_else(|| self.read_committed(record, field))
    }

    /// Value without optimistic layers.
    pub fn read_committed(&self, record: &GlobalId, field: Field) -> Option<Value> {
        self.records.get(record)?.values.get(&field).cloned()
    }

    pub fn is_watching(&self, record: &GlobalId, field: Field) -> bool {
        self.records
            .get(record)
            .is_some_and(|r| r.watched.contains(&field))
    }

    pub fn watched(&self, record: &GlobalId) -> Selection {
        self.records
            .get(record)
            .map(|r| r.watched.iter().copied().collect())
            .unwrap_or_default()
    }

    /// `true` while some unsettled mutation predicts a value for `record`.
    pub fn has_optimistic_update(&self, record: &GlobalId) -> bool {
        self.layers.iter().any(|l| l.patch.touches(record))
    }

    /// Unsettled mutations touching `record`, in submission order.
    pub fn pending_mutations(&self, record: &GlobalId) -> Vec<MutationId> {
        self.layers
            .iter()
            .filter(|l| l.patch.touches(record))
            .map(|l| l.mutation_id)
            .collect()
    }

    pub(crate) fn apply_optimistic(&mut self, mutation_id: MutationId, patch: Payload) {
        self.layers.push(OptimisticLayer { mutation_id, patch });
    }

    /// Drop a mutation's prediction. Returns `false` if there was none.
    pub(crate) fn rollback(&mut self, mutation_id: MutationId) -> bool {
        let before = self.layers.len();
        self.layers.retain(|l| l.mutation_id != mutation_id);
        self.layers.len() != before
    }

    /// Replace a mutation's prediction with its reconciled values.
    pub(crate) fn commit(&mut self, mutation_id: MutationId, reconciled: &Payload) {
        self.rollback(mutation_id);
        for (record, field, value) in reconciled.entries() {
            self.records
                .entry(record.clone())
                .or_default()
                .values
                .insert(field, value.clone());
        }
    }
}
