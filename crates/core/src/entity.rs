//! Entity trait: identity that clients can refer back to.

use crate::id::GlobalId;

/// Entity marker + minimal interface.
pub trait Entity {
    /// Type tag embedded in this entity's global references.
    const TYPE_TAG: &'static str;

    /// Strongly-typed local identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display;

    /// Returns the local identifier.
    fn id(&self) -> &Self::Id;

    /// Returns the world-independent reference for this entity.
    fn global_id(&self) -> GlobalId {
        GlobalId::new(Self::TYPE_TAG, self.id().to_string())
    }
}
