use serde::{Serialize, Serializer};

use treasure_core::{Entity, GlobalId, HidingSpotId};

/// A place where treasure might be hidden.
///
/// Whether the spot holds treasure is fixed at creation. It only becomes
/// observable once the spot has been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HidingSpot {
    id: HidingSpotId,
    has_been_checked: bool,
    treasure: bool,
}

impl HidingSpot {
    pub fn new(id: HidingSpotId, treasure: bool) -> Self {
        Self {
            id,
            has_been_checked: false,
            treasure,
        }
    }

    pub fn id_typed(&self) -> HidingSpotId {
        self.id
    }

    pub fn has_been_checked(&self) -> bool {
        self.has_been_checked
    }

    /// `None` until the spot has been checked.
    pub fn has_treasure(&self) -> Option<bool> {
        self.has_been_checked.then_some(self.treasure)
    }

    /// Mark the spot as checked. Returns `true` if this call revealed it.
    pub(crate) fn check(&mut self) -> bool {
        let newly_checked = !self.has_been_checked;
        self.has_been_checked = true;
        newly_checked
    }
}

impl Entity for HidingSpot {
    const TYPE_TAG: &'static str = "HidingSpot";
    type Id = HidingSpotId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HidingSpotWire {
    id: GlobalId,
    has_been_checked: bool,
    has_treasure: Option<bool>,
}

impl Serialize for HidingSpot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        HidingSpotWire {
            id: self.global_id(),
            has_been_checked: self.has_been_checked,
            has_treasure: self.has_treasure(),
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn treasure_is_hidden_until_checked() {
        let mut spot = HidingSpot::new(HidingSpotId::new(0), true);
        assert_eq!(spot.has_treasure(), None);

        assert!(spot.check());
        assert_eq!(spot.has_treasure(), Some(true));
    }

    #[test]
    fn checking_twice_is_idempotent() {
        let mut spot = HidingSpot::new(HidingSpotId::new(4), false);
        assert!(spot.check());
        let after_first = spot.clone();

        assert!(!spot.check());
        assert_eq!(spot, after_first);
        assert_eq!(spot.has_treasure(), Some(false));
    }

    #[test]
    fn serializes_with_null_treasure_while_hidden() {
        let spot = HidingSpot::new(HidingSpotId::new(3), true);
        let value = serde_json::to_value(&spot).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "SGlkaW5nU3BvdDoz",
                "hasBeenChecked": false,
                "hasTreasure": null,
            })
        );
    }
}
