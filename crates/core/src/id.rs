//! Global references and strongly-typed local identifiers.
//!
//! A global reference is base64 of `"TypeTag:localId"`. Decoding splits at the
//! first `:`, so type tags are plain identifiers while local ids may contain
//! anything.

use core::str::FromStr;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{GraphError, GraphResult};

const SEPARATOR: char = ':';

/// Encode a `(type_tag, local_id)` pair into an opaque reference.
pub fn encode(type_tag: &str, local_id: &str) -> String {
    STANDARD.encode(format!("{type_tag}{SEPARATOR}{local_id}"))
}

/// Decode a reference produced by [`encode`].
pub fn decode(global_ref: &str) -> GraphResult<(String, String)> {
    let bytes = STANDARD
        .decode(global_ref)
        .map_err(|e| GraphError::malformed_reference(format!("{global_ref:?}: {e}")))?;
    let text = String::from_utf8(bytes)
        .map_err(|_| GraphError::malformed_reference(format!("{global_ref:?}: not utf-8")))?;

    match text.split_once(SEPARATOR) {
        Some((type_tag, local_id)) if !type_tag.is_empty() => {
            Ok((type_tag.to_string(), local_id.to_string()))
        }
        _ => Err(GraphError::malformed_reference(format!(
            "{global_ref:?}: missing type tag"
        ))),
    }
}

/// Decoded global reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlobalId {
    type_tag: String,
    local_id: String,
}

impl GlobalId {
    pub fn new(type_tag: impl Into<String>, local_id: impl Into<String>) -> Self {
        Self {
            type_tag: type_tag.into(),
            local_id: local_id.into(),
        }
    }

    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    pub fn encode(&self) -> String {
        encode(&self.type_tag, &self.local_id)
    }

    pub fn decode(global_ref: &str) -> GraphResult<Self> {
        let (type_tag, local_id) = decode(global_ref)?;
        Ok(Self { type_tag, local_id })
    }
}

impl core::fmt::Display for GlobalId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for GlobalId {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl Serialize for GlobalId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for GlobalId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::decode(&raw).map_err(serde::de::Error::custom)
    }
}

/// Local id of a game.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(u32);

/// Identifier of a hiding spot (its creation-order position on the board).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HidingSpotId(u32);

macro_rules! impl_local_id {
    ($t:ty, $name:literal) => {
        impl $t {
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            pub const fn get(self) -> u32 {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<u32> for $t {
            fn from(value: u32) -> Self {
                Self(value)
            }
        }

        impl FromStr for $t {
            type Err = GraphError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s
                    .parse::<u32>()
                    .map_err(|e| GraphError::malformed_reference(format!("{}: {}", $name, e)))?;
                Ok(Self(raw))
            }
        }
    };
}

impl_local_id!(GameId, "GameId");
impl_local_id!(HidingSpotId, "HidingSpotId");

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn encodes_like_relay_global_ids() {
        assert_eq!(encode("HidingSpot", "3"), "SGlkaW5nU3BvdDoz");
        assert_eq!(encode("Game", "1"), "R2FtZTox");
    }

    #[test]
    fn decode_rejects_non_base64() {
        let err = decode("not base64!").unwrap_err();
        assert!(matches!(err, GraphError::MalformedReference(_)));
    }

    #[test]
    fn decode_rejects_missing_separator() {
        let raw = STANDARD.encode("HidingSpot3");
        let err = decode(&raw).unwrap_err();
        assert!(matches!(err, GraphError::MalformedReference(_)));
    }

    #[test]
    fn decode_rejects_empty_type_tag() {
        let raw = STANDARD.encode(":3");
        assert!(matches!(
            decode(&raw),
            Err(GraphError::MalformedReference(_))
        ));
    }

    #[test]
    fn decode_rejects_invalid_utf8() {
        let raw = STANDARD.encode([0xff, 0xfe, b':', b'1']);
        assert!(matches!(
            decode(&raw),
            Err(GraphError::MalformedReference(_))
        ));
    }

    #[test]
    fn local_id_may_contain_separator() {
        let id = GlobalId::new("Game", "a:b:c");
        let back = GlobalId::decode(&id.encode()).unwrap();
        assert_eq!(back.type_tag(), "Game");
        assert_eq!(back.local_id(), "a:b:c");
    }

    #[test]
    fn global_id_serializes_as_encoded_string() {
        let id = GlobalId::new("Game", "1");
        let json = serde_json::to_value(&id).unwrap();
        assert_eq!(json, serde_json::json!("R2FtZTox"));

        let back: GlobalId = serde_json::from_value(json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn local_ids_parse_from_decimal() {
        assert_eq!("7".parse::<HidingSpotId>().unwrap(), HidingSpotId::new(7));
        assert!(matches!(
            "seven".parse::<HidingSpotId>(),
            Err(GraphError::MalformedReference(_))
        ));
    }

    proptest! {
        /// Property: decoding an encoded reference yields the original pair.
        #[test]
        fn decode_inverts_encode(
            type_tag in "[A-Za-z][A-Za-z0-9_]{0,15}",
            local_id in ".{0,24}",
        ) {
            let encoded = encode(&type_tag, &local_id);
            let (tag, local) = decode(&encoded).unwrap();
            prop_assert_eq!(tag, type_tag);
            prop_assert_eq!(local, local_id);
        }

        /// Property: encoding is deterministic.
        #[test]
        fn encode_is_deterministic(local_id in "[0-9]{1,6}") {
            prop_assert_eq!(encode("HidingSpot", &local_id), encode("HidingSpot", &local_id));
        }
    }
}
