//! `treasure-core` — identity and error building blocks for the treasure hunt graph.
//!
//! This crate contains **pure** primitives (no IO, no async): global object
//! references, the error taxonomy shared by every layer, and the `Entity` trait.

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::{GraphError, GraphResult};
pub use id::{GameId, GlobalId, HidingSpotId};
