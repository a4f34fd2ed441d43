//! `treasure-graph` — the typed graph layer over the treasure hunt board.
//!
//! Query side: global identity ([`node`]), cursor pagination ([`connection`])
//! and the read entry points ([`query`]).
//!
//! Mutation side: optimistic prediction, per-conflict-key serialization,
//! dispatch through a [`transport`], and reconciliation of the impact set
//! against what the client watches ([`engine`], [`client`]).

pub mod client;
pub mod config;
pub mod connection;
pub mod engine;
pub mod field;
pub mod mutation;
pub mod node;
pub mod query;
pub mod session;
pub mod transport;

pub use client::ClientStore;
pub use config::EngineConfig;
pub use connection::{Connection, ConnectionArgs, Edge, PageInfo, connection_from_slice};
pub use engine::{MutationEngine, PendingMutation};
pub use field::{Field, Payload, Selection};
pub use mutation::{
    CheckSpotInput, ConflictKey, MutationId, MutationKind, MutationRequest, MutationResponse,
    MutationState, MutationTransition,
};
pub use node::{IdentityRegistry, Node, NodeType};
pub use query::QueryRoot;
pub use session::Session;
pub use transport::{InProcessTransport, Transport};
