//! Relationship graph derivation.
//!
//! # Responsibility
//! - Turn directory records into plain nodes/edges for an external
//!   force-directed layout engine.
//! - List the direct relationships of a single person or organization.
//!
//! # Invariants
//! - Node ids are prefixed by kind (`person-`, `org-`).
//! - Each undirected edge appears at most once.

pub mod network;
pub mod related;

pub use network::{
    build_organization_network, build_people_network, GraphEdge, GraphNode, NetworkGraph,
    NetworkKind,
};
pub use related::{related_organizations, related_people, Related};
