//! Persistence contracts and document store implementations.
//!
//! # Responsibility
//! - Define the `DocumentStore` interface injected into services.
//! - Provide SQLite and in-memory implementations.
//!
//! # Invariants
//! - Services never touch SQL or store internals directly.
//! - Batch commits are all-or-nothing in every implementation.

pub mod document_store;
pub mod memory_store;
pub mod sqlite_store;
