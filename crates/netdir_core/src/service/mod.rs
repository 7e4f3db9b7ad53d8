//! Directory use-case services.
//!
//! # Responsibility
//! - Orchestrate document store calls into directory use cases.
//! - Keep callers (CLI, UI bridges) decoupled from storage details.
//! - Convert store failures into the directory error kinds.

pub mod consistency;
pub mod directory_service;
pub mod error;
pub mod import_export;
mod records;
