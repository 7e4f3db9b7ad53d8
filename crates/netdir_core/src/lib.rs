//! Core logic for the netdir people/organization directory.
//! Owns the CSV transcoder, the document store contract and the membership
//! consistency rules; front ends only call into the service layer.

pub mod config;
pub mod csv;
pub mod db;
pub mod graph;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{AppConfig, ConfigError};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::color_grade::ColorGrade;
pub use model::organization::{GsmSignal, Organization, Room, RoomType};
pub use model::person::{OrganizationMembership, Person};
pub use model::EntityId;
pub use repo::document_store::{
    BatchOp, Collection, Document, DocumentData, DocumentId, DocumentStore, StoreError,
    StoreResult, WriteBatch,
};
pub use repo::memory_store::{MemoryDocumentStore, Subscribe, Subscription};
pub use repo::sqlite_store::SqliteDocumentStore;
pub use service::consistency::{ConsistencyManager, MembershipRepair, RepairReport};
pub use service::directory_service::{DeletedOrganization, DirectoryService, SavedOrganization};
pub use service::error::{DirectoryError, DirectoryResult, Notification, NotificationKind};
pub use service::import_export::{ImportExportService, ImportReport, SkipReason, SkippedRow};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
