//! Service error kinds and user-facing notifications.
//!
//! # Invariants
//! - Consistency-repair batch failures (`BatchUpdate`) are reported apart
//!   from primary record writes (`Save`).
//! - Every error maps to a short notification message; callers never need
//!   to surface raw store errors.

use crate::repo::document_store::{Collection, StoreError};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub type DirectoryResult<T> = Result<T, DirectoryError>;

#[derive(Debug)]
pub enum DirectoryError {
    /// Collection snapshot could not be read or decoded.
    Read {
        collection: Collection,
        source: StoreError,
    },
    /// A primary record write or delete failed. `operation` reads like
    /// `save person`.
    Save {
        operation: &'static str,
        source: StoreError,
    },
    /// The membership repair batch for an organization did not commit.
    BatchUpdate {
        organization_id: String,
        source: StoreError,
    },
    /// CSV input was empty, structurally invalid, or had no usable rows.
    ImportParse(String),
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },
    InvalidInput(String),
}

impl Display for DirectoryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { collection, source } => {
                write!(f, "failed to read {collection}: {source}")
            }
            Self::Save { operation, source } => write!(f, "failed to {operation}: {source}"),
            Self::BatchUpdate {
                organization_id,
                source,
            } => write!(
                f,
                "membership repair for organization `{organization_id}` did not commit: {source}"
            ),
            Self::ImportParse(message) => write!(f, "import failed: {message}"),
            Self::FileRead { path, source } => {
                write!(f, "failed to read `{}`: {source}", path.display())
            }
            Self::FileWrite { path, source } => {
                write!(f, "failed to write `{}`: {source}", path.display())
            }
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
        }
    }
}

impl Error for DirectoryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. }
            | Self::Save { source, .. }
            | Self::BatchUpdate { source, .. } => Some(source),
            Self::FileRead { source, .. } | Self::FileWrite { source, .. } => Some(source),
            Self::ImportParse(_) | Self::InvalidInput(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

/// Short-lived user-visible outcome of one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == NotificationKind::Error
    }
}

impl From<&DirectoryError> for Notification {
    fn from(value: &DirectoryError) -> Self {
        let message = match value {
            DirectoryError::Read {
                collection: Collection::People,
                ..
            } => "Failed to load people.".to_string(),
            DirectoryError::Read {
                collection: Collection::Organizations,
                ..
            } => "Failed to load organizations.".to_string(),
            DirectoryError::Save { operation, .. } => format!("Failed to {operation}."),
            DirectoryError::BatchUpdate { .. } => "Partial update failed.".to_string(),
            DirectoryError::ImportParse(_) => "CSV empty/invalid.".to_string(),
            DirectoryError::FileRead { .. } => "Failed to read file.".to_string(),
            DirectoryError::FileWrite { .. } => "Failed to write file.".to_string(),
            DirectoryError::InvalidInput(message) => message.clone(),
        };
        Self::error(message)
    }
}
