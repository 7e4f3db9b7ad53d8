//! Ordered schema scripts for the document database.
//!
//! Scripts are embedded at build time and applied in one transaction, each
//! followed by a `user_version` bump, so a failed run leaves the previous
//! version intact.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

/// (version, script). Versions must stay strictly increasing.
const SCRIPTS: &[(u32, &str)] = &[(1, include_str!("0001_documents.sql"))];

/// Returns the newest schema version this build can open.
pub fn latest_version() -> u32 {
    SCRIPTS.last().map_or(0, |&(version, _)| version)
}

/// Brings `conn` up to [`latest_version`].
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the file is newer than this build.
/// - `Migration` naming the first script that failed.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let current = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    let latest = latest_version();
    if current > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current,
            latest_supported: latest,
        });
    }

    let pending = SCRIPTS
        .iter()
        .filter(|&&(version, _)| version > current)
        .collect::<Vec<_>>();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for &&(version, script) in &pending {
        tx.execute_batch(script)
            .and_then(|()| tx.pragma_update(None, "user_version", version))
            .map_err(|source| DbError::Migration { version, source })?;
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={current} to_version={latest} applied={}",
        pending.len()
    );
    Ok(())
}
