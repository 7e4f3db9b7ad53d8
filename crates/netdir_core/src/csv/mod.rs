//! CSV transcoder for directory import/export.
//!
//! # Responsibility
//! - Serialize records through an ordered column spec into CSV text.
//! - Parse CSV text into header-keyed records, skipping malformed rows.
//!
//! # Invariants
//! - Serialization introduces no data loss: `parse(serialize(x))` yields the
//!   same field values for values without leading/trailing whitespace.
//! - One malformed row never aborts the whole parse.
//! - Empty input parses to empty headers and no records.

mod reader;
mod writer;

pub use reader::{parse_csv, CsvRecord, CsvTable, RejectedRow};
pub use writer::{escape_field, serialize_records, CsvColumn};
