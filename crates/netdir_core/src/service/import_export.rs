//! CSV import/export for people and organizations.
//!
//! # Responsibility
//! - Define the people/organization CSV column layouts.
//! - Map parsed rows to records with write-path defaults applied.
//! - Persist each import as a single batch.
//!
//! # Invariants
//! - Row-level problems skip the row with a diagnostic; they never fail the
//!   file unless no row is usable.
//! - Organization names in people CSVs resolve case-insensitively; an
//!   unresolved name keeps the CSV text with an empty organization id.
//! - Malformed `Rooms Data (JSON)` yields an empty room list for that row.

use crate::csv::{parse_csv, serialize_records, CsvColumn, CsvRecord, CsvTable};
use crate::model::color_grade::ColorGrade;
use crate::model::organization::{rooms_from_loose_value, Organization, Room};
use crate::model::person::{OrganizationMembership, Person};
use crate::model::{now_timestamp, EntityId};
use crate::repo::document_store::{Collection, DocumentStore, WriteBatch};
use crate::service::error::{DirectoryError, DirectoryResult};
use crate::service::records::{
    encode_organization, encode_person, load_organizations, load_people,
};
use log::{error, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::{Display, Formatter};
use std::path::Path;

pub const FIRST_NAME: &str = "First Name";
pub const MIDDLE_NAME: &str = "Middle Name";
pub const LAST_NAME: &str = "Last Name";
pub const COLOR_GRADE: &str = "Color Grade";
pub const ORGANIZATION_NAME: &str = "Organization Name";
pub const ORGANIZATION_TITLE: &str = "Organization Title";
pub const PHOTO: &str = "Photo";
pub const PHONE: &str = "Phone 1 - Value";
pub const EMAIL: &str = "Email 1 - Value";

pub const ORG_ID: &str = "ID";
pub const ORG_NAME: &str = "Name";
pub const ORG_ADDRESS: &str = "Address";
pub const ORG_WEBSITE: &str = "Website";
pub const ORG_PHONE: &str = "Phone";
pub const ORG_LOGO_URL: &str = "Logo URL";
pub const ORG_ROOMS: &str = "Rooms Data (JSON)";

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Why an input row was not imported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The CSV reader found fewer fields than headers.
    FieldCountMismatch { expected: usize, found: usize },
    /// The reconstructed person name or organization `Name` is empty.
    MissingName,
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FieldCountMismatch { expected, found } => {
                write!(f, "expected {expected} fields, found {found}")
            }
            Self::MissingName => f.write_str("missing name"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    pub line_number: usize,
    pub reason: SkipReason,
}

/// Outcome of one import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub imported_ids: Vec<EntityId>,
    /// Rows skipped by the reader or by validation, ordered by line.
    pub skipped: Vec<SkippedRow>,
    /// Organization names in a people import that matched no organization.
    pub unresolved_organizations: Vec<String>,
}

impl ImportReport {
    pub fn imported(&self) -> usize {
        self.imported_ids.len()
    }
}

/// People CSV layout, in file order.
pub fn people_columns() -> Vec<CsvColumn<Person>> {
    vec![
        CsvColumn::new(FIRST_NAME, |p: &Person| Some(split_person_name(&p.name).0)),
        CsvColumn::new(MIDDLE_NAME, |p: &Person| Some(split_person_name(&p.name).1)),
        CsvColumn::new(LAST_NAME, |p: &Person| Some(split_person_name(&p.name).2)),
        CsvColumn::new(COLOR_GRADE, |p: &Person| Some(p.color_grade.key().to_string())),
        CsvColumn::new(ORGANIZATION_NAME, |p: &Person| {
            p.first_membership().map(|m| m.organization_name.clone())
        }),
        CsvColumn::new(ORGANIZATION_TITLE, |p: &Person| {
            p.first_membership().map(|m| m.title_in_org.clone())
        }),
        CsvColumn::new(PHOTO, |p: &Person| Some(p.photo_url.clone())),
        CsvColumn::new(PHONE, |p: &Person| Some(p.phone.clone())),
        CsvColumn::new(EMAIL, |p: &Person| Some(p.email.clone())),
    ]
}

/// Organization CSV layout, in file order.
pub fn organization_columns() -> Vec<CsvColumn<Organization>> {
    vec![
        CsvColumn::new(ORG_ID, |o: &Organization| Some(o.id.clone())),
        CsvColumn::new(ORG_NAME, |o: &Organization| Some(o.name.clone())),
        CsvColumn::new(ORG_ADDRESS, |o: &Organization| Some(o.address.clone())),
        CsvColumn::new(ORG_WEBSITE, |o: &Organization| Some(o.website.clone())),
        CsvColumn::new(ORG_PHONE, |o: &Organization| Some(o.phone.clone())),
        CsvColumn::new(ORG_LOGO_URL, |o: &Organization| Some(o.logo_url.clone())),
        CsvColumn::new(COLOR_GRADE, |o: &Organization| {
            Some(o.color_grade.key().to_string())
        }),
        CsvColumn::new(ORG_ROOMS, |o: &Organization| {
            Some(serde_json::to_string(&o.rooms).unwrap_or_else(|_| "[]".to_string()))
        }),
    ]
}

/// Splits a full name into (first, middle, last) on whitespace.
///
/// One token is a first name only; middle collects every token between the
/// first and the last.
pub fn split_person_name(name: &str) -> (String, String, String) {
    let tokens = name.split_whitespace().collect::<Vec<_>>();
    match tokens.as_slice() {
        [] => (String::new(), String::new(), String::new()),
        [first] => (first.to_string(), String::new(), String::new()),
        [first, middle @ .., last] => (first.to_string(), middle.join(" "), last.to_string()),
    }
}

/// Rejoins name parts with single spaces, collapsing whitespace runs.
pub fn join_person_name(first: &str, middle: &str, last: &str) -> String {
    let joined = format!("{first} {middle} {last}");
    WHITESPACE_RE.replace_all(&joined, " ").trim().to_string()
}

/// Builds a person from one people-CSV row.
///
/// `Organization Title` fills both the overall title and the membership
/// title.
pub fn person_from_record(
    record: &CsvRecord,
    organizations: &[Organization],
) -> Result<Person, SkipReason> {
    let name = join_person_name(
        record.get(FIRST_NAME),
        record.get(MIDDLE_NAME),
        record.get(LAST_NAME),
    );
    if name.is_empty() {
        return Err(SkipReason::MissingName);
    }

    let title = record.get(ORGANIZATION_TITLE);
    let mut person = Person {
        name,
        photo_url: record.get(PHOTO).to_string(),
        email: record.get(EMAIL).to_string(),
        phone: record.get(PHONE).to_string(),
        overall_title: title.to_string(),
        color_grade: grade_from_cell(record, record.get(COLOR_GRADE)),
        ..Person::default()
    };

    let organization_name = record.get(ORGANIZATION_NAME);
    if !organization_name.is_empty() {
        let membership = match find_organization_by_name(organizations, organization_name) {
            Some(organization) => {
                OrganizationMembership::new(organization.id.clone(), organization.name.clone(), title)
            }
            None => OrganizationMembership::new(String::new(), organization_name, title),
        };
        person.organization_memberships.push(membership);
    }

    Ok(person)
}

/// Builds an organization from one organization-CSV row.
///
/// The `ID` column is informational; the import assigns new ids.
pub fn organization_from_record(record: &CsvRecord) -> Result<Organization, SkipReason> {
    let name = record.get(ORG_NAME);
    if name.is_empty() {
        return Err(SkipReason::MissingName);
    }

    Ok(Organization {
        name: name.to_string(),
        address: record.get(ORG_ADDRESS).to_string(),
        website: record.get(ORG_WEBSITE).to_string(),
        phone: record.get(ORG_PHONE).to_string(),
        logo_url: record.get(ORG_LOGO_URL).to_string(),
        color_grade: grade_from_cell(record, record.get(COLOR_GRADE)),
        rooms: rooms_from_cell(record, record.get(ORG_ROOMS)),
        ..Organization::default()
    })
}

/// Case-insensitive exact match on organization name.
pub fn find_organization_by_name<'a>(
    organizations: &'a [Organization],
    name: &str,
) -> Option<&'a Organization> {
    let wanted = name.to_lowercase();
    organizations
        .iter()
        .find(|organization| organization.name.to_lowercase() == wanted)
}

fn grade_from_cell(record: &CsvRecord, cell: &str) -> ColorGrade {
    if cell.is_empty() {
        return ColorGrade::default();
    }
    ColorGrade::parse(cell).unwrap_or_else(|| {
        warn!(
            "event=csv_grade_unknown module=import status=defaulted line={}",
            record.line_number
        );
        ColorGrade::default()
    })
}

fn rooms_from_cell(record: &CsvRecord, cell: &str) -> Vec<Room> {
    if cell.is_empty() {
        return Vec::new();
    }
    let rooms = serde_json::from_str::<serde_json::Value>(cell)
        .ok()
        .and_then(|value| rooms_from_loose_value(&value));
    rooms.unwrap_or_else(|| {
        warn!(
            "event=csv_rooms_invalid module=import status=defaulted line={}",
            record.line_number
        );
        Vec::new()
    })
}

/// CSV import/export facade over an injected document store.
pub struct ImportExportService<S: DocumentStore> {
    store: S,
}

impl<S: DocumentStore> ImportExportService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn export_people_csv(&self) -> DirectoryResult<String> {
        let people = load_people(&self.store)?;
        let text = serialize_records(&people, &people_columns());
        info!(
            "event=csv_export module=import kind=people status=ok rows={}",
            people.len()
        );
        Ok(text)
    }

    pub fn export_organizations_csv(&self) -> DirectoryResult<String> {
        let organizations = load_organizations(&self.store)?;
        let text = serialize_records(&organizations, &organization_columns());
        info!(
            "event=csv_export module=import kind=organizations status=ok rows={}",
            organizations.len()
        );
        Ok(text)
    }

    /// Imports people, resolving organization names against the current
    /// organizations.
    pub fn import_people_csv(&self, text: &str) -> DirectoryResult<ImportReport> {
        let table = parse_non_empty(text, "people")?;
        let organizations = load_organizations(&self.store)?;
        let created_at = now_timestamp();

        let mut report = ImportReport {
            skipped: reader_skips(&table),
            ..ImportReport::default()
        };
        let mut batch = WriteBatch::new();
        for record in &table.records {
            let mut person = match person_from_record(record, &organizations) {
                Ok(person) => person,
                Err(reason) => {
                    skip_row(&mut report, "people", record, reason);
                    continue;
                }
            };
            if let Some(membership) = person
                .organization_memberships
                .iter()
                .find(|membership| !membership.is_resolved())
            {
                warn!(
                    "event=csv_org_unresolved module=import status=cached_name line={}",
                    record.line_number
                );
                report
                    .unresolved_organizations
                    .push(membership.organization_name.clone());
            }
            person.created_at = created_at.clone();
            let data = encode_person(&person).map_err(|source| DirectoryError::Save {
                operation: "import people",
                source,
            })?;
            report
                .imported_ids
                .push(batch.set(Collection::People, None, data));
        }

        self.commit_import("people", batch, report)
    }

    pub fn import_organizations_csv(&self, text: &str) -> DirectoryResult<ImportReport> {
        let table = parse_non_empty(text, "organizations")?;
        let created_at = now_timestamp();

        let mut report = ImportReport {
            skipped: reader_skips(&table),
            ..ImportReport::default()
        };
        let mut batch = WriteBatch::new();
        for record in &table.records {
            let mut organization = match organization_from_record(record) {
                Ok(organization) => organization,
                Err(reason) => {
                    skip_row(&mut report, "organizations", record, reason);
                    continue;
                }
            };
            organization.created_at = created_at.clone();
            let data = encode_organization(&organization).map_err(|source| {
                DirectoryError::Save {
                    operation: "import organizations",
                    source,
                }
            })?;
            report
                .imported_ids
                .push(batch.set(Collection::Organizations, None, data));
        }

        self.commit_import("organizations", batch, report)
    }

    pub fn import_people_file(&self, path: impl AsRef<Path>) -> DirectoryResult<ImportReport> {
        let text = read_text(path.as_ref())?;
        self.import_people_csv(&text)
    }

    pub fn import_organizations_file(
        &self,
        path: impl AsRef<Path>,
    ) -> DirectoryResult<ImportReport> {
        let text = read_text(path.as_ref())?;
        self.import_organizations_csv(&text)
    }

    pub fn export_people_file(&self, path: impl AsRef<Path>) -> DirectoryResult<()> {
        let text = self.export_people_csv()?;
        write_text(path.as_ref(), &text)
    }

    pub fn export_organizations_file(&self, path: impl AsRef<Path>) -> DirectoryResult<()> {
        let text = self.export_organizations_csv()?;
        write_text(path.as_ref(), &text)
    }

    fn commit_import(
        &self,
        kind: &'static str,
        batch: WriteBatch,
        mut report: ImportReport,
    ) -> DirectoryResult<ImportReport> {
        report.skipped.sort_by_key(|skipped| skipped.line_number);
        if batch.is_empty() {
            error!(
                "event=csv_import module=import kind={kind} status=error imported=0 skipped={}",
                report.skipped.len()
            );
            return Err(DirectoryError::ImportParse(format!(
                "no valid {kind} rows ({} skipped)",
                report.skipped.len()
            )));
        }

        let operation = if kind == "people" {
            "import people"
        } else {
            "import organizations"
        };
        self.store
            .commit(batch)
            .map_err(|source| DirectoryError::Save { operation, source })?;
        info!(
            "event=csv_import module=import kind={kind} status=ok imported={} skipped={}",
            report.imported(),
            report.skipped.len()
        );
        Ok(report)
    }
}

fn parse_non_empty(text: &str, kind: &str) -> DirectoryResult<CsvTable> {
    let table = parse_csv(text);
    if table.headers.is_empty() {
        return Err(DirectoryError::ImportParse(format!("{kind} CSV is empty")));
    }
    Ok(table)
}

fn reader_skips(table: &CsvTable) -> Vec<SkippedRow> {
    table
        .rejected
        .iter()
        .map(|rejected| SkippedRow {
            line_number: rejected.line_number,
            reason: SkipReason::FieldCountMismatch {
                expected: rejected.expected_fields,
                found: rejected.found_fields,
            },
        })
        .collect()
}

fn skip_row(report: &mut ImportReport, kind: &str, record: &CsvRecord, reason: SkipReason) {
    warn!(
        "event=csv_row_skipped module=import kind={kind} status=skipped line={} reason={reason}",
        record.line_number
    );
    report.skipped.push(SkippedRow {
        line_number: record.line_number,
        reason,
    });
}

fn read_text(path: &Path) -> DirectoryResult<String> {
    std::fs::read_to_string(path).map_err(|source| DirectoryError::FileRead {
        path: path.to_path_buf(),
        source,
    })
}

fn write_text(path: &Path, text: &str) -> DirectoryResult<()> {
    std::fs::write(path, text).map_err(|source| DirectoryError::FileWrite {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::{join_person_name, split_person_name};

    #[test]
    fn split_handles_one_two_and_many_tokens() {
        assert_eq!(
            split_person_name("Cher"),
            ("Cher".to_string(), String::new(), String::new())
        );
        assert_eq!(
            split_person_name("Ada Lovelace"),
            ("Ada".to_string(), String::new(), "Lovelace".to_string())
        );
        assert_eq!(
            split_person_name("Juan Carlos de la Vega"),
            (
                "Juan".to_string(),
                "Carlos de la".to_string(),
                "Vega".to_string()
            )
        );
    }

    #[test]
    fn join_collapses_whitespace() {
        assert_eq!(join_person_name("Ada", "", "Lovelace"), "Ada Lovelace");
        assert_eq!(join_person_name("", "", ""), "");
        assert_eq!(join_person_name(" Ada ", "  B ", "C"), "Ada B C");
    }
}
