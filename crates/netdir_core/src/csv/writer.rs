//! CSV serialization through ordered column specs.

use std::borrow::Cow;

/// One output column: header text plus a value accessor.
///
/// Accessors return `None` for absent values, which serialize as an empty
/// field.
pub struct CsvColumn<T> {
    pub header: &'static str,
    accessor: fn(&T) -> Option<String>,
}

impl<T> CsvColumn<T> {
    pub const fn new(header: &'static str, accessor: fn(&T) -> Option<String>) -> Self {
        Self { header, accessor }
    }

    pub fn value(&self, record: &T) -> Option<String> {
        (self.accessor)(record)
    }
}

/// Quotes a field when it contains `"`, `,`, or a line break; internal
/// quotes are doubled.
pub fn escape_field(value: &str) -> Cow<'_, str> {
    if value.contains(['"', ',', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// Serializes records to CSV: header line, then one line per record, joined
/// with `\n` and no trailing newline.
pub fn serialize_records<T>(records: &[T], columns: &[CsvColumn<T>]) -> String {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(
        columns
            .iter()
            .map(|column| escape_field(column.header))
            .collect::<Vec<_>>()
            .join(","),
    );

    for record in records {
        let fields = columns
            .iter()
            .map(|column| match column.value(record) {
                Some(value) => escape_field(&value).into_owned(),
                None => String::new(),
            })
            .collect::<Vec<_>>();
        lines.push(fields.join(","));
    }

    lines.join("\n")
}
