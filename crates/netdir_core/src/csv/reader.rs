//! Quote-aware CSV parsing.
//!
//! This is a best-effort reader rather than a full CSV grammar. A `"` opens a
//! quoted section only at the start of a field (leading blanks allowed);
//! anywhere else it is a literal character. A quoted section left open runs
//! to the end of the input and is not recovered.

use log::warn;
use std::collections::HashMap;

/// One accepted data row keyed by header text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRecord {
    /// 1-based physical line where the row starts.
    pub line_number: usize,
    values: HashMap<String, String>,
}

impl CsvRecord {
    /// Returns the trimmed field for `header`, or `""` when the header is
    /// unknown.
    pub fn get(&self, header: &str) -> &str {
        self.values.get(header).map(String::as_str).unwrap_or("")
    }

    pub fn contains(&self, header: &str) -> bool {
        self.values.contains_key(header)
    }
}

/// Diagnostic for a data row dropped because it had too few fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RejectedRow {
    pub line_number: usize,
    pub expected_fields: usize,
    pub found_fields: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub records: Vec<CsvRecord>,
    pub rejected: Vec<RejectedRow>,
}

impl CsvTable {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Parses CSV text into headers and header-keyed records.
///
/// Rules:
/// - Lines end at `\n` or `\r\n` outside quoted fields.
/// - Empty input, or a blank first line, yields an empty table.
/// - Header tokens are trimmed and lose one surrounding quote pair.
/// - Data rows with fewer fields than headers are rejected and reported;
///   extra fields are ignored. Every kept field is trimmed.
/// - Blank lines produce no record.
pub fn parse_csv(text: &str) -> CsvTable {
    let lines = split_lines(text);
    let Some((_, header_line)) = lines.first() else {
        return CsvTable::default();
    };
    if header_line.trim().is_empty() {
        return CsvTable::default();
    }

    let headers = scan_fields(header_line)
        .into_iter()
        .map(|field| normalize_header(&field))
        .collect::<Vec<_>>();

    let mut records = Vec::new();
    let mut rejected = Vec::new();
    for (line_number, line) in lines.into_iter().skip(1) {
        if line.trim().is_empty() {
            continue;
        }

        let fields = scan_fields(line);
        if fields.len() < headers.len() {
            warn!(
                "event=csv_row_rejected module=csv status=skipped line={} expected_fields={} found_fields={}",
                line_number,
                headers.len(),
                fields.len()
            );
            rejected.push(RejectedRow {
                line_number,
                expected_fields: headers.len(),
                found_fields: fields.len(),
            });
            continue;
        }

        let values = headers
            .iter()
            .zip(fields)
            .map(|(header, field)| (header.clone(), field.trim().to_string()))
            .collect();
        records.push(CsvRecord {
            line_number,
            values,
        });
    }

    CsvTable {
        headers,
        records,
        rejected,
    }
}

/// Splits text into logical lines tagged with their starting line number.
fn split_lines(text: &str) -> Vec<(usize, &str)> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut line_number = 1;
    let mut start_line_number = 1;
    let mut in_quotes = false;
    let mut field_start = true;
    let mut chars = text.char_indices().peekable();

    while let Some((index, ch)) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if chars.peek().map(|&(_, next)| next) == Some('"') {
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if field_start => {
                in_quotes = true;
                field_start = false;
            }
            '\n' => {
                if !in_quotes {
                    lines.push((start_line_number, strip_cr(&text[start..index])));
                    start = index + 1;
                    start_line_number = line_number + 1;
                    field_start = true;
                }
                line_number += 1;
            }
            ',' if !in_quotes => field_start = true,
            _ if in_quotes || ch.is_whitespace() => {}
            _ => field_start = false,
        }
    }
    lines.push((start_line_number, strip_cr(&text[start..])));
    lines
}

fn strip_cr(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}

/// Splits one logical line into unescaped fields.
///
/// A quote at field start opens quoted mode and the next lone quote closes
/// it; `""` inside quotes emits a literal quote; commas split only outside
/// quotes. A trailing comma yields a final empty field.
fn scan_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut field_start = true;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if field_start => {
                in_quotes = true;
                field_start = false;
            }
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
                field_start = true;
            }
            _ => {
                if !in_quotes && !ch.is_whitespace() {
                    field_start = false;
                }
                current.push(ch);
            }
        }
    }
    fields.push(current);
    fields
}

fn normalize_header(field: &str) -> String {
    let trimmed = field.trim();
    let trimmed = trimmed.strip_prefix('"').unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix('"').unwrap_or(trimmed);
    trimmed.to_string()
}
