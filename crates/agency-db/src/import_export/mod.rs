//! # CSV Import / Export
//!
//! Spreadsheet-friendly exchange of catalogue, stock, sales and customers.
//!
//! ## Import Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CSV text                                                               │
//! │    │  csv::Reader (header = line 1)                                     │
//! │    ▼                                                                    │
//! │  line 2: ProductRecord ──parse──► ProductRow ──BEGIN … COMMIT──► ✓     │
//! │  line 3: ProductRecord ──parse──► ✗ RowError { line: 3, … }             │
//! │  line 4: ProductRecord ──parse──► ProductRow ──BEGIN … COMMIT──► ✓     │
//! │    │                                                                    │
//! │    ▼                                                                    │
//! │  ImportReport { created, updated, errors }                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each data row commits on its own: a bad row is reported with its line
//! number and never undoes the rows around it.
//!
//! Records are parsed up front so no `csv::Reader` is held across an
//! `.await`.

mod export;
mod import;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{DbError, DbResult};
use crate::pool::Database;

/// Reference written on ledger rows created by imports.
pub const IMPORT_REFERENCE: &str = "CSV import";

/// CSV exchange bound to a database.
#[derive(Debug, Clone)]
pub struct CsvExchange {
    db: Database,
}

impl CsvExchange {
    pub fn new(db: Database) -> Self {
        CsvExchange { db }
    }
}

/// Serializes records under `headers`. The header row is written even
/// when there are no records.
fn write_records<T, I>(headers: &[&str], records: I) -> DbResult<String>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(headers)?;
    for record in records {
        writer.serialize(record)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| DbError::Csv(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| DbError::Internal(e.to_string()))
}

/// A data row: its 1-based line number and the decoded record.
type ParsedRow<T> = (u64, Result<T, String>);

/// Reads every data row, checking the header for `required` columns first.
///
/// A missing column fails the whole file; a row that can't be decoded is
/// returned as an error for that line only.
fn read_records<T>(data: &str, required: &[&str]) -> DbResult<Vec<ParsedRow<T>>>
where
    T: DeserializeOwned,
{
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(data.as_bytes());

    let headers = reader.headers()?.clone();
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|column| !headers.iter().any(|h| h == *column))
        .collect();
    if !missing.is_empty() {
        return Err(DbError::Csv(format!("missing columns: {}", missing.join(", "))));
    }

    let mut rows = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let fallback_line = index as u64 + 2;
        match result {
            Ok(record) => {
                let line = record
                    .position()
                    .map(|p| p.line())
                    .unwrap_or(fallback_line);
                if record.iter().all(str::is_empty) {
                    continue;
                }
                let parsed = record
                    .deserialize::<T>(Some(&headers))
                    .map_err(|e| e.to_string());
                rows.push((line, parsed));
            }
            Err(e) => {
                let line = e
                    .position()
                    .map(|p| p.line())
                    .unwrap_or(fallback_line);
                rows.push((line, Err(e.to_string())));
            }
        }
    }

    Ok(rows)
}
