//! Organism roster input parsing
//!
//! Reads and validates the input CSV before any network traffic: a
//! malformed record is reported with its 1-based line number and aborts the
//! run with no partial output.

use std::path::Path;

use crate::Organism;

/// Required input header columns.
pub const REQUIRED_COLUMNS: [&str; 2] = ["organism_scientific_name", "organism_id"];

/// Input roster errors
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    /// The header is missing required columns
    #[error(
        "input CSV missing required columns: {}. Found columns: {}",
        missing.join(", "),
        found.join(", ")
    )]
    MissingColumns {
        /// Required columns absent from the header, sorted.
        missing: Vec<String>,
        /// The columns the header actually had.
        found: Vec<String>,
    },

    /// A data row failed validation
    #[error("input CSV row {line}: {reason}")]
    InvalidRow {
        /// 1-based line number (the header is line 1).
        line: usize,
        /// What was wrong with the row.
        reason: String,
    },

    /// The file could not be read or parsed as CSV
    #[error("failed to read input CSV: {0}")]
    Io(String),
}

/// Read and validate the full organism roster.
///
/// Every record must have a non-empty `organism_scientific_name` and an
/// integer `organism_id`; the first violation aborts with its line number.
pub fn read_organisms(path: &Path) -> Result<Vec<Organism>, InputError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| InputError::Io(e.to_string()))?;

    let headers = reader
        .headers()
        .map_err(|e| InputError::Io(e.to_string()))?
        .clone();
    let found: Vec<String> = headers.iter().map(String::from).collect();

    let name_index = headers.iter().position(|h| h == REQUIRED_COLUMNS[0]);
    let id_index = headers.iter().position(|h| h == REQUIRED_COLUMNS[1]);

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .zip([name_index, id_index])
        .filter(|(_, index)| index.is_none())
        .map(|(column, _)| column.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(InputError::MissingColumns { missing, found });
    }
    let (name_index, id_index) = (name_index.unwrap_or(0), id_index.unwrap_or(0));

    let mut organisms = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let line = i + 2; // header is line 1
        let record = record.map_err(|e| InputError::InvalidRow {
            line,
            reason: e.to_string(),
        })?;

        let name = record.get(name_index).unwrap_or("").trim();
        let id_raw = record.get(id_index).unwrap_or("").trim();

        if name.is_empty() {
            return Err(InputError::InvalidRow {
                line,
                reason: "organism_scientific_name must be non-empty".to_string(),
            });
        }
        if id_raw.is_empty() {
            return Err(InputError::InvalidRow {
                line,
                reason: "organism_id must be non-empty".to_string(),
            });
        }

        let organism_id = id_raw.parse::<i64>().map_err(|_| InputError::InvalidRow {
            line,
            reason: format!("organism_id must be an integer taxonomy id, got: {id_raw}"),
        })?;

        organisms.push(Organism {
            scientific_name: name.to_string(),
            organism_id,
        });
    }

    Ok(organisms)
}
