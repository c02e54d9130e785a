/*!
# CSV Validation & I/O

Reading, writing, and consistency checks for roster files.
*/

use crate::{
    errors::{CsvError, CsvResult},
    schemas::{RosterRow, ROSTER_CSV_HEADERS},
};
use csv::{Reader, Writer};
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

/// Read and validate a roster CSV file
pub fn read_roster_csv<P: AsRef<Path>>(path: P) -> CsvResult<Vec<RosterRow>> {
    let file = File::open(path)?;
    let mut rdr = Reader::from_reader(file);

    // Validate headers
    let headers = rdr.headers()?;
    validate_headers(headers.iter(), ROSTER_CSV_HEADERS, "roster.csv")?;

    // Read and deserialize rows
    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let row: RosterRow = result?;
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(CsvError::SchemaValidation(
            "Roster CSV file is empty".to_string(),
        ));
    }

    Ok(rows)
}

/// Write a roster CSV with proper headers
pub fn write_roster_csv<P: AsRef<Path>>(path: P, rows: &[RosterRow]) -> CsvResult<()> {
    let file = File::create(path)?;
    let mut wtr = Writer::from_writer(file);

    // Write data rows (csv crate automatically writes headers)
    for row in rows {
        wtr.serialize(row)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Validate a roster before import
///
/// Ensures no wallet address appears twice; a duplicate is ambiguous intent
/// (two different amounts?) and must be resolved in the file, not guessed at.
pub fn validate_roster(rows: &[RosterRow]) -> CsvResult<()> {
    let mut seen = HashSet::new();

    for row in rows {
        if !seen.insert(row.wallet_address) {
            return Err(CsvError::DuplicateAddress(row.wallet_address.to_string()));
        }
    }

    Ok(())
}

fn validate_headers<'a, I>(actual: I, expected: &[&str], file_type: &str) -> CsvResult<()>
where
    I: Iterator<Item = &'a str>,
{
    let actual_headers: Vec<&str> = actual.collect();

    if actual_headers.len() != expected.len() {
        return Err(CsvError::SchemaValidation(format!(
            "{}: expected {} headers, found {}",
            file_type,
            expected.len(),
            actual_headers.len()
        )));
    }

    for (i, (actual, expected)) in actual_headers.iter().zip(expected.iter()).enumerate() {
        if actual != expected {
            return Err(CsvError::SchemaValidation(format!(
                "{}: header {} should be '{}', found '{}'",
                file_type,
                i + 1,
                expected,
                actual
            )));
        }
    }

    Ok(())
}
