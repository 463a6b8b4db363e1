//! `word,frequency` record files.
//!
//! One headerless record per line. Fields containing a comma, a double quote, or a line
//! break are quoted by the `csv` writer with inner quotes doubled.

use std::io::{Read, Write};

use csv::{ReaderBuilder, StringRecord, WriterBuilder};

use crate::error::{FreqError, Result};
use crate::rank::RankedEntry;

/// Writes one `word,frequency` record per entry.
pub fn write_csv<W: Write>(writer: &mut W, entries: &[RankedEntry]) -> Result<()> {
    let mut records = WriterBuilder::new().has_headers(false).from_writer(writer);
    for entry in entries {
        records.serialize(entry)?;
    }
    records.flush().map_err(|err| FreqError::io(err, None))
}

/// Reads every record of a `word,frequency` file, preserving file order.
///
/// Blank lines are skipped. A record with the wrong number of fields or a frequency that
/// is not an unsigned integer fails with [`FreqError::Record`] naming its 1-based line.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<RankedEntry>> {
    let mut records = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut entries = Vec::new();
    let mut record = StringRecord::new();
    while records.read_record(&mut record)? {
        let line = record.position().map_or(0, |pos| pos.line() as usize);
        if record.len() != 2 {
            return Err(FreqError::Record {
                line,
                message: format!("expected 2 fields, found {}", record.len()),
            });
        }
        let entry = record
            .deserialize::<RankedEntry>(None)
            .map_err(|err| FreqError::Record {
                line,
                message: match err.kind() {
                    csv::ErrorKind::Deserialize { err, .. } => err.to_string(),
                    _ => err.to_string(),
                },
            })?;
        entries.push(entry);
    }
    Ok(entries)
}
