use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::lookup::LookupEntry;
use crate::row::RowTable;

/// Write a row table back out as CSV with its header row.
///
/// This is the artifact format handed between the resolution phase and the
/// path-assignment phase; re-importing the output with
/// [`crate::import_csv_rows`] reproduces the table (source indices are
/// renumbered by the re-import).
pub fn write_rows<W: Write>(writer: W, table: &RowTable) -> Result<(), csv::Error> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(table.columns())?;
    for row in table.rows() {
        out.write_record(row.values())?;
    }
    out.flush()?;
    Ok(())
}

/// Write a row table to a file on disk.
pub fn write_rows_file(path: impl AsRef<Path>, table: &RowTable) -> Result<(), csv::Error> {
    let file = File::create(path)?;
    write_rows(file, table)
}

/// Write finished lookup entries as CSV with the fixed
/// `Name, Formula, Formula Parameters, Parent Path` header.
pub fn write_lookup_entries<W: Write>(
    writer: W,
    entries: &[LookupEntry],
) -> Result<(), csv::Error> {
    let mut out = csv::Writer::from_writer(writer);
    for entry in entries {
        out.serialize(entry)?;
    }
    // `serialize` only emits the header once a record is written; keep the
    // header present for an empty batch too.
    if entries.is_empty() {
        out.write_record(crate::lookup::LOOKUP_COLUMNS)?;
    }
    out.flush()?;
    Ok(())
}

/// Write finished lookup entries to a file on disk.
pub fn write_lookup_file(
    path: impl AsRef<Path>,
    entries: &[LookupEntry],
) -> Result<(), csv::Error> {
    let file = File::create(path)?;
    write_lookup_entries(file, entries)
}
