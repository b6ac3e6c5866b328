use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use csv::ByteRecord;
use encoding_rs::WINDOWS_1252;
use thiserror::Error;

use crate::row::{Row, RowTable};

/// Options controlling how a delimited upload is read.
#[derive(Clone, Debug)]
pub struct CsvOptions {
    pub delimiter: u8,
    /// Whether the first record is a header row. Every pipeline entry point
    /// requires a header; `false` exists for intermediate artifacts whose
    /// schema is carried out of band.
    pub has_header: bool,
    /// How to decode raw CSV bytes into text fields.
    pub encoding: CsvTextEncoding,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_header: true,
            encoding: CsvTextEncoding::Auto,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CsvTextEncoding {
    /// Attempt to decode as UTF-8; if a field contains invalid UTF-8, fall back to Windows-1252.
    ///
    /// This matches common Excel behavior when exporting CSV files on Windows.
    Auto,
    /// Decode as UTF-8 and reject invalid byte sequences.
    Utf8,
    /// Decode as Windows-1252 (aka CP-1252).
    Windows1252,
}

#[derive(Debug, Error)]
pub enum CsvImportError {
    #[error("csv input was empty")]
    EmptyInput,
    #[error("csv parse error at row {row}, column {column}: {reason}")]
    Parse { row: u64, column: u64, reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Import a CSV stream into a [`RowTable`].
///
/// Records shorter than the header are padded with empty fields so a row's
/// value count always matches the column count; records longer than the
/// header widen the table with synthesized `ColumnN` names.
pub fn import_csv_rows<R: BufRead>(
    reader: R,
    options: CsvOptions,
) -> Result<RowTable, CsvImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        // Headers are handled manually so row numbers in errors stay consistent.
        .has_headers(false)
        // Accept rows with varying column counts.
        .flexible(true)
        .from_reader(reader);

    let mut record = ByteRecord::new();
    let mut record_index: u64 = 0;

    let has_first = csv_reader
        .read_byte_record(&mut record)
        .map_err(|e| map_csv_error(e, record_index + 1))?;
    if !has_first {
        return Err(CsvImportError::EmptyInput);
    }
    record_index += 1;

    let mut columns: Vec<String> = Vec::new();
    let mut raw_rows: Vec<Vec<String>> = Vec::new();

    if options.has_header {
        columns = decode_record_to_strings(&record, record_index, options.encoding)?;
    } else {
        raw_rows.push(decode_record_to_strings(
            &record,
            record_index,
            options.encoding,
        )?);
    }

    loop {
        record.clear();
        match csv_reader.read_byte_record(&mut record) {
            Ok(false) => break,
            Ok(true) => {
                record_index += 1;
                raw_rows.push(decode_record_to_strings(
                    &record,
                    record_index,
                    options.encoding,
                )?);
            }
            Err(e) => return Err(map_csv_error(e, record_index + 1)),
        }
    }

    let mut column_count = columns.len();
    for row in &raw_rows {
        column_count = column_count.max(row.len());
    }
    if column_count == 0 {
        column_count = 1;
    }

    if columns.len() < column_count {
        columns.extend((columns.len()..column_count).map(|i| format!("Column{}", i + 1)));
    }

    let rows = raw_rows
        .into_iter()
        .enumerate()
        .map(|(source_index, mut values)| {
            if values.len() < column_count {
                values.resize(column_count, String::new());
            }
            Row::new(source_index, values)
        })
        .collect();

    Ok(RowTable::new(columns, rows))
}

/// Convenience: read a CSV file from disk.
pub fn read_csv_file(
    path: impl AsRef<Path>,
    options: CsvOptions,
) -> Result<RowTable, CsvImportError> {
    let file = File::open(path)?;
    import_csv_rows(BufReader::new(file), options)
}

fn decode_record_to_strings(
    record: &ByteRecord,
    row: u64,
    encoding: CsvTextEncoding,
) -> Result<Vec<String>, CsvImportError> {
    if record.len() == 0 {
        return Ok(vec![String::new()]);
    }

    let mut out = Vec::with_capacity(record.len());
    for (idx, field) in record.iter().enumerate() {
        let s = decode_field(field, row, idx as u64 + 1, encoding)?;
        out.push(s.into_owned());
    }
    Ok(out)
}

fn decode_field<'a>(
    field: &'a [u8],
    row: u64,
    column: u64,
    encoding: CsvTextEncoding,
) -> Result<Cow<'a, str>, CsvImportError> {
    // Handle UTF-8 BOM at the start of the file. This commonly appears in Excel-exported CSVs.
    let field = if row == 1 && column == 1 && field.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &field[3..]
    } else {
        field
    };

    match encoding {
        CsvTextEncoding::Utf8 => std::str::from_utf8(field)
            .map(Cow::Borrowed)
            .map_err(|e| CsvImportError::Parse {
                row,
                column,
                reason: format!("invalid UTF-8: {e}"),
            }),
        CsvTextEncoding::Windows1252 => {
            let (cow, _, _) = WINDOWS_1252.decode(field);
            Ok(cow)
        }
        CsvTextEncoding::Auto => match std::str::from_utf8(field) {
            Ok(s) => Ok(Cow::Borrowed(s)),
            Err(_) => {
                let (cow, _, _) = WINDOWS_1252.decode(field);
                Ok(cow)
            }
        },
    }
}

fn map_csv_error(err: csv::Error, fallback_row: u64) -> CsvImportError {
    let reason = err.to_string();
    let pos = err.position().cloned();

    match err.into_kind() {
        csv::ErrorKind::Io(e) => CsvImportError::Io(e),
        _ => {
            let row = pos
                .map(|p| p.record())
                .filter(|r| *r > 0)
                .unwrap_or(fallback_row);
            CsvImportError::Parse {
                row,
                column: 0,
                reason,
            }
        }
    }
}
