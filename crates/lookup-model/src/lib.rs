//! `lookup-model` defines the core data structures for the lookup pipeline.
//!
//! The crate is intentionally self-contained so it can be reused by:
//! - the resolution/compilation engine (`lookup-engine`)
//! - file-based artifact handoff between pipeline phases
//! - CLI and IPC boundaries via `serde` (JSON-safe schema)

mod export;
mod import;
mod lookup;
mod row;

pub use export::{write_lookup_entries, write_lookup_file, write_rows, write_rows_file};
pub use import::{import_csv_rows, read_csv_file, CsvImportError, CsvOptions, CsvTextEncoding};
pub use lookup::{
    join_path, lookup_name, split_path, LookupDraft, LookupEntry, EMPTY_PARAMETERS,
    LOOKUP_COLUMNS, PATH_SEPARATOR, ROOT_ASSET_PATH,
};
pub use row::{Row, RowTable, SchemaError};
