//! Upload side of the pipeline: bytes → [`RawTable`] → [`ValidatedTable`].

pub mod convert;
pub mod decode;
pub mod header;
pub mod raw_table;
pub mod validate;

pub use decode::{read_table, Encoding};
pub use header::{normalize_header, REQUIRED_COLUMNS};
pub use raw_table::RawTable;
pub use validate::{
    normalize_and_validate, CoordinateSet, RowDefect, ValidateOptions, ValidatedRow,
    ValidatedTable, ValidationReport,
};
