use thiserror::Error;

/// A required field of one spreadsheet row could not be coerced to its type.
///
/// `row` is the 1-based spreadsheet row number, so the header is row 1 and
/// the first record is row 2.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("row {row}, column {column}: {reason} (value: {value:?})")]
pub struct ParseError {
    pub row: usize,
    pub column: &'static str,
    pub value: String,
    pub reason: String,
}

impl ParseError {
    pub fn new(row: usize, column: &'static str, value: impl Into<String>, reason: impl Into<String>) -> Self {
        ParseError {
            row,
            column,
            value: value.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XLSX read error: {0}")]
    Xlsx(#[from] calamine::XlsxError),

    #[error("CSV read error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Workbook contains no sheets")]
    NoSheets,

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("Invalid date bound: {0:?}")]
    InvalidDate(String),

    #[error("Unknown filter: {0:?}")]
    UnknownKey(String),

    #[error("Expected key=value, got {0:?}")]
    MalformedArgument(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregateError {
    #[error("{reduction} overflowed")]
    Overflow { reduction: &'static str },
}

/// Failure while answering one dashboard request
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DashboardError {
    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}
