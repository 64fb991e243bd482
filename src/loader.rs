use crate::error::{LoadError, ParseError};
use crate::record::{CustomerId, Table, Transaction};
use calamine::{Data, Reader, Xlsx};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use log::{debug, info};
use rust_decimal::Decimal;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use std::str::FromStr;

pub const COL_DATE: &str = "Date";
pub const COL_COUNTRY: &str = "Pais";
pub const COL_CUSTOMER: &str = "IdCliente";
pub const COL_PRODUCT: &str = "Descripcion";
pub const COL_QUANTITY: &str = "Cantidad";
pub const COL_TOTAL: &str = "Total";

/// What to do with a row whose date cell has a value that is not a date
///
/// Empty date cells always drop the row; this only covers malformed values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DatePolicy {
    /// Fail the whole load with a `ParseError`
    #[default]
    Reject,
    /// Drop the row and count it in the `LoadReport`
    DropRow,
}

impl FromStr for DatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reject" => Ok(DatePolicy::Reject),
            "drop" | "droprow" | "drop_row" => Ok(DatePolicy::DropRow),
            other => Err(format!("unknown date policy: {}", other)),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub date_policy: DatePolicy,
}

/// Row accounting for one load
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub retained: usize,
    pub dropped_missing: usize,
    pub dropped_bad_date: usize,
}

#[derive(Debug)]
pub struct Loaded {
    pub table: Table,
    pub report: LoadReport,
}

/// Source-independent view of one cell
#[derive(Clone, Debug, PartialEq)]
enum RawCell {
    Empty,
    Text(String),
    Number(f64),
    /// Excel serial date (days since 1899-12-30, fraction is time of day)
    Serial(f64),
}

impl RawCell {
    fn from_text(s: &str) -> Self {
        if s.trim().is_empty() {
            RawCell::Empty
        } else {
            RawCell::Text(s.to_string())
        }
    }

    fn from_xlsx(data: &Data) -> Self {
        match data {
            Data::Empty => RawCell::Empty,
            Data::String(s) => RawCell::from_text(s),
            Data::Float(f) => RawCell::Number(*f),
            Data::Int(i) => RawCell::Number(*i as f64),
            Data::Bool(b) => RawCell::Text(b.to_string()),
            Data::DateTime(dt) => RawCell::Serial(dt.as_f64()),
            Data::DateTimeIso(s) => RawCell::from_text(s),
            Data::DurationIso(s) => RawCell::from_text(s),
            // Error cells (#N/A, #DIV/0!) carry no value
            Data::Error(_) => RawCell::Empty,
        }
    }

    fn raw(&self) -> String {
        match self {
            RawCell::Empty => String::new(),
            RawCell::Text(s) => s.clone(),
            RawCell::Number(f) | RawCell::Serial(f) => f.to_string(),
        }
    }

    /// Trimmed text for the key columns; `None` means the field is missing.
    fn text(&self) -> Option<String> {
        match self {
            RawCell::Empty => None,
            RawCell::Text(s) => Some(s.trim().to_string()),
            RawCell::Number(f) | RawCell::Serial(f) => Some(f.to_string()),
        }
    }
}

static EMPTY_CELL: RawCell = RawCell::Empty;

/// Positions of the required columns in the header row
#[derive(Debug)]
struct ColumnIndex {
    date: usize,
    country: usize,
    customer: usize,
    product: usize,
    quantity: usize,
    total: usize,
}

impl ColumnIndex {
    fn from_headers(headers: &[String]) -> Result<Self, LoadError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| LoadError::MissingColumn(name.to_string()))
        };

        Ok(ColumnIndex {
            date: find(COL_DATE)?,
            country: find(COL_COUNTRY)?,
            customer: find(COL_CUSTOMER)?,
            product: find(COL_PRODUCT)?,
            quantity: find(COL_QUANTITY)?,
            total: find(COL_TOTAL)?,
        })
    }
}

enum RowOutcome {
    Keep(Transaction),
    MissingField,
    BadDate,
}

/// Accumulates records and drop counts while rows are converted
struct TableBuilder<'a> {
    columns: ColumnIndex,
    options: &'a LoadOptions,
    records: Vec<Transaction>,
    report: LoadReport,
}

impl<'a> TableBuilder<'a> {
    fn new(columns: ColumnIndex, options: &'a LoadOptions) -> Self {
        TableBuilder {
            columns,
            options,
            records: Vec::new(),
            report: LoadReport::default(),
        }
    }

    fn push_row(&mut self, row: usize, cells: &[RawCell]) -> Result<(), ParseError> {
        match self.convert_row(row, cells)? {
            RowOutcome::Keep(record) => self.records.push(record),
            RowOutcome::MissingField => self.report.dropped_missing += 1,
            RowOutcome::BadDate => self.report.dropped_bad_date += 1,
        }
        Ok(())
    }

    fn convert_row(&self, row: usize, cells: &[RawCell]) -> Result<RowOutcome, ParseError> {
        let cell = |idx: usize| cells.get(idx).unwrap_or(&EMPTY_CELL);

        let date_cell = cell(self.columns.date);
        let (country, customer, product) = match (
            cell(self.columns.country).text(),
            customer_id(cell(self.columns.customer)),
            cell(self.columns.product).text(),
        ) {
            (Some(country), Some(customer), Some(product)) if *date_cell != RawCell::Empty => {
                (country, customer, product)
            }
            _ => return Ok(RowOutcome::MissingField),
        };

        let date = match parse_date_cell(date_cell) {
            Some(date) => date,
            None => match self.options.date_policy {
                DatePolicy::DropRow => {
                    debug!("Dropping row {} with unreadable date {:?}", row, date_cell.raw());
                    return Ok(RowOutcome::BadDate);
                }
                DatePolicy::Reject => {
                    return Err(ParseError::new(row, COL_DATE, date_cell.raw(), "not a date"));
                }
            },
        };

        let quantity = parse_quantity(cell(self.columns.quantity))
            .map_err(|reason| ParseError::new(row, COL_QUANTITY, cell(self.columns.quantity).raw(), reason))?;
        let total = parse_total(cell(self.columns.total))
            .map_err(|reason| ParseError::new(row, COL_TOTAL, cell(self.columns.total).raw(), reason))?;

        Ok(RowOutcome::Keep(Transaction::new(
            date, country, customer, product, quantity, total,
        )))
    }

    fn finish(mut self) -> Loaded {
        self.report.retained = self.records.len();
        info!(
            "Loaded {} transactions ({} dropped for missing fields, {} for unreadable dates)",
            self.report.retained, self.report.dropped_missing, self.report.dropped_bad_date
        );
        Loaded {
            table: Table::new(self.records),
            report: self.report,
        }
    }
}

fn customer_id(cell: &RawCell) -> Option<CustomerId> {
    match cell {
        RawCell::Empty => None,
        RawCell::Text(s) => Some(CustomerId::from(s.as_str())),
        RawCell::Number(f) | RawCell::Serial(f) => CustomerId::from_number(*f),
    }
}

fn parse_date_cell(cell: &RawCell) -> Option<NaiveDate> {
    match cell {
        RawCell::Empty => None,
        RawCell::Number(f) | RawCell::Serial(f) => serial_to_date(*f),
        RawCell::Text(s) => parse_date_text(s),
    }
}

/// Converts an Excel serial day number to a calendar date, dropping the time.
fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    // 2958465 is 9999-12-31
    if !serial.is_finite() || !(1.0..2958466.0).contains(&serial) {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_signed(Duration::days(serial.floor() as i64))
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// Parses a textual date or date-time, truncating any time of day.
///
/// Slash dates are read day-first unless the year leads.
pub(crate) fn parse_date_text(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

fn parse_quantity(cell: &RawCell) -> Result<u64, String> {
    let value = match cell {
        RawCell::Empty => return Ok(0),
        RawCell::Number(f) | RawCell::Serial(f) => *f,
        RawCell::Text(s) => {
            let s = s.trim();
            if let Ok(n) = s.parse::<u64>() {
                return Ok(n);
            }
            s.parse::<f64>().map_err(|_| "not a number".to_string())?
        }
    };

    if !value.is_finite() {
        return Err("not a finite number".to_string());
    }
    if value < 0.0 {
        return Err("quantity must not be negative".to_string());
    }
    if value.fract() != 0.0 {
        return Err("quantity must be a whole number".to_string());
    }
    if value >= u64::MAX as f64 {
        return Err("quantity out of range".to_string());
    }
    Ok(value as u64)
}

fn parse_total(cell: &RawCell) -> Result<Decimal, String> {
    match cell {
        RawCell::Empty => Ok(Decimal::ZERO),
        RawCell::Number(f) | RawCell::Serial(f) => decimal_from_f64(*f),
        RawCell::Text(s) => {
            let s = s.trim();
            Decimal::from_str(s)
                .or_else(|_| Decimal::from_scientific(s))
                .map_err(|_| "not a number".to_string())
        }
    }
}

/// Goes through the shortest round-trip text so 15.99 stays 15.99.
fn decimal_from_f64(value: f64) -> Result<Decimal, String> {
    if !value.is_finite() {
        return Err("not a finite number".to_string());
    }
    Decimal::from_str(&value.to_string()).map_err(|e| e.to_string())
}

/// Load transactions from the first worksheet of an xlsx workbook
///
/// The first row of the used range is the header. Columns are matched by
/// exact name; extra columns are ignored.
pub fn load_xlsx<R: Read + Seek>(reader: R, options: &LoadOptions) -> Result<Loaded, LoadError> {
    let mut workbook: Xlsx<_> = Xlsx::new(reader)?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(LoadError::NoSheets)?;
    let range = workbook.worksheet_range(&sheet_name)?;

    // Spreadsheet row number of the header (1-based)
    let header_row = range.start().map(|(r, _)| r as usize + 1).unwrap_or(1);

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(cells) => cells.iter().map(|c| RawCell::from_xlsx(c).raw()).collect(),
        None => Vec::new(),
    };

    let mut builder = TableBuilder::new(ColumnIndex::from_headers(&headers)?, options);
    for (i, row) in rows.enumerate() {
        let cells: Vec<RawCell> = row.iter().map(RawCell::from_xlsx).collect();
        builder.push_row(header_row + 1 + i, &cells)?;
    }

    Ok(builder.finish())
}

/// Load transactions from comma-separated text with a header line
pub fn load_csv<R: Read>(reader: R, options: &LoadOptions) -> Result<Loaded, LoadError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();
    let mut builder = TableBuilder::new(ColumnIndex::from_headers(&headers)?, options);

    for (i, record) in csv_reader.records().enumerate() {
        let record = record?;
        let cells: Vec<RawCell> = record.iter().map(RawCell::from_text).collect();
        builder.push_row(i + 2, &cells)?;
    }

    Ok(builder.finish())
}

/// Detect file type and load the appropriate format
///
/// # Arguments
/// * `filepath` - Path to a `.xlsx`, `.xlsm` or `.csv` file
/// * `options` - Row policies
///
/// # Examples
/// ```no_run
/// use sales_dashboard::loader::{load_path, LoadOptions};
///
/// match load_path("ventas.xlsx", &LoadOptions::default()) {
///     Ok(loaded) => println!("Loaded {} transactions", loaded.table.len()),
///     Err(e) => eprintln!("Error loading file: {}", e),
/// }
/// ```
pub fn load_path(filepath: impl AsRef<Path>, options: &LoadOptions) -> Result<Loaded, LoadError> {
    let path = filepath.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    match extension.as_deref() {
        Some("xlsx") | Some("xlsm") => load_xlsx(BufReader::new(File::open(path)?), options),
        Some("csv") => load_csv(BufReader::new(File::open(path)?), options),
        Some(ext) => Err(LoadError::UnsupportedFormat(ext.to_string())),
        None => Err(LoadError::UnsupportedFormat(path.display().to_string())),
    }
}

/// Load with default options, rejecting malformed dates
pub fn load(filepath: impl AsRef<Path>) -> Result<Table, LoadError> {
    load_path(filepath, &LoadOptions::default()).map(|loaded| loaded.table)
}
