//! Fixtures shared by the integration tests

#![allow(dead_code)]

use rust_xlsxwriter::{Format, Workbook};
use sales_dashboard::loader::{COL_COUNTRY, COL_CUSTOMER, COL_DATE, COL_PRODUCT, COL_QUANTITY, COL_TOTAL};
use std::io::Cursor;

pub const HEADERS: [&str; 6] = [COL_DATE, COL_COUNTRY, COL_CUSTOMER, COL_PRODUCT, COL_QUANTITY, COL_TOTAL];

/// One spreadsheet row: date text, country, customer, product, quantity, total
pub type Row = (&'static str, &'static str, &'static str, &'static str, f64, f64);

/// The three transactions used throughout the documentation
pub fn sample_rows() -> Vec<Row> {
    vec![
        ("2024-01-05", "BO", "C1", "Widget", 2.0, 20.0),
        ("2024-02-10", "AR", "C2", "Gadget", 1.0, 15.0),
        ("2024-02-15", "BO", "C1", "Gadget", 3.0, 45.0),
    ]
}

/// A larger set spanning two years, five countries and a gap month
pub fn yearly_rows() -> Vec<Row> {
    vec![
        ("2023-11-02", "BO", "C1", "Widget", 2.0, 20.0),
        ("2023-12-24", "AR", "C2", "Gadget", 1.0, 15.0),
        ("2024-02-03", "CL", "C3", "Widget", 5.0, 50.0),
        ("2024-02-28", "PE", "C4", "Gizmo", 1.0, 99.5),
        ("2024-03-31", "UY", "C5", "Widget", 10.0, 100.0),
        ("2024-04-01", "BO", "C1", "Gizmo", 2.0, 199.0),
        ("2024-06-15", "AR", "C3", "Gadget", 4.0, 60.0),
    ]
}

/// Builds an in-memory xlsx workbook with the standard header row
pub fn xlsx_bytes(rows: &[Row]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (col, header) in HEADERS.iter().enumerate() {
        sheet.write_string(0, col as u16, *header).unwrap();
    }
    for (i, (date, country, customer, product, quantity, total)) in rows.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, *date).unwrap();
        sheet.write_string(row, 1, *country).unwrap();
        sheet.write_string(row, 2, *customer).unwrap();
        sheet.write_string(row, 3, *product).unwrap();
        sheet.write_number(row, 4, *quantity).unwrap();
        sheet.write_number(row, 5, *total).unwrap();
    }
    workbook.save_to_buffer().unwrap()
}

/// Workbook whose date column holds real Excel dates instead of text
pub fn xlsx_with_serial_dates(rows: &[(f64, &str, f64, &str, f64, f64)]) -> Vec<u8> {
    let date_format = Format::new().set_num_format("yyyy-mm-dd");
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (col, header) in HEADERS.iter().enumerate() {
        sheet.write_string(0, col as u16, *header).unwrap();
    }
    for (i, (serial, country, customer, product, quantity, total)) in rows.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_number_with_format(row, 0, *serial, &date_format).unwrap();
        sheet.write_string(row, 1, *country).unwrap();
        sheet.write_number(row, 2, *customer).unwrap();
        sheet.write_string(row, 3, *product).unwrap();
        sheet.write_number(row, 4, *quantity).unwrap();
        sheet.write_number(row, 5, *total).unwrap();
    }
    workbook.save_to_buffer().unwrap()
}

pub fn xlsx_reader(rows: &[Row]) -> Cursor<Vec<u8>> {
    Cursor::new(xlsx_bytes(rows))
}

pub fn csv_text(rows: &[Row]) -> String {
    let mut text = HEADERS.join(",");
    text.push('\n');
    for (date, country, customer, product, quantity, total) in rows {
        text.push_str(&format!("{},{},{},{},{},{}\n", date, country, customer, product, quantity, total));
    }
    text
}
