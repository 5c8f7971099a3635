//! Spreadsheet import (product names) and export (names + handles).

use std::io::Cursor;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use rust_xlsxwriter::{Workbook, XlsxError};
use serde::Serialize;
use shopscribe_core::HandleEntry;
use thiserror::Error;

/// Header strings (lowercased, trimmed) that identify the product-name column.
pub const PRODUCT_HEADERS: &[&str] = &[
    "product",
    "product name",
    "product_name",
    "title",
    "name",
    "item",
    "item name",
];

pub const EXPORT_SHEET_NAME: &str = "Shopify Handles";
pub const EXPORT_HEADER: [&str; 2] = ["Product Name", "Handle"];
pub const EXPORT_FILE_NAME: &str = "shopify_handles.xlsx";
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const MAX_COLUMN_WIDTH: usize = 60;

#[derive(Debug, Error)]
pub enum SpreadsheetError {
    #[error("failed to read workbook: {0}")]
    Read(#[from] calamine::Error),
    #[error("workbook has no worksheets")]
    NoSheets,
    #[error("failed to write workbook: {0}")]
    Write(#[from] XlsxError),
}

/// Names pulled from an uploaded sheet, with where they were found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportedNames {
    pub product_names: Vec<String>,
    /// 1-based column index.
    pub product_col: usize,
    /// 1-based header row, or 0 when the sheet has no header row.
    pub header_row: usize,
}

/// Whether an upload's file name has a spreadsheet extension we read.
pub fn is_supported_file_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".xlsx") || lower.ends_with(".xls")
}

/// Read the first worksheet of an `.xlsx`/`.xls` file and extract names.
pub fn read_product_names(bytes: &[u8]) -> Result<ImportedNames, SpreadsheetError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(SpreadsheetError::NoSheets)??;

    // Lay cells out at absolute positions so row/column numbers match the sheet.
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let mut grid: Vec<Vec<String>> = vec![Vec::new(); start_row as usize];
    for row in range.rows() {
        let mut cells = vec![String::new(); start_col as usize];
        cells.extend(row.iter().map(cell_text));
        grid.push(cells);
    }
    Ok(extract_product_names(&grid))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Locate the product-name column in a row-major grid and collect its values.
///
/// The column is the first whose row-1 header is in [`PRODUCT_HEADERS`].
/// Failing that, column 1 is used and row 1 counts as a header unless its
/// first cell is empty or starts with a digit (any script).
pub fn extract_product_names(grid: &[Vec<String>]) -> ImportedNames {
    fn at(grid: &[Vec<String>], row: usize, col: usize) -> &str {
        grid.get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or_default()
    }
    let cell = |row, col| at(grid, row, col);
    let max_col = grid.iter().map(Vec::len).max().unwrap_or(0);

    let header_match = (0..max_col).find(|&col| {
        let header = cell(0, col).to_lowercase();
        PRODUCT_HEADERS.iter().any(|known| *known == header.trim())
    });

    let (col, header_row) = match header_match {
        Some(col) => (col, 1),
        None => {
            let first = cell(0, 0);
            let looks_like_data = first.chars().next().is_none_or(char::is_numeric);
            (0, if looks_like_data { 0 } else { 1 })
        }
    };

    let product_names = (header_row..grid.len())
        .map(|row| cell(row, col).trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect();

    ImportedNames {
        product_names,
        product_col: col + 1,
        header_row,
    }
}

/// Column widths for the export: longest cell plus padding, capped.
pub fn column_widths(entries: &[HandleEntry]) -> [f64; 2] {
    let longest = |header: &str, values: &mut dyn Iterator<Item = &str>| {
        values
            .map(|v| v.chars().count())
            .chain(std::iter::once(header.chars().count()))
            .max()
            .unwrap_or(0)
    };
    let names = longest(
        EXPORT_HEADER[0],
        &mut entries.iter().map(|e| e.product_name.as_str()),
    );
    let handles = longest(EXPORT_HEADER[1], &mut entries.iter().map(|e| e.handle.as_str()));
    [names, handles].map(|len| (len + 2).min(MAX_COLUMN_WIDTH) as f64)
}

/// Render name/handle pairs as an `.xlsx` workbook.
pub fn write_handles(entries: &[HandleEntry]) -> Result<Vec<u8>, SpreadsheetError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(EXPORT_SHEET_NAME)?;

    for (col, header) in EXPORT_HEADER.iter().enumerate() {
        sheet.write_string(0, col as u16, *header)?;
    }
    for (i, entry) in entries.iter().enumerate() {
        let row = (i + 1) as u32;
        sheet.write_string(row, 0, entry.product_name.as_str())?;
        sheet.write_string(row, 1, entry.handle.as_str())?;
    }
    for (col, width) in column_widths(entries).into_iter().enumerate() {
        sheet.set_column_width(col as u16, width)?;
    }

    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn finds_known_header_in_any_column() {
        let g = grid(&[
            &["SKU", " Product Name "],
            &["1", "Skittles"],
            &["2", ""],
            &["3", "  Nerds  "],
        ]);
        let imported = extract_product_names(&g);
        assert_eq!(imported.product_col, 2);
        assert_eq!(imported.header_row, 1);
        assert_eq!(imported.product_names, vec!["Skittles", "Nerds"]);
    }

    #[test]
    fn unknown_text_header_defaults_to_first_column() {
        let g = grid(&[&["Candy List", "x"], &["Warheads", "y"]]);
        let imported = extract_product_names(&g);
        assert_eq!(imported.product_col, 1);
        assert_eq!(imported.header_row, 1);
        assert_eq!(imported.product_names, vec!["Warheads"]);
    }

    #[test]
    fn numeric_first_cell_means_no_header() {
        let g = grid(&[&["1"], &["Lindt Lindor"]]);
        let imported = extract_product_names(&g);
        assert_eq!(imported.header_row, 0);
        assert_eq!(imported.product_names, vec!["1", "Lindt Lindor"]);
    }

    #[test]
    fn non_ascii_digit_first_cell_means_no_header() {
        let g = grid(&[&["٣ Musketeers"], &["Milky Way"]]);
        let imported = extract_product_names(&g);
        assert_eq!(imported.header_row, 0);
        assert_eq!(imported.product_names, vec!["٣ Musketeers", "Milky Way"]);
    }

    #[test]
    fn numeric_looking_header_is_treated_as_data() {
        let g = grid(&[&["5-Pack Candy"], &["Sour Patch Kids"]]);
        let imported = extract_product_names(&g);
        assert_eq!(imported.header_row, 0);
        assert_eq!(imported.product_names.len(), 2);
    }

    #[test]
    fn empty_sheet() {
        let imported = extract_product_names(&[]);
        assert_eq!(
            imported,
            ImportedNames {
                product_names: vec![],
                product_col: 1,
                header_row: 0,
            }
        );
    }

    #[test]
    fn supported_file_names() {
        assert!(is_supported_file_name("products.xlsx"));
        assert!(is_supported_file_name("LEGACY.XLS"));
        assert!(!is_supported_file_name("products.csv"));
    }

    #[test]
    fn widths_are_padded_and_capped() {
        let entries = vec![
            HandleEntry::new("Skittles", "skittles"),
            HandleEntry::new("x".repeat(100), "x"),
        ];
        assert_eq!(column_widths(&entries), [60.0, 10.0]);
        assert_eq!(column_widths(&[]), [14.0, 8.0]);
    }

    #[test]
    fn product_name_header_round_trip() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "SKU").unwrap();
        sheet.write_string(0, 1, "Product Name").unwrap();
        sheet.write_string(1, 1, "Mike & Ike Mega Mix 5lb").unwrap();
        sheet.write_string(3, 1, "Sour Patch Kids Watermelon").unwrap();
        sheet.write_string(4, 1, "Hershey's Kisses").unwrap();
        sheet.write_number(5, 0, 42).unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let imported = read_product_names(&bytes).unwrap();
        assert_eq!(imported.product_col, 2);
        assert_eq!(imported.header_row, 1);
        assert_eq!(
            imported.product_names,
            vec![
                "Mike & Ike Mega Mix 5lb",
                "Sour Patch Kids Watermelon",
                "Hershey's Kisses"
            ]
        );
    }

    #[test]
    fn numeric_first_cell_in_workbook() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_number(0, 0, 1).unwrap();
        sheet.write_string(1, 0, "Jolly Rancher").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let imported = read_product_names(&bytes).unwrap();
        assert_eq!(imported.header_row, 0);
        assert_eq!(imported.product_names, vec!["1", "Jolly Rancher"]);
    }

    #[test]
    fn export_reads_back() {
        let entries = vec![
            HandleEntry::new("Mike & Ike Mega Mix 5lb", "mike-ike-mega-mix"),
            HandleEntry::new("Mike & Ike Mega Mix 10lb", "mike-ike-mega-mix-10lb"),
        ];
        let bytes = write_handles(&entries).unwrap();

        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).unwrap();
        assert_eq!(workbook.sheet_names(), vec![EXPORT_SHEET_NAME.to_string()]);
        let range = workbook.worksheet_range_at(0).unwrap().unwrap();
        let rows: Vec<Vec<String>> = range
            .rows()
            .map(|r| r.iter().map(cell_text).collect())
            .collect();
        assert_eq!(
            rows,
            vec![
                vec!["Product Name", "Handle"],
                vec!["Mike & Ike Mega Mix 5lb", "mike-ike-mega-mix"],
                vec!["Mike & Ike Mega Mix 10lb", "mike-ike-mega-mix-10lb"],
            ]
        );
    }

    #[test]
    fn garbage_bytes_fail_to_read() {
        let err = read_product_names(b"not a spreadsheet").unwrap_err();
        assert!(matches!(err, SpreadsheetError::Read(_)));
    }
}
