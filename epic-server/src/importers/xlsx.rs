//! Reading the first worksheet of an uploaded workbook

use calamine::{Data, Range, Reader, Xlsx};
use std::io::Cursor;

use super::ImportError;

/// One spreadsheet row with its 1-based line number
#[derive(Debug, Clone, PartialEq)]
pub struct XlsxRow {
    pub line: usize,
    cells: Vec<String>,
}

impl XlsxRow {
    pub fn new(line: usize, cells: Vec<String>) -> Self {
        let cells = cells.into_iter().map(|c| c.trim().to_string()).collect();
        Self { line, cells }
    }

    /// Trimmed cell text; missing cells read as ""
    pub fn cell(&self, index: usize) -> &str {
        self.cells.get(index).map(String::as_str).unwrap_or("")
    }

    fn is_blank(&self) -> bool {
        self.cells.iter().all(|c| c.is_empty())
    }
}

/// A row parsed into the typed record an importer works with
pub trait XlsxLineObject: Sized {
    fn from_xlsx_row(row: &XlsxRow) -> Self;
}

/// First worksheet of a workbook; the first non-blank row is the header
#[derive(Debug, Clone, Default)]
pub struct XlsxSheet {
    rows: Vec<XlsxRow>,
}

impl XlsxSheet {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ImportError> {
        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes.to_vec()))
            .map_err(|e| ImportError::Workbook(format!("Cannot open workbook: {}", e)))?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| ImportError::Workbook("Workbook contains no sheets".to_string()))?
            .map_err(|e| ImportError::Workbook(format!("Cannot read first sheet: {}", e)))?;

        Ok(Self::from_range(&range))
    }

    fn from_range(range: &Range<Data>) -> Self {
        // Ranges start at the first used cell, not at A1
        let (first_row, first_col) = match range.start() {
            Some((row, col)) => (row as usize, col as usize),
            None => return Self::default(),
        };

        let rows = range
            .rows()
            .enumerate()
            .map(|(index, row)| {
                let cells = std::iter::repeat(String::new())
                    .take(first_col)
                    .chain(row.iter().map(|cell| cell.to_string()))
                    .collect();
                XlsxRow::new(first_row + index + 1, cells)
            })
            .collect();

        Self { rows }
    }

    /// Build a sheet from plain rows, the first one being line 1
    pub fn from_rows<I, R, S>(rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(index, row)| XlsxRow::new(index + 1, row.into_iter().map(Into::into).collect()))
            .collect();

        Self { rows }
    }

    /// Rows after the header, blank rows skipped
    pub fn data_rows(&self) -> impl Iterator<Item = &XlsxRow> {
        self.rows.iter().filter(|row| !row.is_blank()).skip(1)
    }

    /// Parse every data row, keeping its line number
    pub fn line_objects<T: XlsxLineObject>(&self) -> Vec<(usize, T)> {
        self.data_rows()
            .map(|row| (row.line, T::from_xlsx_row(row)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    #[test]
    fn test_header_and_blank_rows_are_skipped() {
        let sheet = XlsxSheet::from_rows(vec![
            vec!["area", "group"],
            vec!["Water", "Coast"],
            vec!["", "  "],
            vec![" Land ", "Hills"],
        ]);

        let lines: Vec<usize> = sheet.data_rows().map(|r| r.line).collect();
        assert_eq!(lines, vec![2, 4]);
        assert_eq!(sheet.data_rows().last().unwrap().cell(0), "Land");
    }

    #[test]
    fn test_missing_cell_reads_empty() {
        let row = XlsxRow::new(2, vec!["only".to_string()]);
        assert_eq!(row.cell(0), "only");
        assert_eq!(row.cell(5), "");
    }

    #[test]
    fn test_from_bytes_keeps_absolute_line_numbers() {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        // Header at B3, so the used range is offset from A1
        worksheet.write_string(2, 1, "header").unwrap();
        worksheet.write_string(3, 1, "first").unwrap();
        worksheet.write_string(3, 2, "second").unwrap();
        worksheet.write_string(5, 1, "third").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let sheet = XlsxSheet::from_bytes(&bytes).unwrap();
        let rows: Vec<&XlsxRow> = sheet.data_rows().collect();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].line, 4);
        assert_eq!(rows[0].cell(0), "");
        assert_eq!(rows[0].cell(1), "first");
        assert_eq!(rows[0].cell(2), "second");
        assert_eq!(rows[1].line, 6);
        assert_eq!(rows[1].cell(1), "third");
    }

    #[test]
    fn test_header_below_blank_rows_is_not_data() {
        let sheet = XlsxSheet::from_rows(vec![
            vec!["", ""],
            vec!["area", "group"],
            vec!["Water", "Coast"],
        ]);

        let rows: Vec<&XlsxRow> = sheet.data_rows().collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].line, 3);
        assert_eq!(rows[0].cell(0), "Water");
    }

    #[test]
    fn test_garbage_is_a_workbook_error() {
        let result = XlsxSheet::from_bytes(b"definitely not a zip archive");
        assert!(matches!(result, Err(ImportError::Workbook(_))));
    }
}
