use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use std::io::Cursor;

use crate::error::{PipelineError, Result};

/// A loosely-typed table as it arrives from a CSV export or a workbook grid:
/// trimmed header names plus optional string cells. Source normalizers map
/// this into canonical records via an explicit schema descriptor.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

/// One worksheet pulled out of a workbook, before any header interpretation.
#[derive(Debug, Clone)]
pub struct RawSheet {
    pub name: String,
    pub grid: Vec<Vec<Option<String>>>,
}

fn cell_from_str(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn cell_from_data(data: &Data) -> Option<String> {
    match data {
        Data::Empty => None,
        Data::String(s) => cell_from_str(s),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                Some(format!("{}", *f as i64))
            } else {
                Some(f.to_string())
            }
        }
        Data::Int(i) => Some(i.to_string()),
        Data::Bool(b) => Some(b.to_string()),
        other => cell_from_str(&other.to_string()),
    }
}

impl RawTable {
    /// Parse a CSV export. The first record is taken as the header row;
    /// ragged rows are tolerated and padded out to the header width.
    pub fn from_csv(bytes: &[u8], file: &str) -> Result<Self> {
        let mut reader = ReaderBuilder::new().flexible(true).from_reader(bytes);
        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| PipelineError::file_parse(file, e))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| PipelineError::file_parse(file, e))?;
            let mut row: Vec<Option<String>> = record.iter().map(cell_from_str).collect();
            row.resize(headers.len(), None);
            rows.push(row);
        }

        Ok(RawTable { headers, rows })
    }

    /// Build a table from a worksheet grid, taking `header_idx` as the header
    /// row and everything below it as data.
    pub fn from_grid(grid: &[Vec<Option<String>>], header_idx: usize) -> Self {
        let headers: Vec<String> = grid
            .get(header_idx)
            .map(|row| {
                row.iter()
                    .map(|cell| cell.clone().unwrap_or_default())
                    .collect()
            })
            .unwrap_or_default();

        let rows = grid
            .iter()
            .skip(header_idx + 1)
            .map(|row| {
                let mut row = row.clone();
                row.resize(headers.len(), None);
                row
            })
            .collect();

        RawTable { headers, rows }
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .and_then(|c| c.as_deref())
    }

    /// Case-insensitive exact header lookup.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = name.trim().to_lowercase();
        self.headers
            .iter()
            .position(|h| h.trim().to_lowercase() == wanted)
    }

    /// First column whose header contains `fragment`, case-insensitive.
    pub fn column_containing(&self, fragment: &str) -> Option<usize> {
        let fragment = fragment.to_lowercase();
        self.headers
            .iter()
            .position(|h| h.to_lowercase().contains(&fragment))
    }

    /// Drop columns whose every data cell is empty.
    pub fn drop_empty_columns(&mut self) {
        if self.rows.is_empty() {
            return;
        }
        let keep: Vec<bool> = (0..self.headers.len())
            .map(|col| self.rows.iter().any(|row| row[col].is_some()))
            .collect();
        self.retain_columns(&keep);
    }

    /// Drop columns with a blank header, which workbook exports produce for
    /// decorative spacer columns.
    pub fn drop_unnamed_columns(&mut self) {
        let keep: Vec<bool> = self
            .headers
            .iter()
            .map(|h| !h.trim().is_empty())
            .collect();
        self.retain_columns(&keep);
    }

    fn retain_columns(&mut self, keep: &[bool]) {
        let mut idx = 0;
        self.headers.retain(|_| {
            let k = keep[idx];
            idx += 1;
            k
        });
        for row in &mut self.rows {
            let mut idx = 0;
            row.retain(|_| {
                let k = keep[idx];
                idx += 1;
                k
            });
        }
    }

    /// Drop a trailing summary row: last row fully empty, or its first cell
    /// contains "total" (case-insensitive).
    pub fn drop_trailing_total_row(&mut self) {
        let drop = match self.rows.last() {
            None => false,
            Some(last) => {
                last.iter().all(|c| c.is_none())
                    || last
                        .first()
                        .and_then(|c| c.as_deref())
                        .map(|c| c.to_lowercase().contains("total"))
                        .unwrap_or(false)
            }
        };
        if drop {
            self.rows.pop();
        }
    }

    /// Drop up to `n` footer rows, keeping the table intact when it is too
    /// short to carry a footer.
    pub fn drop_trailing_rows(&mut self, n: usize) {
        if self.rows.len() > n {
            self.rows.truncate(self.rows.len() - n);
        }
    }
}

/// Read every worksheet of an `.xls`/`.xlsx` workbook into raw grids.
pub fn read_workbook_sheets(bytes: &[u8], file: &str) -> Result<Vec<RawSheet>> {
    let cursor = Cursor::new(bytes.to_vec());
    let mut workbook =
        open_workbook_auto_from_rs(cursor).map_err(|e| PipelineError::file_parse(file, e))?;

    let names = workbook.sheet_names().to_owned();
    let mut sheets = Vec::with_capacity(names.len());
    for name in names {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| PipelineError::file_parse(file, e))?;
        let grid = range
            .rows()
            .map(|row| row.iter().map(cell_from_data).collect())
            .collect();
        sheets.push(RawSheet { name, grid });
    }

    Ok(sheets)
}

/// Scan the top of a grid for the row that carries the column headers.
/// Returns the first row containing any of `keywords` (case-insensitive);
/// reports mix title and summary rows above the real header.
pub fn find_header_row(grid: &[Vec<Option<String>>], keywords: &[&str]) -> Option<usize> {
    grid.iter().take(10).position(|row| {
        row.iter().flatten().any(|cell| {
            let cell = cell.to_lowercase();
            keywords.iter().any(|k| cell.contains(k))
        })
    })
}

/// Parse a numeric cell, tolerating currency symbols and thousands
/// separators ("$1,234.50" -> 1234.5).
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned = raw.replace(['$', ','], "");
    cleaned.trim().parse::<f64>().ok()
}

/// Parse a date cell from the formats seen in distributor exports.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    // Timestamps keep only their date part.
    let raw = raw.split(['T', ' ']).next().unwrap_or(raw);
    const FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%m/%d/%y"];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}
