use std::path::Path;

use calamine::{open_workbook, Data, Range, Reader, Xlsx, XlsxError};
use rust_xlsxwriter::{Format, Formula};
use tracing::warn;

use super::local::{is_lock_conflict, StoreError, WorkbookStore};
use super::workbook::{Cell, Sheet, Workbook};

const DATE_FORMAT: &str = "yyyy/mm/dd hh:mm";
const DURATION_FORMAT: &str = "[h]:mm:ss";

/// `.xlsx` files on disk. Reads go through calamine, the whole workbook is
/// rewritten with rust_xlsxwriter on save. Values, types, formulas and
/// date/duration formats survive the round trip; fonts, fills and borders do not.
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxStore;

impl WorkbookStore for XlsxStore {
    fn load(&self, path: &Path) -> Result<Option<Workbook>, StoreError> {
        if !path.exists() {
            return Ok(None);
        }

        let mut xlsx: Xlsx<_> = open_workbook(path).map_err(|e| read_error(path, e))?;
        let mut book = Workbook::default();
        for name in xlsx.sheet_names() {
            let range = xlsx
                .worksheet_range(&name)
                .map_err(|e| read_error(path, e))?;
            let formulas = xlsx
                .worksheet_formula(&name)
                .map_err(|e| read_error(path, e))?;

            // Ranges start at the first used cell; pad back to A1.
            let (row0, col0) = range.start().unwrap_or((0, 0));
            let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); row0 as usize];
            for r in range.rows() {
                let mut row = vec![Cell::Empty; col0 as usize];
                row.extend(r.iter().map(cell_from_data));
                while matches!(row.last(), Some(Cell::Empty)) {
                    row.pop();
                }
                rows.push(row);
            }
            overlay_formulas(&mut rows, &formulas);

            book.sheets.push(Sheet {
                name,
                rows,
                column_widths: Vec::new(),
            });
        }
        Ok(Some(book))
    }

    fn save(&self, path: &Path, book: &Workbook) -> Result<(), StoreError> {
        let date_format = Format::new().set_num_format(DATE_FORMAT);
        let duration_format = Format::new().set_num_format(DURATION_FORMAT);
        let mut out = rust_xlsxwriter::Workbook::new();
        for sheet in &book.sheets {
            let ws = out.add_worksheet();
            ws.set_name(&sheet.name).map_err(|e| write_error(path, e))?;

            for (r, row) in sheet.rows.iter().enumerate() {
                for (c, cell) in row.iter().enumerate() {
                    let (r, c) = (r as u32, c as u16);
                    let written = match cell {
                        Cell::Empty => continue,
                        Cell::Text(s) => ws.write_string(r, c, s),
                        Cell::Number(n) => ws.write_number(r, c, *n),
                        Cell::Bool(b) => ws.write_boolean(r, c, *b),
                        Cell::DateTime(n) => ws.write_number_with_format(r, c, *n, &date_format),
                        Cell::Duration(n) => {
                            ws.write_number_with_format(r, c, *n, &duration_format)
                        }
                        Cell::Formula { formula, result } => {
                            let mut f = Formula::new(formula.as_str());
                            if let Some(result) = result {
                                f = f.set_result(result.as_str());
                            }
                            ws.write_formula(r, c, f)
                        }
                    };
                    written.map_err(|e| write_error(path, e))?;
                }
            }

            for (c, width) in sheet.column_widths.iter().enumerate() {
                if let Err(e) = ws.set_column_width(c as u16, *width) {
                    warn!(sheet = %sheet.name, column = c, error = %e, "column width not applied");
                }
            }
        }

        out.save(path).map_err(|e| write_error(path, e))
    }
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) if dt.is_duration() => Cell::Duration(dt.as_f64()),
        Data::DateTime(dt) => Cell::DateTime(dt.as_f64()),
        Data::Error(e) => Cell::Text(format!("#{:?}", e)),
    }
}

/// Replace value cells with their formulas. The value read at the same
/// position becomes the formula's cached result.
fn overlay_formulas(rows: &mut Vec<Vec<Cell>>, formulas: &Range<String>) {
    let Some((row0, col0)) = formulas.start() else {
        return;
    };
    for (r, c, formula) in formulas.used_cells() {
        let (r, c) = (row0 as usize + r, col0 as usize + c);
        if rows.len() <= r {
            rows.resize(r + 1, Vec::new());
        }
        let row = &mut rows[r];
        if row.len() <= c {
            row.resize(c + 1, Cell::Empty);
        }
        row[c] = Cell::Formula {
            formula: formula.clone(),
            result: row[c].as_text(),
        };
    }
}

fn read_error(path: &Path, e: XlsxError) -> StoreError {
    match e {
        XlsxError::Io(source) if is_lock_conflict(&source) => StoreError::Locked {
            path: path.to_path_buf(),
            source,
        },
        other => StoreError::Read {
            path: path.to_path_buf(),
            message: other.to_string(),
        },
    }
}

fn write_error(path: &Path, e: rust_xlsxwriter::XlsxError) -> StoreError {
    match e {
        rust_xlsxwriter::XlsxError::IoError(source) if is_lock_conflict(&source) => {
            StoreError::Locked {
                path: path.to_path_buf(),
                source,
            }
        }
        other => StoreError::Write {
            path: path.to_path_buf(),
            message: other.to_string(),
        },
    }
}
