use tracing::info;

/// Names spreadsheet tools give the only sheet of a fresh workbook.
const DEFAULT_SHEET_NAMES: &[&str] = &["Sheet1", "Sheet"];

const MAX_COLUMN_WIDTH: usize = 50;
const WIDTH_PADDING: usize = 2;

/// Shown width of date and duration cells.
const DATE_DISPLAY_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Excel serial date, written back with a date number format.
    DateTime(f64),
    /// Excel serial duration, written back with an elapsed-time format.
    Duration(f64),
    /// Formula text without the leading `=`, plus the last computed value.
    Formula {
        formula: String,
        result: Option<String>,
    },
}

impl Cell {
    pub fn display_len(&self) -> usize {
        match self {
            Cell::Empty => 0,
            Cell::Text(s) => s.chars().count(),
            Cell::Number(n) => n.to_string().chars().count(),
            Cell::Bool(b) => b.to_string().len(),
            Cell::DateTime(_) | Cell::Duration(_) => DATE_DISPLAY_LEN,
            Cell::Formula { result, .. } => result.as_deref().map_or(0, |r| r.chars().count()),
        }
    }

    /// Plain-text form of a value, used as a formula's cached result.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => Some(s.clone()),
            Cell::Number(n) | Cell::DateTime(n) | Cell::Duration(n) => Some(n.to_string()),
            Cell::Bool(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
            Cell::Formula { result, .. } => result.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
    /// Width in characters per column, recomputed on every append.
    pub column_widths: Vec<f64>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Sheet {
            name: name.into(),
            rows: Vec::new(),
            column_widths: Vec::new(),
        }
    }

    pub fn append_row(&mut self, values: &[String]) {
        self.rows
            .push(values.iter().map(|v| Cell::Text(v.clone())).collect());
    }

    /// `min(longest + 2, 50)` per column.
    pub fn autofit_columns(&mut self) {
        let columns = self.rows.iter().map(Vec::len).max().unwrap_or(0);
        self.column_widths = (0..columns)
            .map(|col| {
                let longest = self
                    .rows
                    .iter()
                    .filter_map(|r| r.get(col))
                    .map(Cell::display_len)
                    .max()
                    .unwrap_or(0);
                (longest + WIDTH_PADDING).min(MAX_COLUMN_WIDTH) as f64
            })
            .collect();
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// Return the sheet called `name`, creating it if needed. A workbook whose
    /// only sheet still has its default name gets that sheet renamed instead,
    /// so no empty "Sheet1" is left behind.
    pub fn ensure_sheet(&mut self, name: &str) -> &mut Sheet {
        let idx = match self.sheets.iter().position(|s| s.name == name) {
            Some(idx) => idx,
            None if self.sheets.len() == 1
                && DEFAULT_SHEET_NAMES.contains(&self.sheets[0].name.as_str()) =>
            {
                info!(from = %self.sheets[0].name, to = name, "renaming default sheet");
                self.sheets[0].name = name.to_string();
                0
            }
            None => {
                info!(sheet = name, "creating sheet");
                self.sheets.push(Sheet::new(name));
                self.sheets.len() - 1
            }
        };
        &mut self.sheets[idx]
    }
}
