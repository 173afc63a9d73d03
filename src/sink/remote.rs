use thiserror::Error;
use tracing::info;

use super::AppendRecord;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("authorization failed: {0}")]
    Auth(String),

    #[error("Sheets API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Response(String),
}

/// A worksheet inside a spreadsheet, as far as appending and sorting care.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worksheet {
    pub sheet_id: i64,
    pub title: String,
    /// Header rows kept out of the sort.
    pub frozen_rows: u32,
}

/// The handful of spreadsheet operations the remote sink needs.
pub trait SheetsApi {
    fn find_worksheet(&self, spreadsheet_id: &str, title: &str)
        -> Result<Option<Worksheet>, RemoteError>;

    fn add_worksheet(
        &self,
        spreadsheet_id: &str,
        title: &str,
        rows: u32,
        cols: u32,
    ) -> Result<Worksheet, RemoteError>;

    /// Append one row; the service parses values as if typed by a user.
    fn append_row(
        &self,
        spreadsheet_id: &str,
        worksheet: &Worksheet,
        values: &[String],
    ) -> Result<(), RemoteError>;

    fn sort_desc_by_first_column(
        &self,
        spreadsheet_id: &str,
        worksheet: &Worksheet,
    ) -> Result<(), RemoteError>;
}

/// Appends records to a shared spreadsheet and keeps it newest-first.
pub struct RemoteSheetWriter<A> {
    api: A,
    spreadsheet_id: String,
    sheet_name: String,
    default_rows: u32,
    default_cols: u32,
}

impl<A: SheetsApi> RemoteSheetWriter<A> {
    pub fn new(
        api: A,
        spreadsheet_id: &str,
        sheet_name: &str,
        default_rows: u32,
        default_cols: u32,
    ) -> Self {
        RemoteSheetWriter {
            api,
            spreadsheet_id: spreadsheet_id.to_string(),
            sheet_name: sheet_name.to_string(),
            default_rows,
            default_cols,
        }
    }

    /// Append, then re-sort by column A descending. No retries: the caller
    /// records the error and moves on.
    pub fn append(&self, record: &AppendRecord) -> Result<(), RemoteError> {
        let worksheet = match self.api.find_worksheet(&self.spreadsheet_id, &self.sheet_name)? {
            Some(ws) => ws,
            None => {
                info!(sheet = %self.sheet_name, "remote worksheet missing, creating it");
                self.api.add_worksheet(
                    &self.spreadsheet_id,
                    &self.sheet_name,
                    self.default_rows,
                    self.default_cols,
                )?
            }
        };

        self.api
            .append_row(&self.spreadsheet_id, &worksheet, record.cells())?;
        info!(sheet = %worksheet.title, "row appended to remote sheet");

        self.api
            .sort_desc_by_first_column(&self.spreadsheet_id, &worksheet)?;
        info!(sheet = %worksheet.title, "remote sheet sorted newest first");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ranking::RankingRow;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Default)]
    pub(crate) struct MemorySheetsState {
        pub sheets: Vec<(Worksheet, Vec<Vec<String>>)>,
        pub created: Vec<(String, u32, u32)>,
        pub sorts: usize,
        pub fail_append: bool,
    }

    /// Spreadsheet held in memory; sort compares column A as text, which orders
    /// `YYYY/MM/DD HH:MM` timestamps chronologically.
    #[derive(Clone, Default)]
    pub(crate) struct MemorySheets(pub Rc<RefCell<MemorySheetsState>>);

    impl MemorySheets {
        pub fn rows(&self, title: &str) -> Vec<Vec<String>> {
            self.0
                .borrow()
                .sheets
                .iter()
                .find(|(ws, _)| ws.title == title)
                .map(|(_, rows)| rows.clone())
                .unwrap_or_default()
        }
    }

    impl SheetsApi for MemorySheets {
        fn find_worksheet(&self, _: &str, title: &str) -> Result<Option<Worksheet>, RemoteError> {
            Ok(self
                .0
                .borrow()
                .sheets
                .iter()
                .find(|(ws, _)| ws.title == title)
                .map(|(ws, _)| ws.clone()))
        }

        fn add_worksheet(
            &self,
            _: &str,
            title: &str,
            rows: u32,
            cols: u32,
        ) -> Result<Worksheet, RemoteError> {
            let mut state = self.0.borrow_mut();
            let ws = Worksheet {
                sheet_id: state.sheets.len() as i64 + 1,
                title: title.to_string(),
                frozen_rows: 0,
            };
            state.sheets.push((ws.clone(), Vec::new()));
            state.created.push((title.to_string(), rows, cols));
            Ok(ws)
        }

        fn append_row(&self, _: &str, ws: &Worksheet, values: &[String]) -> Result<(), RemoteError> {
            let mut state = self.0.borrow_mut();
            if state.fail_append {
                return Err(RemoteError::Api {
                    status: 429,
                    body: "quota exceeded".to_string(),
                });
            }
            let (_, rows) = state
                .sheets
                .iter_mut()
                .find(|(s, _)| s.sheet_id == ws.sheet_id)
                .ok_or_else(|| RemoteError::Response("no such sheet".to_string()))?;
            rows.push(values.to_vec());
            Ok(())
        }

        fn sort_desc_by_first_column(&self, _: &str, ws: &Worksheet) -> Result<(), RemoteError> {
            let mut state = self.0.borrow_mut();
            state.sorts += 1;
            let (sheet, rows) = state
                .sheets
                .iter_mut()
                .find(|(s, _)| s.sheet_id == ws.sheet_id)
                .ok_or_else(|| RemoteError::Response("no such sheet".to_string()))?;
            let frozen = (sheet.frozen_rows as usize).min(rows.len());
            rows[frozen..].sort_by(|a, b| b.first().cmp(&a.first()));
            Ok(())
        }
    }

    fn record(ts: &str) -> AppendRecord {
        AppendRecord::new(ts.to_string(), &[RankingRow::sentinel(2)])
    }

    fn writer(api: MemorySheets) -> RemoteSheetWriter<MemorySheets> {
        RemoteSheetWriter::new(api, "sheet-id", "Amazon 売れ筋ランキング", 10_000, 20)
    }

    #[test]
    fn newest_row_ends_up_first() {
        let api = MemorySheets::default();
        let w = writer(api.clone());

        w.append(&record("2026/10/18 09:00")).unwrap();
        assert_eq!(api.rows("Amazon 売れ筋ランキング")[0][0], "2026/10/18 09:00");

        w.append(&record("2026/10/18 10:00")).unwrap();
        let rows = api.rows("Amazon 売れ筋ランキング");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], "2026/10/18 10:00");
        assert_eq!(rows[1][0], "2026/10/18 09:00");
        assert_eq!(api.0.borrow().sorts, 2);
    }

    #[test]
    fn creates_sheet_once_with_default_capacity() {
        let api = MemorySheets::default();
        let w = writer(api.clone());
        w.append(&record("2026/10/18 09:00")).unwrap();
        w.append(&record("2026/10/18 08:00")).unwrap();

        let state = api.0.borrow();
        assert_eq!(
            state.created,
            vec![("Amazon 売れ筋ランキング".to_string(), 10_000, 20)]
        );
    }

    #[test]
    fn frozen_header_stays_on_top() {
        let api = MemorySheets::default();
        api.0.borrow_mut().sheets.push((
            Worksheet {
                sheet_id: 7,
                title: "Amazon 売れ筋ランキング".to_string(),
                frozen_rows: 1,
            },
            vec![vec!["日時".to_string()], vec!["2026/01/01 00:00".to_string()]],
        ));
        writer(api.clone()).append(&record("2026/02/01 00:00")).unwrap();

        let rows = api.rows("Amazon 売れ筋ランキング");
        assert_eq!(rows[0][0], "日時");
        assert_eq!(rows[1][0], "2026/02/01 00:00");
        assert!(api.0.borrow().created.is_empty());
    }

    #[test]
    fn failed_append_skips_sort() {
        let api = MemorySheets::default();
        api.0.borrow_mut().fail_append = true;
        let err = writer(api.clone()).append(&record("2026/10/18 09:00")).unwrap_err();

        assert!(matches!(err, RemoteError::Api { status: 429, .. }));
        assert_eq!(api.0.borrow().sorts, 0);
    }
}
