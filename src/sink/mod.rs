pub mod google;
pub mod local;
pub mod remote;
pub mod workbook;
pub mod xlsx;

use crate::ranking::RankingRow;

/// One persisted row: timestamp, then every source's ranking columns in
/// configured order. Built once per run and never modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendRecord(Vec<String>);

impl AppendRecord {
    pub fn new(timestamp: String, rows: &[RankingRow]) -> Self {
        let mut cells = Vec::with_capacity(1 + rows.iter().map(RankingRow::len).sum::<usize>());
        cells.push(timestamp);
        for row in rows {
            cells.extend(row.cells().iter().cloned());
        }
        AppendRecord(cells)
    }

    pub fn cells(&self) -> &[String] {
        &self.0
    }

    pub fn timestamp(&self) -> &str {
        &self.0[0]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// What happened to one sink during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkOutcome {
    Written,
    WrittenToBackup,
    Skipped(String),
    Failed(String),
}

impl SinkOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, SinkOutcome::Written | SinkOutcome::WrittenToBackup)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, SinkOutcome::Failed(_))
    }
}

impl std::fmt::Display for SinkOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkOutcome::Written => write!(f, "written"),
            SinkOutcome::WrittenToBackup => write!(f, "written to backup"),
            SinkOutcome::Skipped(why) => write!(f, "skipped ({})", why),
            SinkOutcome::Failed(why) => write!(f, "failed ({})", why),
        }
    }
}
