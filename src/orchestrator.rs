use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::ranking::RankingRow;
use crate::sink::local::{LocalSheetWriter, WorkbookStore};
use crate::sink::remote::{RemoteSheetWriter, SheetsApi};
use crate::sink::{AppendRecord, SinkOutcome};

/// Either a ready remote writer, or the outcome to report instead.
pub enum RemoteSink<A> {
    Ready(RemoteSheetWriter<A>),
    Unavailable(SinkOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub record: AppendRecord,
    pub local: SinkOutcome,
    pub remote: SinkOutcome,
}

impl RunReport {
    pub fn local_ok(&self) -> bool {
        self.local.is_ok()
    }

    pub fn remote_ok(&self) -> bool {
        self.remote.is_ok()
    }
}

/// Drives both sinks for one run. Each sink is attempted regardless of how
/// the other fared; the two are not kept in lockstep.
pub struct AppendOrchestrator<S, A> {
    local: LocalSheetWriter<S>,
    primary_path: PathBuf,
    backup_path: PathBuf,
    remote: RemoteSink<A>,
}

impl<S: WorkbookStore, A: SheetsApi> AppendOrchestrator<S, A> {
    pub fn new(
        local: LocalSheetWriter<S>,
        primary_path: PathBuf,
        backup_path: PathBuf,
        remote: RemoteSink<A>,
    ) -> Self {
        AppendOrchestrator {
            local,
            primary_path,
            backup_path,
            remote,
        }
    }

    pub fn run(&self, rows: &[RankingRow], timestamp: String) -> RunReport {
        let record = AppendRecord::new(timestamp, rows);
        info!(record = ?record.cells(), columns = record.len(), "append record built");

        let local = self.write_local(&record);
        let remote = self.write_remote(&record);

        info!(local = %local, remote = %remote, "sinks done");
        RunReport {
            record,
            local,
            remote,
        }
    }

    /// Primary path first; on failure the same record goes to the backup
    /// path once.
    fn write_local(&self, record: &AppendRecord) -> SinkOutcome {
        let primary_err = match self.local.append(&self.primary_path, record) {
            Ok(()) => return SinkOutcome::Written,
            Err(e) => e,
        };
        warn!(
            path = %self.primary_path.display(),
            error = %primary_err,
            backup = %self.backup_path.display(),
            "primary workbook failed, switching to backup"
        );

        match self.local.append(&self.backup_path, record) {
            Ok(()) => {
                info!(path = %self.backup_path.display(), "saved to backup workbook");
                SinkOutcome::WrittenToBackup
            }
            Err(backup_err) => {
                error!(error = %backup_err, "backup workbook failed too");
                SinkOutcome::Failed(format!("primary: {}; backup: {}", primary_err, backup_err))
            }
        }
    }

    fn write_remote(&self, record: &AppendRecord) -> SinkOutcome {
        let writer = match &self.remote {
            RemoteSink::Ready(writer) => writer,
            RemoteSink::Unavailable(outcome) => return outcome.clone(),
        };
        match writer.append(record) {
            Ok(()) => SinkOutcome::Written,
            Err(e) => {
                error!(error = %e, "remote sheet write failed");
                SinkOutcome::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::normalize::normalize;
    use crate::sink::local::tests::MemoryStore;
    use crate::sink::remote::tests::MemorySheets;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    const SHEET: &str = "Amazon 売れ筋ランキング";

    fn rows() -> Vec<RankingRow> {
        vec![
            normalize(vec!["3,456位本".into(), "12位コンピュータ・IT".into()], 4),
            RankingRow::sentinel(2),
            normalize(vec!["987位Audible".into()], 2),
        ]
    }

    fn orchestrator(
        store: &MemoryStore,
        remote: RemoteSink<MemorySheets>,
    ) -> AppendOrchestrator<MemoryStore, MemorySheets> {
        let local = LocalSheetWriter::new(store.clone(), SHEET, 3, Duration::ZERO).with_pause(|_| {});
        AppendOrchestrator::new(local, "main.xlsx".into(), "backup.xlsx".into(), remote)
    }

    fn remote(api: &MemorySheets) -> RemoteSink<MemorySheets> {
        RemoteSink::Ready(RemoteSheetWriter::new(api.clone(), "id", SHEET, 10_000, 20))
    }

    #[test]
    fn both_sinks_get_the_same_record() {
        let store = MemoryStore::default();
        let api = MemorySheets::default();
        let report = orchestrator(&store, remote(&api)).run(&rows(), "2026/10/18 09:00".into());

        assert!(report.local_ok());
        assert!(report.remote_ok());
        assert_eq!(report.record.len(), 9);
        let expected: Vec<String> = report.record.cells().to_vec();
        assert_eq!(store.rows("main.xlsx", SHEET), vec![expected.clone()]);
        assert_eq!(api.rows(SHEET), vec![expected]);
    }

    #[test]
    fn locked_primary_falls_back_to_backup_once() {
        let store = MemoryStore::default();
        store.lock("main.xlsx");
        let api = MemorySheets::default();
        let report = orchestrator(&store, remote(&api)).run(&rows(), "2026/10/18 09:00".into());

        assert_eq!(report.local, SinkOutcome::WrittenToBackup);
        assert_eq!(store.save_attempts("main.xlsx"), 3);
        assert_eq!(store.save_attempts("backup.xlsx"), 1);
        assert_eq!(store.rows("backup.xlsx", SHEET).len(), 1);
        assert!(report.remote_ok());
    }

    #[test]
    fn both_local_paths_failing_still_writes_remote() {
        let store = MemoryStore::default();
        store.lock("main.xlsx");
        store.break_path("backup.xlsx");
        let api = MemorySheets::default();
        let report = orchestrator(&store, remote(&api)).run(&rows(), "2026/10/18 09:00".into());

        assert!(report.local.is_failure());
        assert_eq!(store.save_attempts("backup.xlsx"), 1);
        assert!(report.remote_ok());
        assert_eq!(api.rows(SHEET).len(), 1);
    }

    #[test]
    fn remote_failure_does_not_block_local() {
        let store = MemoryStore::default();
        let api = MemorySheets::default();
        api.0.borrow_mut().fail_append = true;
        let report = orchestrator(&store, remote(&api)).run(&rows(), "2026/10/18 09:00".into());

        assert!(report.remote.is_failure());
        assert_eq!(report.local, SinkOutcome::Written);
        assert_eq!(store.rows("main.xlsx", SHEET).len(), 1);
    }

    #[test]
    fn unconfigured_remote_is_skipped() {
        let store = MemoryStore::default();
        let skipped = SinkOutcome::Skipped("no spreadsheet id".into());
        let report = orchestrator(&store, RemoteSink::Unavailable(skipped.clone()))
            .run(&rows(), "2026/10/18 09:00".into());

        assert_eq!(report.remote, skipped);
        assert!(!report.remote.is_failure());
        assert!(report.local_ok());
    }

    #[test]
    fn retry_pauses_use_configured_backoff() {
        let store = MemoryStore::default();
        store.lock("main.xlsx");
        store.lock("backup.xlsx");
        let pauses = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&pauses);
        let local = LocalSheetWriter::new(store.clone(), SHEET, 3, Duration::from_secs(5))
            .with_pause(move |d| seen.borrow_mut().push(d));
        let orchestrator = AppendOrchestrator::new(
            local,
            "main.xlsx".into(),
            "backup.xlsx".into(),
            RemoteSink::<MemorySheets>::Unavailable(SinkOutcome::Skipped("off".into())),
        );

        let report = orchestrator.run(&rows(), "2026/10/18 09:00".into());
        assert!(report.local.is_failure());
        assert_eq!(store.save_attempts("main.xlsx"), 3);
        assert_eq!(store.save_attempts("backup.xlsx"), 3);
        assert_eq!(*pauses.borrow(), vec![Duration::from_secs(5); 4]);
        assert!(store.rows("main.xlsx", SHEET).is_empty());
    }
}
