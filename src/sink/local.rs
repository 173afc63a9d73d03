use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::{error, info, warn};

use super::workbook::Workbook;
use super::xlsx::XlsxStore;
use super::AppendRecord;
use crate::config::Settings;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{} is locked or not writable: {}", .path.display(), .source)]
    Locked {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot read {}: {}", .path.display(), .message)]
    Read { path: PathBuf, message: String },

    #[error("cannot write {}: {}", .path.display(), .message)]
    Write { path: PathBuf, message: String },
}

impl StoreError {
    pub fn is_lock_conflict(&self) -> bool {
        matches!(self, StoreError::Locked { .. })
    }
}

/// True for errors a human holding the file open would cause.
pub fn is_lock_conflict(e: &io::Error) -> bool {
    if e.kind() == io::ErrorKind::PermissionDenied {
        return true;
    }
    // ERROR_SHARING_VIOLATION / ERROR_LOCK_VIOLATION
    cfg!(windows) && matches!(e.raw_os_error(), Some(32 | 33))
}

/// Where workbooks live. `load` returns `None` for a file that does not exist yet.
pub trait WorkbookStore {
    fn load(&self, path: &Path) -> Result<Option<Workbook>, StoreError>;
    fn save(&self, path: &Path, book: &Workbook) -> Result<(), StoreError>;
}

#[derive(Debug, Error)]
pub enum LocalWriteError {
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: StoreError,
    },

    #[error(transparent)]
    Fatal(StoreError),
}

/// Appends records to a worksheet in a local workbook, waiting out lock
/// conflicts a bounded number of times.
pub struct LocalSheetWriter<S = XlsxStore> {
    store: S,
    sheet_name: String,
    max_retries: u32,
    backoff: Duration,
    pause: Box<dyn Fn(Duration)>,
}

impl LocalSheetWriter<XlsxStore> {
    pub fn from_settings(settings: &Settings) -> Self {
        LocalSheetWriter::new(
            XlsxStore,
            &settings.sheet_name,
            settings.local.max_retries,
            settings.local.retry_backoff(),
        )
    }
}

impl<S: WorkbookStore> LocalSheetWriter<S> {
    /// `max_retries` is the total number of attempts per append. Every append
    /// makes at least one attempt, so 0 behaves like 1.
    pub fn new(store: S, sheet_name: &str, max_retries: u32, backoff: Duration) -> Self {
        LocalSheetWriter {
            store,
            sheet_name: sheet_name.to_string(),
            max_retries: max_retries.max(1),
            backoff,
            pause: Box::new(std::thread::sleep),
        }
    }

    /// Replace the blocking sleep between attempts.
    pub fn with_pause(mut self, pause: impl Fn(Duration) + 'static) -> Self {
        self.pause = Box::new(pause);
        self
    }

    /// Up to `max_retries` attempts in total (at least one). Only lock
    /// conflicts are retried; anything else fails on the spot.
    pub fn append(&self, path: &Path, record: &AppendRecord) -> Result<(), LocalWriteError> {
        let mut attempt = 1;
        loop {
            info!(
                path = %path.display(),
                "workbook write attempt {}/{}",
                attempt,
                self.max_retries
            );
            match self.append_once(path, record) {
                Ok(()) => {
                    info!(path = %path.display(), sheet = %self.sheet_name, "workbook updated");
                    return Ok(());
                }
                Err(e) if e.is_lock_conflict() => {
                    warn!(path = %path.display(), error = %e, "workbook busy (attempt {})", attempt);
                    if attempt >= self.max_retries {
                        warn!(path = %path.display(), "workbook may be open in another program");
                        return Err(LocalWriteError::Exhausted {
                            attempts: attempt,
                            last: e,
                        });
                    }
                    info!("retrying in {:.0}s", self.backoff.as_secs_f64());
                    (self.pause)(self.backoff);
                    attempt += 1;
                }
                Err(e) => {
                    error!(path = %path.display(), error = %e, "workbook write failed");
                    return Err(LocalWriteError::Fatal(e));
                }
            }
        }
    }

    fn append_once(&self, path: &Path, record: &AppendRecord) -> Result<(), StoreError> {
        let mut book = self.store.load(path)?.unwrap_or_default();
        let sheet = book.ensure_sheet(&self.sheet_name);
        sheet.append_row(record.cells());
        sheet.autofit_columns();
        self.store.save(path, &book)
    }
}
