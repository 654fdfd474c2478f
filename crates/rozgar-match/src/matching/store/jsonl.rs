use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use super::super::domain::{
    JobId, MatchId, MatchRecord, Notification, NotificationId, WorkerId,
};
use super::memory::{InMemoryMatchStore, InMemoryNotificationStore};
use super::{MatchStore, NotificationStore, StoreError};

/// Append-only file of JSON records, one per line. The file is held under an exclusive
/// advisory lock for as long as the log is open, so one directory has one writer.
#[derive(Debug)]
struct JsonlLog<T> {
    path: PathBuf,
    file: Mutex<File>,
    _record: PhantomData<fn() -> T>,
}

impl<T> JsonlLog<T>
where
    T: Serialize + DeserializeOwned,
{
    fn open(path: &Path) -> Result<(Self, Vec<T>), StoreError> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;
        lock_exclusive(&file, path)?;

        let mut raw = String::new();
        file.read_to_string(&mut raw)?;
        let (records, torn_tail) = parse_lines(path, &raw)?;

        match torn_tail {
            Some(TornTail::Complete) => file.write_all(b"\n")?,
            Some(TornTail::Partial { offset }) => {
                warn!(
                    path = %path.display(),
                    dropped_bytes = raw.len() - offset,
                    "discarding unterminated final record"
                );
                file.set_len(offset as u64)?;
            }
            None => {}
        }

        let log = Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
            _record: PhantomData,
        };
        Ok((log, records))
    }

    fn append(&self, record: &T) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut file = self.file.lock().map_err(|_| {
            StoreError::Unavailable(format!("{} lock poisoned", self.path.display()))
        })?;
        append_line(&mut *file, &line)?;
        Ok(())
    }
}

/// Unterminated last line found on open.
#[derive(Debug, PartialEq, Eq)]
enum TornTail {
    /// Parses as a record; only the newline is missing.
    Complete,
    /// Cut short mid-record; the file is truncated back to `offset`.
    Partial { offset: usize },
}

fn parse_lines<T: DeserializeOwned>(
    path: &Path,
    raw: &str,
) -> Result<(Vec<T>, Option<TornTail>), StoreError> {
    let mut records = Vec::new();
    let mut offset = 0;

    for (index, line) in raw.split_inclusive('\n').enumerate() {
        let terminated = line.ends_with('\n');
        let body = line.trim_end_matches(['\n', '\r']);
        let line_start = offset;
        offset += line.len();

        if body.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(body) {
            Ok(record) => {
                records.push(record);
                if !terminated {
                    return Ok((records, Some(TornTail::Complete)));
                }
            }
            Err(_) if !terminated => {
                return Ok((records, Some(TornTail::Partial { offset: line_start })));
            }
            Err(source) => {
                return Err(StoreError::Corrupt {
                    path: path.to_path_buf(),
                    line: index + 1,
                    source,
                })
            }
        }
    }
    Ok((records, None))
}

/// File-like sink whose length can be rolled back after a failed write.
trait LineSink: Write {
    fn byte_len(&self) -> io::Result<u64>;
    fn truncate_to(&mut self, len: u64) -> io::Result<()>;
}

impl LineSink for File {
    fn byte_len(&self) -> io::Result<u64> {
        self.metadata().map(|metadata| metadata.len())
    }

    fn truncate_to(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

/// Writes a whole line or nothing: a failed write is cut back to the prior length so the
/// next append never lands on a fragment.
fn append_line<S: LineSink>(sink: &mut S, line: &[u8]) -> io::Result<()> {
    let len = sink.byte_len()?;
    if let Err(error) = sink.write_all(line).and_then(|()| sink.flush()) {
        if let Err(rollback) = sink.truncate_to(len) {
            warn!(%rollback, "unable to roll back partial record");
        }
        return Err(error);
    }
    Ok(())
}

#[cfg(unix)]
fn lock_exclusive(file: &File, path: &Path) -> Result<(), StoreError> {
    use std::os::unix::io::AsRawFd;

    // SAFETY: the descriptor belongs to `file`, which outlives the call.
    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if rc == 0 {
        return Ok(());
    }
    let error = io::Error::last_os_error();
    if error.kind() == io::ErrorKind::WouldBlock {
        Err(StoreError::Unavailable(format!(
            "{} is already open by another store",
            path.display()
        )))
    } else {
        Err(error.into())
    }
}

#[cfg(not(unix))]
fn lock_exclusive(_file: &File, path: &Path) -> Result<(), StoreError> {
    warn!(path = %path.display(), "file locking unsupported; store directory must not be shared");
    Ok(())
}

/// Durable match store. The unique pair index is rebuilt from the file on open, and a new
/// line is only appended while the pair's slot in that index is held vacant.
#[derive(Debug)]
pub struct JsonlMatchStore {
    log: JsonlLog<MatchRecord>,
    index: InMemoryMatchStore,
}

impl JsonlMatchStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let (log, records) = JsonlLog::open(path.as_ref())?;
        Ok(Self {
            log,
            index: InMemoryMatchStore::from_records(records),
        })
    }
}

impl MatchStore for JsonlMatchStore {
    fn exists(&self, job_id: &JobId, worker_id: &WorkerId) -> Result<bool, StoreError> {
        self.index.exists(job_id, worker_id)
    }

    fn insert(&self, record: MatchRecord) -> Result<MatchId, StoreError> {
        self.index.insert_with(record, |record| self.log.append(record))
    }

    fn for_worker(&self, worker_id: &WorkerId) -> Result<Vec<MatchRecord>, StoreError> {
        self.index.for_worker(worker_id)
    }

    fn for_job(&self, job_id: &JobId) -> Result<Vec<MatchRecord>, StoreError> {
        self.index.for_job(job_id)
    }

    fn all(&self) -> Result<Vec<MatchRecord>, StoreError> {
        self.index.all()
    }

    fn count_for_job(&self, job_id: &JobId) -> Result<usize, StoreError> {
        self.index.count_for_job(job_id)
    }
}

#[derive(Debug)]
pub struct JsonlNotificationStore {
    log: JsonlLog<Notification>,
    cache: InMemoryNotificationStore,
}

impl JsonlNotificationStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let (log, records) = JsonlLog::open(path.as_ref())?;
        Ok(Self {
            log,
            cache: InMemoryNotificationStore::from_records(records),
        })
    }
}

impl NotificationStore for JsonlNotificationStore {
    fn insert(&self, notification: Notification) -> Result<NotificationId, StoreError> {
        self.log.append(&notification)?;
        self.cache.insert(notification)
    }

    fn for_worker(&self, worker_id: &WorkerId) -> Result<Vec<Notification>, StoreError> {
        self.cache.for_worker(worker_id)
    }
}
