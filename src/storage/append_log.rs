//! Append-only CSV log
//!
//! File layout:
//! ```text
//! header,row,written,once
//! record 1
//! record 2
//! ...
//! ```
//!
//! Writers on the same path are serialized by a process-wide lock registry, so
//! two handles opened on one file never interleave their lines. Readers take no
//! lock: they only trust newline-terminated lines, and every append writes its
//! whole line (newline included) in one call and syncs it before returning.

use crate::storage::record::{encode_line, split_line, CsvRecord};
use crate::utils::AppError;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex, OnceLock, PoisonError};
use std::io::SeekFrom;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Initial number of bytes `read_last` reads from the end of the file
const TAIL_WINDOW: u64 = 8 * 1024;

/// Result type for log operations
pub type LogResult<T> = Result<T, AppError>;

/// Lock shared by every handle writing to the same path
fn write_lock_for(path: &Path) -> Arc<Mutex<()>> {
    static WRITE_LOCKS: OnceLock<StdMutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();

    let key = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut locks = WRITE_LOCKS
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    locks.entry(key).or_default().clone()
}

/// Append-only log of typed records backed by a CSV file
pub struct AppendLog<R> {
    /// Backing file
    path: PathBuf,
    /// Per-path writer lock
    write_lock: Arc<Mutex<()>>,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for AppendLog<R> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            write_lock: Arc::clone(&self.write_lock),
            _record: PhantomData,
        }
    }
}

impl<R> std::fmt::Debug for AppendLog<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppendLog").field("path", &self.path).finish()
    }
}

impl<R: CsvRecord> AppendLog<R> {
    /// Open a handle on the log at `path`. Nothing is created until the
    /// first `ensure` or `append`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let write_lock = write_lock_for(&path);
        Self {
            path,
            write_lock,
            _record: PhantomData,
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the log with its header row if it does not exist yet
    pub async fn ensure(&self) -> LogResult<()> {
        let _guard = self.write_lock.lock().await;
        self.ensure_unlocked().await
    }

    /// Append one record as the next line, creating the log first if needed.
    /// An unterminated fragment left by an interrupted write is closed off
    /// first, so it stays a separate (skipped) line instead of swallowing
    /// this record.
    pub async fn append(&self, record: &R) -> LogResult<()> {
        let mut line = encode_line(&record.to_row());
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        self.ensure_unlocked().await?;
        if !self.ends_with_newline().await? {
            warn!(path = %self.path.display(), "Closing unterminated trailing line before append");
            line.insert(0, '\n');
        }
        self.write_line(&line).await?;

        debug!(path = %self.path.display(), "Record appended");
        Ok(())
    }

    /// Read every well-formed record in append order.
    /// A missing file reads as an empty log.
    pub async fn read_all(&self) -> LogResult<Vec<R>> {
        let content = match self.read_content().await? {
            Some(c) => c,
            None => return Ok(vec![]),
        };

        Ok(committed_lines(&content)
            .filter_map(|(line_no, line)| self.parse_line(Some(line_no), line))
            .collect())
    }

    /// Read the most recent well-formed record, if any.
    ///
    /// Only the tail of the file is read: the window starts at `TAIL_WINDOW`
    /// bytes and doubles until a record parses or the header is reached.
    pub async fn read_last(&self) -> LogResult<Option<R>> {
        let mut file = match File::open(&self.path).await {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AppError::io(&self.path, e)),
        };
        let len = file
            .metadata()
            .await
            .map_err(|e| AppError::io(&self.path, e))?
            .len();

        let mut window = TAIL_WINDOW.min(len);
        // Complete lines already examined by a smaller window
        let mut examined = 0;
        loop {
            let start = len - window;
            let mut buf = vec![0u8; window as usize];
            file.seek(SeekFrom::Start(start))
                .await
                .map_err(|e| AppError::io(&self.path, e))?;
            file.read_exact(&mut buf)
                .await
                .map_err(|e| AppError::io(&self.path, e))?;

            let content = String::from_utf8_lossy(&buf);
            let at_start = start == 0;
            let lines = tail_lines(&content);

            for line in lines.iter().skip(examined) {
                if let Some(record) = self.parse_line(None, line) {
                    return Ok(Some(record));
                }
            }

            if at_start {
                return Ok(None);
            }
            examined = lines.len();
            window = (window * 2).min(len);
        }
    }

    /// SAFETY: caller must hold `write_lock`
    async fn ensure_unlocked(&self) -> LogResult<()> {
        match fs::metadata(&self.path).await {
            Ok(meta) if meta.len() > 0 => return Ok(()),
            Ok(_) => {
                // Present but empty: the header still has to go first
                self.write_line(&header_line::<R>()).await?;
                info!(path = %self.path.display(), "Header written to empty log");
                return Ok(());
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(AppError::io(&self.path, e)),
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::io(parent, e))?;
        }

        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .await
        {
            Ok(f) => f,
            // Created by someone else in between; their header wins
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(()),
            Err(e) => return Err(AppError::io(&self.path, e)),
        };

        file.write_all(header_line::<R>().as_bytes())
            .await
            .map_err(|e| AppError::io(&self.path, e))?;
        file.sync_data()
            .await
            .map_err(|e| AppError::io(&self.path, e))?;

        info!(path = %self.path.display(), "Log created with header");
        Ok(())
    }

    /// SAFETY: caller must hold `write_lock`
    async fn write_line(&self, line: &str) -> LogResult<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| AppError::io(&self.path, e))?;

        file.write_all(line.as_bytes())
            .await
            .map_err(|e| AppError::io(&self.path, e))?;
        file.flush()
            .await
            .map_err(|e| AppError::io(&self.path, e))?;
        file.sync_data()
            .await
            .map_err(|e| AppError::io(&self.path, e))?;

        Ok(())
    }

    /// SAFETY: caller must hold `write_lock`
    async fn ends_with_newline(&self) -> LogResult<bool> {
        let mut file = File::open(&self.path)
            .await
            .map_err(|e| AppError::io(&self.path, e))?;
        let len = file
            .metadata()
            .await
            .map_err(|e| AppError::io(&self.path, e))?
            .len();
        if len == 0 {
            return Ok(true);
        }

        let mut last = [0u8; 1];
        file.seek(SeekFrom::Start(len - 1))
            .await
            .map_err(|e| AppError::io(&self.path, e))?;
        file.read_exact(&mut last)
            .await
            .map_err(|e| AppError::io(&self.path, e))?;
        Ok(last[0] == b'\n')
    }

    async fn read_content(&self) -> LogResult<Option<String>> {
        match fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::io(&self.path, e)),
        }
    }

    fn parse_line(&self, line_no: Option<usize>, line: &str) -> Option<R> {
        match R::from_row(&split_line(line)) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    line = ?line_no,
                    error = %e,
                    "Skipping malformed record"
                );
                None
            }
        }
    }
}

fn header_line<R: CsvRecord>() -> String {
    let mut line = encode_line(R::HEADER);
    line.push('\n');
    line
}

/// Complete data lines of a tail window, newest first. The first piece is
/// dropped: it is either cut by the window or, at offset 0, the header.
fn tail_lines(window: &str) -> Vec<&str> {
    let mut pieces: Vec<&str> = window.split('\n').collect();
    pieces.pop();
    if !pieces.is_empty() {
        pieces.remove(0);
    }

    pieces
        .into_iter()
        .rev()
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.trim().is_empty())
        .collect()
}

/// Data lines (1-based line numbers) that are complete: the header is skipped,
/// blank lines are ignored, and a trailing fragment without its newline is
/// treated as not yet written.
fn committed_lines(content: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut pieces: Vec<&str> = content.split('\n').collect();
    // The piece after the last newline is either empty or an unfinished line
    pieces.pop();

    pieces
        .into_iter()
        .enumerate()
        .skip(1)
        .map(|(index, line)| (index + 1, line.strip_suffix('\r').unwrap_or(line)))
        .filter(|(_, line)| !line.trim().is_empty())
}
