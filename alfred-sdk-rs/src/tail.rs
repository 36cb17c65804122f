//! Follows the live server log.
//!
//! [`LogTail`] starts at the current end of the file and only ever yields
//! lines appended afterwards. When the file shrinks below the read offset it
//! has been truncated or rotated, and the tail reattaches at the end of the
//! new file. [`watch_chat`] drives a tail and feeds parsed chat events into the
//! bounded queue read by the reply dispatcher.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::TailError;
use crate::events::{ChatEvent, parse_chat_line};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Result of one read step.
#[derive(Debug, PartialEq, Eq)]
pub enum TailRead {
    Line(String),
    /// No complete line is available yet.
    Idle,
    /// The file was truncated or replaced and the tail moved to the new end.
    Reopened,
}

pub struct LogTail {
    path: PathBuf,
    reader: BufReader<File>,
    offset: u64,
    pending: Vec<u8>,
}

impl LogTail {
    /// Opens `path` positioned at its current end. Historical content is never replayed.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, TailError> {
        let path = path.as_ref().to_path_buf();
        let (reader, offset) = attach(&path).await?;
        info!("Attached to log {} at {} bytes", path.display(), offset);
        Ok(Self {
            path,
            reader,
            offset,
            pending: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte offset of everything consumed from the current physical file.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Reads the next complete line, or reports why none is available.
    ///
    /// Read errors other than end-of-stream are returned. A failure to stat or
    /// reopen the file during rotation is transient: it is logged and the
    /// caller sees `Idle`, so the next poll retries.
    pub async fn poll_next(&mut self) -> Result<TailRead, TailError> {
        let read = self
            .reader
            .read_until(b'\n', &mut self.pending)
            .await
            .map_err(|source| TailError::Read {
                path: self.path.clone(),
                source,
            })?;
        self.offset += read as u64;

        if self.pending.ends_with(b"\n") {
            let raw = std::mem::take(&mut self.pending);
            let line = String::from_utf8_lossy(&raw)
                .trim_end_matches(['\r', '\n'])
                .to_string();
            return Ok(TailRead::Line(line));
        }

        match tokio::fs::metadata(&self.path).await {
            Ok(meta) if meta.len() < self.offset => self.reopen().await,
            Ok(_) => Ok(TailRead::Idle),
            Err(e) => {
                debug!("stat {} failed during poll: {}", self.path.display(), e);
                Ok(TailRead::Idle)
            }
        }
    }

    async fn reopen(&mut self) -> Result<TailRead, TailError> {
        match attach(&self.path).await {
            Ok((reader, offset)) => {
                info!(
                    "Log {} shrank below {} bytes, reattached at {} bytes",
                    self.path.display(),
                    self.offset,
                    offset
                );
                self.reader = reader;
                self.offset = offset;
                self.pending.clear();
                Ok(TailRead::Reopened)
            }
            Err(e) => {
                warn!("reopen error: {}", e);
                Ok(TailRead::Idle)
            }
        }
    }
}

async fn attach(path: &Path) -> Result<(BufReader<File>, u64), TailError> {
    let open_err = |source| TailError::Open {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::open(path).await.map_err(open_err)?;
    let offset = file.seek(SeekFrom::End(0)).await.map_err(open_err)?;
    Ok((BufReader::new(file), offset))
}

/// Tails `path` and pushes every chat event into `out` until cancelled.
///
/// Enqueueing blocks while the queue is full, so a slow consumer throttles the
/// producer instead of losing events. Returns `Ok(())` on cancellation or when
/// the consumer hangs up; opening or reading the log fails fatally.
pub async fn watch_chat(
    path: impl AsRef<Path>,
    out: mpsc::Sender<ChatEvent>,
    cancel: CancellationToken,
    poll_interval: Duration,
) -> Result<(), TailError> {
    let mut tail = LogTail::open(path).await?;

    loop {
        if cancel.is_cancelled() {
            break;
        }
        match tail.poll_next().await? {
            TailRead::Line(line) => {
                let Some(event) = parse_chat_line(&line) else {
                    continue;
                };
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    sent = out.send(event) => {
                        if sent.is_err() {
                            debug!("chat queue closed, stopping log watcher");
                            break;
                        }
                    }
                }
            }
            TailRead::Reopened => {}
            TailRead::Idle => {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(poll_interval) => {}
                }
            }
        }
    }

    info!("Log watcher for {} stopped", tail.path().display());
    Ok(())
}
