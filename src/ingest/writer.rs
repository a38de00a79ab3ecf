// src/ingest/writer.rs
//! Append-only JSON array file.
//!
//! The closing bracket is rewritten on every append, so the file parses as a
//! complete array between any two calls, including after an interrupted run.

use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::ingest::error::IngestError;
use crate::vote::VoteRecord;

const TAIL_WINDOW: u64 = 4096;

/// Single writer for one output file. `append` takes `&mut self`, so two
/// appends to the same writer can never interleave.
#[derive(Debug)]
pub struct AppendWriter {
    path: PathBuf,
    file: File,
    /// Offset of the closing `]`; `None` while the file is still empty.
    close_at: Option<u64>,
    has_elements: bool,
    appended: usize,
}

impl AppendWriter {
    /// Open (or create) `path`. An existing file must already hold a JSON array.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, IngestError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| IngestError::write(&path, e))?;
            }
        }
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .await
            .map_err(|e| IngestError::write(&path, e))?;

        let (close_at, has_elements) = inspect(&mut file)
            .await
            .map_err(|e| IngestError::write(&path, e))?;

        tracing::debug!(
            target: "ingest",
            path = %path.display(),
            existing = has_elements,
            "output file opened"
        );
        Ok(Self {
            path,
            file,
            close_at,
            has_elements,
            appended: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records appended through this writer (not counting earlier runs).
    pub fn appended(&self) -> usize {
        self.appended
    }

    pub async fn append(&mut self, record: &VoteRecord) -> Result<(), IngestError> {
        let json = serde_json::to_vec(record)
            .map_err(|e| IngestError::write(&self.path, std::io::Error::other(e)))?;
        let close_at = self
            .write_element(&json)
            .await
            .map_err(|e| IngestError::write(&self.path, e))?;
        self.close_at = Some(close_at);
        self.has_elements = true;
        self.appended += 1;
        Ok(())
    }

    /// Returns the new offset of the closing bracket.
    async fn write_element(&mut self, json: &[u8]) -> std::io::Result<u64> {
        let (start, lead): (u64, &[u8]) = match self.close_at {
            None => (0, b"[\n"),
            Some(pos) if self.has_elements => (pos, b",\n"),
            Some(pos) => (pos, b""),
        };

        let mut buf = Vec::with_capacity(lead.len() + json.len() + 2);
        buf.extend_from_slice(lead);
        buf.extend_from_slice(json);
        buf.extend_from_slice(b"\n]");
        let close_at = start + buf.len() as u64 - 1;

        self.file.seek(SeekFrom::Start(start)).await?;
        self.file.write_all(&buf).await?;
        self.file.flush().await?;
        // Drop whatever followed the old bracket (trailing newline etc.).
        self.file.set_len(close_at + 1).await?;
        self.file.sync_data().await?;
        Ok(close_at)
    }
}

/// Append one record to the array at `path`, opening and closing the file.
pub async fn append(path: impl AsRef<Path>, record: &VoteRecord) -> Result<(), IngestError> {
    let mut writer = AppendWriter::open(path).await?;
    writer.append(record).await
}

/// Find the closing bracket of an existing array and whether it has elements.
async fn inspect(file: &mut File) -> std::io::Result<(Option<u64>, bool)> {
    let len = file.metadata().await?.len();
    if len == 0 {
        return Ok((None, false));
    }

    let start = len.saturating_sub(TAIL_WINDOW);
    file.seek(SeekFrom::Start(start)).await?;
    let mut tail = Vec::with_capacity((len - start) as usize);
    file.read_to_end(&mut tail).await?;

    let not_array =
        || std::io::Error::new(ErrorKind::InvalidData, "existing file is not a JSON array");

    let mut it = tail
        .iter()
        .enumerate()
        .rev()
        .filter(|(_, b)| !b.is_ascii_whitespace());
    let (close_idx, close) = match it.next() {
        Some(found) => found,
        // Whitespace only: same as a new file.
        None if start == 0 => return Ok((None, false)),
        None => return Err(not_array()),
    };
    if *close != b']' {
        return Err(not_array());
    }
    let has_elements = match it.next() {
        Some((_, &b'[')) => false,
        Some(_) => true,
        // Everything before the bracket is outside the window or whitespace.
        None if start > 0 => true,
        None => return Err(not_array()),
    };
    Ok((Some(start + close_idx as u64), has_elements))
}
