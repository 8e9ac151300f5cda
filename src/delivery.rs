//! Delivering encoded bytes as a named file
//!
//! Handing a file to the user is one scoped call, `FileSink::deliver`. Any
//! temporary resource it needs is released on every exit path, success or
//! failure.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use log::{debug, warn};

use crate::{Error, Result};

/// Where a delivered file ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivered {
    /// Final file name (may carry a ` (n)` suffix if the name was taken)
    pub filename: String,
    /// Filesystem location, for sinks that write to disk
    pub path: Option<PathBuf>,
}

#[async_trait]
pub trait FileSink: Send + Sync {
    async fn deliver(&self, filename: &str, bytes: &[u8]) -> Result<Delivered>;
}

/// `<prefix>-<tag>-<millis>.png`
pub fn export_filename(prefix: &str, tag: &str, unix_millis: u64) -> String {
    format!("{}-{}-{}.png", prefix, tag, unix_millis)
}

/// Milliseconds since the Unix epoch. A clock before the epoch reads as 0.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Most ` (n)` suffixes tried before a delivery gives up
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Writes delivered files into a directory
///
/// Bytes go to a uniquely named hidden temporary file first and are then
/// linked into place under a name nobody holds yet, so a reader never sees a
/// partial PNG and concurrent deliveries of the same name never collide. An
/// existing file is never overwritten: like a browser's download shelf, a
/// ` (n)` suffix is added instead. The temporary file is removed on every
/// failure path.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// `name.ext` -> `name (n).ext`
fn numbered_name(filename: &str, n: u32) -> String {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{} ({}).{}", stem, n, ext),
        _ => format!("{} ({})", filename, n),
    }
}

fn deliver_blocking(dir: &Path, filename: &str, bytes: &[u8]) -> Result<Delivered> {
    let failed = |what: &Path, e: std::io::Error| Error::DeliveryFailed(format!("{}: {}", what.display(), e));

    std::fs::create_dir_all(dir).map_err(|e| failed(dir, e))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".sketch-")
        .suffix(".part")
        .tempfile_in(dir)
        .map_err(|e| failed(dir, e))?;
    tmp.write_all(bytes).map_err(|e| failed(tmp.path(), e))?;
    tmp.as_file().sync_all().map_err(|e| failed(tmp.path(), e))?;

    let mut candidate = filename.to_string();
    for n in 1..=MAX_NAME_ATTEMPTS {
        let path = dir.join(&candidate);
        match tmp.persist_noclobber(&path) {
            Ok(_) => {
                return Ok(Delivered {
                    filename: candidate,
                    path: Some(path),
                })
            }
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                tmp = e.file;
                candidate = numbered_name(filename, n);
            }
            Err(e) => return Err(failed(&path, e.error)),
        }
    }
    // `tmp` drops here and removes itself
    Err(Error::DeliveryFailed(format!("no free name for {}", filename)))
}

#[async_trait]
impl FileSink for DirectorySink {
    async fn deliver(&self, filename: &str, bytes: &[u8]) -> Result<Delivered> {
        if filename.is_empty() || filename.contains(['/', '\\']) {
            return Err(Error::DeliveryFailed(format!("invalid file name: {:?}", filename)));
        }
        let dir = self.dir.clone();
        let name = filename.to_string();
        let bytes = bytes.to_vec();
        let len = bytes.len();

        let delivered = tokio::task::spawn_blocking(move || deliver_blocking(&dir, &name, &bytes))
            .await
            .map_err(|e| Error::DeliveryFailed(format!("delivery task failed: {}", e)))??;

        if delivered.filename != filename {
            warn!("{} already exists, delivered as {}", filename, delivered.filename);
        }
        if let Some(path) = &delivered.path {
            debug!("Delivered {} ({} bytes)", path.display(), len);
        }
        Ok(delivered)
    }
}

/// Keeps delivered files in memory; useful for embedding and tests
#[derive(Debug, Default)]
pub struct MemorySink {
    files: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files(&self) -> Vec<(String, Vec<u8>)> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl FileSink for MemorySink {
    async fn deliver(&self, filename: &str, bytes: &[u8]) -> Result<Delivered> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((filename.to_string(), bytes.to_vec()));
        Ok(Delivered {
            filename: filename.to_string(),
            path: None,
        })
    }
}
