use std::fs::{DirBuilder, File, OpenOptions};
use std::io::{self, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tokio::task;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::cache::token::Token;
use crate::config::settings::ClientSettings;
use crate::error::{ClientError, Result};
use crate::helpers::time::{is_fresh, now_utc};
use crate::observability::metrics::{Metrics, OP_LOOKUP, OP_MKDIR, OP_STORE};
use crate::utils::constants::{CACHE_FILE_NAME, CACHE_RECORD_VERSION};

#[cfg(unix)]
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};

/// On-disk layout of the cached token.
#[derive(Debug, Serialize, Deserialize)]
struct CacheRecord {
    version: u32,
    access_token: String,
}

/// File-backed cache holding a single bearer token.
///
/// Freshness comes from the file's modification time. Reads take a shared
/// advisory lock, writes an exclusive one; both are held only for the
/// duration of the file operation.
#[derive(Clone)]
pub struct TokenCache {
    dir: PathBuf,
    ttl: Duration,
    tolerance_percent: u8,
    io_timeout: Duration,
    metrics: Arc<Metrics>,
}

impl TokenCache {
    pub fn new(
        dir: PathBuf,
        ttl: Duration,
        tolerance_percent: u8,
        io_timeout: Duration,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self { dir, ttl, tolerance_percent: tolerance_percent.min(100), io_timeout, metrics }
    }

    pub fn from_settings(settings: &ClientSettings, metrics: Arc<Metrics>) -> Self {
        Self::new(
            settings.cache.dir.clone(),
            settings.token_ttl(),
            settings.cache.tolerance_percent,
            settings.timeout(),
            metrics,
        )
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(CACHE_FILE_NAME)
    }

    pub fn tolerance_percent(&self) -> u8 {
        self.tolerance_percent
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Creates the cache directory and its parents when absent.
    pub async fn ensure_directory(&self) -> Result<()> {
        let dir = self.dir.clone();
        let create = task::spawn_blocking(move || create_dir(&dir));

        let result = match timeout(self.io_timeout, create).await {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => Err(io::Error::new(ErrorKind::Other, err)),
            Err(_) => Err(io::Error::new(
                ErrorKind::TimedOut,
                format!("cache directory creation timed out after {:?}", self.io_timeout),
            )),
        };
        result.map_err(|source| {
            self.metrics.cache_failures.with_label_values(&[OP_MKDIR]).inc();
            ClientError::CacheDir { path: self.dir.clone(), source }
        })
    }

    /// Returns the cached token if present and still within the tolerated window.
    pub async fn lookup(&self) -> Option<Token> {
        if self.tolerance_percent == 0 {
            return None;
        }
        let path = self.path();
        let read = task::spawn_blocking(move || read_locked(&path));

        let (content, modified) = match timeout(self.io_timeout, read).await {
            Ok(Ok(Ok(entry))) => entry,
            Ok(Ok(Err(err))) if err.kind() == ErrorKind::NotFound => {
                debug!("token cache: no cached token at '{}'", self.path().display());
                return None;
            }
            Ok(Ok(Err(err))) => {
                warn!("token cache: read failed, treating as miss: {}", err);
                self.metrics.cache_failures.with_label_values(&[OP_LOOKUP]).inc();
                return None;
            }
            Ok(Err(err)) => {
                warn!("token cache: read task failed: {}", err);
                self.metrics.cache_failures.with_label_values(&[OP_LOOKUP]).inc();
                return None;
            }
            Err(_) => {
                warn!("token cache: read timed out after {:?}", self.io_timeout);
                self.metrics.cache_failures.with_label_values(&[OP_LOOKUP]).inc();
                return None;
            }
        };

        let written_at: DateTime<Utc> = modified.into();
        if !is_fresh(written_at, now_utc(), self.ttl, self.tolerance_percent) {
            debug!("token cache: cached token written at {} is past the tolerated window", written_at);
            return None;
        }

        match serde_json::from_str::<CacheRecord>(&content) {
            Ok(record) if record.version == CACHE_RECORD_VERSION && !record.access_token.is_empty() => {
                debug!("token cache: hit");
                Some(Token::cached(record.access_token))
            }
            Ok(record) => {
                debug!("token cache: ignoring record with version {}", record.version);
                None
            }
            Err(err) => {
                warn!("token cache: malformed record, treating as miss: {}", err);
                self.metrics.cache_failures.with_label_values(&[OP_LOOKUP]).inc();
                None
            }
        }
    }

    /// Truncates and rewrites the cache file. No-op when tolerance is 0.
    pub async fn store(&self, token: &str) -> io::Result<()> {
        if self.tolerance_percent == 0 {
            return Ok(());
        }
        let record = CacheRecord { version: CACHE_RECORD_VERSION, access_token: token.to_owned() };
        let payload = serde_json::to_vec(&record).map_err(io::Error::from)?;
        let path = self.path();
        let write = task::spawn_blocking(move || write_locked(&path, &payload));

        let result = match timeout(self.io_timeout, write).await {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => Err(io::Error::new(ErrorKind::Other, err)),
            Err(_) => Err(io::Error::new(
                ErrorKind::TimedOut,
                format!("cache write timed out after {:?}", self.io_timeout),
            )),
        };
        if result.is_err() {
            self.metrics.cache_failures.with_label_values(&[OP_STORE]).inc();
        }
        result
    }
}

fn create_dir(dir: &Path) -> io::Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(0o775);
    builder.create(dir)
}

fn read_locked(path: &Path) -> io::Result<(String, SystemTime)> {
    let file = File::open(path)?;
    FileExt::lock_shared(&file)?;
    let result = read_entry(&file);
    let _ = FileExt::unlock(&file);
    result
}

fn read_entry(mut file: &File) -> io::Result<(String, SystemTime)> {
    let modified = file.metadata()?.modified()?;
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    Ok((content, modified))
}

fn write_locked(path: &Path, payload: &[u8]) -> io::Result<()> {
    let mut options = OpenOptions::new();
    // Truncation happens under the lock, never on open.
    options.create(true).write(true).truncate(false);
    #[cfg(unix)]
    options.mode(0o600);

    let file = options.open(path)?;
    FileExt::lock_exclusive(&file)?;
    let result = rewrite(&file, payload);
    let _ = FileExt::unlock(&file);
    result
}

fn rewrite(mut file: &File, payload: &[u8]) -> io::Result<()> {
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(payload)?;
    file.sync_data()
}
