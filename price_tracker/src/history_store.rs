//! Durable history storage.
//!
//! A `HistoryStore` keeps one series per symbol and is overwritten, not appended,
//! on every save so that it mirrors the store's current window exactly. Loading is
//! best-effort seed data: a missing series is simply empty.
//!
//! - `FileHistoryStore` — one text file per symbol, `{dir}/{SYMBOL}_history.txt`,
//!   one `timestamp,price` line per sample, oldest first.
//! - `MemoryHistoryStore` — process-local map, for tests and dry runs.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::warn;
use price_common::defaults::{DATA_DIR, HISTORY_FILE_SUFFIX};
use price_common::{PriceSample, Result, TrackerError};

/// Durable per-symbol series storage.
pub trait HistoryStore: Send + Sync {
    /// Replace the stored series for `symbol` with `samples`.
    fn save(&self, symbol: &str, samples: &[PriceSample]) -> Result<()>;

    /// Stored series for `symbol`, oldest first; empty if none was saved.
    fn load(&self, symbol: &str) -> Result<Vec<PriceSample>>;
}

/// Flat-file history store.
#[derive(Debug, Clone)]
pub struct FileHistoryStore {
    dir: PathBuf,
}

impl Default for FileHistoryStore {
    fn default() -> Self {
        Self::new(DATA_DIR)
    }
}

impl FileHistoryStore {
    /// Store files under `dir`, created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the history files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File that holds the series for `symbol`.
    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}{HISTORY_FILE_SUFFIX}"))
    }

    fn write_file(path: &Path, samples: &[PriceSample]) -> std::io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        for sample in samples {
            writeln!(writer, "{}", sample.to_line())?;
        }
        writer.flush()?;
        writer.get_ref().sync_all()
    }
}

impl HistoryStore for FileHistoryStore {
    fn save(&self, symbol: &str, samples: &[PriceSample]) -> Result<()> {
        let target = self.path_for(symbol);
        let staging = target.with_extension("txt.tmp");

        fs::create_dir_all(&self.dir)
            .and_then(|_| Self::write_file(&staging, samples))
            .and_then(|_| fs::rename(&staging, &target))
            .map_err(|e| {
                let _ = fs::remove_file(&staging);
                TrackerError::Persist(format!("{}: {e}", target.display()))
            })
    }

    fn load(&self, symbol: &str) -> Result<Vec<PriceSample>> {
        let path = self.path_for(symbol);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(TrackerError::Io(e)),
        };

        let mut samples = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match PriceSample::parse_line(&line) {
                Ok(sample) => samples.push(sample),
                Err(e) => warn!("{}:{}: skipping line: {}", path.display(), idx + 1, e),
            }
        }
        Ok(samples)
    }
}

/// In-memory history store.
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    series: Mutex<HashMap<String, Vec<PriceSample>>>,
}

impl MemoryHistoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of symbols with a saved series.
    pub fn len(&self) -> usize {
        self.series().len()
    }

    /// Whether nothing has been saved.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A panic while holding the lock cannot leave a half-written series behind.
    fn series(&self) -> MutexGuard<'_, HashMap<String, Vec<PriceSample>>> {
        self.series.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn save(&self, symbol: &str, samples: &[PriceSample]) -> Result<()> {
        self.series().insert(symbol.to_string(), samples.to_vec());
        Ok(())
    }

    fn load(&self, symbol: &str) -> Result<Vec<PriceSample>> {
        Ok(self.series().get(symbol).cloned().unwrap_or_default())
    }
}
