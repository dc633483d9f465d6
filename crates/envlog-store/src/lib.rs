//! Local persistence for envlog readings.
//!
//! Every backend implements the same small contract, [`ReadingStore`]:
//! append a reading, report the most recent one, and stream stored readings
//! back in receipt order. Views built on top of a store never mutate it.
//!
//! Two backends are provided:
//!
//! - [`Store`]: SQLite, the default. Appends and the latest snapshot are
//!   written in one transaction.
//! - [`LogStore`]: a directory holding `latest.json` and an append-only
//!   `history.jsonl`. The snapshot is replaced atomically via rename.
//!
//! # Example
//!
//! ```
//! use envlog_store::{ReadingStore, Store};
//! use envlog_types::Reading;
//!
//! let store = Store::open_in_memory()?;
//! store.append(&Reading::new("Z1").with_temperature(21.0))?;
//!
//! let latest = store.latest()?.expect("one reading stored");
//! assert_eq!(latest.temperature_value(), Some(21.0));
//! assert_eq!(store.scan(Some(10))?.len(), 1);
//! # Ok::<(), envlog_store::Error>(())
//! ```

mod error;
mod log;
mod schema;
mod store;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use envlog_types::Reading;

pub use error::{Error, Result};
pub use log::LogStore;
pub use store::Store;

/// Storage contract shared by all backends.
///
/// Readings come back from [`scan`](ReadingStore::scan) oldest first, in the
/// order they were appended. Records that can no longer be decoded are
/// skipped rather than failing the scan.
pub trait ReadingStore: Send {
    /// Append a reading and make it the latest snapshot.
    fn append(&self, reading: &Reading) -> Result<()>;

    /// The most recently appended reading, if any.
    fn latest(&self) -> Result<Option<Reading>>;

    /// The most recent `limit` readings (all of them for `None`), oldest first.
    fn scan(&self, limit: Option<usize>) -> Result<Vec<Reading>>;

    /// Number of stored readings.
    fn count(&self) -> Result<u64>;

    /// Short backend name for diagnostics.
    fn backend(&self) -> Backend;
}

/// Available storage backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// SQLite database file.
    #[default]
    Sqlite,
    /// Directory with a JSON snapshot and a JSON-lines history log.
    Jsonl,
}

impl Backend {
    /// Default location for this backend, following platform conventions.
    ///
    /// - Linux: `~/.local/share/envlog/`
    /// - macOS: `~/Library/Application Support/envlog/`
    /// - Windows: `C:\Users\<user>\AppData\Local\envlog\`
    pub fn default_path(self) -> PathBuf {
        let base = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("envlog");
        match self {
            Backend::Sqlite => base.join("data.db"),
            Backend::Jsonl => base.join("log"),
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Sqlite => write!(f, "sqlite"),
            Backend::Jsonl => write!(f, "jsonl"),
        }
    }
}

/// Open a store of the given kind at `path`.
///
/// For [`Backend::Sqlite`] `path` is the database file; for
/// [`Backend::Jsonl`] it is the directory holding the log.
pub fn open(backend: Backend, path: &Path) -> Result<Box<dyn ReadingStore>> {
    Ok(match backend {
        Backend::Sqlite => Box::new(Store::open(path)?),
        Backend::Jsonl => Box::new(LogStore::open(path)?),
    })
}

/// Create `dir` and its parents if it does not exist yet.
pub(crate) fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.as_os_str().is_empty() && !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| Error::CreateDirectory {
            path: dir.to_path_buf(),
            source: e,
        })?;
    }
    Ok(())
}
