//! JSON-lines store implementation.
//!
//! Layout inside the store directory:
//!
//! - `latest.json`: pretty-printed snapshot of the most recent reading.
//!   Replaced by writing a sibling temp file and renaming it over the old
//!   one, so readers never see a partial snapshot.
//! - `history.jsonl`: one reading per line, in receipt order. Each record is
//!   written with a single `write_all` on a file opened in append mode,
//!   after the snapshot has been replaced.

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use envlog_types::Reading;

use crate::error::Result;
use crate::{Backend, ReadingStore};

const LATEST_FILE: &str = "latest.json";
const LATEST_TMP_FILE: &str = "latest.json.tmp";
const HISTORY_FILE: &str = "history.jsonl";

/// File-backed store using a JSON snapshot and a JSON-lines log.
#[derive(Debug, Clone)]
pub struct LogStore {
    dir: PathBuf,
}

impl LogStore {
    /// Open (creating if needed) a log store rooted at `dir`.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        crate::ensure_dir(&dir)?;
        info!("Opening reading log at {}", dir.display());
        Ok(Self { dir })
    }

    /// Path of the history log.
    pub fn history_path(&self) -> PathBuf {
        self.dir.join(HISTORY_FILE)
    }

    /// Path of the latest-reading snapshot.
    pub fn latest_path(&self) -> PathBuf {
        self.dir.join(LATEST_FILE)
    }

    fn write_snapshot(&self, reading: &Reading) -> Result<()> {
        let tmp = self.dir.join(LATEST_TMP_FILE);
        let content = serde_json::to_string_pretty(reading)?;
        fs::write(&tmp, content)?;
        fs::rename(&tmp, self.latest_path())?;
        Ok(())
    }
}

impl ReadingStore for LogStore {
    fn append(&self, reading: &Reading) -> Result<()> {
        let mut line = serde_json::to_string(reading)?;
        line.push('\n');

        // The history line is the commit point, so it goes last
        self.write_snapshot(reading)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.history_path())?;
        file.write_all(line.as_bytes())?;

        debug!("Appended reading for zone {}", reading.zone());
        Ok(())
    }

    fn latest(&self) -> Result<Option<Reading>> {
        let path = self.latest_path();
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn scan(&self, limit: Option<usize>) -> Result<Vec<Reading>> {
        let path = self.history_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        if limit == Some(0) {
            return Ok(Vec::new());
        }

        // Keep only the trailing `limit` raw lines in memory
        let mut tail: VecDeque<(usize, Vec<u8>)> = VecDeque::new();
        let reader = BufReader::new(File::open(path)?);
        for (index, line) in reader.split(b'\n').enumerate() {
            tail.push_back((index + 1, line?));
            if limit.is_some_and(|l| tail.len() > l) {
                tail.pop_front();
            }
        }

        let readings = tail
            .into_iter()
            .filter(|(_, line)| !line.trim_ascii().is_empty())
            .filter_map(|(line_no, line)| match serde_json::from_slice(&line) {
                Ok(reading) => Some(reading),
                Err(e) => {
                    warn!("Skipping malformed history line {}: {}", line_no, e);
                    None
                }
            })
            .collect();

        Ok(readings)
    }

    fn count(&self) -> Result<u64> {
        let path = self.history_path();
        if !path.exists() {
            return Ok(0);
        }

        let reader = BufReader::new(File::open(path)?);
        let mut count = 0;
        for line in reader.split(b'\n') {
            if !line?.trim_ascii().is_empty() {
                count += 1;
            }
        }
        Ok(count)
    }

    fn backend(&self) -> Backend {
        Backend::Jsonl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(temperature: f64) -> Reading {
        Reading::new("Z1")
            .with_temperature(temperature)
            .with_humidity(40.0)
            .with_timestamp("2026-01-28 09:00:00")
    }

    fn temps(readings: &[Reading]) -> Vec<f64> {
        readings.iter().filter_map(|r| r.temperature_value()).collect()
    }

    #[test]
    fn test_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = LogStore::open(dir.path()).unwrap();

        assert!(store.latest().unwrap().is_none());
        assert!(store.scan(None).unwrap().is_empty());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_append_writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = LogStore::open(dir.path()).unwrap();

        store.append(&reading(20.0)).unwrap();
        store.append(&reading(21.0)).unwrap();

        let history = fs::read_to_string(store.history_path()).unwrap();
        assert_eq!(history.lines().count(), 2);
        assert!(!dir.path().join(LATEST_TMP_FILE).exists());

        let latest = store.latest().unwrap().unwrap();
        assert_eq!(latest.temperature_value(), Some(21.0));
    }

    #[test]
    fn test_failed_snapshot_skips_history() {
        let dir = tempfile::tempdir().unwrap();
        let store = LogStore::open(dir.path()).unwrap();

        // A directory in place of the snapshot makes the rename fail
        fs::create_dir(store.latest_path()).unwrap();

        assert!(store.append(&reading(20.0)).is_err());
        assert!(!store.history_path().exists());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_scan_tail_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = LogStore::open(dir.path()).unwrap();
        for t in [1.0, 2.0, 3.0, 4.0] {
            store.append(&reading(t)).unwrap();
        }

        assert_eq!(temps(&store.scan(None).unwrap()), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(temps(&store.scan(Some(3)).unwrap()), vec![2.0, 3.0, 4.0]);
        assert!(store.scan(Some(0)).unwrap().is_empty());
        assert_eq!(store.count().unwrap(), 4);
    }

    #[test]
    fn test_scan_skips_blank_and_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let store = LogStore::open(dir.path()).unwrap();
        store.append(&reading(1.0)).unwrap();

        let mut file = OpenOptions::new()
            .append(true)
            .open(store.history_path())
            .unwrap();
        file.write_all(b"\n{\"zone\": \"Z1\", \"temperature\"\n   \n")
            .unwrap();
        drop(file);

        store.append(&reading(2.0)).unwrap();

        assert_eq!(temps(&store.scan(None).unwrap()), vec![1.0, 2.0]);
        assert_eq!(store.count().unwrap(), 3);
    }

    #[test]
    fn test_reopen_sees_existing_records() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = LogStore::open(dir.path()).unwrap();
            store.append(&reading(5.0)).unwrap();
        }

        let store = LogStore::open(dir.path()).unwrap();
        assert_eq!(temps(&store.scan(None).unwrap()), vec![5.0]);
        assert_eq!(store.latest().unwrap().unwrap().temperature_value(), Some(5.0));
    }
}
