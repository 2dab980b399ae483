//! File-backed snapshot store with atomic replace

use crate::{
    error::{StoreReadError, StoreWriteError},
    types::{MarketRecord, Snapshot},
};
use chrono::{DateTime, Utc};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use uuid::Uuid;

/// Persists the latest snapshot as a JSON array of records
///
/// Writes go to a temporary file in the same directory which is then
/// renamed over the live file, so a reader sees either the previous
/// complete snapshot or the new one. The scrape time travels as the file's
/// modification time, stamped before the rename.
///
/// The store is the file's only writer; any number of readers may call
/// [`SnapshotStore::read`] concurrently without locking.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    /// Live snapshot file
    path: PathBuf,
    /// Where the previous snapshot is copied before each replace
    backup_path: Option<PathBuf>,
}

impl SnapshotStore {
    /// Creates a store for the given snapshot path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            backup_path: None,
        }
    }

    /// Keeps a copy of the previous snapshot at `backup_path`
    pub fn with_backup(mut self, backup_path: Option<PathBuf>) -> Self {
        self.backup_path = backup_path;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Checks if a snapshot file is present
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Atomically replaces the stored snapshot
    ///
    /// # Arguments
    /// * `snapshot` - Non-empty snapshot to persist
    ///
    /// # Returns
    /// Ok once the rename has completed. On error the previous file is untouched
    /// and the temporary file has been removed.
    pub fn write(&self, snapshot: &Snapshot) -> Result<(), StoreWriteError> {
        if snapshot.is_empty() {
            return Err(StoreWriteError::EmptySnapshot);
        }

        let tmp_path = self.temp_path();
        let result = write_temp(&tmp_path, snapshot).and_then(|()| {
            self.backup_current();
            fs::rename(&tmp_path, &self.path)?;
            Ok(())
        });

        if result.is_err() {
            if let Err(e) = fs::remove_file(&tmp_path) {
                if e.kind() != ErrorKind::NotFound {
                    tracing::warn!(path = %tmp_path.display(), error = %e, "Failed to remove temp snapshot");
                }
            }
        }

        if result.is_ok() {
            tracing::debug!(
                path = %self.path.display(),
                count = snapshot.len(),
                "Snapshot written"
            );
        }

        result
    }

    /// Loads the current snapshot
    ///
    /// # Returns
    /// The snapshot, or [`StoreReadError::Missing`] if nothing has been written yet
    pub fn read(&self) -> Result<Snapshot, StoreReadError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreReadError::Missing {
                    path: self.path.clone(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        // Metadata and contents both come from the open handle, so a rename
        // landing mid-read cannot mix two snapshots.
        let modified = file.metadata()?.modified()?;
        let records: Vec<MarketRecord> = serde_json::from_reader(BufReader::new(file))?;

        Ok(Snapshot::captured_at(DateTime::<Utc>::from(modified), records))
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "snapshot".to_string());
        self.directory()
            .join(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()))
    }

    /// Directory holding the live file; temp files must live here for rename to be atomic
    fn directory(&self) -> PathBuf {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    fn backup_current(&self) {
        let Some(backup_path) = &self.backup_path else {
            return;
        };
        if !self.path.is_file() {
            return;
        }
        if let Err(e) = copy_with_mtime(&self.path, backup_path) {
            tracing::warn!(
                backup = %backup_path.display(),
                error = %e,
                "Failed to write snapshot backup"
            );
        }
    }
}

/// Copies `from` to `to` and carries over the scrape time held in the mtime
fn copy_with_mtime(from: &Path, to: &Path) -> std::io::Result<()> {
    let modified = fs::metadata(from)?.modified()?;
    fs::copy(from, to)?;
    File::options().write(true).open(to)?.set_modified(modified)
}

fn write_temp(tmp_path: &Path, snapshot: &Snapshot) -> Result<(), StoreWriteError> {
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(tmp_path)?;

    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &snapshot.records)?;
    writer.write_all(b"\n")?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;

    file.set_modified(SystemTime::from(snapshot.captured_at))?;
    file.sync_all()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn snapshot(pairs: &[&str]) -> Snapshot {
        let captured_at = Utc.timestamp_opt(1_760_000_000, 0).unwrap();
        Snapshot::captured_at(
            captured_at,
            pairs
                .iter()
                .map(|p| MarketRecord::new(*p, "67250.85", "+1.35%"))
                .collect(),
        )
    }

    fn temp_files(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "tmp"))
            .collect()
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("crypto_data.json"));
        let snap = snapshot(&["BTC/USDT", "ETH/USDT"]);

        store.write(&snap).unwrap();
        let loaded = store.read().unwrap();

        assert_eq!(loaded, snap);
        assert!(temp_files(dir.path()).is_empty());
    }

    #[test]
    fn test_file_is_plain_record_array() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("crypto_data.json"));
        store.write(&snapshot(&["BTC/USDT"])).unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            value,
            serde_json::json!([{"pair": "BTC/USDT", "price": "67250.85", "change_24h": "+1.35%"}])
        );
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("nothing.json"));
        assert!(!store.exists());
        assert!(matches!(store.read(), Err(StoreReadError::Missing { .. })));
    }

    #[test]
    fn test_read_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crypto_data.json");
        fs::write(&path, "[{\"pair\": \"BTC/US").unwrap();

        let store = SnapshotStore::new(path);
        assert!(matches!(store.read(), Err(StoreReadError::Corrupt(_))));
    }

    #[test]
    fn test_empty_snapshot_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("crypto_data.json"));
        store.write(&snapshot(&["BTC/USDT"])).unwrap();

        let result = store.write(&Snapshot::new(Vec::new()));
        assert!(matches!(result, Err(StoreWriteError::EmptySnapshot)));
        assert_eq!(store.read().unwrap().records[0].pair, "BTC/USDT");
    }

    #[test]
    fn test_interrupted_write_leaves_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("crypto_data.json"));
        let good = snapshot(&["BTC/USDT"]);
        store.write(&good).unwrap();

        // A writer killed before its rename leaves only a truncated temp file.
        fs::write(
            dir.path().join(".crypto_data.json.deadbeef.tmp"),
            "[{\"pair\": \"ETH/USDT\", \"pri",
        )
        .unwrap();

        assert_eq!(store.read().unwrap(), good);
    }

    #[test]
    fn test_failed_write_keeps_old_file_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("crypto_data.json");
        // Renaming a file over a non-empty directory fails.
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep"), "x").unwrap();

        let store = SnapshotStore::new(&target);
        assert!(matches!(
            store.write(&snapshot(&["BTC/USDT"])),
            Err(StoreWriteError::Io(_))
        ));
        assert!(target.join("keep").exists());
        assert!(temp_files(dir.path()).is_empty());
    }

    #[test]
    fn test_backup_holds_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let backup = dir.path().join("crypto_data_backup.json");
        let store = SnapshotStore::new(dir.path().join("crypto_data.json"))
            .with_backup(Some(backup.clone()));

        let first = Snapshot::captured_at(
            Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            vec![MarketRecord::new("BTC/USDT", "1", "0%")],
        );
        store.write(&first).unwrap();
        assert!(!backup.exists());

        let second = Snapshot::captured_at(
            Utc.timestamp_opt(1_760_000_000, 0).unwrap(),
            vec![MarketRecord::new("ETH/USDT", "2", "0%")],
        );
        store.write(&second).unwrap();

        let previous = SnapshotStore::new(&backup).read().unwrap();
        assert_eq!(previous, first);
        assert_eq!(store.read().unwrap().records[0].pair, "ETH/USDT");
    }

    #[test]
    fn test_concurrent_reader_never_sees_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SnapshotStore::new(dir.path().join("crypto_data.json")));
        store.write(&snapshot(&["BTC/USDT"])).unwrap();

        let done = Arc::new(AtomicBool::new(false));
        let reader = {
            let store = store.clone();
            let done = done.clone();
            std::thread::spawn(move || {
                let mut reads = 0usize;
                loop {
                    let snap = store.read().expect("reader saw a partial snapshot");
                    assert!(snap.len() == 1 || snap.len() == 200);
                    reads += 1;
                    if done.load(Ordering::Acquire) {
                        return reads;
                    }
                }
            })
        };

        let pairs: Vec<String> = (0..200).map(|i| format!("PAIR{i}/USDT")).collect();
        let pairs: Vec<&str> = pairs.iter().map(String::as_str).collect();
        for i in 0..100 {
            if i % 2 == 0 {
                store.write(&snapshot(&pairs)).unwrap();
            } else {
                store.write(&snapshot(&["BTC/USDT"])).unwrap();
            }
        }
        done.store(true, Ordering::Release);

        assert!(reader.join().unwrap() > 0);
    }
}
