use anyhow::{Context, Result};
use atomicwrites::{AtomicFile, OverwriteBehavior};
use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use leadx_core::Record;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

const SNAPSHOT_FILE: &str = "leadx.snapshot.json.gz";
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotData {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub entities: Vec<EntitySnapshot>,
}

/// Every record of one entity, soft-deleted ones included
#[derive(Debug, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub name: String,
    pub records: Vec<Record>,
}

/// Gzip-compressed JSON snapshot written by atomic replace
pub struct SnapshotPersistence {
    path: PathBuf,
    last_save: Mutex<Option<DateTime<Utc>>>,
}

impl SnapshotPersistence {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            path: data_dir.as_ref().join(SNAPSHOT_FILE),
            last_save: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot from disk (on startup)
    pub fn load(&self) -> Result<Option<SnapshotData>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let file = File::open(&self.path)
            .with_context(|| format!("failed to open snapshot {}", self.path.display()))?;
        let snapshot: SnapshotData = serde_json::from_reader(GzDecoder::new(BufReader::new(file)))
            .with_context(|| format!("failed to decode snapshot {}", self.path.display()))?;

        if snapshot.version != SNAPSHOT_VERSION {
            anyhow::bail!(
                "unsupported snapshot version {} (expected {})",
                snapshot.version,
                SNAPSHOT_VERSION
            );
        }
        *self.last_save.lock() = Some(snapshot.saved_at);
        Ok(Some(snapshot))
    }

    /// Write the snapshot; readers never observe a partially written file
    pub fn save(&self, snapshot: &SnapshotData) -> Result<()> {
        let json = serde_json::to_vec(snapshot).context("failed to serialize snapshot")?;

        AtomicFile::new(&self.path, OverwriteBehavior::AllowOverwrite)
            .write(|file| -> std::io::Result<()> {
                let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
                encoder.write_all(&json)?;
                encoder.finish()?.flush()
            })
            .map_err(|e| anyhow::anyhow!("failed to write snapshot {}: {e}", self.path.display()))?;

        *self.last_save.lock() = Some(snapshot.saved_at);
        Ok(())
    }

    /// Time of the last snapshot written or loaded
    pub fn last_save_time(&self) -> Option<DateTime<Utc>> {
        *self.last_save.lock()
    }
}
