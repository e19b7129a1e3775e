//! # Outcome Log — append-only JSONL ledger of enforcement decisions
//!
//! One `OutcomeRecord` per line. Written by the enforcement path and by the
//! auto-expiry sweep; both go through the same `OutcomeLog` so writes are
//! serialized and records never interleave. Malformed lines are skipped on
//! read so one bad write cannot poison threshold evolution.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

use crate::error::NetwardResult;
use crate::types::OutcomeRecord;

pub struct OutcomeLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl OutcomeLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record as a single JSON line.
    pub fn append(&self, record: &OutcomeRecord) -> NetwardResult<()> {
        let line = serde_json::to_string(record)?;
        let _guard = self.lock.lock();
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        debug!(
            source = %record.source,
            action = %record.action_taken,
            was_threat = record.was_threat,
            "Outcome recorded"
        );
        Ok(())
    }

    /// Load all records. Missing file yields an empty list; unparseable
    /// lines are skipped.
    pub fn load(&self) -> Vec<OutcomeRecord> {
        let _guard = self.lock.lock();
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "Could not read outcome log");
                return Vec::new();
            }
        };
        content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|l| serde_json::from_str(l).ok())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The most recent record per source address, by log order.
    pub fn latest_per_source(&self) -> HashMap<String, OutcomeRecord> {
        let mut latest = HashMap::new();
        for record in self.load() {
            latest.insert(record.source.clone(), record);
        }
        latest
    }
}
