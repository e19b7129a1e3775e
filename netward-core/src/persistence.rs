//! # Persistence helpers — atomic JSON snapshots
//!
//! The best-genome file is overwritten on every evolution run; readers must
//! never observe a torn write. Writes go to a sibling temp file which is
//! then renamed over the target.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use tracing::debug;

use crate::error::NetwardResult;

/// Serialize `value` as pretty JSON and atomically replace `path` with it.
pub fn atomic_write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> NetwardResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json.as_bytes())?;
    std::fs::rename(&tmp, path)?;
    debug!(path = %path.display(), bytes = json.len(), "Snapshot written");
    Ok(())
}

/// Read a JSON file into `T`. Returns `Ok(None)` when the file is absent.
pub fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> NetwardResult<Option<T>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&content)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Snapshot {
        fitness: f64,
        generation: u32,
    }

    #[test]
    fn test_write_then_read() {
        let dir = std::env::temp_dir().join("netward_persist_rt");
        std::fs::remove_dir_all(&dir).ok();
        let path = dir.join("best.json");

        let snap = Snapshot { fitness: 0.875, generation: 20 };
        atomic_write_json(&path, &snap).unwrap();

        let loaded: Option<Snapshot> = read_json(&path).unwrap();
        assert_eq!(loaded, Some(snap));
        // No temp residue after a successful rename
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_overwrite_replaces_previous() {
        let dir = std::env::temp_dir().join("netward_persist_ow");
        std::fs::remove_dir_all(&dir).ok();
        let path = dir.join("best.json");

        atomic_write_json(&path, &Snapshot { fitness: 0.1, generation: 1 }).unwrap();
        atomic_write_json(&path, &Snapshot { fitness: 0.9, generation: 2 }).unwrap();

        let loaded: Snapshot = read_json(&path).unwrap().unwrap();
        assert_eq!(loaded.generation, 2);
    }

    #[test]
    fn test_absent_file_reads_none() {
        let missing: Option<Snapshot> =
            read_json(std::env::temp_dir().join("netward_persist_none.json")).unwrap();
        assert!(missing.is_none());
    }
}
