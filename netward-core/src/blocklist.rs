//! # Blocklist — newline-delimited blocked-address file
//!
//! Append-on-block, rewrite-on-unblock. Shared between the enforcement
//! path and the auto-expiry sweep, so all access goes through one Mutex.

use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::NetwardResult;

pub struct Blocklist {
    path: PathBuf,
    lock: Mutex<()>,
}

impl Blocklist {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current blocked addresses. Missing file yields an empty set.
    pub fn load(&self) -> BTreeSet<String> {
        let _guard = self.lock.lock();
        self.load_unlocked()
    }

    fn load_unlocked(&self) -> BTreeSet<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => content
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from)
                .collect(),
            Err(_) => BTreeSet::new(),
        }
    }

    /// Append `addr` if not already present. Returns true if it was added.
    pub fn add(&self, addr: &str) -> NetwardResult<bool> {
        let _guard = self.lock.lock();
        if self.load_unlocked().contains(addr) {
            debug!(addr = %addr, "Address already blocked");
            return Ok(false);
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", addr)?;
        info!(addr = %addr, "Address added to blocklist");
        Ok(true)
    }

    /// Remove `addr`, rewriting the file without it. Returns true if it
    /// was present.
    pub fn remove(&self, addr: &str) -> NetwardResult<bool> {
        let _guard = self.lock.lock();
        let mut addrs = self.load_unlocked();
        if !addrs.remove(addr) {
            debug!(addr = %addr, "Address not in blocklist");
            return Ok(false);
        }
        let mut content = String::new();
        for a in &addrs {
            content.push_str(a);
            content.push('\n');
        }
        std::fs::write(&self.path, content)?;
        info!(addr = %addr, "Address removed from blocklist");
        Ok(true)
    }

    pub fn contains(&self, addr: &str) -> bool {
        self.load().contains(addr)
    }

    pub fn len(&self) -> usize {
        self.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.load().is_empty()
    }
}
