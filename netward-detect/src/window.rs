//! # Statistics Window — time-bounded flow observations per source
//!
//! Observations arrive epoch-ordered per source, so horizon eviction is a
//! prefix trim. Each source's buffer is bounded; when full, the oldest
//! observation drops rather than blocking the producer.

use parking_lot::RwLock;
use std::collections::{HashMap, HashSet, VecDeque};
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use netward_core::types::StatisticsSnapshot;

use crate::types::FlowObservation;

pub struct StatisticsWindow {
    horizon_secs: f64,
    max_per_source: usize,
    flows: RwLock<HashMap<IpAddr, VecDeque<FlowObservation>>>,
    total_ingested: AtomicU64,
    total_dropped: AtomicU64,
    total_evicted: AtomicU64,
}

impl StatisticsWindow {
    pub fn new(horizon_secs: f64, max_per_source: usize) -> Self {
        Self {
            horizon_secs,
            max_per_source,
            flows: RwLock::new(HashMap::new()),
            total_ingested: AtomicU64::new(0),
            total_dropped: AtomicU64::new(0),
            total_evicted: AtomicU64::new(0),
        }
    }

    pub fn horizon_secs(&self) -> f64 {
        self.horizon_secs
    }

    /// Ingest a batch of observations, keyed by source.
    pub fn ingest(&self, batch: &[FlowObservation]) {
        if batch.is_empty() {
            return;
        }
        let mut flows = self.flows.write();
        for obs in batch {
            let buf = flows.entry(obs.src).or_insert_with(VecDeque::new);
            if buf.len() >= self.max_per_source {
                buf.pop_front();
                self.total_dropped.fetch_add(1, Ordering::Relaxed);
            }
            buf.push_back(obs.clone());
        }
        self.total_ingested.fetch_add(batch.len() as u64, Ordering::Relaxed);
    }

    /// Evict observations older than the horizon relative to `now_ms`.
    /// Sources left empty are removed entirely.
    pub fn evict(&self, now_ms: i64) {
        let cutoff = now_ms - (self.horizon_secs * 1_000.0) as i64;
        let mut evicted = 0u64;
        let mut flows = self.flows.write();
        flows.retain(|_, buf| {
            while buf.front().map_or(false, |o| o.ts_ms < cutoff) {
                buf.pop_front();
                evicted += 1;
            }
            !buf.is_empty()
        });
        if evicted > 0 {
            self.total_evicted.fetch_add(evicted, Ordering::Relaxed);
            debug!(evicted = evicted, "Stale observations evicted");
        }
    }

    /// All sources currently holding observations.
    pub fn sources(&self) -> Vec<IpAddr> {
        self.flows.read().keys().copied().collect()
    }

    /// Derive fresh metrics for one source over the window width.
    /// Returns `None` for an unknown source.
    pub fn snapshot(&self, source: IpAddr) -> Option<StatisticsSnapshot> {
        let flows = self.flows.read();
        let buf = flows.get(&source)?;
        Some(Self::compute(buf, self.horizon_secs))
    }

    /// Snapshot every source at once so a whole tick sees one consistent
    /// view of the buffer.
    pub fn snapshot_all(&self) -> Vec<(IpAddr, StatisticsSnapshot)> {
        let flows = self.flows.read();
        flows
            .iter()
            .map(|(src, buf)| (*src, Self::compute(buf, self.horizon_secs)))
            .collect()
    }

    fn compute(buf: &VecDeque<FlowObservation>, window_secs: f64) -> StatisticsSnapshot {
        let width = if window_secs > 0.0 { window_secs } else { 1.0 };
        let packets = buf.len() as f64;
        let bytes: u64 = buf.iter().map(|o| o.bytes).sum();
        let syn_count = buf.iter().filter(|o| o.syn_only).count() as u64;
        let unique_dests = buf
            .iter()
            .map(|o| o.dst)
            .collect::<HashSet<_>>()
            .len() as u64;

        StatisticsSnapshot {
            packets_per_second: packets / width,
            bytes_per_second: bytes as f64 / width,
            unique_dests,
            syn_count,
            port_entropy: Self::port_entropy(buf),
            window_seconds: width,
        }
    }

    /// Shannon entropy (bits) of the destination-port multiset.
    fn port_entropy(buf: &VecDeque<FlowObservation>) -> f64 {
        if buf.is_empty() {
            return 0.0;
        }
        let mut counts: HashMap<u16, usize> = HashMap::new();
        for obs in buf {
            *counts.entry(obs.dst_port).or_insert(0) += 1;
        }
        let total = buf.len() as f64;
        counts
            .values()
            .map(|&c| {
                let p = c as f64 / total;
                -p * p.log2()
            })
            .sum()
    }

    pub fn total_ingested(&self) -> u64 {
        self.total_ingested.load(Ordering::Relaxed)
    }
    pub fn total_dropped(&self) -> u64 {
        self.total_dropped.load(Ordering::Relaxed)
    }
    pub fn total_evicted(&self) -> u64 {
        self.total_evicted.load(Ordering::Relaxed)
    }
    pub fn observation_count(&self) -> usize {
        self.flows.read().values().map(VecDeque::len).sum()
    }
}
