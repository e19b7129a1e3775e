//! # Auto-Expiry Scheduler — time-based reversal of enforcement
//!
//! Runs on its own timer, independent of the tick loop. Each sweep finds
//! the most recent action per address; active enforcement older than its
//! kind-specific TTL gets the inverse action issued through the same
//! `CommandRunner` the forward path uses, a blocklist update, and a
//! fresh outcome record. I/O errors are logged and the timer carries on;
//! one failed sweep must never kill the background task.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use netward_core::config::ExpiryConfig;
use netward_core::event_bus::{EventBus, EventCategory, EventSeverity};
use netward_core::types::{EnforcementAction, OutcomeRecord, StatisticsSnapshot, ThreatCategory};
use netward_core::{Blocklist, OutcomeLog};

use crate::engine::CommandRunner;

pub struct AutoExpiryScheduler {
    outcome_log: Arc<OutcomeLog>,
    blocklist: Arc<Blocklist>,
    runner: Arc<dyn CommandRunner>,
    rate_limit_ttl_secs: i64,
    block_ttl_secs: i64,
    responder_id: String,
    bus: Option<Arc<EventBus>>,
    stop: AtomicBool,
    sweeps: AtomicU64,
    reversals: AtomicU64,
}

impl AutoExpiryScheduler {
    pub fn new(
        outcome_log: Arc<OutcomeLog>,
        blocklist: Arc<Blocklist>,
        runner: Arc<dyn CommandRunner>,
        config: &ExpiryConfig,
        responder_id: impl Into<String>,
    ) -> Self {
        Self {
            outcome_log,
            blocklist,
            runner,
            rate_limit_ttl_secs: config.rate_limit_ttl_secs,
            block_ttl_secs: config.block_ttl_secs,
            responder_id: responder_id.into(),
            bus: None,
            stop: AtomicBool::new(false),
            sweeps: AtomicU64::new(0),
            reversals: AtomicU64::new(0),
        }
    }

    pub fn with_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn sweeps_completed(&self) -> u64 {
        self.sweeps.load(Ordering::Relaxed)
    }

    pub fn reversals_issued(&self) -> u64 {
        self.reversals.load(Ordering::Relaxed)
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    fn ttl_for(&self, action: EnforcementAction) -> i64 {
        match action {
            EnforcementAction::RateLimit => self.rate_limit_ttl_secs,
            _ => self.block_ttl_secs,
        }
    }

    /// One sweep at `now` (unix seconds). Returns the number of reversals
    /// issued.
    pub fn sweep(&self, now: i64) -> usize {
        let latest = self.outcome_log.latest_per_source();
        let mut reverted = 0usize;

        for (source, record) in latest {
            if !record.action_taken.is_active_enforcement() {
                continue;
            }
            let age = now - record.timestamp;
            let ttl = self.ttl_for(record.action_taken);
            if age < ttl {
                continue;
            }
            let Some(inverse) = record.action_taken.inverse() else {
                continue;
            };

            debug!(
                source = %source,
                action = %record.action_taken,
                age_secs = age,
                ttl_secs = ttl,
                "Enforcement expired"
            );

            // Reversals go through the same seam as the forward path so
            // the network layer actually lifts what it applied.
            let success = match self.runner.run(inverse, &source) {
                Ok(()) => true,
                Err(e) => {
                    warn!(source = %source, action = %inverse, error = %e, "Reversal command failed");
                    false
                }
            };

            if success && matches!(inverse, EnforcementAction::Unblock) {
                if let Err(e) = self.blocklist.remove(&source) {
                    warn!(source = %source, error = %e, "Blocklist removal failed, will retry next sweep");
                    continue;
                }
            }

            let reversal = OutcomeRecord::new(
                now,
                source.clone(),
                StatisticsSnapshot::default(),
                ThreatCategory::Normal,
                0.0,
                inverse,
                success,
            );
            if let Err(e) = self.outcome_log.append(&reversal) {
                warn!(source = %source, error = %e, "Could not record reversal");
                continue;
            }

            self.reversals.fetch_add(1, Ordering::Relaxed);
            reverted += 1;
            info!(source = %source, expired = %record.action_taken, issued = %inverse, "Enforcement reverted");

            if let Some(bus) = &self.bus {
                let mut details = HashMap::new();
                details.insert("source".into(), source.clone());
                details.insert("expired_action".into(), record.action_taken.as_str().to_string());
                bus.emit(
                    EventCategory::Response,
                    "auto_expiry",
                    EventSeverity::Info,
                    &format!("{} reverted for {}", record.action_taken, source),
                    details,
                );
            }
        }

        self.sweeps.fetch_add(1, Ordering::Relaxed);
        reverted
    }

    /// Spawn the periodic sweep. Checks the stop flag between iterations
    /// only; a sweep in flight always completes.
    pub fn start(self: Arc<Self>, interval_secs: u64) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(std::time::Duration::from_secs(interval_secs.max(1)));
            loop {
                ticker.tick().await;
                if self.stop.load(Ordering::Relaxed) {
                    info!(
                        sweeps = self.sweeps_completed(),
                        reversals = self.reversals_issued(),
                        "Auto-expiry scheduler stopped"
                    );
                    break;
                }
                let now = chrono::Utc::now().timestamp();
                let reverted = self.sweep(now);
                if reverted > 0 {
                    info!(reverted = reverted, "Expiry sweep complete");
                }
            }
        })
    }
}
