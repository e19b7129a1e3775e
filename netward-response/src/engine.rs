//! # Enforcement Decision Engine — one verdict, one concrete action
//!
//! Decision priority: an explicit recommended action always wins over the
//! category fallback table. Unknown categories default to monitor — fail
//! safe, not fail closed. Malformed verdicts are rejected before any side
//! effect; a failed enforcement command is recorded with success=false and
//! never aborts the pipeline.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use netward_core::error::{NetwardError, NetwardResult};
use netward_core::event_bus::{EventBus, EventCategory, EventSeverity};
use netward_core::types::{EnforcementAction, OutcomeRecord, ThreatCategory};
use netward_core::{Blocklist, OutcomeLog};

use crate::types::{EnforcementReport, PreemptiveCandidate, Verdict};

/// Seam between the decision engine and the host network layer. The live
/// implementation issues firewall commands; the recording one only keeps
/// a transcript.
pub trait CommandRunner: Send + Sync {
    fn run(&self, action: EnforcementAction, source: &str) -> Result<(), String>;
}

/// Logs the command each action maps to without touching the host. The
/// default runner; dry-run first.
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    fn run(&self, action: EnforcementAction, source: &str) -> Result<(), String> {
        let command = match action {
            EnforcementAction::Block => format!("nft add element inet netward blocked {{ {} }}", source),
            EnforcementAction::Unblock => format!("nft delete element inet netward blocked {{ {} }}", source),
            EnforcementAction::RateLimit => format!("tc filter add dev eth0 u32 match ip src {} police rate 64kbit", source),
            EnforcementAction::RemoveRateLimit => format!("tc filter del dev eth0 u32 match ip src {}", source),
            EnforcementAction::RedirectToHoneypot => format!("nft add rule inet netward prerouting ip saddr {} dnat to honeypot", source),
            EnforcementAction::Quarantine => format!("nft add element inet netward quarantine {{ {} }}", source),
            EnforcementAction::Monitor | EnforcementAction::ElevatedMonitor => {
                info!(source = %source, action = %action, "Monitoring only, no network change");
                return Ok(());
            }
        };
        info!(source = %source, action = %action, command = %command, "Enforcement command issued");
        Ok(())
    }
}

/// Records every action for inspection; used by tests and dry-run mode.
#[derive(Default)]
pub struct RecordingRunner {
    pub actions: Mutex<Vec<(EnforcementAction, String)>>,
}

impl CommandRunner for RecordingRunner {
    fn run(&self, action: EnforcementAction, source: &str) -> Result<(), String> {
        self.actions.lock().push((action, source.to_string()));
        Ok(())
    }
}

pub struct EnforcementDecisionEngine {
    responder_id: String,
    runner: Arc<dyn CommandRunner>,
    outcome_log: Arc<OutcomeLog>,
    blocklist: Arc<Blocklist>,
    bus: Option<Arc<EventBus>>,
    decisions: AtomicU64,
    failures: AtomicU64,
}

impl EnforcementDecisionEngine {
    pub fn new(
        responder_id: impl Into<String>,
        runner: Arc<dyn CommandRunner>,
        outcome_log: Arc<OutcomeLog>,
        blocklist: Arc<Blocklist>,
    ) -> Self {
        Self {
            responder_id: responder_id.into(),
            runner,
            outcome_log,
            blocklist,
            bus: None,
            decisions: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    pub fn with_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn responder_id(&self) -> &str {
        &self.responder_id
    }

    pub fn decisions(&self) -> u64 {
        self.decisions.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Pure decision: explicit request wins, else the category table.
    pub fn decide_action(verdict: &Verdict) -> EnforcementAction {
        if let Some(action) = verdict.recommended_action {
            return action;
        }
        match ThreatCategory::from_label(&verdict.predicted_category) {
            ThreatCategory::Flood => EnforcementAction::Block,
            ThreatCategory::Scan => EnforcementAction::RedirectToHoneypot,
            ThreatCategory::Exfiltration => EnforcementAction::Quarantine,
            ThreatCategory::Normal => EnforcementAction::Monitor,
        }
    }

    fn validate(verdict: &Verdict) -> NetwardResult<()> {
        if verdict.source.trim().is_empty() {
            return Err(NetwardError::InvalidVerdict("missing source".into()));
        }
        if verdict.predicted_category.trim().is_empty() {
            return Err(NetwardError::InvalidVerdict("missing predicted_category".into()));
        }
        if verdict.requester_id.trim().is_empty() {
            return Err(NetwardError::InvalidVerdict("missing requester_id".into()));
        }
        if !(0.0..=1.0).contains(&verdict.confidence) {
            return Err(NetwardError::InvalidVerdict(format!(
                "confidence {} outside [0, 1]",
                verdict.confidence
            )));
        }
        Ok(())
    }

    /// Decide and enforce one confirmed verdict. Rejection happens before
    /// any side effect; a failed command is reported, not raised.
    pub fn execute(&self, verdict: &Verdict) -> NetwardResult<EnforcementReport> {
        Self::validate(verdict)?;
        let action = Self::decide_action(verdict);
        let category = ThreatCategory::from_label(&verdict.predicted_category);
        self.enforce(
            &verdict.source,
            action,
            category,
            verdict.confidence,
            verdict.stats.clone().unwrap_or_default(),
        )
    }

    /// Enforce a gate-approved preemptive candidate.
    pub fn execute_preemptive(&self, candidate: &PreemptiveCandidate) -> NetwardResult<EnforcementReport> {
        let category = candidate
            .category
            .as_deref()
            .map(ThreatCategory::from_label)
            .unwrap_or(ThreatCategory::Normal);
        self.enforce(
            &candidate.source,
            candidate.requested_action,
            category,
            candidate.current_confidence,
            candidate.stats.clone().unwrap_or_default(),
        )
    }

    fn enforce(
        &self,
        source: &str,
        action: EnforcementAction,
        category: ThreatCategory,
        confidence: f64,
        stats: netward_core::types::StatisticsSnapshot,
    ) -> NetwardResult<EnforcementReport> {
        let success = match self.runner.run(action, source) {
            Ok(()) => true,
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                warn!(source = %source, action = %action, error = %e, "Enforcement command failed");
                false
            }
        };

        if success && matches!(action, EnforcementAction::Block | EnforcementAction::RedirectToHoneypot) {
            if let Err(e) = self.blocklist.add(source) {
                warn!(source = %source, error = %e, "Blocklist update failed");
            }
        }

        let timestamp = chrono::Utc::now().timestamp();
        let record = OutcomeRecord::new(timestamp, source, stats, category, confidence, action, success);
        if let Err(e) = self.outcome_log.append(&record) {
            warn!(source = %source, error = %e, "Outcome log append failed");
        }

        self.decisions.fetch_add(1, Ordering::Relaxed);
        info!(
            source = %source,
            action = %action,
            category = %category,
            confidence = confidence,
            success = success,
            "Enforcement decision recorded"
        );

        if let Some(bus) = &self.bus {
            let mut details = HashMap::new();
            details.insert("source".into(), source.to_string());
            details.insert("action".into(), action.as_str().to_string());
            details.insert("success".into(), success.to_string());
            bus.emit(
                EventCategory::Response,
                "decision_engine",
                if action.implies_threat() { EventSeverity::High } else { EventSeverity::Info },
                &format!("{} {}", action, source),
                details,
            );
        }

        Ok(EnforcementReport {
            action_taken: action,
            success,
            responder_id: self.responder_id.clone(),
            timestamp,
        })
    }
}
