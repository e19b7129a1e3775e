//! # Pipeline Data Contract — shared value types
//!
//! The four pipeline stages are coupled by a single data contract:
//! statistics → confidence → action → outcome → new thresholds.
//! The types that cross stage boundaries (and the wire / disk formats
//! derived from them) are defined here so every crate agrees on them.

use serde::{Deserialize, Serialize};

// ── Threat categories ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatCategory {
    Normal,
    Flood,
    Scan,
    Exfiltration,
}

impl ThreatCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatCategory::Normal => "normal",
            ThreatCategory::Flood => "flood",
            ThreatCategory::Scan => "scan",
            ThreatCategory::Exfiltration => "exfiltration",
        }
    }

    /// Map a free-form category label (our own names or upstream ones
    /// like "DDoS" / "PortScan") onto a category. Unknown labels map to
    /// `Normal` so downstream decision tables fail safe.
    pub fn from_label(label: &str) -> Self {
        let l = label.to_ascii_lowercase();
        if l.contains("flood") || l.contains("ddos") || l.contains("dos") || l.contains("syn") {
            ThreatCategory::Flood
        } else if l.contains("scan") {
            ThreatCategory::Scan
        } else if l.contains("exfil") || l.contains("infiltra") {
            ThreatCategory::Exfiltration
        } else {
            ThreatCategory::Normal
        }
    }
}

impl std::fmt::Display for ThreatCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Enforcement actions ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementAction {
    Monitor,
    ElevatedMonitor,
    RateLimit,
    Block,
    RedirectToHoneypot,
    Quarantine,
    Unblock,
    RemoveRateLimit,
}

impl EnforcementAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnforcementAction::Monitor => "monitor",
            EnforcementAction::ElevatedMonitor => "elevated_monitor",
            EnforcementAction::RateLimit => "rate_limit",
            EnforcementAction::Block => "block",
            EnforcementAction::RedirectToHoneypot => "redirect_to_honeypot",
            EnforcementAction::Quarantine => "quarantine",
            EnforcementAction::Unblock => "unblock",
            EnforcementAction::RemoveRateLimit => "remove_rate_limit",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "monitor" => Some(EnforcementAction::Monitor),
            "elevated_monitor" => Some(EnforcementAction::ElevatedMonitor),
            "rate_limit" => Some(EnforcementAction::RateLimit),
            "block" => Some(EnforcementAction::Block),
            "redirect_to_honeypot" => Some(EnforcementAction::RedirectToHoneypot),
            "quarantine" => Some(EnforcementAction::Quarantine),
            "unblock" => Some(EnforcementAction::Unblock),
            "remove_rate_limit" => Some(EnforcementAction::RemoveRateLimit),
            _ => None,
        }
    }

    /// Actions that assert the source was a real threat. Drives the
    /// inferred ground truth on every recorded outcome.
    pub fn implies_threat(&self) -> bool {
        matches!(
            self,
            EnforcementAction::Block
                | EnforcementAction::RedirectToHoneypot
                | EnforcementAction::Quarantine
        )
    }

    /// Actions that hold active state on the network and are subject to
    /// time-based auto-expiry.
    pub fn is_active_enforcement(&self) -> bool {
        matches!(
            self,
            EnforcementAction::Block
                | EnforcementAction::RedirectToHoneypot
                | EnforcementAction::RateLimit
        )
    }

    /// The action that reverts this one, if any.
    pub fn inverse(&self) -> Option<EnforcementAction> {
        match self {
            EnforcementAction::Block | EnforcementAction::RedirectToHoneypot => {
                Some(EnforcementAction::Unblock)
            }
            EnforcementAction::RateLimit => Some(EnforcementAction::RemoveRateLimit),
            _ => None,
        }
    }
}

impl std::fmt::Display for EnforcementAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Alert levels ─────────────────────────────────────────────────────────────

/// Derived per tick from (current, predicted) confidence; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Normal,
    Elevated,
    EarlyWarning,
    Confirmed,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Normal => "normal",
            AlertLevel::Elevated => "elevated",
            AlertLevel::EarlyWarning => "early_warning",
            AlertLevel::Confirmed => "confirmed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "normal" => Some(AlertLevel::Normal),
            "elevated" => Some(AlertLevel::Elevated),
            "early_warning" => Some(AlertLevel::EarlyWarning),
            "confirmed" => Some(AlertLevel::Confirmed),
            _ => None,
        }
    }
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Statistics snapshot ──────────────────────────────────────────────────────

/// Per-source derived metrics over one sliding window. Recomputed fresh
/// every evaluation; absent metrics deserialize to zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    #[serde(default)]
    pub packets_per_second: f64,
    #[serde(default)]
    pub bytes_per_second: f64,
    #[serde(default)]
    pub unique_dests: u64,
    #[serde(default)]
    pub syn_count: u64,
    #[serde(default)]
    pub port_entropy: f64,
    #[serde(default)]
    pub window_seconds: f64,
}

// ── Outcome record ───────────────────────────────────────────────────────────

/// One enforcement decision, durably logged. The append-only sequence of
/// these records is the ground-truth proxy replayed by threshold evolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeRecord {
    /// Unix seconds at the time the action was taken.
    pub timestamp: i64,
    pub source: String,
    pub stats: StatisticsSnapshot,
    pub attack_type: ThreatCategory,
    pub original_confidence: f64,
    pub action_taken: EnforcementAction,
    pub enforcement_success: bool,
    pub was_threat: bool,
}

impl OutcomeRecord {
    /// Build a record with `was_threat` inferred from the action:
    /// block / redirect_to_honeypot / quarantine assert a real threat,
    /// everything else does not.
    pub fn new(
        timestamp: i64,
        source: impl Into<String>,
        stats: StatisticsSnapshot,
        attack_type: ThreatCategory,
        original_confidence: f64,
        action_taken: EnforcementAction,
        enforcement_success: bool,
    ) -> Self {
        Self {
            timestamp,
            source: source.into(),
            stats,
            attack_type,
            original_confidence,
            action_taken,
            enforcement_success,
            was_threat: action_taken.implies_threat(),
        }
    }
}
