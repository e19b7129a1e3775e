use std::sync::Arc;

use netward_core::config::ExpiryConfig;
use netward_core::types::{AlertLevel, EnforcementAction, StatisticsSnapshot, ThreatCategory};
use netward_core::{Blocklist, OutcomeLog};

use crate::engine::{CommandRunner, EnforcementDecisionEngine, RecordingRunner};
use crate::expiry::AutoExpiryScheduler;
use crate::gate::SafetyGate;
use crate::types::{GateDecision, PreemptiveCandidate, Verdict};

fn temp_stores(name: &str) -> (Arc<OutcomeLog>, Arc<Blocklist>) {
    let dir = std::env::temp_dir().join(name);
    std::fs::remove_dir_all(&dir).ok();
    (
        Arc::new(OutcomeLog::new(dir.join("outcomes.jsonl"))),
        Arc::new(Blocklist::new(dir.join("blocked_addresses.txt"))),
    )
}

fn engine_with(name: &str) -> (EnforcementDecisionEngine, Arc<OutcomeLog>, Arc<Blocklist>) {
    let (log, blocklist) = temp_stores(name);
    let engine = EnforcementDecisionEngine::new(
        "responder-test",
        Arc::new(RecordingRunner::default()),
        log.clone(),
        blocklist.clone(),
    );
    (engine, log, blocklist)
}

fn verdict(source: &str, category: &str, confidence: f64) -> Verdict {
    Verdict {
        source: source.into(),
        predicted_category: category.into(),
        confidence,
        explanation: None,
        recommended_action: None,
        requester_id: "scout-test".into(),
        stats: None,
    }
}

fn candidate(level: AlertLevel, action: EnforcementAction, current: f64, predicted: f64) -> PreemptiveCandidate {
    PreemptiveCandidate {
        source: "10.0.0.9".into(),
        alert_level: level,
        current_confidence: current,
        predicted_confidence: predicted,
        requested_action: action,
        requester_id: "scout-test".into(),
        category: Some("flood".into()),
        trend: Some("rising".into()),
        stats: None,
    }
}

// ── Decision engine ──────────────────────────────────────────────────────────

#[test]
fn test_category_fallback_table() {
    assert_eq!(
        EnforcementDecisionEngine::decide_action(&verdict("10.0.0.1", "flood", 0.9)),
        EnforcementAction::Block
    );
    assert_eq!(
        EnforcementDecisionEngine::decide_action(&verdict("10.0.0.1", "DDoS", 0.9)),
        EnforcementAction::Block
    );
    assert_eq!(
        EnforcementDecisionEngine::decide_action(&verdict("10.0.0.1", "PortScan", 0.9)),
        EnforcementAction::RedirectToHoneypot
    );
    assert_eq!(
        EnforcementDecisionEngine::decide_action(&verdict("10.0.0.1", "exfiltration", 0.9)),
        EnforcementAction::Quarantine
    );
    // Unknown categories fail safe to monitor
    assert_eq!(
        EnforcementDecisionEngine::decide_action(&verdict("10.0.0.1", "mystery", 0.9)),
        EnforcementAction::Monitor
    );
}

#[test]
fn test_explicit_recommendation_wins() {
    let mut v = verdict("10.0.0.1", "flood", 0.9);
    v.recommended_action = Some(EnforcementAction::RateLimit);
    assert_eq!(
        EnforcementDecisionEngine::decide_action(&v),
        EnforcementAction::RateLimit
    );
}

#[test]
fn test_execute_records_outcome_and_blocklist() {
    let (engine, log, blocklist) = engine_with("netward_engine_exec");
    let report = engine.execute(&verdict("10.0.0.1", "flood", 0.92)).unwrap();

    assert_eq!(report.action_taken, EnforcementAction::Block);
    assert!(report.success);
    assert_eq!(report.responder_id, "responder-test");
    assert!(blocklist.contains("10.0.0.1"));

    let records = log.load();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].attack_type, ThreatCategory::Flood);
    assert!(records[0].was_threat);
    assert_eq!(records[0].original_confidence, 0.92);
}

#[test]
fn test_monitor_does_not_touch_blocklist() {
    let (engine, log, blocklist) = engine_with("netward_engine_monitor");
    let report = engine.execute(&verdict("10.0.0.2", "unknown-thing", 0.3)).unwrap();

    assert_eq!(report.action_taken, EnforcementAction::Monitor);
    assert!(blocklist.is_empty());
    assert!(!log.load()[0].was_threat);
}

#[test]
fn test_malformed_verdicts_rejected_before_side_effects() {
    let (engine, log, blocklist) = engine_with("netward_engine_invalid");

    assert!(engine.execute(&verdict("", "flood", 0.9)).is_err());
    assert!(engine.execute(&verdict("10.0.0.1", "", 0.9)).is_err());
    assert!(engine.execute(&verdict("10.0.0.1", "flood", 1.5)).is_err());
    let mut v = verdict("10.0.0.1", "flood", 0.9);
    v.requester_id = String::new();
    assert!(engine.execute(&v).is_err());

    assert!(log.is_empty());
    assert!(blocklist.is_empty());
    assert_eq!(engine.decisions(), 0);
}

struct FailingRunner;

impl CommandRunner for FailingRunner {
    fn run(&self, _action: EnforcementAction, _source: &str) -> Result<(), String> {
        Err("netlink: permission denied".into())
    }
}

#[test]
fn test_failed_command_is_recorded_not_fatal() {
    let (log, blocklist) = temp_stores("netward_engine_fail");
    let engine = EnforcementDecisionEngine::new(
        "responder-test",
        Arc::new(FailingRunner),
        log.clone(),
        blocklist.clone(),
    );

    let report = engine.execute(&verdict("10.0.0.3", "flood", 0.95)).unwrap();
    assert!(!report.success);
    assert_eq!(engine.failures(), 1);
    // Outcome still recorded; blocklist untouched on failure
    let records = log.load();
    assert_eq!(records.len(), 1);
    assert!(!records[0].enforcement_success);
    assert!(blocklist.is_empty());
}

// ── Safety gate ──────────────────────────────────────────────────────────────

#[test]
fn test_gate_approves_valid_candidate() {
    let gate = SafetyGate::new(0.75, 0.85);
    let decision = gate.review(&candidate(
        AlertLevel::EarlyWarning,
        EnforcementAction::RateLimit,
        0.70,
        0.90,
    ));
    assert_eq!(decision, GateDecision::Approved);

    let decision = gate.review(&candidate(
        AlertLevel::EarlyWarning,
        EnforcementAction::ElevatedMonitor,
        0.10,
        0.86,
    ));
    assert_eq!(decision, GateDecision::Approved);
}

#[test]
fn test_gate_rejects_heavy_actions() {
    let gate = SafetyGate::new(0.75, 0.85);
    for action in [
        EnforcementAction::Block,
        EnforcementAction::RedirectToHoneypot,
        EnforcementAction::Quarantine,
        EnforcementAction::Monitor,
    ] {
        let decision = gate.review(&candidate(AlertLevel::EarlyWarning, action, 0.70, 0.90));
        assert!(!decision.is_approved(), "{} must not pass the gate", action);
    }
}

#[test]
fn test_gate_rejects_any_level_but_early_warning() {
    // Including confirmed: confirmed threats use the normal verdict path
    let gate = SafetyGate::new(0.75, 0.85);
    for level in [AlertLevel::Normal, AlertLevel::Elevated, AlertLevel::Confirmed] {
        for (current, predicted) in [(0.0, 0.0), (0.7, 0.9), (0.99, 0.99)] {
            let decision = gate.review(&candidate(
                level,
                EnforcementAction::RateLimit,
                current,
                predicted,
            ));
            assert!(
                !decision.is_approved(),
                "level {} with ({}, {}) must be rejected",
                level,
                current,
                predicted
            );
        }
    }
}

#[test]
fn test_gate_rejects_weak_prediction_and_confirmed_current() {
    let gate = SafetyGate::new(0.75, 0.85);

    let decision = gate.review(&candidate(
        AlertLevel::EarlyWarning,
        EnforcementAction::RateLimit,
        0.70,
        0.74,
    ));
    assert!(!decision.is_approved());

    let decision = gate.review(&candidate(
        AlertLevel::EarlyWarning,
        EnforcementAction::RateLimit,
        0.85,
        0.90,
    ));
    assert!(!decision.is_approved());
}

#[test]
fn test_gate_rejection_carries_reason() {
    let gate = SafetyGate::new(0.75, 0.85);
    match gate.review(&candidate(AlertLevel::Confirmed, EnforcementAction::RateLimit, 0.9, 0.9)) {
        GateDecision::Rejected { reason } => assert!(reason.contains("early_warning")),
        GateDecision::Approved => panic!("must be rejected"),
    }
}

// ── Auto-expiry ──────────────────────────────────────────────────────────────

fn expiry_config() -> ExpiryConfig {
    ExpiryConfig {
        sweep_interval_secs: 60,
        rate_limit_ttl_secs: 300,
        block_ttl_secs: 1_800,
    }
}

fn block_record(log: &OutcomeLog, source: &str, ts: i64, action: EnforcementAction) {
    log.append(&netward_core::types::OutcomeRecord::new(
        ts,
        source,
        StatisticsSnapshot::default(),
        ThreatCategory::Flood,
        0.9,
        action,
        true,
    ))
    .unwrap();
}

#[test]
fn test_expired_block_is_reverted_exactly_once() {
    let (log, blocklist) = temp_stores("netward_expiry_block");
    blocklist.add("10.0.0.5").unwrap();
    block_record(&log, "10.0.0.5", 1_000, EnforcementAction::Block);

    let scheduler = AutoExpiryScheduler::new(
        log.clone(),
        blocklist.clone(),
        Arc::new(RecordingRunner::default()),
        &expiry_config(),
        "responder-test",
    );

    // Age 2 000 s ≥ 1 800 s TTL: one reversal
    assert_eq!(scheduler.sweep(3_000), 1);
    assert!(!blocklist.contains("10.0.0.5"));
    let latest = log.latest_per_source();
    assert_eq!(latest["10.0.0.5"].action_taken, EnforcementAction::Unblock);

    // Latest action is now unblock; nothing further to revert
    assert_eq!(scheduler.sweep(10_000), 0);
    assert_eq!(scheduler.reversals_issued(), 1);
}

#[test]
fn test_fresh_block_survives_sweep() {
    let (log, blocklist) = temp_stores("netward_expiry_fresh");
    blocklist.add("10.0.0.6").unwrap();
    block_record(&log, "10.0.0.6", 1_000, EnforcementAction::Block);

    let scheduler = AutoExpiryScheduler::new(
        log,
        blocklist.clone(),
        Arc::new(RecordingRunner::default()),
        &expiry_config(),
        "responder-test",
    );
    assert_eq!(scheduler.sweep(1_500), 0);
    assert!(blocklist.contains("10.0.0.6"));
}

#[test]
fn test_rate_limit_expires_faster_than_block() {
    let (log, blocklist) = temp_stores("netward_expiry_rl");
    block_record(&log, "10.0.0.7", 1_000, EnforcementAction::RateLimit);
    blocklist.add("10.0.0.8").unwrap();
    block_record(&log, "10.0.0.8", 1_000, EnforcementAction::Block);

    let scheduler = AutoExpiryScheduler::new(
        log.clone(),
        blocklist,
        Arc::new(RecordingRunner::default()),
        &expiry_config(),
        "responder-test",
    );

    // At age 400 s only the rate limit is past its TTL
    assert_eq!(scheduler.sweep(1_400), 1);
    let latest = log.latest_per_source();
    assert_eq!(latest["10.0.0.7"].action_taken, EnforcementAction::RemoveRateLimit);
    assert_eq!(latest["10.0.0.8"].action_taken, EnforcementAction::Block);
}

#[test]
fn test_passive_actions_never_expire() {
    let (log, blocklist) = temp_stores("netward_expiry_passive");
    block_record(&log, "10.0.0.9", 0, EnforcementAction::Monitor);
    block_record(&log, "10.0.0.10", 0, EnforcementAction::Quarantine);

    let scheduler = AutoExpiryScheduler::new(
        log,
        blocklist,
        Arc::new(RecordingRunner::default()),
        &expiry_config(),
        "responder-test",
    );
    assert_eq!(scheduler.sweep(1_000_000), 0);
}

#[test]
fn test_reversal_is_issued_through_the_shared_runner() {
    let (log, blocklist) = temp_stores("netward_expiry_runner");
    let runner = Arc::new(RecordingRunner::default());
    let engine = EnforcementDecisionEngine::new(
        "responder-test",
        runner.clone(),
        log.clone(),
        blocklist.clone(),
    );
    let scheduler = AutoExpiryScheduler::new(
        log.clone(),
        blocklist.clone(),
        runner.clone(),
        &expiry_config(),
        "responder-test",
    );

    engine.execute(&verdict("10.0.0.42", "flood", 0.95)).unwrap();
    assert!(blocklist.contains("10.0.0.42"));

    // Rewind the recorded block so it is past its TTL, then sweep
    let records = log.load();
    let blocked_at = records[0].timestamp;
    assert_eq!(scheduler.sweep(blocked_at + 2_000), 1);

    let transcript = runner.actions.lock().clone();
    assert_eq!(
        transcript,
        vec![
            (EnforcementAction::Block, "10.0.0.42".to_string()),
            (EnforcementAction::Unblock, "10.0.0.42".to_string()),
        ]
    );
    assert!(!blocklist.contains("10.0.0.42"));
}

#[test]
fn test_failed_reversal_is_recorded_not_fatal() {
    let (log, blocklist) = temp_stores("netward_expiry_runner_fail");
    blocklist.add("10.0.0.43").unwrap();
    block_record(&log, "10.0.0.43", 0, EnforcementAction::Block);

    let scheduler = AutoExpiryScheduler::new(
        log.clone(),
        blocklist.clone(),
        Arc::new(FailingRunner),
        &expiry_config(),
        "responder-test",
    );
    assert_eq!(scheduler.sweep(5_000), 1);

    let latest = log.latest_per_source();
    let reversal = &latest["10.0.0.43"];
    assert_eq!(reversal.action_taken, EnforcementAction::Unblock);
    assert!(!reversal.enforcement_success);
    // Blocklist untouched when the command never took effect
    assert!(blocklist.contains("10.0.0.43"));
}

#[test]
fn test_reversal_record_is_not_a_threat() {
    let (log, blocklist) = temp_stores("netward_expiry_record");
    blocklist.add("10.0.0.11").unwrap();
    block_record(&log, "10.0.0.11", 0, EnforcementAction::Block);

    let scheduler = AutoExpiryScheduler::new(
        log.clone(),
        blocklist,
        Arc::new(RecordingRunner::default()),
        &expiry_config(),
        "responder-test",
    );
    scheduler.sweep(5_000);

    let latest = log.latest_per_source();
    let reversal = &latest["10.0.0.11"];
    assert!(!reversal.was_threat);
    assert_eq!(reversal.attack_type, ThreatCategory::Normal);
    assert!(reversal.enforcement_success);
}
