use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use netward_core::types::{AlertLevel, EnforcementAction, StatisticsSnapshot, ThreatCategory};

use crate::belief::BeliefTracker;
use crate::estimator::{ThreatEstimator, Thresholds};
use crate::rolling::RollingInference;
use crate::types::{BeliefEntry, FlowObservation, Protocol, TrendDirection};
use crate::window::StatisticsWindow;

fn ip(last: u8) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
}

fn obs(src: IpAddr, dst: IpAddr, dst_port: u16, ts_ms: i64, bytes: u64, syn_only: bool) -> FlowObservation {
    FlowObservation {
        ts_ms,
        src,
        dst,
        dst_port,
        protocol: Protocol::Tcp,
        bytes,
        syn_only,
    }
}

fn default_estimator() -> ThreatEstimator {
    ThreatEstimator::new(Thresholds::default(), 200, 0.10, 0.10)
}

// ── Window ───────────────────────────────────────────────────────────────────

#[test]
fn test_window_snapshot_rates() {
    let window = StatisticsWindow::new(10.0, 5_000);
    let src = ip(1);
    let batch: Vec<_> = (0..100)
        .map(|i| obs(src, ip(2), 443, 1_000 + i * 10, 100, false))
        .collect();
    window.ingest(&batch);

    let snap = window.snapshot(src).unwrap();
    assert_eq!(snap.packets_per_second, 10.0);
    assert_eq!(snap.bytes_per_second, 1_000.0);
    assert_eq!(snap.unique_dests, 1);
    assert_eq!(snap.syn_count, 0);
    assert_eq!(snap.window_seconds, 10.0);
    // Single destination port has zero entropy
    assert_eq!(snap.port_entropy, 0.0);
}

#[test]
fn test_window_eviction_is_prefix_trim() {
    let window = StatisticsWindow::new(10.0, 5_000);
    let src = ip(1);
    window.ingest(&[
        obs(src, ip(2), 80, 1_000, 60, false),
        obs(src, ip(2), 80, 5_000, 60, false),
        obs(src, ip(2), 80, 12_000, 60, false),
    ]);

    window.evict(15_000); // cutoff at 5 000
    assert_eq!(window.observation_count(), 2);
    assert_eq!(window.total_evicted(), 1);

    window.evict(60_000); // everything stale; source removed entirely
    assert!(window.sources().is_empty());
}

#[test]
fn test_window_bounded_buffer_drops_oldest() {
    let window = StatisticsWindow::new(10.0, 5);
    let src = ip(1);
    let batch: Vec<_> = (0..8).map(|i| obs(src, ip(2), 80, i, 60, false)).collect();
    window.ingest(&batch);

    assert_eq!(window.observation_count(), 5);
    assert_eq!(window.total_dropped(), 3);
    // Oldest were dropped, newest kept
    let snap = window.snapshot(src).unwrap();
    assert_eq!(snap.packets_per_second, 0.5);
}

#[test]
fn test_port_entropy_spread() {
    let window = StatisticsWindow::new(10.0, 5_000);
    let src = ip(1);
    // 32 distinct ports, uniform → exactly 5 bits
    let batch: Vec<_> = (0..32u16)
        .map(|i| obs(src, ip(2), 1_000 + i, i as i64, 60, true))
        .collect();
    window.ingest(&batch);

    let snap = window.snapshot(src).unwrap();
    assert!((snap.port_entropy - 5.0).abs() < 1e-9);
}

// ── Estimator ────────────────────────────────────────────────────────────────

#[test]
fn test_all_zero_snapshot_is_normal() {
    let estimator = default_estimator();
    let estimate = estimator.estimate(&StatisticsSnapshot::default());
    assert_eq!(estimate.top_category, ThreatCategory::Normal);
    assert_eq!(estimate.top_confidence, 0.0);
    assert_eq!(estimate.recommended_action, EnforcementAction::Monitor);
}

#[test]
fn test_flood_scenario_syn_burst() {
    // 600 SYN-only observations of 60 bytes over a 10 s window
    let window = StatisticsWindow::new(10.0, 5_000);
    let src = ip(1);
    let batch: Vec<_> = (0..600)
        .map(|i| obs(src, ip(2), 80, i * 16, 60, true))
        .collect();
    window.ingest(&batch);

    let snap = window.snapshot(src).unwrap();
    assert_eq!(snap.packets_per_second, 60.0);
    assert_eq!(snap.syn_count, 600);
    assert_eq!(snap.port_entropy, 0.0);

    let estimate = default_estimator().estimate(&snap);
    assert_eq!(estimate.top_category, ThreatCategory::Flood);
    assert!(estimate.top_confidence > 0.9, "got {}", estimate.top_confidence);
    assert_eq!(estimate.recommended_action, EnforcementAction::Block);
}

#[test]
fn test_scan_scenario_port_sweep() {
    // 50 observations to 40 distinct destinations/ports over 10 s
    let window = StatisticsWindow::new(10.0, 5_000);
    let src = ip(1);
    let mut batch = Vec::new();
    for i in 0..50u16 {
        let d = (i % 40) as u8;
        batch.push(obs(src, ip(100 + d), 1_000 + (i % 40), i as i64 * 200, 60, true));
    }
    window.ingest(&batch);

    let snap = window.snapshot(src).unwrap();
    assert_eq!(snap.unique_dests, 40);
    assert!(snap.port_entropy > 5.0, "got {}", snap.port_entropy);

    let estimate = default_estimator().estimate(&snap);
    assert_eq!(estimate.top_category, ThreatCategory::Scan);
    assert!(estimate.top_confidence > 0.9);
    assert_eq!(estimate.recommended_action, EnforcementAction::RedirectToHoneypot);
}

#[test]
fn test_exfiltration_high_byte_rate() {
    let snap = StatisticsSnapshot {
        packets_per_second: 20.0,
        bytes_per_second: 1_200_000.0,
        unique_dests: 1,
        syn_count: 2,
        port_entropy: 0.3,
        window_seconds: 10.0,
    };
    let estimate = default_estimator().estimate(&snap);
    assert_eq!(estimate.top_category, ThreatCategory::Exfiltration);
    assert!(estimate.top_confidence > 0.9);
    assert_eq!(estimate.recommended_action, EnforcementAction::Quarantine);
}

#[test]
fn test_threshold_update_changes_verdict() {
    let estimator = default_estimator();
    let snap = StatisticsSnapshot {
        packets_per_second: 100.0,
        window_seconds: 10.0,
        ..Default::default()
    };
    let before = estimator.estimate(&snap);
    assert_eq!(before.top_category, ThreatCategory::Normal);

    let mut t = estimator.thresholds();
    t.flood_pps = 50.0;
    estimator.set_thresholds(t);

    let after = estimator.estimate(&snap);
    assert_eq!(after.top_category, ThreatCategory::Flood);
    assert!(after.top_confidence > 0.9);
}

// ── Belief ───────────────────────────────────────────────────────────────────

#[test]
fn test_history_ring_is_bounded() {
    let tracker = BeliefTracker::new(5, 0.85, 0.60, 0.02);
    let src = ip(1);
    for i in 0..12 {
        tracker.record(
            src,
            BeliefEntry {
                confidence: i as f64 / 12.0,
                category: ThreatCategory::Flood,
                tick_ts: i * 1_000,
            },
        );
    }
    let history = tracker.history(src);
    assert_eq!(history.len(), 5);
    // Oldest dropped: remaining entries are the most recent ticks
    assert_eq!(history[0].tick_ts, 7_000);
    assert_eq!(history[4].tick_ts, 11_000);
}

#[test]
fn test_trend_rising_extrapolation() {
    let tracker = BeliefTracker::new(20, 0.85, 0.60, 0.02);
    let src = ip(1);
    for (i, c) in [0.2, 0.4, 0.6, 0.8].iter().enumerate() {
        tracker.record(
            src,
            BeliefEntry {
                confidence: *c,
                category: ThreatCategory::Flood,
                tick_ts: i as i64 * 5_000,
            },
        );
    }
    let trend = tracker.trend(src);
    assert_eq!(trend.direction, TrendDirection::Rising);
    // Perfect line: one tick ahead of 0.8 is 1.0
    assert!((trend.predicted_confidence - 1.0).abs() < 1e-9);
}

#[test]
fn test_trend_prediction_clamped() {
    let tracker = BeliefTracker::new(20, 0.85, 0.60, 0.02);
    let src = ip(1);
    for (i, c) in [0.9, 0.5, 0.1].iter().enumerate() {
        tracker.record(
            src,
            BeliefEntry {
                confidence: *c,
                category: ThreatCategory::Scan,
                tick_ts: i as i64 * 5_000,
            },
        );
    }
    let trend = tracker.trend(src);
    assert_eq!(trend.direction, TrendDirection::Falling);
    assert_eq!(trend.predicted_confidence, 0.0);
}

#[test]
fn test_trend_single_point_is_flat() {
    let tracker = BeliefTracker::new(20, 0.85, 0.60, 0.02);
    let src = ip(1);
    tracker.record(
        src,
        BeliefEntry {
            confidence: 0.42,
            category: ThreatCategory::Scan,
            tick_ts: 1_000,
        },
    );
    let trend = tracker.trend(src);
    assert_eq!(trend.direction, TrendDirection::Stable);
    assert_eq!(trend.predicted_confidence, 0.42);
}

#[test]
fn test_alert_level_decision_table() {
    let tracker = BeliefTracker::new(20, 0.85, 0.60, 0.02);
    assert_eq!(tracker.alert_level(0.90, 0.10), AlertLevel::Confirmed);
    assert_eq!(tracker.alert_level(0.85, 0.85), AlertLevel::Confirmed);
    assert_eq!(tracker.alert_level(0.70, 0.90), AlertLevel::EarlyWarning);
    assert_eq!(tracker.alert_level(0.10, 0.85), AlertLevel::EarlyWarning);
    assert_eq!(tracker.alert_level(0.50, 0.70), AlertLevel::Elevated);
    assert_eq!(tracker.alert_level(0.84, 0.60), AlertLevel::Elevated);
    assert_eq!(tracker.alert_level(0.50, 0.50), AlertLevel::Normal);
    assert_eq!(tracker.alert_level(0.0, 0.0), AlertLevel::Normal);
}

#[test]
fn test_alert_level_partition_is_total_and_exclusive() {
    // Exactly one table row applies for every (current, predicted) pair
    let tracker = BeliefTracker::new(20, 0.85, 0.60, 0.02);
    for ci in 0..=20 {
        for pi in 0..=20 {
            let current = ci as f64 / 20.0;
            let predicted = pi as f64 / 20.0;
            let confirmed = current >= 0.85;
            let early = !confirmed && predicted >= 0.85;
            let elevated = !confirmed && !early && predicted >= 0.60;
            let expected = if confirmed {
                AlertLevel::Confirmed
            } else if early {
                AlertLevel::EarlyWarning
            } else if elevated {
                AlertLevel::Elevated
            } else {
                AlertLevel::Normal
            };
            assert_eq!(tracker.alert_level(current, predicted), expected);
        }
    }
}

// ── Rolling inference ────────────────────────────────────────────────────────

#[test]
fn test_tick_confirms_sustained_flood() {
    let window = Arc::new(StatisticsWindow::new(10.0, 5_000));
    let estimator = Arc::new(default_estimator());
    let belief = Arc::new(BeliefTracker::new(20, 0.85, 0.60, 0.02));
    let rolling = RollingInference::new(window, estimator, belief);

    let src = ip(1);
    let batch: Vec<_> = (0..600)
        .map(|i| obs(src, ip(2), 80, 10_000 + i * 16, 60, true))
        .collect();

    let assessments = rolling.tick(&batch, 20_000);
    assert_eq!(assessments.len(), 1);
    let a = &assessments[0];
    assert_eq!(a.source, src);
    assert_eq!(a.estimate.top_category, ThreatCategory::Flood);
    assert_eq!(a.alert_level, AlertLevel::Confirmed);
}

#[test]
fn test_tick_drops_vanished_sources() {
    let window = Arc::new(StatisticsWindow::new(10.0, 5_000));
    let estimator = Arc::new(default_estimator());
    let belief = Arc::new(BeliefTracker::new(20, 0.85, 0.60, 0.02));
    let rolling = RollingInference::new(window, estimator, belief.clone());

    let src = ip(1);
    rolling.tick(&[obs(src, ip(2), 80, 10_000, 60, false)], 11_000);
    assert_eq!(belief.tracked_sources(), 1);

    // Far future tick: source aged out, history pruned with it
    rolling.tick(&[], 200_000);
    assert_eq!(belief.tracked_sources(), 0);
}

#[test]
fn test_tick_is_quiet_on_benign_traffic() {
    let window = Arc::new(StatisticsWindow::new(10.0, 5_000));
    let estimator = Arc::new(default_estimator());
    let belief = Arc::new(BeliefTracker::new(20, 0.85, 0.60, 0.02));
    let rolling = RollingInference::new(window, estimator, belief);

    let src = ip(1);
    let batch: Vec<_> = (0..30)
        .map(|i| obs(src, ip(2), 443, 10_000 + i * 300, 500, false))
        .collect();
    let assessments = rolling.tick(&batch, 20_000);

    assert_eq!(assessments.len(), 1);
    assert_eq!(assessments[0].estimate.top_category, ThreatCategory::Normal);
    assert_eq!(assessments[0].alert_level, AlertLevel::Normal);
}
