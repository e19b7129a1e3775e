//! # Event Bus — cross-stage observability backbone
//!
//! Publish/subscribe routing for pipeline events. Purely observational:
//! nothing on the decision path ever branches on bus state, and a missing
//! subscriber never blocks a publisher. Events flow as
//! Detection → Assessment → Response → Evolution.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Maximum events held before the oldest are pruned.
const MAX_EVENT_QUEUE: usize = 10_000;
const MAX_SUBSCRIBERS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub enum EventSeverity {
    Info,
    Medium,
    High,
    Critical,
}

/// Which pipeline stage an event originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum EventCategory {
    /// Per-source estimate or alert-level change
    Detection,
    /// Attack-graph / lateral-risk assessment
    Assessment,
    /// Enforcement action taken, gated, or reverted
    Response,
    /// Threshold evolution run completed
    Evolution,
    /// Lifecycle and health
    System,
}

/// One event flowing through the bus.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PipelineEvent {
    /// Monotonic event ID
    pub id: u64,
    /// Unix timestamp (millis)
    pub timestamp_ms: i64,
    pub component: String,
    pub category: EventCategory,
    pub severity: EventSeverity,
    pub title: String,
    pub details: HashMap<String, String>,
}

pub type SubscriberFn = Arc<dyn Fn(&PipelineEvent) + Send + Sync>;

struct Subscription {
    id: u64,
    name: String,
    filter_category: Option<EventCategory>,
    filter_severity_min: Option<EventSeverity>,
    callback: SubscriberFn,
}

/// The central bus shared by the tick loop, the responder, the expiry
/// sweep, and the evolver.
pub struct EventBus {
    subscriptions: RwLock<Vec<Subscription>>,
    event_log: RwLock<Vec<PipelineEvent>>,
    next_event_id: AtomicU64,
    next_sub_id: AtomicU64,
    total_published: AtomicU64,
    total_delivered: AtomicU64,
    total_dropped: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(Vec::new()),
            event_log: RwLock::new(Vec::with_capacity(256)),
            next_event_id: AtomicU64::new(1),
            next_sub_id: AtomicU64::new(1),
            total_published: AtomicU64::new(0),
            total_delivered: AtomicU64::new(0),
            total_dropped: AtomicU64::new(0),
        }
    }

    // ── Publishing ───────────────────────────────────────────────────────

    /// Publish a raw event. Returns the assigned event ID.
    pub fn publish(&self, mut event: PipelineEvent) -> u64 {
        let id = self.next_event_id.fetch_add(1, Ordering::Relaxed);
        event.id = id;
        if event.timestamp_ms == 0 {
            event.timestamp_ms = chrono::Utc::now().timestamp_millis();
        }
        self.total_published.fetch_add(1, Ordering::Relaxed);

        debug!(
            id = id,
            component = %event.component,
            cat = ?event.category,
            title = %event.title,
            "Event published"
        );

        let subs = self.subscriptions.read();
        for sub in subs.iter() {
            if Self::matches_filter(sub, &event) {
                (sub.callback)(&event);
                self.total_delivered.fetch_add(1, Ordering::Relaxed);
            }
        }
        drop(subs);

        let mut log = self.event_log.write();
        if log.len() >= MAX_EVENT_QUEUE {
            let drain_count = MAX_EVENT_QUEUE / 10;
            log.drain(..drain_count);
            self.total_dropped.fetch_add(drain_count as u64, Ordering::Relaxed);
        }
        log.push(event);

        id
    }

    /// Convenience: publish an event in the given category.
    pub fn emit(
        &self,
        category: EventCategory,
        component: &str,
        severity: EventSeverity,
        title: &str,
        details: HashMap<String, String>,
    ) -> u64 {
        self.publish(PipelineEvent {
            id: 0,
            timestamp_ms: 0,
            component: component.into(),
            category,
            severity,
            title: title.into(),
            details,
        })
    }

    // ── Subscribing ──────────────────────────────────────────────────────

    /// Subscribe to events. Returns a subscription ID for later unsubscribe.
    pub fn subscribe(
        &self,
        name: &str,
        filter_category: Option<EventCategory>,
        filter_severity_min: Option<EventSeverity>,
        callback: SubscriberFn,
    ) -> u64 {
        let id = self.next_sub_id.fetch_add(1, Ordering::Relaxed);
        let mut subs = self.subscriptions.write();
        if subs.len() >= MAX_SUBSCRIBERS {
            warn!(name = %name, "Max subscribers reached, dropping oldest");
            subs.remove(0);
        }
        subs.push(Subscription {
            id,
            name: name.into(),
            filter_category,
            filter_severity_min,
            callback,
        });
        id
    }

    pub fn unsubscribe(&self, sub_id: u64) -> bool {
        let mut subs = self.subscriptions.write();
        let before = subs.len();
        subs.retain(|s| s.id != sub_id);
        subs.len() < before
    }

    // ── Querying ─────────────────────────────────────────────────────────

    /// Most recent events (up to `limit`), optionally filtered by category.
    pub fn recent_events(
        &self,
        limit: usize,
        category: Option<EventCategory>,
    ) -> Vec<PipelineEvent> {
        let log = self.event_log.read();
        log.iter()
            .rev()
            .filter(|e| category.map_or(true, |c| e.category == c))
            .take(limit)
            .cloned()
            .collect()
    }

    // ── Stats ────────────────────────────────────────────────────────────

    pub fn total_published(&self) -> u64 {
        self.total_published.load(Ordering::Relaxed)
    }
    pub fn total_delivered(&self) -> u64 {
        self.total_delivered.load(Ordering::Relaxed)
    }
    pub fn total_dropped(&self) -> u64 {
        self.total_dropped.load(Ordering::Relaxed)
    }
    pub fn event_log_size(&self) -> usize {
        self.event_log.read().len()
    }
    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    fn matches_filter(sub: &Subscription, event: &PipelineEvent) -> bool {
        if let Some(cat) = sub.filter_category {
            if event.category != cat {
                return false;
            }
        }
        if let Some(min_sev) = sub.filter_severity_min {
            if event.severity < min_sev {
                return false;
            }
        }
        true
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_and_subscribe() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicU64::new(0));
        let c = counter.clone();

        bus.subscribe(
            "test_sub",
            Some(EventCategory::Detection),
            None,
            Arc::new(move |_event| {
                c.fetch_add(1, Ordering::Relaxed);
            }),
        );

        let id = bus.emit(
            EventCategory::Detection,
            "estimator",
            EventSeverity::High,
            "flood suspected",
            HashMap::new(),
        );

        assert!(id > 0);
        assert_eq!(counter.load(Ordering::Relaxed), 1);
        assert_eq!(bus.total_published(), 1);
        assert_eq!(bus.total_delivered(), 1);
    }

    #[test]
    fn test_category_filter() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicU64::new(0));
        let c = counter.clone();

        bus.subscribe(
            "response_only",
            Some(EventCategory::Response),
            None,
            Arc::new(move |_| {
                c.fetch_add(1, Ordering::Relaxed);
            }),
        );

        bus.emit(
            EventCategory::Detection,
            "estimator",
            EventSeverity::High,
            "det",
            HashMap::new(),
        );
        assert_eq!(counter.load(Ordering::Relaxed), 0);

        bus.emit(
            EventCategory::Response,
            "responder",
            EventSeverity::High,
            "blocked",
            HashMap::new(),
        );
        assert_eq!(counter.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_severity_floor() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicU64::new(0));
        let c = counter.clone();

        bus.subscribe(
            "high_only",
            None,
            Some(EventSeverity::High),
            Arc::new(move |_| {
                c.fetch_add(1, Ordering::Relaxed);
            }),
        );

        bus.emit(EventCategory::System, "tick", EventSeverity::Info, "tick", HashMap::new());
        assert_eq!(counter.load(Ordering::Relaxed), 0);

        bus.emit(
            EventCategory::Response,
            "responder",
            EventSeverity::Critical,
            "quarantine",
            HashMap::new(),
        );
        assert_eq!(counter.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_recent_events_order_and_filter() {
        let bus = EventBus::new();
        for i in 0..5 {
            bus.emit(
                EventCategory::Detection,
                "estimator",
                EventSeverity::Info,
                &format!("event-{}", i),
                HashMap::new(),
            );
        }
        bus.emit(
            EventCategory::Evolution,
            "evolver",
            EventSeverity::Info,
            "evolved",
            HashMap::new(),
        );

        let recent = bus.recent_events(3, Some(EventCategory::Detection));
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].title, "event-4");

        let all = bus.recent_events(100, None);
        assert_eq!(all.len(), 6);
    }

    #[test]
    fn test_unsubscribe() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicU64::new(0));
        let c = counter.clone();

        let sub_id = bus.subscribe(
            "temp",
            None,
            None,
            Arc::new(move |_| {
                c.fetch_add(1, Ordering::Relaxed);
            }),
        );
        bus.emit(EventCategory::System, "x", EventSeverity::Info, "e1", HashMap::new());
        assert_eq!(counter.load(Ordering::Relaxed), 1);

        assert!(bus.unsubscribe(sub_id));
        bus.emit(EventCategory::System, "x", EventSeverity::Info, "e2", HashMap::new());
        assert_eq!(counter.load(Ordering::Relaxed), 1);
    }
}
