use hdrhistogram::Histogram;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::config::MetricsConfig;

/// Process-wide counters for the matchmaking server.
///
/// Counters are lock-free atomics. Session durations and the rolling event
/// windows sit behind a single async mutex since they need ordered buffers.
#[derive(Debug)]
pub struct ServerMetrics {
    // Connection metrics
    pub total_connections: AtomicU64,
    pub active_connections: AtomicU64,
    pub disconnections: AtomicU64,
    pub rejected_connections: AtomicU64,
    pub websocket_messages_dropped: AtomicU64,
    pub idle_clients_evicted: AtomicU64,

    // Matchmaking metrics
    pub matchmaking_requests: AtomicU64,
    pub matches_made: AtomicU64,
    pub skips: AtomicU64,
    pub stops: AtomicU64,

    // Room metrics
    pub extension_requests: AtomicU64,
    pub extensions_granted: AtomicU64,
    pub rooms_expired: AtomicU64,
    pub rooms_closed: AtomicU64,

    // Moderation
    pub reports: AtomicU64,

    // Signaling relay
    pub signals_relayed: AtomicU64,
    pub signals_dropped: AtomicU64,

    // Error tracking
    pub validation_errors: AtomicU64,
    pub malformed_messages: AtomicU64,
    pub oversized_messages: AtomicU64,

    activity: Mutex<ActivityTracker>,
}

/// Events counted in the trailing rolling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollingEvent {
    Connection,
    Match,
    Skip,
    Report,
    Expiry,
    Extension,
}

impl RollingEvent {
    const ALL: [Self; 6] = [
        Self::Connection,
        Self::Match,
        Self::Skip,
        Self::Report,
        Self::Expiry,
        Self::Extension,
    ];

    const fn index(self) -> usize {
        match self {
            Self::Connection => 0,
            Self::Match => 1,
            Self::Skip => 2,
            Self::Report => 3,
            Self::Expiry => 4,
            Self::Extension => 5,
        }
    }
}

#[derive(Debug)]
struct ActivityTracker {
    sessions: SessionDurationTracker,
    rolling: RollingCounters,
}

/// Completed-session durations: a bounded trailing window for the average and
/// a histogram over every session for percentiles.
#[derive(Debug, Clone)]
pub struct SessionDurationTracker {
    recent: VecDeque<Duration>,
    capacity: usize,
    histogram: Option<Histogram<u64>>,
    clamped_samples: u64,
}

const LOWEST_DISCERNIBLE_MILLIS: u64 = 1;
const HIGHEST_TRACKABLE_MILLIS: u64 = 24 * 60 * 60 * 1000; // one day
const SIGNIFICANT_FIGURES: u8 = 3;
const MILLIS_PER_SEC: f64 = 1000.0;

impl SessionDurationTracker {
    pub fn new(capacity: usize) -> Self {
        let histogram = Histogram::new_with_bounds(
            LOWEST_DISCERNIBLE_MILLIS,
            HIGHEST_TRACKABLE_MILLIS,
            SIGNIFICANT_FIGURES,
        )
        .or_else(|e| {
            tracing::warn!(
                target: "metrics",
                error = %e,
                "Failed to create session histogram with bounds, using auto-resizing fallback"
            );
            Histogram::new(2)
        })
        .ok();

        if histogram.is_none() {
            tracing::error!(target: "metrics", "Session histogram unavailable; percentiles disabled");
        }

        Self {
            recent: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
            histogram,
            clamped_samples: 0,
        }
    }

    pub fn record(&mut self, duration: Duration) {
        if self.recent.len() == self.capacity {
            self.recent.pop_front();
        }
        self.recent.push_back(duration);

        let millis = duration_to_millis(duration).max(LOWEST_DISCERNIBLE_MILLIS);
        let value = if millis > HIGHEST_TRACKABLE_MILLIS {
            self.clamped_samples += 1;
            HIGHEST_TRACKABLE_MILLIS
        } else {
            millis
        };
        if let Some(histogram) = self.histogram.as_mut() {
            if let Err(error) = histogram.record(value) {
                tracing::warn!(target: "metrics", %error, value, "failed to record session duration");
            }
        }
    }

    /// Mean over the trailing window, `None` before the first session ends.
    pub fn average(&self) -> Option<Duration> {
        if self.recent.is_empty() {
            return None;
        }
        let total: Duration = self.recent.iter().sum();
        let count = u32::try_from(self.recent.len()).unwrap_or(u32::MAX);
        Some(total / count)
    }

    pub fn metrics(&self) -> SessionDurationMetrics {
        let average_secs = self.average().map(|d| d.as_secs_f64());
        let histogram = self.histogram.as_ref().filter(|h| !h.is_empty());
        let percentile =
            |p: f64| histogram.map(|h| h.value_at_percentile(p) as f64 / MILLIS_PER_SEC);

        SessionDurationMetrics {
            window_size: self.recent.len(),
            average_secs,
            p50_secs: percentile(50.0),
            p95_secs: percentile(95.0),
            p99_secs: percentile(99.0),
            max_secs: histogram.map(|h| h.max() as f64 / MILLIS_PER_SEC),
            sample_count: histogram.map_or(0, Histogram::len),
            clamped_samples: self.clamped_samples,
        }
    }
}

fn duration_to_millis(duration: Duration) -> u64 {
    duration.as_millis().min(u128::from(u64::MAX)) as u64
}

/// Timestamped events trimmed to a trailing window.
#[derive(Debug, Clone)]
pub struct RollingCounters {
    window: Duration,
    events: [VecDeque<Instant>; 6],
}

impl RollingCounters {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            events: Default::default(),
        }
    }

    pub fn record_at(&mut self, event: RollingEvent, at: Instant) {
        let buffer = &mut self.events[event.index()];
        buffer.push_back(at);
        Self::trim(buffer, self.window, at);
    }

    pub fn count_at(&mut self, event: RollingEvent, now: Instant) -> u64 {
        let buffer = &mut self.events[event.index()];
        Self::trim(buffer, self.window, now);
        buffer.len() as u64
    }

    fn trim(buffer: &mut VecDeque<Instant>, window: Duration, now: Instant) {
        while let Some(oldest) = buffer.front() {
            if now.saturating_duration_since(*oldest) > window {
                buffer.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn metrics_at(&mut self, now: Instant) -> RollingMetrics {
        let mut counts = [0_u64; 6];
        for event in RollingEvent::ALL {
            counts[event.index()] = self.count_at(event, now);
        }
        RollingMetrics {
            window_secs: self.window.as_secs(),
            connections: counts[RollingEvent::Connection.index()],
            matches: counts[RollingEvent::Match.index()],
            skips: counts[RollingEvent::Skip.index()],
            reports: counts[RollingEvent::Report.index()],
            expirations: counts[RollingEvent::Expiry.index()],
            extensions: counts[RollingEvent::Extension.index()],
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MetricsSnapshot {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub connections: ConnectionMetrics,
    pub matchmaking: MatchmakingMetrics,
    pub rooms: RoomMetrics,
    pub moderation: ModerationMetrics,
    pub signaling: SignalingMetrics,
    pub errors: ErrorMetrics,
    pub rolling: RollingMetrics,
    pub sessions: SessionDurationMetrics,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ConnectionMetrics {
    pub total_connections: u64,
    pub active_connections: u64,
    pub disconnections: u64,
    pub rejected_connections: u64,
    pub websocket_messages_dropped: u64,
    pub idle_clients_evicted: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MatchmakingMetrics {
    pub matchmaking_requests: u64,
    pub matches_made: u64,
    pub skips: u64,
    pub stops: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RoomMetrics {
    pub extension_requests: u64,
    pub extensions_granted: u64,
    pub rooms_expired: u64,
    pub rooms_closed: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ModerationMetrics {
    pub reports: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SignalingMetrics {
    pub signals_relayed: u64,
    pub signals_dropped: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ErrorMetrics {
    pub validation_errors: u64,
    pub malformed_messages: u64,
    pub oversized_messages: u64,
    pub total_errors: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct RollingMetrics {
    pub window_secs: u64,
    pub connections: u64,
    pub matches: u64,
    pub skips: u64,
    pub reports: u64,
    pub expirations: u64,
    /// Mutually granted extensions
    pub extensions: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct SessionDurationMetrics {
    /// Sessions currently in the averaging window
    pub window_size: usize,
    pub average_secs: Option<f64>,
    pub p50_secs: Option<f64>,
    pub p95_secs: Option<f64>,
    pub p99_secs: Option<f64>,
    pub max_secs: Option<f64>,
    /// Sessions recorded since startup
    pub sample_count: u64,
    pub clamped_samples: u64,
}

impl Default for ServerMetrics {
    fn default() -> Self {
        Self::new(&MetricsConfig::default())
    }
}

impl ServerMetrics {
    pub fn new(config: &MetricsConfig) -> Self {
        Self {
            total_connections: AtomicU64::new(0),
            active_connections: AtomicU64::new(0),
            disconnections: AtomicU64::new(0),
            rejected_connections: AtomicU64::new(0),
            websocket_messages_dropped: AtomicU64::new(0),
            idle_clients_evicted: AtomicU64::new(0),
            matchmaking_requests: AtomicU64::new(0),
            matches_made: AtomicU64::new(0),
            skips: AtomicU64::new(0),
            stops: AtomicU64::new(0),
            extension_requests: AtomicU64::new(0),
            extensions_granted: AtomicU64::new(0),
            rooms_expired: AtomicU64::new(0),
            rooms_closed: AtomicU64::new(0),
            reports: AtomicU64::new(0),
            signals_relayed: AtomicU64::new(0),
            signals_dropped: AtomicU64::new(0),
            validation_errors: AtomicU64::new(0),
            malformed_messages: AtomicU64::new(0),
            oversized_messages: AtomicU64::new(0),
            activity: Mutex::new(ActivityTracker {
                sessions: SessionDurationTracker::new(config.session_window_size),
                rolling: RollingCounters::new(Duration::from_secs(config.rolling_window_secs)),
            }),
        }
    }

    async fn record_rolling(&self, event: RollingEvent) {
        self.activity
            .lock()
            .await
            .rolling
            .record_at(event, Instant::now());
    }

    // Connection metrics
    pub async fn increment_connections(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
        self.record_rolling(RollingEvent::Connection).await;
    }

    pub fn decrement_active_connections(&self) {
        // fetch_update keeps concurrent decrements from wrapping below zero
        let _ =
            self.active_connections
                .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                    if current > 0 {
                        Some(current - 1)
                    } else {
                        None
                    }
                });
        self.disconnections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rejected_connections(&self) {
        self.rejected_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_websocket_messages_dropped(&self) {
        self.websocket_messages_dropped
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_idle_clients_evicted(&self, count: u64) {
        if count > 0 {
            self.idle_clients_evicted.fetch_add(count, Ordering::Relaxed);
        }
    }

    // Matchmaking metrics
    pub fn increment_matchmaking_requests(&self) {
        self.matchmaking_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub async fn increment_matches(&self) {
        self.matches_made.fetch_add(1, Ordering::Relaxed);
        self.record_rolling(RollingEvent::Match).await;
    }

    pub async fn increment_skips(&self) {
        self.skips.fetch_add(1, Ordering::Relaxed);
        self.record_rolling(RollingEvent::Skip).await;
    }

    pub fn increment_stops(&self) {
        self.stops.fetch_add(1, Ordering::Relaxed);
    }

    // Room metrics
    pub fn increment_extension_requests(&self) {
        self.extension_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub async fn increment_extensions_granted(&self) {
        self.extensions_granted.fetch_add(1, Ordering::Relaxed);
        self.record_rolling(RollingEvent::Extension).await;
    }

    pub async fn increment_rooms_expired(&self) {
        self.rooms_expired.fetch_add(1, Ordering::Relaxed);
        self.record_rolling(RollingEvent::Expiry).await;
    }

    /// Count a room teardown and feed its lifetime into the session tracker.
    pub async fn record_room_closed(&self, duration: Duration) {
        self.rooms_closed.fetch_add(1, Ordering::Relaxed);
        self.activity.lock().await.sessions.record(duration);
    }

    // Moderation
    pub async fn increment_reports(&self) {
        self.reports.fetch_add(1, Ordering::Relaxed);
        self.record_rolling(RollingEvent::Report).await;
    }

    // Signaling relay
    pub fn increment_signals_relayed(&self) {
        self.signals_relayed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_signals_dropped(&self) {
        self.signals_dropped.fetch_add(1, Ordering::Relaxed);
    }

    // Error tracking
    pub fn increment_validation_errors(&self) {
        self.validation_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_malformed_messages(&self) {
        self.malformed_messages.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_oversized_messages(&self) {
        self.oversized_messages.fetch_add(1, Ordering::Relaxed);
    }

    // Snapshot generation
    pub async fn snapshot(&self) -> MetricsSnapshot {
        let (rolling, sessions) = {
            let mut activity = self.activity.lock().await;
            let rolling = activity.rolling.metrics_at(Instant::now());
            (rolling, activity.sessions.metrics())
        };

        let validation_errors = self.validation_errors.load(Ordering::Relaxed);
        let malformed_messages = self.malformed_messages.load(Ordering::Relaxed);
        let oversized_messages = self.oversized_messages.load(Ordering::Relaxed);

        MetricsSnapshot {
            timestamp: chrono::Utc::now(),
            connections: ConnectionMetrics {
                total_connections: self.total_connections.load(Ordering::Relaxed),
                active_connections: self.active_connections.load(Ordering::Relaxed),
                disconnections: self.disconnections.load(Ordering::Relaxed),
                rejected_connections: self.rejected_connections.load(Ordering::Relaxed),
                websocket_messages_dropped: self.websocket_messages_dropped.load(Ordering::Relaxed),
                idle_clients_evicted: self.idle_clients_evicted.load(Ordering::Relaxed),
            },
            matchmaking: MatchmakingMetrics {
                matchmaking_requests: self.matchmaking_requests.load(Ordering::Relaxed),
                matches_made: self.matches_made.load(Ordering::Relaxed),
                skips: self.skips.load(Ordering::Relaxed),
                stops: self.stops.load(Ordering::Relaxed),
            },
            rooms: RoomMetrics {
                extension_requests: self.extension_requests.load(Ordering::Relaxed),
                extensions_granted: self.extensions_granted.load(Ordering::Relaxed),
                rooms_expired: self.rooms_expired.load(Ordering::Relaxed),
                rooms_closed: self.rooms_closed.load(Ordering::Relaxed),
            },
            moderation: ModerationMetrics {
                reports: self.reports.load(Ordering::Relaxed),
            },
            signaling: SignalingMetrics {
                signals_relayed: self.signals_relayed.load(Ordering::Relaxed),
                signals_dropped: self.signals_dropped.load(Ordering::Relaxed),
            },
            errors: ErrorMetrics {
                validation_errors,
                malformed_messages,
                oversized_messages,
                total_errors: validation_errors + malformed_messages + oversized_messages,
            },
            rolling,
            sessions,
        }
    }

    /// Classify overall health from the current counters.
    pub async fn health_status(&self) -> HealthStatus {
        let snapshot = self.snapshot().await;

        let mut issues = Vec::new();
        let mut warnings = Vec::new();

        let delivered = snapshot.signaling.signals_relayed;
        let dropped_outbound = snapshot.connections.websocket_messages_dropped;
        if delivered > 0 {
            let drop_rate = (dropped_outbound as f64) / (delivered as f64);
            if drop_rate > 0.1 {
                issues.push(format!(
                    "High outbound drop rate: {:.1}%",
                    drop_rate * 100.0
                ));
            } else if drop_rate > 0.01 {
                warnings.push(format!(
                    "Elevated outbound drop rate: {:.1}%",
                    drop_rate * 100.0
                ));
            }
        }

        if snapshot.connections.rejected_connections > 0 {
            warnings.push(format!(
                "Connections rejected by per-IP limit: {}",
                snapshot.connections.rejected_connections
            ));
        }

        let status = if !issues.is_empty() {
            HealthStatusLevel::Unhealthy
        } else if !warnings.is_empty() {
            HealthStatusLevel::Degraded
        } else {
            HealthStatusLevel::Healthy
        };

        HealthStatus {
            status,
            issues,
            warnings,
            metrics: snapshot,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HealthStatus {
    pub status: HealthStatusLevel,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
    pub metrics: MetricsSnapshot,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum HealthStatusLevel {
    Healthy,
    Degraded,
    Unhealthy,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_decrement_active_connections_no_underflow() {
        let metrics = ServerMetrics::default();

        for _ in 0..10 {
            metrics.decrement_active_connections();
        }

        assert_eq!(metrics.active_connections.load(Ordering::Relaxed), 0);
        // disconnections still counts every call
        assert_eq!(metrics.disconnections.load(Ordering::Relaxed), 10);
    }

    #[tokio::test]
    async fn test_concurrent_increment_decrement_active_connections() {
        let metrics = Arc::new(ServerMetrics::default());

        let inc_barrier = Arc::new(tokio::sync::Barrier::new(100));
        let mut handles = Vec::with_capacity(100);
        for _ in 0..100 {
            let metrics = Arc::clone(&metrics);
            let barrier = Arc::clone(&inc_barrier);
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                metrics.increment_connections().await;
            }));
        }
        for handle in handles {
            handle.await.expect("increment task should not panic");
        }
        assert_eq!(metrics.active_connections.load(Ordering::Relaxed), 100);

        let dec_barrier = Arc::new(tokio::sync::Barrier::new(50));
        let mut handles = Vec::with_capacity(50);
        for _ in 0..50 {
            let metrics = Arc::clone(&metrics);
            let barrier = Arc::clone(&dec_barrier);
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                metrics.decrement_active_connections();
            }));
        }
        for handle in handles {
            handle.await.expect("decrement task should not panic");
        }

        assert_eq!(metrics.active_connections.load(Ordering::Relaxed), 50);
        assert_eq!(metrics.total_connections.load(Ordering::Relaxed), 100);
        assert_eq!(metrics.snapshot().await.rolling.connections, 100);
    }

    #[test]
    fn session_average_uses_only_the_trailing_window() {
        let mut tracker = SessionDurationTracker::new(3);
        for secs in [100, 10, 20, 30] {
            tracker.record(Duration::from_secs(secs));
        }
        assert_eq!(tracker.average(), Some(Duration::from_secs(20)));

        let metrics = tracker.metrics();
        assert_eq!(metrics.window_size, 3);
        assert_eq!(metrics.sample_count, 4);
        let max = metrics.max_secs.unwrap();
        assert!((max - 100.0).abs() < 0.5, "max was {max}");
    }

    #[test]
    fn empty_session_tracker_reports_nothing() {
        let tracker = SessionDurationTracker::new(100);
        let metrics = tracker.metrics();
        assert_eq!(metrics.average_secs, None);
        assert_eq!(metrics.p50_secs, None);
        assert_eq!(metrics.sample_count, 0);
    }

    #[test]
    fn rolling_counters_forget_old_events() {
        let mut rolling = RollingCounters::new(Duration::from_secs(60));
        let start = Instant::now();
        rolling.record_at(RollingEvent::Match, start);
        rolling.record_at(RollingEvent::Match, start + Duration::from_secs(30));
        rolling.record_at(RollingEvent::Skip, start + Duration::from_secs(30));

        assert_eq!(rolling.count_at(RollingEvent::Match, start + Duration::from_secs(60)), 2);
        assert_eq!(rolling.count_at(RollingEvent::Match, start + Duration::from_secs(61)), 1);

        rolling.record_at(RollingEvent::Extension, start + Duration::from_secs(90));
        let metrics = rolling.metrics_at(start + Duration::from_secs(120));
        assert_eq!(metrics.extensions, 1);
        assert_eq!(metrics.matches, 0);
        assert_eq!(metrics.skips, 0);
        assert_eq!(metrics.window_secs, 60);
    }

    #[tokio::test]
    async fn room_closures_feed_session_stats() {
        let metrics = ServerMetrics::default();
        metrics.record_room_closed(Duration::from_secs(60)).await;
        metrics.record_room_closed(Duration::from_secs(120)).await;

        let snapshot = metrics.snapshot().await;
        assert_eq!(snapshot.rooms.rooms_closed, 2);
        assert_eq!(snapshot.sessions.average_secs, Some(90.0));
    }

    #[tokio::test]
    async fn granted_extensions_enter_the_rolling_window() {
        let metrics = ServerMetrics::default();
        metrics.increment_extension_requests();
        metrics.increment_extension_requests();
        metrics.increment_extensions_granted().await;

        let snapshot = metrics.snapshot().await;
        assert_eq!(snapshot.rooms.extension_requests, 2);
        assert_eq!(snapshot.rooms.extensions_granted, 1);
        assert_eq!(snapshot.rolling.extensions, 1);
        assert_eq!(snapshot.rolling.matches, 0);
    }

    #[tokio::test]
    async fn health_degrades_on_rejections() {
        let metrics = ServerMetrics::default();
        assert_eq!(metrics.health_status().await.status, HealthStatusLevel::Healthy);
        metrics.increment_rejected_connections();
        assert_eq!(metrics.health_status().await.status, HealthStatusLevel::Degraded);
    }
}
