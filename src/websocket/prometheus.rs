use crate::metrics::SessionDurationMetrics;
use crate::server::ServerStats;

/// Render server stats into Prometheus text exposition format.
pub(crate) fn render_prometheus_metrics(stats: &ServerStats) -> String {
    use std::fmt::Write;

    fn write_metric(buf: &mut String, name: &str, help: &str, metric_type: &str, value: f64) {
        let _ = writeln!(buf, "# HELP {name} {help}");
        let _ = writeln!(buf, "# TYPE {name} {metric_type}");
        let _ = writeln!(buf, "{name} {value}");
    }

    fn counter(buf: &mut String, name: &str, help: &str, value: u64) {
        write_metric(buf, name, help, "counter", value as f64);
    }

    fn gauge(buf: &mut String, name: &str, help: &str, value: u64) {
        write_metric(buf, name, help, "gauge", value as f64);
    }

    fn gauge_f64(buf: &mut String, name: &str, help: &str, value: f64) {
        write_metric(buf, name, help, "gauge", value);
    }

    fn emit_session_metrics(buf: &mut String, sessions: &SessionDurationMetrics) {
        let quantiles = [
            ("average", "Average", sessions.average_secs),
            ("p50", "p50", sessions.p50_secs),
            ("p95", "p95", sessions.p95_secs),
            ("p99", "p99", sessions.p99_secs),
            ("max", "Maximum", sessions.max_secs),
        ];
        for (suffix, label, value) in quantiles {
            if let Some(value) = value {
                gauge_f64(
                    buf,
                    &format!("voicelink_session_duration_{suffix}_seconds"),
                    &format!("{label} voice session duration in seconds"),
                    value,
                );
            }
        }
        gauge(
            buf,
            "voicelink_session_duration_window_size",
            "Sessions in the trailing averaging window",
            sessions.window_size as u64,
        );
        counter(
            buf,
            "voicelink_session_duration_samples_total",
            "Total sessions recorded for duration statistics",
            sessions.sample_count,
        );
    }

    let snapshot = &stats.metrics;
    let mut buf = String::new();

    gauge(
        &mut buf,
        "voicelink_participants_online",
        "Participants currently connected",
        stats.online as u64,
    );
    gauge(
        &mut buf,
        "voicelink_queue_depth",
        "Participants waiting for a partner",
        stats.queue_depth as u64,
    );
    gauge(
        &mut buf,
        "voicelink_rooms_active",
        "Rooms currently open",
        stats.active_rooms as u64,
    );
    gauge(
        &mut buf,
        "voicelink_uptime_seconds",
        "Seconds since the server started",
        stats.uptime_secs,
    );

    counter(
        &mut buf,
        "voicelink_connections_total",
        "Total connections accepted since startup",
        snapshot.connections.total_connections,
    );
    gauge(
        &mut buf,
        "voicelink_connections_active",
        "Number of currently active connections",
        snapshot.connections.active_connections,
    );
    counter(
        &mut buf,
        "voicelink_connections_disconnections_total",
        "Total connection closures observed since startup",
        snapshot.connections.disconnections,
    );
    counter(
        &mut buf,
        "voicelink_connections_rejected_total",
        "Connections refused by the per-IP limit",
        snapshot.connections.rejected_connections,
    );
    counter(
        &mut buf,
        "voicelink_websocket_messages_dropped_total",
        "Server messages dropped because the outbound WebSocket buffer was full",
        snapshot.connections.websocket_messages_dropped,
    );
    counter(
        &mut buf,
        "voicelink_idle_clients_evicted_total",
        "Connections evicted after missing the ping timeout",
        snapshot.connections.idle_clients_evicted,
    );

    counter(
        &mut buf,
        "voicelink_matchmaking_requests_total",
        "Start-matching requests received",
        snapshot.matchmaking.matchmaking_requests,
    );
    counter(
        &mut buf,
        "voicelink_matches_total",
        "Rooms created by matchmaking",
        snapshot.matchmaking.matches_made,
    );
    counter(
        &mut buf,
        "voicelink_skips_total",
        "Rooms left by skipping the partner",
        snapshot.matchmaking.skips,
    );
    counter(
        &mut buf,
        "voicelink_stops_total",
        "Stop-matching requests received",
        snapshot.matchmaking.stops,
    );

    counter(
        &mut buf,
        "voicelink_extension_requests_total",
        "Extension requests recorded",
        snapshot.rooms.extension_requests,
    );
    counter(
        &mut buf,
        "voicelink_extensions_granted_total",
        "Extensions granted by mutual consent",
        snapshot.rooms.extensions_granted,
    );
    counter(
        &mut buf,
        "voicelink_rooms_expired_total",
        "Rooms closed by the session timer",
        snapshot.rooms.rooms_expired,
    );
    counter(
        &mut buf,
        "voicelink_rooms_closed_total",
        "Rooms closed for any reason",
        snapshot.rooms.rooms_closed,
    );

    counter(
        &mut buf,
        "voicelink_reports_total",
        "Reports filed against partners",
        snapshot.moderation.reports,
    );

    counter(
        &mut buf,
        "voicelink_signals_relayed_total",
        "Negotiation messages delivered to a partner",
        snapshot.signaling.signals_relayed,
    );
    counter(
        &mut buf,
        "voicelink_signals_dropped_total",
        "Negotiation messages discarded for a stale or foreign room",
        snapshot.signaling.signals_dropped,
    );

    counter(
        &mut buf,
        "voicelink_validation_errors_total",
        "Requests rejected for invalid input",
        snapshot.errors.validation_errors,
    );
    counter(
        &mut buf,
        "voicelink_malformed_messages_total",
        "Frames that could not be parsed",
        snapshot.errors.malformed_messages,
    );
    counter(
        &mut buf,
        "voicelink_oversized_messages_total",
        "Frames over the configured size limit",
        snapshot.errors.oversized_messages,
    );

    let rolling = &snapshot.rolling;
    for (name, label, value) in [
        ("connections", "Connections", rolling.connections),
        ("matches", "Matches", rolling.matches),
        ("skips", "Skips", rolling.skips),
        ("reports", "Reports", rolling.reports),
        ("expirations", "Expirations", rolling.expirations),
        ("extensions", "Granted extensions", rolling.extensions),
    ] {
        gauge(
            &mut buf,
            &format!("voicelink_rolling_{name}"),
            &format!("{label} in the trailing {}s window", rolling.window_secs),
            value,
        );
    }

    emit_session_metrics(&mut buf, &snapshot.sessions);

    buf
}
