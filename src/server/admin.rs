use super::VoiceServer;
use crate::metrics::MetricsSnapshot;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Live occupancy figures plus the cumulative metrics snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerStats {
    pub online: usize,
    pub queue_depth: usize,
    pub active_rooms: usize,
    pub uptime_secs: u64,
    pub total_reports: u64,
    pub metrics: MetricsSnapshot,
}

impl VoiceServer {
    pub async fn stats(&self) -> ServerStats {
        let (online, queue_depth, active_rooms, total_reports) = self
            .inspect(|state| {
                (
                    state.registry().len(),
                    state.pool().len(),
                    state.rooms().len(),
                    state.ledger().total_reports(),
                )
            })
            .await;

        ServerStats {
            online,
            queue_depth,
            active_rooms,
            uptime_secs: self.started_at.elapsed().as_secs(),
            total_reports,
            metrics: self.metrics.snapshot().await,
        }
    }

    /// The coordinator lock must be obtainable within a second.
    pub async fn health_check(&self) -> bool {
        tokio::time::timeout(Duration::from_secs(1), self.state.lock())
            .await
            .is_ok()
    }
}
