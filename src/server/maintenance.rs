use tokio::time::MissedTickBehavior;

use super::VoiceServer;

impl VoiceServer {
    /// Evict connections that have been silent longer than `ping_timeout`.
    pub async fn evict_idle_clients(&self) -> usize {
        let expired_clients = self
            .connection_manager
            .collect_expired_clients(self.config.ping_timeout);

        let count = expired_clients.len();
        self.metrics.add_idle_clients_evicted(count as u64);

        for participant_id in expired_clients {
            tracing::info!(%participant_id, instance_id = %self.instance_id, "Removing idle client");
            self.unregister_client(&participant_id).await;
        }
        count
    }

    /// Background maintenance loop: room expiry and idle-client eviction.
    ///
    /// Never returns; spawn it once per server.
    pub async fn cleanup_task(&self) {
        let mut expiry_interval = tokio::time::interval(self.config.expiry_sweep_interval);
        expiry_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut client_interval = tokio::time::interval(self.config.client_sweep_interval);
        client_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = expiry_interval.tick() => {
                    let expired = self.run_expiry_sweep().await;
                    if expired > 0 {
                        tracing::debug!(expired, instance_id = %self.instance_id, "Expiry sweep closed rooms");
                    }
                }
                _ = client_interval.tick() => {
                    let evicted = self.evict_idle_clients().await;
                    if evicted > 0 {
                        tracing::info!(
                            evicted,
                            remaining = self.connection_manager.len(),
                            instance_id = %self.instance_id,
                            "Evicted idle clients"
                        );
                    }
                }
            }
        }
    }
}
