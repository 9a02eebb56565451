use crate::protocol::{ParticipantId, ServerMessage};

use super::VoiceServer;

impl VoiceServer {
    /// Handle an application-level ping: refresh liveness and reply.
    pub fn handle_ping(&self, participant_id: &ParticipantId) {
        self.connection_manager.record_ping(participant_id);
        self.send_to_participant(participant_id, ServerMessage::Pong);
    }

    /// Refresh liveness on a transport-level pong or any inbound frame.
    pub fn record_activity(&self, participant_id: &ParticipantId) {
        self.connection_manager.record_ping(participant_id);
    }
}

#[cfg(test)]
mod tests {
    use crate::config::MetricsConfig;
    use crate::protocol::ServerMessage;
    use crate::server::{ServerConfig, VoiceServer};
    use std::time::Duration as StdDuration;
    use tokio::sync::mpsc;
    use tokio::time::{sleep, timeout, Duration};

    #[tokio::test]
    async fn handle_ping_resets_timeout_and_replies() {
        let server = VoiceServer::new(ServerConfig::default(), &MetricsConfig::default());
        let (sender, mut receiver) = mpsc::channel(4);
        let participant_id = server.connect_client(sender).await;

        sleep(Duration::from_millis(25)).await;
        let expired_before = server
            .connection_manager
            .collect_expired_clients(StdDuration::from_millis(5));
        assert_eq!(
            expired_before,
            vec![participant_id],
            "participant should look expired before ping"
        );

        server.handle_ping(&participant_id);

        let msg = timeout(Duration::from_secs(1), receiver.recv())
            .await
            .expect("channel still open")
            .expect("message present");
        assert!(
            matches!(*msg, ServerMessage::Pong),
            "server responds with Pong"
        );

        let expired_after = server
            .connection_manager
            .collect_expired_clients(StdDuration::from_millis(5));
        assert!(
            expired_after.is_empty(),
            "ping refresh should remove participant from expired set"
        );
    }
}
