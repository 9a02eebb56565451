use crate::coordination::{CoordinatorSettings, CoordinatorState};
use crate::metrics::ServerMetrics;
use crate::protocol::{ParticipantId, ServerMessage};
use chrono::Utc;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::time::Duration;
use uuid::Uuid;

mod admin;
mod connection_manager;
mod heartbeat;
mod maintenance;
mod matchmaking_service;
mod message_router;
mod messaging;
mod relay_service;
mod room_service;

pub use admin::ServerStats;
use connection_manager::ConnectionManager;

/// Matchmaking and signaling server for one process.
///
/// Connections live in a lock-free [`ConnectionManager`]; everything the
/// matchmaker reasons about lives in one [`CoordinatorState`] guarded by an
/// async mutex, so each client event is applied as a single step.
pub struct VoiceServer {
    /// Connection management (outbound channels, IP accounting, liveness)
    connection_manager: ConnectionManager,
    /// Registry, waiting pool, rooms and moderation ledger
    state: Mutex<CoordinatorState>,
    /// Server configuration
    config: ServerConfig,
    /// Server metrics
    pub(crate) metrics: Arc<ServerMetrics>,
    /// Instance identifier
    instance_id: Uuid,
    started_at: Instant,
}

#[derive(Debug, Error)]
pub enum RegisterClientError {
    #[error("Too many connections from your IP ({current}/{limit})")]
    IpLimitExceeded { current: usize, limit: usize },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub session_duration: Duration,
    pub extension: Duration,
    pub max_interests: usize,
    pub max_interest_length: usize,
    /// How often the maintenance loop closes rooms past their deadline.
    pub expiry_sweep_interval: Duration,
    /// How often idle connections are looked for.
    pub client_sweep_interval: Duration,
    pub ping_timeout: Duration,
    pub max_message_size: usize,
    pub max_connections_per_ip: usize,
    pub require_metrics_auth: bool,
    pub metrics_auth_token: Option<String>,
    pub websocket_config: crate::config::WebSocketConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            session_duration: Duration::from_secs(300),
            extension: Duration::from_secs(300),
            max_interests: crate::protocol::DEFAULT_MAX_INTERESTS,
            max_interest_length: crate::protocol::DEFAULT_MAX_INTEREST_LENGTH,
            expiry_sweep_interval: Duration::from_millis(500),
            client_sweep_interval: Duration::from_secs(15),
            ping_timeout: Duration::from_secs(60),
            max_message_size: 65536, // 64KB
            max_connections_per_ip: 10,
            require_metrics_auth: false,
            metrics_auth_token: None,
            websocket_config: crate::config::WebSocketConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Build the runtime configuration from the loaded config document.
    pub fn from_config(cfg: &crate::config::Config) -> Self {
        Self {
            session_duration: Duration::from_secs(cfg.server.session_duration_secs),
            extension: Duration::from_secs(cfg.server.extension_secs),
            max_interests: cfg.server.max_interests,
            max_interest_length: cfg.server.max_interest_length,
            expiry_sweep_interval: Duration::from_millis(cfg.server.expiry_sweep_interval_ms),
            client_sweep_interval: Duration::from_secs(cfg.server.client_sweep_interval),
            ping_timeout: Duration::from_secs(cfg.server.ping_timeout),
            max_message_size: cfg.security.max_message_size,
            max_connections_per_ip: cfg.security.max_connections_per_ip,
            require_metrics_auth: cfg.security.require_metrics_auth,
            metrics_auth_token: cfg.security.metrics_auth_token.clone(),
            websocket_config: cfg.websocket.clone(),
        }
    }

    pub fn coordinator_settings(&self) -> CoordinatorSettings {
        CoordinatorSettings {
            session_duration: self.session_duration,
            extension: self.extension,
            max_interests: self.max_interests,
            max_interest_length: self.max_interest_length,
        }
    }
}

impl VoiceServer {
    pub fn new(config: ServerConfig, metrics_config: &crate::config::MetricsConfig) -> Arc<Self> {
        let metrics = Arc::new(ServerMetrics::new(metrics_config));
        let connection_manager =
            ConnectionManager::new(config.max_connections_per_ip, metrics.clone());

        Arc::new(Self {
            connection_manager,
            state: Mutex::new(CoordinatorState::new(config.coordinator_settings())),
            config,
            metrics,
            instance_id: Uuid::new_v4(),
            started_at: Instant::now(),
        })
    }

    /// Register a new client connection
    pub async fn register_client(
        &self,
        sender: mpsc::Sender<Arc<ServerMessage>>,
        client_addr: SocketAddr,
    ) -> Result<ParticipantId, RegisterClientError> {
        if let Err(err) = self.connection_manager.reserve_ip_slot(client_addr.ip()) {
            self.metrics.increment_rejected_connections();
            return Err(err);
        }

        let participant_id = self.state.lock().await.register(Utc::now());
        self.connection_manager
            .attach(participant_id, sender, client_addr);
        self.metrics.increment_connections().await;

        tracing::info!(
            %participant_id,
            instance_id = %self.instance_id,
            client_addr = %client_addr,
            "Client registered"
        );
        Ok(participant_id)
    }

    /// Connect a client without per-IP accounting (used for testing)
    pub async fn connect_client(
        &self,
        sender: mpsc::Sender<Arc<ServerMessage>>,
    ) -> ParticipantId {
        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        let participant_id = self.state.lock().await.register(Utc::now());
        self.connection_manager
            .attach_unbounded(participant_id, sender, addr);
        self.metrics.increment_connections().await;
        tracing::info!(%participant_id, instance_id = %self.instance_id, "Client connected");
        participant_id
    }

    /// Disconnect a client (alias for unregister_client for testing compatibility)
    pub async fn disconnect_client(&self, participant_id: &ParticipantId) {
        self.unregister_client(participant_id).await;
    }

    /// Unregister a client connection.
    ///
    /// Tears down the room and queue membership first so the partner is told
    /// before the connection disappears. Safe to call more than once.
    pub async fn unregister_client(&self, participant_id: &ParticipantId) {
        let outcome = self
            .apply(|state, now, out| state.disconnect(participant_id, now, out))
            .await;

        if let Some(closed) = outcome.and_then(|outcome| outcome.closed) {
            self.record_closed_room(&closed).await;
        }

        if let Some(connection) = self.connection_manager.remove_client(participant_id) {
            self.metrics.decrement_active_connections();
            tracing::info!(
                %participant_id,
                instance_id = %self.instance_id,
                connected_secs = connection.connected_at.elapsed().as_secs(),
                "Client unregistered"
            );
        }
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Get server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get server metrics
    pub fn metrics(&self) -> Arc<ServerMetrics> {
        self.metrics.clone()
    }

    /// Run a read-only closure against the coordinator state.
    pub async fn inspect<R>(&self, f: impl FnOnce(&CoordinatorState) -> R) -> R {
        let state = self.state.lock().await;
        f(&state)
    }
}
