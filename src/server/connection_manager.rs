use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::metrics::ServerMetrics;
use crate::protocol::{ParticipantId, ServerMessage};

use super::RegisterClientError;

#[derive(Debug, Clone)]
pub(crate) struct ClientConnection {
    pub last_ping: Instant,
    pub connected_at: Instant,
    pub sender: mpsc::Sender<Arc<ServerMessage>>,
    pub client_addr: SocketAddr,
}

pub(crate) struct ConnectionManager {
    clients: DashMap<ParticipantId, ClientConnection>,
    connections_per_ip: DashMap<IpAddr, usize>,
    metrics: Arc<ServerMetrics>,
    max_connections_per_ip: usize,
}

impl ConnectionManager {
    pub fn new(max_connections_per_ip: usize, metrics: Arc<ServerMetrics>) -> Self {
        Self {
            clients: DashMap::new(),
            connections_per_ip: DashMap::new(),
            metrics,
            max_connections_per_ip,
        }
    }

    /// Claim a connection slot for `ip`, failing once the per-IP cap is reached.
    pub fn reserve_ip_slot(&self, ip: IpAddr) -> Result<usize, RegisterClientError> {
        self.try_reserve_ip_slot(ip).map_err(|current| {
            warn!(
                %ip,
                current,
                max = self.max_connections_per_ip,
                "IP connection limit exceeded"
            );
            RegisterClientError::IpLimitExceeded {
                current,
                limit: self.max_connections_per_ip,
            }
        })
    }

    /// Attach the outbound channel for a participant whose slot is reserved.
    pub fn attach(
        &self,
        participant_id: ParticipantId,
        sender: mpsc::Sender<Arc<ServerMessage>>,
        client_addr: SocketAddr,
    ) {
        let now = Instant::now();
        self.clients.insert(
            participant_id,
            ClientConnection {
                last_ping: now,
                connected_at: now,
                sender,
                client_addr,
            },
        );
    }

    /// Attach without enforcing the per-IP cap; the slot is still counted.
    pub fn attach_unbounded(
        &self,
        participant_id: ParticipantId,
        sender: mpsc::Sender<Arc<ServerMessage>>,
        client_addr: SocketAddr,
    ) {
        self.increment_ip_slot_unbounded(client_addr.ip());
        self.attach(participant_id, sender, client_addr);
    }

    /// Queue a message without waiting.
    ///
    /// A full queue drops the message and counts it; a closed queue means the
    /// connection is already tearing down.
    pub fn send_to(&self, participant_id: &ParticipantId, message: Arc<ServerMessage>) -> bool {
        let Some(sender) = self
            .clients
            .get(participant_id)
            .map(|client| client.sender.clone())
        else {
            debug!(%participant_id, "No connection for outbound message");
            return false;
        };

        match sender.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(message)) => {
                self.metrics.increment_websocket_messages_dropped();
                warn!(%participant_id, ?message, "Outbound queue full, dropping message");
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(%participant_id, "Outbound queue closed");
                false
            }
        }
    }

    pub fn record_ping(&self, participant_id: &ParticipantId) {
        if let Some(mut client) = self.clients.get_mut(participant_id) {
            client.last_ping = Instant::now();
        }
    }

    #[cfg(test)]
    pub fn has_client(&self, participant_id: &ParticipantId) -> bool {
        self.clients.contains_key(participant_id)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    #[cfg(test)]
    pub fn connections_from(&self, ip: &IpAddr) -> usize {
        self.connections_per_ip
            .get(ip)
            .map(|entry| *entry.value())
            .unwrap_or(0)
    }

    pub fn remove_client(&self, participant_id: &ParticipantId) -> Option<ClientConnection> {
        self.clients
            .remove(participant_id)
            .map(|(_, connection)| {
                self.release_ip_slot(connection.client_addr.ip());
                connection
            })
    }

    pub fn collect_expired_clients(&self, ping_timeout: std::time::Duration) -> Vec<ParticipantId> {
        let now = Instant::now();
        self.clients
            .iter()
            .filter_map(|entry| {
                if now.duration_since(entry.last_ping) > ping_timeout {
                    Some(*entry.key())
                } else {
                    None
                }
            })
            .collect()
    }

    fn try_reserve_ip_slot(&self, ip: IpAddr) -> Result<usize, usize> {
        match self.connections_per_ip.entry(ip) {
            dashmap::mapref::entry::Entry::Occupied(mut entry) => {
                let current = *entry.get();
                if current >= self.max_connections_per_ip {
                    Err(current)
                } else {
                    let count = entry.get_mut();
                    *count += 1;
                    Ok(*count)
                }
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                if self.max_connections_per_ip == 0 {
                    Err(0)
                } else {
                    entry.insert(1);
                    Ok(1)
                }
            }
        }
    }

    fn increment_ip_slot_unbounded(&self, ip: IpAddr) -> usize {
        let mut entry = self.connections_per_ip.entry(ip).or_insert(0);
        *entry += 1;
        *entry
    }

    /// Decrement and drop-at-zero happen under one shard lock.
    fn release_ip_slot(&self, ip: IpAddr) {
        if let dashmap::mapref::entry::Entry::Occupied(mut entry) = self.connections_per_ip.entry(ip)
        {
            if *entry.get() > 1 {
                *entry.get_mut() -= 1;
            } else {
                entry.remove();
            }
        }
    }
}
