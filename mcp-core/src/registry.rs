//! Live connection bookkeeping backing the Connection Record entity.
//!
//! `mcp-transport` registers a record per stdio/WebSocket connection on
//! open and removes it on close; `mcp-server`'s idle-connection reaper
//! background task sweeps it every 30s. HTTP requests are accounted for
//! separately by `mcp-stats` (request-scoped, not connection-scoped), so
//! they are not registered here.

use crate::ids::{ConnId, Principal};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;

/// Which transport opened the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Stdio,
    WebSocket,
}

#[derive(Debug, Clone)]
pub struct ConnectionRecord {
    pub conn_id: ConnId,
    pub transport: TransportKind,
    pub remote_address: Option<String>,
    pub principal: Option<Principal>,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

/// Registry of currently-open stdio/WebSocket connections.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: DashMap<ConnId, ConnectionRecord>,
}

impl ConnectionRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn register(
        &self,
        conn_id: ConnId,
        transport: TransportKind,
        remote_address: Option<String>,
        principal: Option<Principal>,
    ) {
        let now = Utc::now();
        self.connections.insert(
            conn_id.clone(),
            ConnectionRecord { conn_id, transport, remote_address, principal, created_at: now, last_activity_at: now },
        );
    }

    /// Bumps `last_activity_at` for `conn_id`. No-op if the connection has
    /// already been unregistered (e.g. a race against the reaper).
    pub fn touch(&self, conn_id: &ConnId) {
        if let Some(mut entry) = self.connections.get_mut(conn_id) {
            entry.last_activity_at = Utc::now();
        }
    }

    pub fn unregister(&self, conn_id: &ConnId) {
        self.connections.remove(conn_id);
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Returns the ids of connections idle for longer than `threshold`.
    pub fn idle_longer_than(&self, threshold: Duration) -> Vec<ConnId> {
        let now = Utc::now();
        self.connections
            .iter()
            .filter(|entry| now - entry.last_activity_at > threshold)
            .map(|entry| entry.conn_id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_unregister_tracks_len() {
        let registry = ConnectionRegistry::new();
        let id = ConnId::generate();
        registry.register(id.clone(), TransportKind::WebSocket, Some("127.0.0.1".into()), None);
        assert_eq!(registry.len(), 1);
        registry.unregister(&id);
        assert!(registry.is_empty());
    }

    #[test]
    fn touch_updates_last_activity() {
        let registry = ConnectionRegistry::new();
        let id = ConnId::generate();
        registry.register(id.clone(), TransportKind::Stdio, None, None);
        let before = registry.connections.get(&id).unwrap().last_activity_at;
        registry.touch(&id);
        let after = registry.connections.get(&id).unwrap().last_activity_at;
        assert!(after >= before);
    }

    #[test]
    fn idle_longer_than_zero_returns_everything() {
        let registry = ConnectionRegistry::new();
        let id = ConnId::generate();
        registry.register(id.clone(), TransportKind::WebSocket, None, None);
        let idle = registry.idle_longer_than(Duration::zero());
        assert_eq!(idle, vec![id]);
    }

    #[test]
    fn idle_longer_than_future_threshold_returns_nothing() {
        let registry = ConnectionRegistry::new();
        registry.register(ConnId::generate(), TransportKind::WebSocket, None, None);
        assert!(registry.idle_longer_than(Duration::hours(1)).is_empty());
    }
}
