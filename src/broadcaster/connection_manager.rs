//! Connection manager: the broadcaster's one legitimate process-global
//! (§9). Mutated only under an async lock; keyed two levels deep
//! (user id -> connection id) so a single user's sockets are isolated
//! from every other user's, mirroring the reference `ConnectionManager`'s
//! per-user weak-set design without relying on Rust weak references —
//! here, disconnection is explicit (`disconnect`) rather than
//! garbage-collected, since each connection's recv loop reliably runs to
//! completion and calls it.

use axum::extract::ws::Message as WsMessage;
use std::collections::HashMap;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

type Outbox = mpsc::UnboundedSender<WsMessage>;

#[derive(Default)]
pub struct ConnectionManager {
    connections: RwLock<HashMap<Uuid, HashMap<Uuid, Outbox>>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection for `user_id`, returning its id.
    pub async fn connect(&self, user_id: Uuid, outbox: Outbox) -> Uuid {
        let connection_id = Uuid::new_v4();
        let mut connections = self.connections.write().await;
        connections
            .entry(user_id)
            .or_insert_with(HashMap::new)
            .insert(connection_id, outbox);
        connection_id
    }

    pub async fn disconnect(&self, user_id: Uuid, connection_id: Uuid) {
        let mut connections = self.connections.write().await;
        if let Some(user_conns) = connections.get_mut(&user_id) {
            user_conns.remove(&connection_id);
            if user_conns.is_empty() {
                connections.remove(&user_id);
            }
        }
    }

    /// Send a JSON text message to every live connection of `user_id`.
    /// Connections whose send fails (channel closed) are evicted.
    pub async fn broadcast_to_user(&self, user_id: Uuid, payload: &serde_json::Value) {
        let text = payload.to_string();
        let mut stale = Vec::new();
        {
            let connections = self.connections.read().await;
            if let Some(user_conns) = connections.get(&user_id) {
                for (connection_id, outbox) in user_conns {
                    if outbox.send(WsMessage::Text(text.clone().into())).is_err() {
                        stale.push(*connection_id);
                    }
                }
            }
        }
        for connection_id in stale {
            self.disconnect(user_id, connection_id).await;
        }
    }

    /// Ping every live socket; failed sends evict the socket. Invoked
    /// every heartbeat interval by the broadcaster binary.
    pub async fn send_heartbeat(&self) {
        let mut stale = Vec::new();
        {
            let connections = self.connections.read().await;
            for (user_id, user_conns) in connections.iter() {
                for (connection_id, outbox) in user_conns {
                    if outbox.send(WsMessage::Ping(Vec::new().into())).is_err() {
                        stale.push((*user_id, *connection_id));
                    }
                }
            }
        }
        for (user_id, connection_id) in stale {
            self.disconnect(user_id, connection_id).await;
        }
    }

    pub async fn connection_count_for_user(&self, user_id: Uuid) -> usize {
        self.connections
            .read()
            .await
            .get(&user_id)
            .map(|m| m.len())
            .unwrap_or(0)
    }

    pub async fn active_connections_count(&self) -> usize {
        self.connections.read().await.values().map(|m| m.len()).sum()
    }

    pub async fn active_users_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_reaches_only_target_user_connections() {
        let manager = ConnectionManager::new();
        let u1 = Uuid::new_v4();
        let u2 = Uuid::new_v4();

        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        let (tx3, mut rx3) = mpsc::unbounded_channel();
        manager.connect(u1, tx1).await;
        manager.connect(u1, tx2).await;
        manager.connect(u2, tx3).await;

        manager
            .broadcast_to_user(u1, &serde_json::json!({"type": "task_update"}))
            .await;

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
        assert!(rx3.try_recv().is_err());
    }

    #[tokio::test]
    async fn disconnect_removes_connection_and_empty_user_entry() {
        let manager = ConnectionManager::new();
        let user_id = Uuid::new_v4();
        let (tx, _rx) = mpsc::unbounded_channel();
        let connection_id = manager.connect(user_id, tx).await;
        assert_eq!(manager.connection_count_for_user(user_id).await, 1);
        manager.disconnect(user_id, connection_id).await;
        assert_eq!(manager.connection_count_for_user(user_id).await, 0);
        assert_eq!(manager.active_users_count().await, 0);
    }
}
