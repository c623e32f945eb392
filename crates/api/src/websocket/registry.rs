//! Connection registry
//!
//! The single shared set of live relay connections. Membership changes are
//! serialized behind the write lock; iteration always works on a snapshot so
//! heartbeat sweeps and broadcasts never hold the lock while sending.

use std::collections::HashMap;
use std::sync::Arc;

use recipemaster_shared::ConnectionId;
use tokio::sync::RwLock;

use super::connection::Connection;

/// Registry of all admitted connections
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    connections: Arc<RwLock<HashMap<ConnectionId, Arc<Connection>>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection
    pub async fn add(&self, conn: Connection) -> Arc<Connection> {
        let conn = Arc::new(conn);
        let mut connections = self.connections.write().await;
        connections.insert(conn.id, Arc::clone(&conn));

        tracing::info!(
            connection_id = %conn.id,
            total_connections = connections.len(),
            "Relay connection added"
        );

        conn
    }

    /// Remove a connection. Unknown ids are ignored.
    pub async fn remove(&self, id: &ConnectionId) -> bool {
        let mut connections = self.connections.write().await;
        match connections.remove(id) {
            Some(_) => {
                tracing::info!(
                    connection_id = %id,
                    remaining_connections = connections.len(),
                    "Relay connection removed"
                );
                true
            }
            None => false,
        }
    }

    pub async fn get(&self, id: &ConnectionId) -> Option<Arc<Connection>> {
        let connections = self.connections.read().await;
        connections.get(id).cloned()
    }

    /// Point-in-time copy of the membership
    pub async fn snapshot(&self) -> Vec<Arc<Connection>> {
        let connections = self.connections.read().await;
        connections.values().cloned().collect()
    }

    /// Visit every connection present when the walk starts
    pub async fn for_each<F>(&self, mut visitor: F)
    where
        F: FnMut(&Arc<Connection>),
    {
        for conn in self.snapshot().await {
            visitor(&conn);
        }
    }

    pub async fn len(&self) -> usize {
        let connections = self.connections.read().await;
        connections.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Get statistics about the registry
    pub async fn stats(&self) -> RelayStats {
        RelayStats {
            active_connections: self.len().await,
        }
    }
}

/// Statistics about relay connections
#[derive(Debug, Clone, serde::Serialize)]
pub struct RelayStats {
    /// Number of active connections
    pub active_connections: usize,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn connection() -> Connection {
        let (tx, _rx) = mpsc::unbounded_channel();
        Connection::new(tx)
    }

    #[tokio::test]
    async fn test_add_and_remove_connection() {
        let registry = ConnectionRegistry::new();

        let conn = registry.add(connection()).await;
        assert_eq!(registry.len().await, 1);
        assert!(registry.get(&conn.id).await.is_some());

        assert!(registry.remove(&conn.id).await);
        assert!(registry.is_empty().await);
        assert!(registry.get(&conn.id).await.is_none());
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let conn = registry.add(connection()).await;

        assert!(registry.remove(&conn.id).await);
        assert!(!registry.remove(&conn.id).await);
        assert!(!registry.remove(&ConnectionId::new()).await);
        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test]
    async fn test_snapshot_is_unaffected_by_later_changes() {
        let registry = ConnectionRegistry::new();
        let a = registry.add(connection()).await;
        registry.add(connection()).await;

        let snapshot = registry.snapshot().await;
        registry.remove(&a.id).await;
        registry.add(connection()).await;

        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.iter().any(|c| c.id == a.id));
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn test_for_each_can_mutate_registry_while_visiting() {
        let registry = ConnectionRegistry::new();
        for _ in 0..3 {
            registry.add(connection()).await;
        }

        let mut visited = Vec::new();
        registry.for_each(|conn| visited.push(conn.id)).await;
        assert_eq!(visited.len(), 3);

        // Removing every visited id must not disturb anything
        for id in &visited {
            registry.remove(id).await;
        }
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_concurrent_add_remove() {
        let registry = ConnectionRegistry::new();
        let mut handles = Vec::new();
        for _ in 0..32 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                let conn = registry.add(connection()).await;
                let _ = registry.snapshot().await;
                registry.remove(&conn.id).await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap());
        }
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_stats() {
        let registry = ConnectionRegistry::new();
        registry.add(connection()).await;

        let stats = registry.stats().await;
        assert_eq!(stats.active_connections, 1);
    }
}
