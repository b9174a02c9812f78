use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Instant,
};

use tokio::sync::{Mutex, Semaphore};
use tracing::info;

use crate::config::ConnectionConfig;
use crate::errors::ConnectionError;

use super::{stats::ClientStats, ConnectionGuard, ConnectionStats, IpStats};

/// Admission control and per-peer stats for the TCP server. One `Manager`
/// is shared (via `Arc`) across every accepted connection's task.
pub struct Manager {
    per_ip_semaphores: Mutex<HashMap<SocketAddr, Arc<Semaphore>>>,
    global_semaphore: Arc<Semaphore>,
    stats: Mutex<HashMap<SocketAddr, ClientStats>>,
    config: ConnectionConfig,
    total_connections: AtomicU64,
}

impl Manager {
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            per_ip_semaphores: Mutex::new(HashMap::new()),
            global_semaphore: Arc::new(Semaphore::new(config.max_connections)),
            stats: Mutex::new(HashMap::new()),
            config,
            total_connections: AtomicU64::new(0),
        }
    }

    /// Admits a new connection, enforcing the per-IP and global limits.
    /// Returns an RAII guard that releases both permits and clears the
    /// peer's stats entry on drop.
    pub async fn accept_connection(self: &Arc<Self>, addr: SocketAddr) -> Result<ConnectionGuard, ConnectionError> {
        let per_ip_permit = if let Some(per_ip_limit) = self.config.per_ip_limits {
            let mut semaphores = self.per_ip_semaphores.lock().await;
            let semaphore = semaphores
                .entry(addr)
                .or_insert_with(|| Arc::new(Semaphore::new(per_ip_limit)))
                .clone();
            Some(semaphore.try_acquire_owned().map_err(|_| {
                ConnectionError::limit_exceeded(format!("per-IP limit ({per_ip_limit}) reached for {addr}"))
            })?)
        } else {
            None
        };

        let global_permit = self
            .global_semaphore
            .clone()
            .try_acquire_owned()
            .map_err(|_| ConnectionError::limit_exceeded("global connection limit reached"))?;

        {
            let mut stats = self.stats.lock().await;
            let client_stats = stats.entry(addr).or_default();
            client_stats.active_connections += 1;
            client_stats.last_active = Instant::now();
        }

        self.total_connections.fetch_add(1, Ordering::Relaxed);

        Ok(ConnectionGuard::new(Arc::clone(self), addr, global_permit, per_ip_permit))
    }

    pub(super) async fn release(&self, addr: SocketAddr) {
        let mut stats = self.stats.lock().await;
        if let Some(client_stats) = stats.get_mut(&addr) {
            client_stats.active_connections = client_stats.active_connections.saturating_sub(1);
        }
    }

    pub async fn record_request(&self, addr: SocketAddr, success: bool) {
        let mut stats = self.stats.lock().await;
        if let Some(client_stats) = stats.get_mut(&addr) {
            client_stats.total_requests += 1;
            client_stats.last_active = Instant::now();
            if !success {
                client_stats.error_count += 1;
                client_stats.last_error = Some(Instant::now());
            }
        }
    }

    /// Drops stats entries that have been idle at least `idle_timeout`
    /// and have no live connection remaining. Meant to be called
    /// periodically from a background task.
    pub async fn cleanup_idle_connections(&self) {
        let now = Instant::now();
        let idle_timeout = self.config.idle_timeout;
        let mut stats = self.stats.lock().await;
        let before = stats.len();
        stats.retain(|_, s| s.active_connections > 0 || now.duration_since(s.last_active) < idle_timeout);
        let removed = before - stats.len();
        if removed > 0 {
            info!(removed, "cleaned up idle connection stats entries");
        }
    }

    pub async fn get_stats(&self) -> ConnectionStats {
        let stats = self.stats.lock().await;
        let mut total_active = 0;
        let mut total_requests = 0;
        let mut total_errors = 0;
        let mut per_ip_stats = HashMap::new();

        for (addr, client_stats) in stats.iter() {
            total_active += client_stats.active_connections;
            total_requests += client_stats.total_requests;
            total_errors += client_stats.error_count;
            per_ip_stats.insert(
                *addr,
                IpStats {
                    active_connections: client_stats.active_connections,
                    total_requests: client_stats.total_requests,
                    error_count: client_stats.error_count,
                    last_active: client_stats.last_active,
                    last_error: client_stats.last_error,
                },
            );
        }

        ConnectionStats {
            total_connections: self.total_connections.load(Ordering::Relaxed),
            active_connections: total_active,
            total_requests,
            total_errors,
            per_ip_stats,
        }
    }

    pub async fn connection_count(&self, addr: &SocketAddr) -> usize {
        self.stats
            .lock()
            .await
            .get(addr)
            .map(|s| s.active_connections)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    use super::*;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), port)
    }

    #[tokio::test]
    async fn per_ip_limit_is_enforced() {
        let config = ConnectionConfig {
            max_connections: 10,
            per_ip_limits: Some(1),
            ..ConnectionConfig::default()
        };
        let manager = Arc::new(Manager::new(config));
        let a = addr(1234);

        let _first = manager.accept_connection(a).await.unwrap();
        let second = manager.accept_connection(a).await;
        assert!(matches!(second, Err(ConnectionError::LimitExceeded(_))));
    }

    #[tokio::test]
    async fn guard_drop_releases_the_slot() {
        let config = ConnectionConfig {
            max_connections: 1,
            per_ip_limits: None,
            ..ConnectionConfig::default()
        };
        let manager = Arc::new(Manager::new(config));
        let a = addr(1235);

        {
            let _guard = manager.accept_connection(a).await.unwrap();
            assert_eq!(manager.connection_count(&a).await, 1);
        }

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(manager.connection_count(&a).await, 0);

        let second = manager.accept_connection(a).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn stats_accumulate_requests() {
        let manager = Arc::new(Manager::new(ConnectionConfig::default()));
        let a = addr(1236);
        let _guard = manager.accept_connection(a).await.unwrap();
        manager.record_request(a, true).await;
        manager.record_request(a, false).await;

        let stats = manager.get_stats().await;
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.total_errors, 1);
    }
}
