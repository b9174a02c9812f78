use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::OwnedSemaphorePermit;

use super::ConnectionManager;

/// RAII admission ticket. Holding one means both the per-IP and global
/// semaphore permits are held; dropping it releases both and decrements
/// the peer's active-connection count.
pub struct ConnectionGuard {
    manager: Arc<ConnectionManager>,
    addr: SocketAddr,
    _global_permit: OwnedSemaphorePermit,
    _per_ip_permit: Option<OwnedSemaphorePermit>,
}

impl ConnectionGuard {
    pub(super) fn new(
        manager: Arc<ConnectionManager>,
        addr: SocketAddr,
        global_permit: OwnedSemaphorePermit,
        per_ip_permit: Option<OwnedSemaphorePermit>,
    ) -> Self {
        Self {
            manager,
            addr,
            _global_permit: global_permit,
            _per_ip_permit: per_ip_permit,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let manager = Arc::clone(&self.manager);
        let addr = self.addr;
        tokio::spawn(async move {
            manager.release(addr).await;
        });
    }
}
