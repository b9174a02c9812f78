use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;

/// Per-peer connection bookkeeping, keyed by socket address in the
/// manager's stats map.
#[derive(Debug, Clone)]
pub struct ClientStats {
    pub active_connections: usize,
    pub last_active: Instant,
    pub total_requests: u64,
    pub error_count: u64,
    pub last_error: Option<Instant>,
}

impl ClientStats {
    pub fn new() -> Self {
        Self {
            active_connections: 0,
            last_active: Instant::now(),
            total_requests: 0,
            error_count: 0,
            last_error: None,
        }
    }
}

impl Default for ClientStats {
    fn default() -> Self {
        Self::new()
    }
}

/// A snapshot of one peer's stats, safe to hand out over the HTTP
/// observability surface.
#[derive(Debug, Clone)]
pub struct IpStats {
    pub active_connections: usize,
    pub total_requests: u64,
    pub error_count: u64,
    pub last_active: Instant,
    pub last_error: Option<Instant>,
}

/// Aggregate snapshot across every known peer.
#[derive(Debug, Clone, Default)]
pub struct ConnectionStats {
    pub total_connections: u64,
    pub active_connections: usize,
    pub total_requests: u64,
    pub total_errors: u64,
    pub per_ip_stats: HashMap<SocketAddr, IpStats>,
}
