//! Request metrics collaborator for the HTTP transports.
//!
//! An explicitly constructed counter set passed into the routers at
//! construction time; there is no process-global registration step, so
//! building two servers (as tests do) cannot collide.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Per-endpoint request counters.
#[derive(Debug, Default)]
pub struct RequestMetrics {
    uuid_requests: AtomicU64,
    list_requests: AtomicU64,
    health_requests: AtomicU64,
    rpc_requests: AtomicU64,
}

/// Point-in-time view of the counters, serialised by `/api/metrics`.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// `GET /api/uuid` calls served.
    pub uuid_requests: u64,
    /// `GET /api/list` calls served.
    pub list_requests: u64,
    /// `GET /health` calls served.
    pub health_requests: u64,
    /// JSON-RPC requests received over the streamable HTTP transport.
    pub rpc_requests: u64,
}

impl RequestMetrics {
    /// Creates a zeroed counter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one `/api/uuid` request.
    pub fn record_uuid(&self) {
        self.uuid_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one `/api/list` request.
    pub fn record_list(&self) {
        self.list_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one `/health` request.
    pub fn record_health(&self) {
        self.health_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one streamable-HTTP JSON-RPC request.
    pub fn record_rpc(&self) {
        self.rpc_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Captures the current counter values.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uuid_requests: self.uuid_requests.load(Ordering::Relaxed),
            list_requests: self.list_requests.load(Ordering::Relaxed),
            health_requests: self.health_requests.load(Ordering::Relaxed),
            rpc_requests: self.rpc_requests.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let metrics = RequestMetrics::new();
        let snap = metrics.snapshot();
        assert_eq!(snap.uuid_requests, 0);
        assert_eq!(snap.rpc_requests, 0);
    }

    #[test]
    fn counters_increment_independently() {
        let metrics = RequestMetrics::new();
        metrics.record_uuid();
        metrics.record_uuid();
        metrics.record_list();
        metrics.record_rpc();

        let snap = metrics.snapshot();
        assert_eq!(snap.uuid_requests, 2);
        assert_eq!(snap.list_requests, 1);
        assert_eq!(snap.health_requests, 0);
        assert_eq!(snap.rpc_requests, 1);
    }

    #[test]
    fn two_instances_do_not_share_state() {
        let a = RequestMetrics::new();
        let b = RequestMetrics::new();
        a.record_uuid();
        assert_eq!(b.snapshot().uuid_requests, 0);
    }
}
