//! Streaming session metrics
//!
//! Counters for started and finished transport sessions plus per-vendor error
//! counts. Vendor errors are fatal only for the session that hit them, so the
//! counter is the main signal that a vendor is misbehaving.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::RwLock;
use serde::Serialize;

use crate::core::models::VendorName;

#[derive(Debug)]
pub struct StreamingMetrics {
    /// Transport sessions registered with the handler
    sessions_started: AtomicU64,

    /// Transport sessions released (hangup, stop, vendor failure or finish)
    sessions_finished: AtomicU64,

    /// Connections rejected before a session was resolved
    rejected_connections: AtomicU64,

    /// Vendor errors keyed by vendor
    vendor_errors: RwLock<HashMap<VendorName, u64>>,

    start_time: Instant,
}

/// Point-in-time copy of [`StreamingMetrics`].
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub sessions_started: u64,
    pub sessions_finished: u64,
    pub rejected_connections: u64,
    pub vendor_errors: HashMap<VendorName, u64>,
    pub uptime_seconds: u64,
}

impl StreamingMetrics {
    pub fn new() -> Self {
        Self {
            sessions_started: AtomicU64::new(0),
            sessions_finished: AtomicU64::new(0),
            rejected_connections: AtomicU64::new(0),
            vendor_errors: RwLock::new(HashMap::new()),
            start_time: Instant::now(),
        }
    }

    pub fn record_session_started(&self) {
        self.sessions_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_finished(&self) {
        self.sessions_finished.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected_connection(&self) {
        self.rejected_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_vendor_error(&self, vendor: VendorName) {
        *self.vendor_errors.write().entry(vendor).or_insert(0) += 1;
    }

    pub fn vendor_errors(&self, vendor: VendorName) -> u64 {
        self.vendor_errors.read().get(&vendor).copied().unwrap_or(0)
    }

    /// Sessions started but not yet finished
    pub fn active_sessions(&self) -> u64 {
        let started = self.sessions_started.load(Ordering::Relaxed);
        let finished = self.sessions_finished.load(Ordering::Relaxed);
        started.saturating_sub(finished)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sessions_started: self.sessions_started.load(Ordering::Relaxed),
            sessions_finished: self.sessions_finished.load(Ordering::Relaxed),
            rejected_connections: self.rejected_connections.load(Ordering::Relaxed),
            vendor_errors: self.vendor_errors.read().clone(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for StreamingMetrics {
    fn default() -> Self {
        Self::new()
    }
}
