//! Metrics registry
//!
//! - Counters only
//! - Monotonic increase, reset only on process start
//! - Per-type fetch counts sit behind a mutex; everything else is atomic

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Registry of operational counters shared by the store and executor
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Fetch scans issued
    fetches: AtomicU64,
    /// Document files decoded during scans
    documents_scanned: AtomicU64,
    /// Documents published (create + modify)
    writes: AtomicU64,
    /// Documents removed
    deletes: AtomicU64,
    /// Deferred relation batches loaded
    batch_loads: AtomicU64,
    /// Requests executed
    requests_executed: AtomicU64,
    /// Mutations rejected before storage
    mutations_rejected: AtomicU64,
    /// Fetch scans per type name
    fetches_by_type: Mutex<BTreeMap<String, u64>>,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one fetch scan against `type_name`
    pub fn record_fetch(&self, type_name: &str) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut by_type) = self.fetches_by_type.lock() {
            *by_type.entry(type_name.to_string()).or_insert(0) += 1;
        }
    }

    /// Add scanned document files
    pub fn add_documents_scanned(&self, count: u64) {
        self.documents_scanned.fetch_add(count, Ordering::Relaxed);
    }

    /// Increment writes
    pub fn increment_writes(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment deletes
    pub fn increment_deletes(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment batch loads
    pub fn increment_batch_loads(&self) {
        self.batch_loads.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment executed requests
    pub fn increment_requests(&self) {
        self.requests_executed.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment rejected mutations
    pub fn increment_mutations_rejected(&self) {
        self.mutations_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of fetch scans issued against `type_name`
    pub fn fetches_for(&self, type_name: &str) -> u64 {
        self.fetches_by_type
            .lock()
            .map(|by_type| by_type.get(type_name).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            fetches: self.fetches.load(Ordering::Relaxed),
            documents_scanned: self.documents_scanned.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            batch_loads: self.batch_loads.load(Ordering::Relaxed),
            requests_executed: self.requests_executed.load(Ordering::Relaxed),
            mutations_rejected: self.mutations_rejected.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of the scalar counters
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    pub fetches: u64,
    pub documents_scanned: u64,
    pub writes: u64,
    pub deletes: u64,
    pub batch_loads: u64,
    pub requests_executed: u64,
    pub mutations_rejected: u64,
}
