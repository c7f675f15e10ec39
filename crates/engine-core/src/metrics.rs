use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

#[derive(Debug, Default)]
struct InnerMetrics {
    pages_fetched: AtomicU64,
    keys_counted: AtomicU64,
    records_yielded: AtomicU64,
    failure_count: AtomicU64,
}

/// Counters shared by every walk the handle is attached to.
#[derive(Debug, Clone, Default)]
pub struct WalkMetrics {
    inner: Arc<InnerMetrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub pages_fetched: u64,
    pub keys_counted: u64,
    pub records_yielded: u64,
    pub failure_count: u64,
}

impl WalkMetrics {
    pub fn new() -> Self {
        WalkMetrics::default()
    }

    pub fn increment_pages(&self, count: u64) {
        self.inner.pages_fetched.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_keys(&self, count: u64) {
        self.inner.keys_counted.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_records(&self, count: u64) {
        self.inner
            .records_yielded
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_failures(&self, count: u64) {
        self.inner.failure_count.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            pages_fetched: self.inner.pages_fetched.load(Ordering::Relaxed),
            keys_counted: self.inner.keys_counted.load(Ordering::Relaxed),
            records_yielded: self.inner.records_yielded.load(Ordering::Relaxed),
            failure_count: self.inner.failure_count.load(Ordering::Relaxed),
        }
    }
}
