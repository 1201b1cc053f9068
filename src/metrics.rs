// ─────────────────────────────────────────────────────────────────────────────
// metrics.rs — lightweight per-worker counters (ambient).
//
// Generalized from `monitor.rs`'s `PerformanceMonitor` (profit-factor /
// win-rate tracking over PnL) down to the handful of counters this spec
// actually needs: cycles run, broadcasts sent, circuit-breaker trips.
// Surfaced through `workerStatus` rather than through a dashboard.
// ─────────────────────────────────────────────────────────────────────────────
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct WorkerMetrics {
    pub cycles_run: AtomicU64,
    pub broadcasts_sent: AtomicU64,
    pub cycles_skipped: AtomicU64,
    pub circuit_breaker_trips: AtomicU64,
}

impl WorkerMetrics {
    pub fn record_cycle(&self) {
        self.cycles_run.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_broadcast(&self) {
        self.broadcasts_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skip(&self) {
        self.cycles_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_trip(&self) {
        self.circuit_breaker_trips.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cycles_run: self.cycles_run.load(Ordering::Relaxed),
            broadcasts_sent: self.broadcasts_sent.load(Ordering::Relaxed),
            cycles_skipped: self.cycles_skipped.load(Ordering::Relaxed),
            circuit_breaker_trips: self.circuit_breaker_trips.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub cycles_run: u64,
    pub broadcasts_sent: u64,
    pub cycles_skipped: u64,
    pub circuit_breaker_trips: u64,
}
