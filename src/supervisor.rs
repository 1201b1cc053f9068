// ─────────────────────────────────────────────────────────────────────────────
// supervisor.rs — Supervisor surface (ambient).
//
// main.rs spawns one tokio task per concern (ingestor, latency reporter,
// stall monitor...) and coordinates them with `tokio::sync::watch`
// channels (the screener subscriber, `publisher.rs:37-82`). This module
// generalizes that into one structured type: one task per wallet, a
// watch channel per task for status, and graceful start/stop.
// ─────────────────────────────────────────────────────────────────────────────
use std::collections::HashMap;

use log::info;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::{EngineError, EngineResult};
use crate::worker::{WalletWorker, WorkerStatus};

struct Handle {
    join: JoinHandle<EngineResult<()>>,
    shutdown_tx: watch::Sender<bool>,
    status_rx: watch::Receiver<WorkerStatus>,
}

/// Starts and stops `WalletWorker` tasks and exposes their status. An
/// operator-facing layer talks to this and nothing lower.
#[derive(Default)]
pub struct Supervisor {
    workers: HashMap<String, Handle>,
}

impl Supervisor {
    pub fn new() -> Self {
        Self { workers: HashMap::new() }
    }

    pub fn start_worker(&mut self, wallet_id: String, worker: WalletWorker) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let status_rx = worker.status_receiver();
        let join = tokio::spawn(worker.run(shutdown_rx));
        info!("started worker for wallet {wallet_id}");
        self.workers.insert(wallet_id, Handle { join, shutdown_tx, status_rx });
    }

    /// Signals shutdown and, if `graceful`, awaits the task's completion
    /// (bounded by the worker's own per-call timeouts). A non-graceful
    /// stop only flips the signal and returns immediately.
    pub async fn stop_worker(&mut self, wallet_id: &str, graceful: bool) -> EngineResult<()> {
        let handle = self
            .workers
            .remove(wallet_id)
            .ok_or_else(|| EngineError::UnknownWallet(wallet_id.to_string()))?;

        handle.shutdown_tx.send(true).ok();
        if graceful {
            match handle.join.await {
                Ok(result) => result?,
                Err(e) => return Err(EngineError::Invariant(format!("worker task panicked: {e}"))),
            }
        }
        Ok(())
    }

    pub fn worker_status(&self, wallet_id: &str) -> EngineResult<WorkerStatus> {
        self.workers
            .get(wallet_id)
            .map(|h| h.status_rx.borrow().clone())
            .ok_or_else(|| EngineError::UnknownWallet(wallet_id.to_string()))
    }

    pub fn wallet_ids(&self) -> Vec<String> {
        self.workers.keys().cloned().collect()
    }
}
