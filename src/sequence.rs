// ─────────────────────────────────────────────────────────────────────────────
// sequence.rs — SequenceController (C4), the subtle part.
//
// The exclusive lease is a `tokio::sync::Mutex` held for the whole body of
// `with_sequence`, so "exactly one with_sequence call may be active" is a
// property of the lock rather than a convention. Error classification is a
// typed `SequenceOutcome` instead of exceptions, matching `OrderError`'s
// pattern-matched classification (exchange.rs:79-98) but carrying the
// retry policy as data rather than leaving it to the caller to infer from
// a string.
// ─────────────────────────────────────────────────────────────────────────────
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::warn;
use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::chain::ChainClient;
use crate::error::EngineError;

const REFRESH_INTERVAL: Duration = Duration::from_secs(30);
const DRIFT_TOLERANCE: i64 = 2;
pub const TRIP_THRESHOLD: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryReason {
    SequenceMismatch,
    TimeoutHeight,
    Other,
}

#[derive(Debug)]
pub enum SequenceOutcome<T> {
    Success(T),
    Retryable(RetryReason),
    Fatal(String),
}

struct SequenceState {
    value: u64,
    last_refreshed_at: Option<Instant>,
    consecutive_errors: u32,
}

/// Owns the signing sequence number for one wallet. Reachable only through
/// this API — no external reads of the raw counter.
pub struct SequenceController {
    address: String,
    chain: Arc<dyn ChainClient>,
    state: Mutex<SequenceState>,
}

impl SequenceController {
    pub fn new(address: String, chain: Arc<dyn ChainClient>) -> Self {
        Self {
            address,
            chain,
            state: Mutex::new(SequenceState { value: 0, last_refreshed_at: None, consecutive_errors: 0 }),
        }
    }

    /// Acquires the exclusive lease, invokes `f` with the current sequence,
    /// and classifies the result. On success advances `value` and resets
    /// the error counter; on failure applies the wait prescribed by the
    /// error pattern and updates `consecutive_errors`. Exactly one call can
    /// be inside this body at a time because `state` is a tokio Mutex held
    /// for the duration.
    pub async fn with_sequence<F, Fut, T>(&self, f: F) -> SequenceOutcome<T>
    where
        F: FnOnce(u64) -> Fut,
        Fut: std::future::Future<Output = Result<T, String>>,
    {
        let mut guard = self.state.lock().await;
        let seq = guard.value;

        match f(seq).await {
            Ok(value) => {
                guard.value = seq + 1;
                guard.consecutive_errors = 0;
                SequenceOutcome::Success(value)
            }
            Err(raw_err) => {
                let reason = classify(&raw_err);
                guard.consecutive_errors += 1;
                let errors = guard.consecutive_errors;
                drop(guard);

                match reason {
                    RetryReason::SequenceMismatch => {
                        self.refresh(true).await;
                        sleep(Duration::from_secs(3)).await;
                        SequenceOutcome::Retryable(RetryReason::SequenceMismatch)
                    }
                    RetryReason::TimeoutHeight => {
                        sleep(Duration::from_secs(5)).await;
                        SequenceOutcome::Retryable(RetryReason::TimeoutHeight)
                    }
                    RetryReason::Other => {
                        if errors < TRIP_THRESHOLD {
                            SequenceOutcome::Retryable(RetryReason::Other)
                        } else {
                            SequenceOutcome::Fatal(raw_err)
                        }
                    }
                }
            }
        }
    }

    /// Queries the authoritative sequence. Skipped unless `force` or the
    /// last refresh is stale by more than 30 s. Leaves state unchanged on
    /// query failure.
    pub async fn refresh(&self, force: bool) {
        let mut guard = self.state.lock().await;
        if !force {
            if let Some(last) = guard.last_refreshed_at {
                if last.elapsed() < REFRESH_INTERVAL {
                    return;
                }
            }
        }

        match self.chain.query_account_sequence(&self.address).await {
            Ok(authoritative) => {
                guard.value = authoritative;
                guard.last_refreshed_at = Some(Instant::now());
            }
            Err(e) => {
                warn!("sequence refresh failed for {}: {e}", self.address);
            }
        }
    }

    /// Overwrites `value` with the authoritative sequence if it has
    /// drifted by more than `DRIFT_TOLERANCE`.
    pub async fn check_drift(&self) {
        let authoritative = match self.chain.query_account_sequence(&self.address).await {
            Ok(v) => v,
            Err(e) => {
                warn!("drift check failed for {}: {e}", self.address);
                return;
            }
        };

        let mut guard = self.state.lock().await;
        let drift = authoritative as i64 - guard.value as i64;
        if drift.abs() > DRIFT_TOLERANCE {
            warn!(
                "sequence drift detected for {}: local={} authoritative={}",
                self.address, guard.value, authoritative
            );
            guard.value = authoritative;
        }
    }

    pub async fn tripped(&self) -> bool {
        self.state.lock().await.consecutive_errors >= TRIP_THRESHOLD
    }

    pub async fn reset_errors(&self) {
        self.state.lock().await.consecutive_errors = 0;
    }

    pub async fn value(&self) -> u64 {
        self.state.lock().await.value
    }
}

fn classify(raw_err: &str) -> RetryReason {
    let lowered = raw_err.to_lowercase();
    if lowered.contains("sequence mismatch") || lowered.contains("account sequence") {
        RetryReason::SequenceMismatch
    } else if lowered.contains("timeout height") {
        RetryReason::TimeoutHeight
    } else {
        RetryReason::Other
    }
}

pub fn fatal_if(outcome: &SequenceOutcome<()>) -> Option<EngineError> {
    match outcome {
        SequenceOutcome::Fatal(msg) => Some(EngineError::Invariant(msg.clone())),
        _ => None,
    }
}
