// ─────────────────────────────────────────────────────────────────────────────
// worker.rs — WalletWorker (C7), the per-wallet control loop.
//
// Grounded on main.rs's quoting loop (gate checks, per-asset loop,
// sleep-then-iterate) and its stall/circuit-breaker tasks
// (main.rs:141-154,156-172), restructured as one `WalletWorker::run`
// method instead of scattered `tokio::spawn` closures in `main`.
// ─────────────────────────────────────────────────────────────────────────────
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use log::{error, info, warn};
use tokio::sync::watch;
use tokio::time::sleep;

use crate::catalog::Market;
use crate::chain::ChainClient;
use crate::config::MarketParams;
use crate::error::{EngineError, EngineResult};
use crate::keys::WalletConfig;
use crate::metrics::WorkerMetrics;
use crate::oracle::PriceOracle;
use crate::orderbook::OrderbookView;
use crate::planner::{self, Phase};
use crate::rng::PlannerRng;
use crate::sequence::{SequenceController, SequenceOutcome};
use crate::txbuilder;

const DRIFT_CHECK_INTERVAL: Duration = Duration::from_secs(30);
const COOLING_SLEEP: Duration = Duration::from_secs(10);
const MAX_BROADCAST_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Starting,
    Running,
    Cooling,
    Stopping,
    Stopped,
}

/// Status surfaced through `Supervisor::worker_status`. Wall-clock
/// timestamps (rather than `Instant`) since this is the operator-facing
/// view — an `Instant` can't be rendered in a log line or a dashboard.
#[derive(Debug, Clone)]
pub struct WorkerStatus {
    pub state: WorkerState,
    pub started_at: Option<DateTime<Utc>>,
    pub last_cycle_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl Default for WorkerStatus {
    fn default() -> Self {
        Self { state: WorkerState::Starting, started_at: None, last_cycle_at: None, last_error: None }
    }
}

impl WorkerStatus {
    /// Wall-clock time since the worker entered RUNNING, or `None` if it
    /// hasn't started yet.
    pub fn uptime(&self) -> Option<Duration> {
        let started = self.started_at?;
        (Utc::now() - started).to_std().ok()
    }
}

pub struct WalletWorker {
    wallet: WalletConfig,
    markets: Vec<Market>,
    market_params: HashMap<String, MarketParams>,
    oracle: Arc<PriceOracle>,
    orderbook: OrderbookView,
    chain: Arc<dyn ChainClient>,
    sequence: SequenceController,
    metrics: Arc<WorkerMetrics>,
    rng: PlannerRng,
    status_tx: watch::Sender<WorkerStatus>,
    maintain_cycles: HashMap<String, u64>,
}

impl WalletWorker {
    pub fn new(
        wallet: WalletConfig,
        markets: Vec<Market>,
        market_params: HashMap<String, MarketParams>,
        oracle: Arc<PriceOracle>,
        chain: Arc<dyn ChainClient>,
        rng_seed: u64,
    ) -> Self {
        let sequence = SequenceController::new(wallet.wallet_id.clone(), chain.clone());
        let orderbook = OrderbookView::new(chain.clone());
        let (status_tx, _rx) = watch::channel(WorkerStatus::default());
        Self {
            wallet,
            markets,
            market_params,
            oracle,
            orderbook,
            chain,
            sequence,
            metrics: Arc::new(WorkerMetrics::default()),
            rng: PlannerRng::from_seed(rng_seed),
            status_tx,
            maintain_cycles: HashMap::new(),
        }
    }

    pub fn metrics(&self) -> Arc<WorkerMetrics> {
        self.metrics.clone()
    }

    pub fn status_receiver(&self) -> watch::Receiver<WorkerStatus> {
        self.status_tx.subscribe()
    }

    fn publish(&self, f: impl FnOnce(&mut WorkerStatus)) {
        self.status_tx.send_modify(f);
    }

    /// Runs until `shutdown` fires. STARTING verifies the wallet has at
    /// least one enabled market and force-refreshes the sequence; RUNNING
    /// round-robins one market per cycle so sequence usage stays strictly
    /// serial per account; COOLING is entered after the circuit breaker
    /// trips. A shutdown signal observed between cycles stops the loop
    /// without cancelling an in-flight lease — `with_sequence` always
    /// runs to completion before the suspension point is reached.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> EngineResult<()> {
        if self.markets.is_empty() {
            return Err(EngineError::Config(format!("wallet {} has no enabled markets", self.wallet.wallet_id)));
        }

        self.sequence.refresh(true).await;
        self.publish(|s| {
            s.state = WorkerState::Running;
            s.started_at = Some(Utc::now());
        });

        let mut market_idx = 0usize;
        let mut last_drift_check = Instant::now();

        loop {
            if *shutdown.borrow() {
                break;
            }

            let market = self.markets[market_idx % self.markets.len()].clone();
            market_idx = market_idx.wrapping_add(1);

            if last_drift_check.elapsed() >= DRIFT_CHECK_INTERVAL {
                self.sequence.refresh(false).await;
                self.sequence.check_drift().await;
                last_drift_check = Instant::now();
            }

            match self.run_cycle(&market).await {
                Ok(()) => {
                    self.publish(|s| {
                        s.last_cycle_at = Some(Utc::now());
                        s.last_error = None;
                    });
                }
                Err(EngineError::Invariant(ref msg)) if msg == "NothingToDo" => {
                    self.metrics.record_skip();
                }
                Err(e @ EngineError::Config(_)) | Err(e @ EngineError::UnknownMarket(_)) => {
                    self.publish(|s| {
                        s.state = WorkerState::Stopped;
                        s.last_error = Some(e.to_string());
                    });
                    return Err(e);
                }
                Err(e) => {
                    warn!("wallet {} cycle error: {e}", self.wallet.wallet_id);
                    self.publish(|s| s.last_error = Some(e.to_string()));
                }
            }

            if self.sequence.tripped().await {
                self.metrics.record_trip();
                self.publish(|s| s.state = WorkerState::Cooling);
                info!("wallet {} circuit breaker tripped, cooling down", self.wallet.wallet_id);
                sleep(COOLING_SLEEP).await;
                self.sequence.refresh(true).await;
                self.sequence.reset_errors().await;
                self.publish(|s| s.state = WorkerState::Running);
            }

            let interval = self
                .market_params
                .get(&market.symbol)
                .map(|p| p.cycle_interval_secs)
                .unwrap_or(15);

            tokio::select! {
                _ = sleep(Duration::from_secs(interval)) => {}
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        self.publish(|s| s.state = WorkerState::Stopped);
        Ok(())
    }

    async fn run_cycle(&mut self, market: &Market) -> EngineResult<()> {
        self.metrics.record_cycle();

        let params = self
            .market_params
            .get(&market.symbol)
            .cloned()
            .ok_or_else(|| EngineError::UnknownMarket(market.symbol.clone()))?;

        let price_ttl = Duration::from_secs(params.price_refresh_interval_secs);
        let mainnet_mid = self.oracle.mainnet_mid(&market.mainnet_market_id, price_ttl).await;
        let testnet_mid = self.oracle.testnet_mid(&market.testnet_market_id, price_ttl).await;

        let own_orders = self.orderbook.own_orders(&self.wallet.wallet_id, &market.testnet_market_id).await?;
        let snapshot = self.orderbook.snapshot(&market.testnet_market_id, mainnet_mid).await?;

        let maintain_cycle = *self.maintain_cycles.get(&market.symbol).unwrap_or(&0);
        let action_plan = planner::plan(
            market,
            mainnet_mid,
            testnet_mid,
            &snapshot,
            &own_orders,
            &params,
            self.wallet.max_open_orders,
            maintain_cycle,
            &mut self.rng,
        );

        if action_plan.phase == Phase::Maintain {
            self.maintain_cycles.insert(market.symbol.clone(), maintain_cycle + 1);
        }

        if action_plan.phase == Phase::Idle || action_plan.is_empty() {
            return Ok(());
        }

        let batch = txbuilder::build(&action_plan, market, &own_orders)?;

        let mut last_outcome_err: Option<String> = None;
        for _attempt in 0..MAX_BROADCAST_ATTEMPTS {
            let chain = self.chain.clone();
            let wallet_id = self.wallet.wallet_id.clone();
            let market_type = market.market_type;
            let creates = batch.creates.clone();
            let cancels = batch.cancels.clone();

            let outcome = self
                .sequence
                .with_sequence(move |seq| async move {
                    let signed = chain
                        .build_signed_batch(&wallet_id, seq, creates, cancels, market_type)
                        .await
                        .map_err(|e| e.to_string())?;
                    let result = chain.broadcast_batch(signed).await.map_err(|e| e.to_string())?;
                    if result.ok {
                        Ok(result)
                    } else {
                        Err(result.raw_log)
                    }
                })
                .await;

            match outcome {
                SequenceOutcome::Success(_) => {
                    self.metrics.record_broadcast();
                    return Ok(());
                }
                SequenceOutcome::Retryable(reason) => {
                    last_outcome_err = Some(format!("{reason:?}"));
                    continue;
                }
                SequenceOutcome::Fatal(msg) => {
                    error!("wallet {} fatal broadcast error: {msg}", self.wallet.wallet_id);
                    return Err(EngineError::Invariant(msg));
                }
            }
        }

        Err(EngineError::Transient(last_outcome_err.unwrap_or_else(|| "broadcast retries exhausted".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MarketType;
    use crate::chain::SimChainClient;
    use crate::keys::Secret;

    fn sample_market() -> Market {
        Market {
            symbol: "INJ/USDT".to_string(),
            market_type: MarketType::Spot,
            testnet_market_id: "tnet".to_string(),
            mainnet_market_id: "mnet".to_string(),
            base_decimals: 18,
            quote_decimals: 6,
            min_price_tick: 0.0001,
            min_quantity_tick: 0.01,
            min_notional: 1.0,
        }
    }

    fn sample_params() -> MarketParams {
        MarketParams {
            base_order_size: 15.0,
            base_spread_bps: 10.0,
            min_spread_bps: 5.0,
            max_spread_bps: 100.0,
            deviation_threshold_bps: 1500.0,
            price_refresh_interval_secs: 5,
            cycle_interval_secs: 15,
        }
    }

    fn sample_wallet() -> WalletConfig {
        WalletConfig {
            wallet_id: "w0".to_string(),
            name: "w0".to_string(),
            private_key: Secret::new("k"),
            enabled: true,
            max_open_orders: 200,
        }
    }

    #[tokio::test]
    async fn empty_plan_does_not_consume_sequence_number() {
        let sim = Arc::new(SimChainClient::new());
        // no mainnet mid configured -> IDLE
        let oracle = Arc::new(PriceOracle::new(sim.clone(), sim.clone()));
        let mut params_map = HashMap::new();
        params_map.insert("INJ/USDT".to_string(), sample_params());
        let mut worker = WalletWorker::new(sample_wallet(), vec![sample_market()], params_map, oracle, sim.clone(), 42);

        let market = sample_market();
        let before = worker.sequence.value().await;
        let _ = worker.run_cycle(&market).await;
        let after = worker.sequence.value().await;
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn worker_requires_at_least_one_market() {
        let sim = Arc::new(SimChainClient::new());
        let oracle = Arc::new(PriceOracle::new(sim.clone(), sim.clone()));
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = WalletWorker::new(sample_wallet(), vec![], HashMap::new(), oracle, sim, 42);
        let result = worker.run(shutdown_rx).await;
        assert!(result.is_err());
    }

    #[test]
    fn uptime_is_none_before_started_at_is_set() {
        let status = WorkerStatus::default();
        assert!(status.uptime().is_none());
    }

    #[test]
    fn uptime_is_some_once_started_at_is_set() {
        let status = WorkerStatus { started_at: Some(Utc::now()), ..WorkerStatus::default() };
        assert!(status.uptime().is_some());
    }
}
