// ─────────────────────────────────────────────────────────────────────────────
// chain.rs — ChainClient (ambient): the opaque on-chain collaborator.
//
// Grounded on exchange.rs's `ExchangeClient` trait + `SimExchange`/
// `LiveExchange` split: one async_trait consumed by the engine, one
// in-memory implementation for tests, one real implementation behind a
// network client. The engine never matches on which implementation it
// holds.
// ─────────────────────────────────────────────────────────────────────────────
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::catalog::MarketType;
use crate::error::{EngineError, EngineResult};

/// Default per-call network timeout, per the concurrency model (§5).
pub const CALL_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderState {
    Booked,
    Partial,
    Active,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenOrder {
    pub order_hash: String,
    pub side: Side,
    pub price: f64,
    pub quantity: f64,
    pub filled_quantity: f64,
    pub state: OrderState,
}

/// A create instruction already scaled and rounded by the TxBuilder:
/// `price`/`quantity` are human-unit values aligned to `minPriceTick`/
/// `minQuantityTick`, not yet the chain's wire-format integers. Producing
/// the actual on-chain integer encoding (applying each market's decimal
/// exponents) is this trait's job, inside `build_signed_batch` — the
/// TxBuilder's contract ends at a tick-conformant, notional-checked order.
#[derive(Debug, Clone)]
pub struct ChainCreate {
    pub side: Side,
    pub price: f64,
    pub quantity: f64,
}

#[derive(Debug, Clone)]
pub struct ChainCancel {
    pub order_hash: String,
}

/// Opaque signed payload. The real implementation would hold bytes; tests
/// only need identity, so this is a transparent wrapper.
#[derive(Debug, Clone)]
pub struct SignedBatch {
    pub wallet_id: String,
    pub sequence: u64,
    pub creates: Vec<ChainCreate>,
    pub cancels: Vec<ChainCancel>,
}

#[derive(Debug, Clone)]
pub struct TxResult {
    pub ok: bool,
    pub code: u32,
    pub raw_log: String,
    pub tx_hash: String,
}

#[derive(Debug, Clone, Default)]
pub struct OrderbookDepth {
    pub best_bid: Option<f64>,
    pub best_ask: Option<f64>,
    pub total_orders: u32,
    pub near_count: u32,
}

/// Everything the engine needs from the chain, as an opaque collaborator.
/// Mirrors `ExchangeClient` (`exchange.rs`): one trait, swapped wholesale
/// between a simulated and a live backend.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn query_account_sequence(&self, address: &str) -> EngineResult<u64>;

    async fn query_open_orders(&self, address: &str, market_id: &str) -> EngineResult<Vec<OpenOrder>>;

    async fn query_orderbook(
        &self,
        market_id: &str,
        reference_price: Option<f64>,
        near_pct: f64,
    ) -> EngineResult<OrderbookDepth>;

    /// Last-trade-preferred mid. `None` means `Unavailable`, never a stale guess.
    async fn query_mid(&self, market_id: &str) -> EngineResult<Option<f64>>;

    async fn build_signed_batch(
        &self,
        wallet_id: &str,
        sequence: u64,
        creates: Vec<ChainCreate>,
        cancels: Vec<ChainCancel>,
        market_type: MarketType,
    ) -> EngineResult<SignedBatch>;

    async fn broadcast_batch(&self, batch: SignedBatch) -> EngineResult<TxResult>;
}

/// In-memory chain for tests and local runs without a real RPC endpoint.
/// Tracks one sequence counter and one open-order set per wallet/market,
/// the way `SimExchange` tracks positions without touching the network.
pub struct SimChainClient {
    inner: Mutex<SimState>,
}

#[derive(Default)]
struct SimState {
    sequences: HashMap<String, u64>,
    orders: HashMap<(String, String), Vec<OpenOrder>>,
    mids: HashMap<String, Option<f64>>,
    next_order_id: u64,
    /// Queue of scripted outcomes consumed in order by `broadcast_batch`,
    /// for tests that need to inject sequence-mismatch / reject errors.
    scripted_broadcasts: Vec<TxResult>,
}

impl SimChainClient {
    pub fn new() -> Self {
        Self { inner: Mutex::new(SimState::default()) }
    }

    pub fn set_sequence(&self, address: &str, value: u64) {
        self.inner.lock().unwrap().sequences.insert(address.to_string(), value);
    }

    pub fn set_mid(&self, market_id: &str, mid: Option<f64>) {
        self.inner.lock().unwrap().mids.insert(market_id.to_string(), mid);
    }

    pub fn seed_orders(&self, address: &str, market_id: &str, orders: Vec<OpenOrder>) {
        self.inner
            .lock()
            .unwrap()
            .orders
            .insert((address.to_string(), market_id.to_string()), orders);
    }

    /// Push a canned broadcast result to be returned on the next call,
    /// in FIFO order. Used to simulate sequence mismatches (S5) and
    /// repeated rejections (S6) without a real network.
    pub fn script_broadcast(&self, result: TxResult) {
        self.inner.lock().unwrap().scripted_broadcasts.push(result);
    }
}

impl Default for SimChainClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainClient for SimChainClient {
    async fn query_account_sequence(&self, address: &str) -> EngineResult<u64> {
        Ok(*self.inner.lock().unwrap().sequences.get(address).unwrap_or(&0))
    }

    async fn query_open_orders(&self, address: &str, market_id: &str) -> EngineResult<Vec<OpenOrder>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .orders
            .get(&(address.to_string(), market_id.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn query_orderbook(
        &self,
        _market_id: &str,
        _reference_price: Option<f64>,
        _near_pct: f64,
    ) -> EngineResult<OrderbookDepth> {
        Ok(OrderbookDepth::default())
    }

    async fn query_mid(&self, market_id: &str) -> EngineResult<Option<f64>> {
        Ok(self.inner.lock().unwrap().mids.get(market_id).copied().flatten())
    }

    async fn build_signed_batch(
        &self,
        wallet_id: &str,
        sequence: u64,
        creates: Vec<ChainCreate>,
        cancels: Vec<ChainCancel>,
        _market_type: MarketType,
    ) -> EngineResult<SignedBatch> {
        Ok(SignedBatch { wallet_id: wallet_id.to_string(), sequence, creates, cancels })
    }

    async fn broadcast_batch(&self, batch: SignedBatch) -> EngineResult<TxResult> {
        let mut state = self.inner.lock().unwrap();
        if let Some(scripted) = state.scripted_broadcasts.first().cloned() {
            state.scripted_broadcasts.remove(0);
            if scripted.ok {
                let seq = state.sequences.entry(batch.wallet_id.clone()).or_insert(0);
                *seq = batch.sequence + 1;
            }
            return Ok(scripted);
        }

        let seq = state.sequences.entry(batch.wallet_id.clone()).or_insert(0);
        *seq = batch.sequence + 1;
        state.next_order_id += 1;
        Ok(TxResult {
            ok: true,
            code: 0,
            raw_log: String::new(),
            tx_hash: format!("0x{}", hex::encode(state.next_order_id.to_be_bytes())),
        })
    }
}

/// Real backend. Holds the bits a concrete gRPC/REST client would need;
/// the network calls themselves are deliberately left unimplemented rather
/// than faked.
pub struct LiveChainClient {
    pub base_url: String,
}

impl LiveChainClient {
    pub fn new(base_url: String) -> Self {
        Self { base_url }
    }
}

#[async_trait]
impl ChainClient for LiveChainClient {
    async fn query_account_sequence(&self, _address: &str) -> EngineResult<u64> {
        Err(EngineError::Chain(format!("live chain client not wired to {}", self.base_url)))
    }

    async fn query_open_orders(&self, _address: &str, _market_id: &str) -> EngineResult<Vec<OpenOrder>> {
        Err(EngineError::Chain(format!("live chain client not wired to {}", self.base_url)))
    }

    async fn query_orderbook(
        &self,
        _market_id: &str,
        _reference_price: Option<f64>,
        _near_pct: f64,
    ) -> EngineResult<OrderbookDepth> {
        Err(EngineError::Chain(format!("live chain client not wired to {}", self.base_url)))
    }

    async fn query_mid(&self, _market_id: &str) -> EngineResult<Option<f64>> {
        Err(EngineError::Chain(format!("live chain client not wired to {}", self.base_url)))
    }

    async fn build_signed_batch(
        &self,
        _wallet_id: &str,
        _sequence: u64,
        _creates: Vec<ChainCreate>,
        _cancels: Vec<ChainCancel>,
        _market_type: MarketType,
    ) -> EngineResult<SignedBatch> {
        Err(EngineError::Chain(format!("live chain client not wired to {}", self.base_url)))
    }

    async fn broadcast_batch(&self, _batch: SignedBatch) -> EngineResult<TxResult> {
        Err(EngineError::Chain(format!("live chain client not wired to {}", self.base_url)))
    }
}
