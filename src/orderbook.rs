// ─────────────────────────────────────────────────────────────────────────────
// orderbook.rs — OrderbookView (C3)
//
// Thin read-through over ChainClient's order/book queries. No caching
// here (unlike PriceOracle) — depth and own-order state must reflect the
// latest chain state each cycle, matching how `exchange.rs`'s
// `get_open_orders`/`get_all_mids` are called fresh each quoting loop
// iteration rather than through the TTL cache used for prices.
// ─────────────────────────────────────────────────────────────────────────────
use std::sync::Arc;

use crate::chain::{ChainClient, OpenOrder};
use crate::error::{EngineError, EngineResult};

pub const NEAR_PRICE_PCT: f64 = 0.05;

#[derive(Debug, Clone, Default)]
pub struct OrderbookSnapshot {
    pub best_bid: Option<f64>,
    pub best_ask: Option<f64>,
    pub total_orders: u32,
    pub orders_near_price: u32,
}

pub struct OrderbookView {
    chain: Arc<dyn ChainClient>,
}

impl OrderbookView {
    pub fn new(chain: Arc<dyn ChainClient>) -> Self {
        Self { chain }
    }

    pub async fn own_orders(&self, address: &str, market_id: &str) -> EngineResult<Vec<OpenOrder>> {
        self.chain
            .query_open_orders(address, market_id)
            .await
            .map_err(|e| EngineError::Transient(e.to_string()))
    }

    pub async fn snapshot(&self, market_id: &str, reference_price: Option<f64>) -> EngineResult<OrderbookSnapshot> {
        let depth = self
            .chain
            .query_orderbook(market_id, reference_price, NEAR_PRICE_PCT)
            .await
            .map_err(|e| EngineError::Transient(e.to_string()))?;
        Ok(OrderbookSnapshot {
            best_bid: depth.best_bid,
            best_ask: depth.best_ask,
            total_orders: depth.total_orders,
            orders_near_price: depth.near_count,
        })
    }
}
