// ─────────────────────────────────────────────────────────────────────────────
// catalog.rs — Market metadata catalog (C1)
//
// Loaded once from the `markets.*` section of the config file and held
// immutable for the life of the process. Shared read-only across every
// wallet worker.
// ─────────────────────────────────────────────────────────────────────────────
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Spot markets settle in quote-asset units with a coarser price scale than
/// perpetuals; derivative markets carry a leverage/margin dimension the
/// TxBuilder must encode differently. No inheritance — callers match on
/// this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MarketType {
    Spot,
    Derivative,
}

/// Static, immutable metadata for one market. Opaque on-chain market ids
/// are carried as hex strings (e.g. Injective-style order-book market
/// hashes) rather than raw bytes, matching how this kind of id is rendered
/// at every layer above the chain client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub symbol: String,
    #[serde(rename = "type")]
    pub market_type: MarketType,
    pub testnet_market_id: String,
    pub mainnet_market_id: String,
    pub base_decimals: u32,
    pub quote_decimals: u32,
    pub min_price_tick: f64,
    pub min_quantity_tick: f64,
    pub min_notional: f64,
}

impl Market {
    fn validate(&self) -> EngineResult<()> {
        let bad = |reason: &str| EngineError::InvalidMarket {
            symbol: self.symbol.clone(),
            reason: reason.to_string(),
        };
        if self.min_price_tick <= 0.0 {
            return Err(bad("min_price_tick must be positive"));
        }
        if self.min_quantity_tick <= 0.0 {
            return Err(bad("min_quantity_tick must be positive"));
        }
        if self.min_notional < 0.0 {
            return Err(bad("min_notional must not be negative"));
        }
        if self.base_decimals == 0 && self.market_type == MarketType::Spot {
            return Err(bad("base_decimals must be positive"));
        }
        Ok(())
    }
}

/// Immutable, shared-read catalog of every configured market.
#[derive(Debug, Clone, Default)]
pub struct MarketCatalog {
    markets: HashMap<String, Market>,
    /// wallet id -> enabled market symbols, as declared in `wallets.<id>.markets`.
    wallet_markets: HashMap<String, Vec<String>>,
}

impl MarketCatalog {
    pub fn build(
        markets: HashMap<String, Market>,
        wallet_markets: HashMap<String, Vec<String>>,
    ) -> EngineResult<Self> {
        for market in markets.values() {
            market.validate()?;
        }
        for (wallet_id, symbols) in &wallet_markets {
            for symbol in symbols {
                if !markets.contains_key(symbol) {
                    return Err(EngineError::InvalidMarket {
                        symbol: symbol.clone(),
                        reason: format!("referenced by wallet {wallet_id} but not declared in [markets]"),
                    });
                }
            }
        }
        Ok(Self { markets, wallet_markets })
    }

    pub fn lookup(&self, symbol: &str) -> EngineResult<&Market> {
        self.markets
            .get(symbol)
            .ok_or_else(|| EngineError::UnknownMarket(symbol.to_string()))
    }

    /// Markets enabled for a given wallet, in declaration order.
    pub fn enabled_markets(&self, wallet_id: &str) -> EngineResult<Vec<&Market>> {
        let symbols = self
            .wallet_markets
            .get(wallet_id)
            .ok_or_else(|| EngineError::UnknownWallet(wallet_id.to_string()))?;
        symbols.iter().map(|s| self.lookup(s)).collect()
    }
}
