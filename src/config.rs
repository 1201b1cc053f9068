// ─────────────────────────────────────────────────────────────────────────────
// config.rs — Config loading & validation (C8)
//
// A structured TOML document with two top-level tables:
//   [wallets.<id>]  -> markets[] the wallet should quote
//   [markets.<symbol>] -> static Market metadata + per-market trading params
// ─────────────────────────────────────────────────────────────────────────────
use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::catalog::{Market, MarketCatalog, MarketType};
use crate::error::{EngineError, EngineResult};

/// Per-market trading parameters, layered on top of the static `Market`
/// metadata. These tune the Planner's behavior, not the chain encoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketParams {
    pub base_order_size: f64,
    pub base_spread_bps: f64,
    pub min_spread_bps: f64,
    pub max_spread_bps: f64,
    pub deviation_threshold_bps: f64,
    #[serde(default = "default_price_refresh_secs")]
    pub price_refresh_interval_secs: u64,
    #[serde(default = "default_cycle_interval_secs")]
    pub cycle_interval_secs: u64,
}

fn default_price_refresh_secs() -> u64 {
    5
}

fn default_cycle_interval_secs() -> u64 {
    15
}

/// Raw per-symbol config entry: static catalog fields plus the trading
/// params, flattened into one TOML table for operator convenience.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketEntry {
    pub testnet_market_id: String,
    pub mainnet_market_id: String,
    #[serde(rename = "type")]
    pub market_type: MarketType,
    pub base_order_size: f64,
    pub base_spread_bps: f64,
    pub min_spread_bps: f64,
    pub max_spread_bps: f64,
    pub deviation_threshold_bps: f64,
    pub min_price_tick: f64,
    pub min_quantity_tick: f64,
    pub min_notional: f64,
    pub base_decimals: u32,
    pub quote_decimals: u32,
    #[serde(default = "default_price_refresh_secs")]
    pub price_refresh_interval_secs: u64,
    #[serde(default = "default_cycle_interval_secs")]
    pub cycle_interval_secs: u64,
}

impl MarketEntry {
    fn split(self, symbol: String) -> (Market, MarketParams) {
        let market = Market {
            symbol,
            market_type: self.market_type,
            testnet_market_id: self.testnet_market_id,
            mainnet_market_id: self.mainnet_market_id,
            base_decimals: self.base_decimals,
            quote_decimals: self.quote_decimals,
            min_price_tick: self.min_price_tick,
            min_quantity_tick: self.min_quantity_tick,
            min_notional: self.min_notional,
        };
        let params = MarketParams {
            base_order_size: self.base_order_size,
            base_spread_bps: self.base_spread_bps,
            min_spread_bps: self.min_spread_bps,
            max_spread_bps: self.max_spread_bps,
            deviation_threshold_bps: self.deviation_threshold_bps,
            price_refresh_interval_secs: self.price_refresh_interval_secs,
            cycle_interval_secs: self.cycle_interval_secs,
        };
        (market, params)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletEntry {
    pub markets: Vec<String>,
}

/// Top-level config document, as parsed directly from TOML.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RawConfig {
    #[serde(default)]
    pub wallets: HashMap<String, WalletEntry>,
    #[serde(default)]
    pub markets: HashMap<String, MarketEntry>,
}

impl RawConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| EngineError::Config(format!("failed to read {:?}: {e}", path.as_ref())))?;
        toml::from_str(&content).map_err(|e| EngineError::Config(format!("failed to parse config: {e}")))
    }
}

/// Fully validated, loaded configuration: the market catalog plus
/// per-market trading params. Per-wallet `maxOpenOrders` lives on
/// `WalletConfig` instead (sourced from `WALLET_<N>_MAX_ORDERS`, per
/// `KeyProvider`), not here.
pub struct LoadedConfig {
    pub catalog: MarketCatalog,
    pub market_params: HashMap<String, MarketParams>,
}

impl LoadedConfig {
    pub fn from_raw(raw: RawConfig) -> EngineResult<Self> {
        let mut markets = HashMap::new();
        let mut market_params = HashMap::new();
        for (symbol, entry) in raw.markets {
            let (market, params) = entry.split(symbol.clone());
            market_params.insert(symbol.clone(), params);
            markets.insert(symbol, market);
        }

        let mut wallet_markets = HashMap::new();
        for (wallet_id, entry) in raw.wallets {
            wallet_markets.insert(wallet_id, entry.markets);
        }

        let catalog = MarketCatalog::build(markets, wallet_markets)?;
        Ok(Self { catalog, market_params })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        Self::from_raw(RawConfig::from_file(path)?)
    }

    pub fn params_for(&self, symbol: &str) -> EngineResult<&MarketParams> {
        self.market_params
            .get(symbol)
            .ok_or_else(|| EngineError::UnknownMarket(symbol.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_TOML: &str = r#"
[wallets.w0]
markets = ["INJ/USDT"]

[markets."INJ/USDT"]
testnet_market_id = "0xtest"
mainnet_market_id = "0xmain"
type = "SPOT"
base_order_size = 15.0
base_spread_bps = 10.0
min_spread_bps = 5.0
max_spread_bps = 100.0
deviation_threshold_bps = 1500.0
min_price_tick = 0.0001
min_quantity_tick = 0.01
min_notional = 1.0
base_decimals = 18
quote_decimals = 6
"#;

    #[test]
    fn parses_minimal_config() {
        let raw: RawConfig = toml::from_str(SAMPLE_TOML).unwrap();
        let loaded = LoadedConfig::from_raw(raw).unwrap();
        let markets = loaded.catalog.enabled_markets("w0").unwrap();
        assert_eq!(markets.len(), 1);
        assert_eq!(markets[0].symbol, "INJ/USDT");
        let params = loaded.params_for("INJ/USDT").unwrap();
        assert_eq!(params.cycle_interval_secs, 15);
        assert_eq!(params.price_refresh_interval_secs, 5);
    }
}
