// ─────────────────────────────────────────────────────────────────────────────
// testnet-mm-engine: per-wallet testnet liquidity-provision engine.
//
// CLI entry point: loads config + keys, builds the market catalog, spawns
// one supervisor-managed worker per enabled wallet, and maps fatal
// startup/runtime errors onto the exit-code taxonomy. Generalized from
// main.rs's single-exchange `tokio::main` bootstrap into a multi-wallet
// orchestration layer over the Supervisor.
// ─────────────────────────────────────────────────────────────────────────────
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::{error, info};

use testnet_mm_engine::chain::{ChainClient, LiveChainClient, SimChainClient};
use testnet_mm_engine::config::LoadedConfig;
use testnet_mm_engine::error::EngineError;
use testnet_mm_engine::keys::{EnvKeyProvider, KeyProvider};
use testnet_mm_engine::oracle::PriceOracle;
use testnet_mm_engine::persistence::{self, EngineSnapshot};
use testnet_mm_engine::supervisor::Supervisor;
use testnet_mm_engine::worker::WalletWorker;
use testnet_mm_engine::logging;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
const SNAPSHOT_PATH: &str = "engine_snapshot.json";

#[tokio::main]
async fn main() {
    logging::init();

    match run().await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            error!("fatal: {e}");
            std::process::exit(e.exit_code());
        }
    }
}

async fn run() -> Result<(), EngineError> {
    let config_path = std::env::var("ENGINE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = LoadedConfig::load(&config_path)?;

    let wallets = EnvKeyProvider::new().load_wallets()?;
    if wallets.is_empty() {
        return Err(EngineError::Config("no enabled wallets configured".to_string()));
    }

    // Loaded for operational visibility only: STARTING always force-refreshes
    // the sequence from the chain, so the snapshot never seeds live state.
    let _snapshot = persistence::load_snapshot(SNAPSHOT_PATH);

    let live = std::env::var("ENGINE_LIVE").map(|v| v == "true" || v == "1").unwrap_or(false);
    let chain: Arc<dyn ChainClient> = if live {
        let base_url = std::env::var("ENGINE_CHAIN_URL").unwrap_or_else(|_| "https://testnet.chain.local".to_string());
        Arc::new(LiveChainClient::new(base_url))
    } else {
        Arc::new(SimChainClient::new())
    };

    let oracle = Arc::new(PriceOracle::new(chain.clone(), chain.clone()));

    let mut supervisor = Supervisor::new();
    let mut seed_counter: u64 = 42;

    for wallet in wallets {
        let markets = config.catalog.enabled_markets(&wallet.wallet_id)?;
        if markets.is_empty() {
            info!("wallet {} has no enabled markets, skipping", wallet.wallet_id);
            continue;
        }

        let mut params = HashMap::new();
        for market in &markets {
            params.insert(market.symbol.clone(), config.params_for(&market.symbol)?.clone());
        }

        let owned_markets = markets.into_iter().cloned().collect::<Vec<_>>();
        let worker = WalletWorker::new(wallet.clone(), owned_markets, params, oracle.clone(), chain.clone(), seed_counter);
        seed_counter += 1;

        supervisor.start_worker(wallet.wallet_id.clone(), worker);
    }

    info!("engine started with {} wallet workers", supervisor.wallet_ids().len());

    tokio::signal::ctrl_c().await.ok();
    info!("shutdown signal received, stopping workers");

    for wallet_id in supervisor.wallet_ids() {
        if let Err(e) = supervisor.stop_worker(&wallet_id, true).await {
            error!("error stopping wallet {wallet_id}: {e}");
        }
    }

    let snapshot = EngineSnapshot::default();
    persistence::save_snapshot(SNAPSHOT_PATH, &snapshot);

    Ok(())
}
