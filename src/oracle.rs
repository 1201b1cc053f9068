// ─────────────────────────────────────────────────────────────────────────────
// oracle.rs — PriceOracle (C2)
//
// TTL-cached mid-price sampling over the opaque ChainClient. Grounded on
// `LiveExchange`'s `cached_mids` / `CACHE_DURATION` pattern
// (exchange.rs:417,508-530): a small map guarded by a std Mutex, holding
// the last good sample and its fetch time, refreshed lazily on read.
// ─────────────────────────────────────────────────────────────────────────────
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::chain::ChainClient;

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Venue {
    Mainnet,
    Testnet,
}

struct CacheEntry {
    mid: Option<f64>,
    sampled_at: Instant,
}

/// Samples and caches mid-prices. Safe for concurrent read across workers
/// sharing the same instance. The cache TTL is supplied by the caller on
/// every read rather than fixed at construction, since each market
/// configures its own `priceRefreshIntervalSecs`.
pub struct PriceOracle {
    mainnet: Arc<dyn ChainClient>,
    testnet: Arc<dyn ChainClient>,
    cache: Mutex<HashMap<(String, &'static str), CacheEntry>>,
}

impl PriceOracle {
    pub fn new(mainnet: Arc<dyn ChainClient>, testnet: Arc<dyn ChainClient>) -> Self {
        Self { mainnet, testnet, cache: Mutex::new(HashMap::new()) }
    }

    pub async fn mainnet_mid(&self, market_id: &str, ttl: Duration) -> Option<f64> {
        self.mid(Venue::Mainnet, market_id, ttl).await
    }

    pub async fn testnet_mid(&self, market_id: &str, ttl: Duration) -> Option<f64> {
        self.mid(Venue::Testnet, market_id, ttl).await
    }

    async fn mid(&self, venue: Venue, market_id: &str, ttl: Duration) -> Option<f64> {
        let key_venue = match venue {
            Venue::Mainnet => "mainnet",
            Venue::Testnet => "testnet",
        };

        if let Some(entry) = self.cache.lock().unwrap().get(&(market_id.to_string(), key_venue)) {
            if entry.sampled_at.elapsed() < ttl {
                return entry.mid;
            }
        }

        let client = match venue {
            Venue::Mainnet => &self.mainnet,
            Venue::Testnet => &self.testnet,
        };

        // A fetch error yields Unavailable for this sample; the oracle
        // never hands back a value older than 2x the TTL, and it never
        // retries internally — that is the caller's decision.
        let mid = client.query_mid(market_id).await.unwrap_or(None);

        self.cache.lock().unwrap().insert(
            (market_id.to_string(), key_venue),
            CacheEntry { mid, sampled_at: Instant::now() },
        );
        mid
    }
}
