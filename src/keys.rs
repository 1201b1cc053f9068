// ─────────────────────────────────────────────────────────────────────────────
// keys.rs — KeyProvider (ambient).
//
// Generalized from main.rs's `HL_ADDRESS`/`HL_PRIVATE_KEY` single-wallet
// env loading into `WALLET_<N>_*` for N = 0.. until a gap, via
// `dotenvy::dotenv()` just like main.rs loads `.env` before reading
// anything else. Private keys are wrapped so `Debug`/`Display` never
// print them: a key must never appear in a log line.
// ─────────────────────────────────────────────────────────────────────────────
use std::fmt;

use crate::error::{EngineError, EngineResult};

/// A private key that redacts itself on any formatting path.
#[derive(Clone)]
pub struct Secret(String);

impl Secret {
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub(crate) fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

#[derive(Debug, Clone)]
pub struct WalletConfig {
    pub wallet_id: String,
    pub name: String,
    pub private_key: Secret,
    pub enabled: bool,
    pub max_open_orders: usize,
}

pub trait KeyProvider {
    fn load_wallets(&self) -> EngineResult<Vec<WalletConfig>>;
}

/// Reads `WALLET_<N>_PRIVATE_KEY`, `WALLET_<N>_NAME`, `WALLET_<N>_ENABLED`,
/// `WALLET_<N>_MAX_ORDERS` from the process environment, for `N = 0..`
/// until the first missing `PRIVATE_KEY`. Disabled wallets are filtered
/// out before being returned.
pub struct EnvKeyProvider;

impl EnvKeyProvider {
    pub fn new() -> Self {
        dotenvy::dotenv().ok();
        Self
    }
}

impl Default for EnvKeyProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyProvider for EnvKeyProvider {
    fn load_wallets(&self) -> EngineResult<Vec<WalletConfig>> {
        let mut wallets = Vec::new();
        for n in 0.. {
            let key_var = format!("WALLET_{n}_PRIVATE_KEY");
            let private_key = match std::env::var(&key_var) {
                Ok(v) => v,
                Err(_) => break,
            };

            let wallet_id = format!("w{n}");
            let name = std::env::var(format!("WALLET_{n}_NAME")).unwrap_or_else(|_| wallet_id.clone());
            let enabled = std::env::var(format!("WALLET_{n}_ENABLED"))
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true);
            let max_open_orders = std::env::var(format!("WALLET_{n}_MAX_ORDERS"))
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60);

            if private_key.is_empty() {
                return Err(EngineError::Config(format!("{key_var} is set but empty")));
            }

            wallets.push(WalletConfig {
                wallet_id,
                name,
                private_key: Secret::new(private_key),
                enabled,
                max_open_orders,
            });
        }

        Ok(wallets.into_iter().filter(|w| w.enabled).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_debug_never_prints_value() {
        let secret = Secret("super-secret-key".to_string());
        let rendered = format!("{secret:?}");
        assert!(!rendered.contains("super-secret-key"));
    }
}
