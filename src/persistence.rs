// ─────────────────────────────────────────────────────────────────────────────
// persistence.rs — durable sequence/worker snapshot across restarts (ambient).
//
// serde_json::to_string_pretty + fs::write/read_to_string, holding just
// what this engine needs to survive a restart: the last known sequence
// number per wallet, so `STARTING`'s forced refresh has a sane local value
// to compare drift against rather than starting at 0.
// ─────────────────────────────────────────────────────────────────────────────
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::{error, info};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PersistedSequenceState {
    pub value: u64,
    pub consecutive_errors: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineSnapshot {
    pub sequences: HashMap<String, PersistedSequenceState>,
}

pub fn load_snapshot<P: AsRef<Path>>(path: P) -> EngineSnapshot {
    if path.as_ref().exists() {
        match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<EngineSnapshot>(&content) {
                Ok(snapshot) => {
                    info!("loaded engine snapshot from {:?}: {} wallets", path.as_ref(), snapshot.sequences.len());
                    return snapshot;
                }
                Err(e) => error!("failed to parse snapshot file: {e}"),
            },
            Err(e) => error!("failed to read snapshot file: {e}"),
        }
    }
    info!("no snapshot file found at {:?}, starting fresh", path.as_ref());
    EngineSnapshot::default()
}

pub fn save_snapshot<P: AsRef<Path>>(path: P, snapshot: &EngineSnapshot) {
    match serde_json::to_string_pretty(snapshot) {
        Ok(content) => {
            if let Err(e) = fs::write(path, content) {
                error!("failed to write snapshot file: {e}");
            }
        }
        Err(e) => error!("failed to serialize snapshot: {e}"),
    }
}
