// ─────────────────────────────────────────────────────────────────────────────
// txbuilder.rs — TxBuilder (C5)
//
// Scales a planner-produced ActionPlan into chain-native ticks and hands
// back a ready-to-sign batch. Numeric helpers sit at the bottom of the
// file, in the same "helpers after the main logic" placement as
// `exchange.rs`'s `round_to_5_sig_figs`/`round_f64`/`float_to_wire`
// (exchange.rs:870-905), adapted from sig-fig/wire rounding to tick and
// notional rounding.
//
// Open question resolved: stale cancel refs are advisory (dropped as a
// no-op, not a batch failure), and price rounding is always "inward"
// (BUY rounds down, SELL rounds up) so a create is never more aggressive
// than the planner intended.
// ─────────────────────────────────────────────────────────────────────────────
use std::collections::HashSet;

use crate::catalog::Market;
use crate::chain::{ChainCancel, ChainCreate, OpenOrder, Side};
use crate::error::{EngineError, EngineResult};
use crate::planner::{ActionPlan, CreateIntent};

#[derive(Debug, Clone)]
pub struct BuiltBatch {
    pub creates: Vec<ChainCreate>,
    pub cancels: Vec<ChainCancel>,
}

/// Scales and validates one plan against the market's tick/notional rules
/// and the worker's currently-known open orders. Returns
/// `EngineError::Invariant("NothingToDo")` when nothing survives —
/// callers should treat that as a dedicated `NothingToDo` case, not a
/// generic failure, and skip the broadcast without consuming a sequence.
pub fn build(plan: &ActionPlan, market: &Market, known_orders: &[OpenOrder]) -> EngineResult<BuiltBatch> {
    let known_hashes: HashSet<&str> = known_orders.iter().map(|o| o.order_hash.as_str()).collect();

    let mut creates = Vec::new();
    for intent in &plan.creates {
        if let Some(create) = scale_create(intent, market) {
            creates.push(create);
        }
        // creates failing tick/notional checks are dropped silently, never
        // fail the batch
    }

    // Advisory cancels: a cancel ref no longer present in the known
    // open-orders set is simply skipped rather than failing the batch.
    let cancels: Vec<ChainCancel> = plan
        .cancels
        .iter()
        .filter(|c| known_hashes.contains(c.order_hash.as_str()))
        .map(|c| ChainCancel { order_hash: c.order_hash.clone() })
        .collect();

    if creates.is_empty() && cancels.is_empty() {
        return Err(EngineError::Invariant("NothingToDo".to_string()));
    }

    Ok(BuiltBatch { creates, cancels })
}

fn scale_create(intent: &CreateIntent, market: &Market) -> Option<ChainCreate> {
    let chain_price = round_price_inward(intent.price_human, intent.side, market.min_price_tick);
    let chain_qty = floor_to_tick(intent.quantity_human, market.min_quantity_tick);

    if chain_qty <= 0.0 {
        return None;
    }
    if chain_price * chain_qty < market.min_notional {
        return None;
    }

    Some(ChainCreate { side: intent.side, price: chain_price, quantity: chain_qty })
}

/// `chainPrice = round(priceHuman / minPriceTick) * minPriceTick`, with
/// the rounding direction chosen so the order is never more aggressive
/// than intended: BUY rounds down (never bids higher than planned), SELL
/// rounds up (never offers lower than planned).
fn round_price_inward(price_human: f64, side: Side, min_price_tick: f64) -> f64 {
    let ticks = price_human / min_price_tick;
    let rounded_ticks = match side {
        Side::Buy => ticks.floor(),
        Side::Sell => ticks.ceil(),
    };
    rounded_ticks * min_price_tick
}

fn floor_to_tick(value: f64, tick: f64) -> f64 {
    (value / tick).floor() * tick
}
