// ─────────────────────────────────────────────────────────────────────────────
// planner.rs — Planner (C6), the strategy core.
//
// Grounded on `market_maker.rs::compute_quote_grid`: a tiered, inventory-
// aware grid of spreads and sizes around a reference mid. Generalized
// from that single-spread skew grid into a five-tier BUILD staircase and
// rotating-stage MAINTAIN, and restricted to a pure function of its
// inputs plus an explicit seeded RNG (`rng.rs`) so a run replays
// deterministically instead of drawing from embedded global RNG state.
// ─────────────────────────────────────────────────────────────────────────────
use crate::catalog::Market;
use crate::chain::{OpenOrder, Side};
use crate::config::MarketParams;
use crate::orderbook::OrderbookSnapshot;
use crate::rng::PlannerRng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Move,
    Build,
    Maintain,
    Idle,
}

#[derive(Debug, Clone)]
pub struct CreateIntent {
    pub side: Side,
    pub price_human: f64,
    pub quantity_human: f64,
}

#[derive(Debug, Clone)]
pub struct CancelRef {
    pub order_hash: String,
}

#[derive(Debug, Clone)]
pub struct ActionPlan {
    pub phase: Phase,
    pub creates: Vec<CreateIntent>,
    pub cancels: Vec<CancelRef>,
    pub rationale: String,
}

impl ActionPlan {
    pub fn idle(rationale: impl Into<String>) -> Self {
        Self { phase: Phase::Idle, creates: vec![], cancels: vec![], rationale: rationale.into() }
    }

    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.cancels.is_empty()
    }
}

/// MAINTAIN's rotating spread bands, cycling on successive MAINTAIN
/// cycles. `maintain_cycle` is supplied by the caller (WalletWorker) so
/// the rotation is explicit state, not planner-internal mutation — the
/// planner stays a pure function of its inputs.
const MAINTAIN_STAGES: [(f64, f64); 4] = [(0.005, 0.015), (0.015, 0.03), (0.03, 0.05), (0.05, 0.08)];

#[allow(clippy::too_many_arguments)]
pub fn plan(
    market: &Market,
    mainnet_mid: Option<f64>,
    testnet_mid: Option<f64>,
    snapshot: &OrderbookSnapshot,
    open_orders: &[OpenOrder],
    params: &MarketParams,
    max_open_orders: usize,
    maintain_cycle: u64,
    rng: &mut PlannerRng,
) -> ActionPlan {
    let mainnet = match mainnet_mid {
        Some(m) => m,
        None => return ActionPlan::idle("mainnet mid unavailable"),
    };

    let phase = classify_phase(mainnet, testnet_mid, snapshot, params);

    let mut plan = match phase {
        Phase::Idle => ActionPlan::idle("mainnet mid unavailable"),
        Phase::Move => plan_move(mainnet, testnet_mid.unwrap(), open_orders, params, rng),
        Phase::Build => plan_build(market, mainnet, open_orders, params, max_open_orders, rng),
        Phase::Maintain => plan_maintain(mainnet, open_orders, params, maintain_cycle, rng),
    };

    dedup_against_open_orders(&mut plan.creates, open_orders, market.min_price_tick);
    plan
}

fn classify_phase(mainnet: f64, testnet_mid: Option<f64>, snapshot: &OrderbookSnapshot, params: &MarketParams) -> Phase {
    let total = snapshot.total_orders;
    let near = snapshot.orders_near_price;

    let testnet = match testnet_mid {
        // No testnet reference: still proceed, goal is to build depth.
        None => return Phase::Build,
        Some(t) => t,
    };

    let gap = (testnet - mainnet).abs() / mainnet;
    let gap_threshold = params.deviation_threshold_bps / 10_000.0;

    if gap > gap_threshold && total >= 30 {
        return Phase::Move;
    }
    if total < 50 || near < 20 {
        return Phase::Build;
    }
    Phase::Maintain
}

fn plan_move(mainnet: f64, testnet: f64, open_orders: &[OpenOrder], params: &MarketParams, rng: &mut PlannerRng) -> ActionPlan {
    let side = if testnet > mainnet { Side::Sell } else { Side::Buy };

    let cancel_count = rng.range_usize(8, 12).min(open_orders.len());
    let mut by_distance: Vec<&OpenOrder> = open_orders.iter().collect();
    by_distance.sort_by(|a, b| {
        let da = (a.price - mainnet).abs();
        let db = (b.price - mainnet).abs();
        db.partial_cmp(&da)
            .unwrap()
            .then(b.quantity.partial_cmp(&a.quantity).unwrap())
    });
    let cancels = by_distance
        .into_iter()
        .take(cancel_count)
        .map(|o| CancelRef { order_hash: o.order_hash.clone() })
        .collect();

    let create_count = rng.range_usize(6, 10);
    let mut creates = Vec::with_capacity(create_count);
    for _ in 0..create_count {
        let spread = rng.uniform(0.001, 0.01);
        let price = match side {
            Side::Sell => mainnet * (1.0 + spread),
            Side::Buy => mainnet * (1.0 - spread),
        };
        let size = rng.uniform(0.5, 1.0) * params.base_order_size;
        creates.push(CreateIntent { side, price_human: price, quantity_human: size });
    }

    ActionPlan { phase: Phase::Move, creates, cancels, rationale: format!("gap correction via {side:?}") }
}

struct BuildTier {
    spread_low: f64,
    spread_high: f64,
    levels_per_side: usize,
    size_multiplier: f64,
}

const BUILD_TIERS: [BuildTier; 5] = [
    BuildTier { spread_low: 0.0001, spread_high: 0.001, levels_per_side: 5, size_multiplier: 0.8 },
    BuildTier { spread_low: 0.001, spread_high: 0.005, levels_per_side: 5, size_multiplier: 1.3 },
    BuildTier { spread_low: 0.005, spread_high: 0.015, levels_per_side: 2, size_multiplier: 2.0 },
    BuildTier { spread_low: 0.015, spread_high: 0.03, levels_per_side: 1, size_multiplier: 3.0 },
    BuildTier { spread_low: 0.03, spread_high: 0.05, levels_per_side: 1, size_multiplier: 4.5 },
];

fn plan_build(
    _market: &Market,
    mainnet: f64,
    open_orders: &[OpenOrder],
    params: &MarketParams,
    max_open_orders: usize,
    rng: &mut PlannerRng,
) -> ActionPlan {
    let mut creates = Vec::with_capacity(28);
    for tier in BUILD_TIERS.iter() {
        for side in [Side::Buy, Side::Sell] {
            for _ in 0..tier.levels_per_side {
                let spread = rng.uniform(tier.spread_low, tier.spread_high);
                let price = match side {
                    Side::Buy => mainnet * (1.0 - spread),
                    Side::Sell => mainnet * (1.0 + spread),
                };
                let size = rng.jitter(tier.size_multiplier * params.base_order_size, 0.1);
                creates.push(CreateIntent { side, price_human: price, quantity_human: size });
            }
        }
    }

    // Truncate from the widest tier inward if the projected open-order
    // count would exceed max_open_orders. Tiers are pushed in ascending
    // width order above, so truncating from the back removes the widest
    // tier's entries first.
    let projected = open_orders.len() + creates.len();
    if projected > max_open_orders {
        let excess = projected - max_open_orders;
        let keep = creates.len().saturating_sub(excess);
        creates.truncate(keep);
    }

    ActionPlan { phase: Phase::Build, creates, cancels: vec![], rationale: "building staircase depth".to_string() }
}

fn plan_maintain(mainnet: f64, open_orders: &[OpenOrder], params: &MarketParams, maintain_cycle: u64, rng: &mut PlannerRng) -> ActionPlan {
    let (stage_low, stage_high) = MAINTAIN_STAGES[(maintain_cycle as usize) % MAINTAIN_STAGES.len()];

    let mut creates = Vec::new();
    for side in [Side::Buy, Side::Sell] {
        let count = rng.range_usize(5, 8);
        for _ in 0..count {
            let spread = rng.uniform(stage_low, stage_high);
            let price = match side {
                Side::Buy => mainnet * (1.0 - spread),
                Side::Sell => mainnet * (1.0 + spread),
            };
            let size = rng.uniform(0.2, 0.5) * params.base_order_size;
            creates.push(CreateIntent { side, price_human: price, quantity_human: size });
        }
    }

    let cancel_count = rng.range_usize(4, 6).min(open_orders.len());
    let mut candidates: Vec<&OpenOrder> = open_orders.iter().collect();
    candidates.sort_by_key(|o| {
        let pct = (o.price - mainnet).abs() / mainnet;
        // orders outside the current stage band are preferred for cancellation
        !(pct < stage_low || pct > stage_high)
    });
    let cancels = candidates
        .into_iter()
        .take(cancel_count)
        .map(|o| CancelRef { order_hash: o.order_hash.clone() })
        .collect();

    ActionPlan {
        phase: Phase::Maintain,
        creates,
        cancels,
        rationale: format!("rotating depth stage [{stage_low}, {stage_high}]"),
    }
}

fn dedup_against_open_orders(creates: &mut Vec<CreateIntent>, open_orders: &[OpenOrder], min_price_tick: f64) {
    creates.retain(|intent| {
        !open_orders.iter().any(|o| {
            o.side == intent.side && (o.price - intent.price_human).abs() <= min_price_tick
        })
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MarketType;
    use crate::chain::OrderState;

    fn sample_market() -> Market {
        Market {
            symbol: "INJ/USDT".to_string(),
            market_type: MarketType::Spot,
            testnet_market_id: "t".to_string(),
            mainnet_market_id: "m".to_string(),
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

    fn empty_snapshot(total: u32, near: u32) -> OrderbookSnapshot {
        OrderbookSnapshot { best_bid: None, best_ask: None, total_orders: total, orders_near_price: near }
    }

    #[test]
    fn s1_empty_book_is_build_with_28_creates() {
        let market = sample_market();
        let params = sample_params();
        let snapshot = empty_snapshot(0, 0);
        let mut rng = PlannerRng::from_seed(42);
        let result = plan(&market, Some(24.5623), None, &snapshot, &[], &params, 200, 0, &mut rng);
        assert_eq!(result.phase, Phase::Build);
        assert_eq!(result.creates.len(), 28);
        assert_eq!(result.cancels.len(), 0);
        for c in &result.creates {
            assert!(c.quantity_human >= 15.0 * 0.8 * 0.9 && c.quantity_human <= 15.0 * 4.5 * 1.1);
        }
    }

    #[test]
    fn s3_wide_gap_with_depth_is_move_all_buy() {
        let market = sample_market();
        let params = sample_params();
        let snapshot = empty_snapshot(50, 30);
        let mut rng = PlannerRng::from_seed(42);
        let open_orders: Vec<OpenOrder> = (0..20)
            .map(|i| OpenOrder {
                order_hash: format!("h{i}"),
                side: Side::Sell,
                price: 24.5623 + i as f64 * 0.1,
                quantity: 10.0,
                filled_quantity: 0.0,
                state: OrderState::Booked,
            })
            .collect();
        let result = plan(&market, Some(24.5623), Some(20.00), &snapshot, &open_orders, &params, 200, 0, &mut rng);
        assert_eq!(result.phase, Phase::Move);
        assert!(result.creates.iter().all(|c| c.side == Side::Buy));
        assert!(result.creates.len() >= 6 && result.creates.len() <= 10);
        assert!(result.cancels.len() >= 8 && result.cancels.len() <= 12);
    }

    #[test]
    fn s4_tight_gap_deep_book_is_maintain_balanced() {
        let market = sample_market();
        let params = sample_params();
        let snapshot = empty_snapshot(120, 80);
        let mut rng = PlannerRng::from_seed(42);
        let result = plan(&market, Some(24.5623), Some(24.57), &snapshot, &[], &params, 200, 0, &mut rng);
        assert_eq!(result.phase, Phase::Maintain);
        assert!(result.creates.len() >= 10 && result.creates.len() <= 16);
        assert!(result.creates.iter().any(|c| c.side == Side::Buy));
        assert!(result.creates.iter().any(|c| c.side == Side::Sell));
    }

    #[test]
    fn determinism_same_seed_same_plan() {
        let market = sample_market();
        let params = sample_params();
        let snapshot = empty_snapshot(0, 0);

        let mut rng_a = PlannerRng::from_seed(42);
        let a = plan(&market, Some(24.5623), None, &snapshot, &[], &params, 200, 0, &mut rng_a);

        let mut rng_b = PlannerRng::from_seed(42);
        let b = plan(&market, Some(24.5623), None, &snapshot, &[], &params, 200, 0, &mut rng_b);

        assert_eq!(a.creates.len(), b.creates.len());
        for (ca, cb) in a.creates.iter().zip(b.creates.iter()) {
            assert_eq!(ca.side, cb.side);
            assert!((ca.price_human - cb.price_human).abs() < 1e-12);
            assert!((ca.quantity_human - cb.quantity_human).abs() < 1e-12);
        }
    }

    #[test]
    fn mainnet_unavailable_is_idle() {
        let market = sample_market();
        let params = sample_params();
        let snapshot = empty_snapshot(0, 0);
        let mut rng = PlannerRng::from_seed(42);
        let result = plan(&market, None, Some(20.0), &snapshot, &[], &params, 200, 0, &mut rng);
        assert_eq!(result.phase, Phase::Idle);
        assert!(result.is_empty());
    }

    #[test]
    fn build_truncates_from_widest_tier_when_over_cap() {
        let market = sample_market();
        let params = sample_params();
        let snapshot = empty_snapshot(0, 0);
        let mut rng = PlannerRng::from_seed(42);
        let result = plan(&market, Some(24.5623), None, &snapshot, &[], &params, 10, 0, &mut rng);
        assert_eq!(result.creates.len(), 10);
    }
}
