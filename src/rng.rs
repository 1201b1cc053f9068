// ─────────────────────────────────────────────────────────────────────────────
// rng.rs — per-worker seeded RNG (ambient).
//
// market_maker.rs jitters grid spreads/sizes through whatever `rand`
// state happens to be live at the call site. Per the "embedded RNG
// global state" REDESIGN FLAG, this crate threads one seeded generator
// explicitly from WalletWorker down into the Planner instead, so a run
// is replayable from its seed.
// ─────────────────────────────────────────────────────────────────────────────
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub struct PlannerRng {
    inner: StdRng,
}

impl PlannerRng {
    pub fn from_seed(seed: u64) -> Self {
        Self { inner: StdRng::seed_from_u64(seed) }
    }

    pub fn uniform(&mut self, low: f64, high: f64) -> f64 {
        self.inner.gen_range(low..=high)
    }

    pub fn jitter(&mut self, value: f64, fraction: f64) -> f64 {
        let delta = self.uniform(-fraction, fraction);
        value * (1.0 + delta)
    }

    pub fn range_usize(&mut self, low: usize, high: usize) -> usize {
        self.inner.gen_range(low..=high)
    }
}
