//! Seeded synthetic bar generation.
//!
//! Deterministic random-walk series for tests and demos: the same seed
//! always produces the same bars. Synthetic data never mixes with loaded
//! data silently — callers decide what they feed the pipeline.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use breakout_core::domain::Bar;

/// Parameters for a synthetic random-walk series.
#[derive(Debug, Clone)]
pub struct WalkParams {
    pub start: DateTime<Utc>,
    pub bar_spacing: Duration,
    pub start_price: f64,
    /// Per-bar return standard deviation, e.g. 0.01 for 1%.
    pub volatility: f64,
    pub base_volume: f64,
}

impl Default for WalkParams {
    fn default() -> Self {
        Self {
            start: DateTime::<Utc>::from_timestamp(1_704_153_600, 0).expect("valid epoch"),
            bar_spacing: Duration::hours(1),
            start_price: 100.0,
            volatility: 0.01,
            base_volume: 1_000.0,
        }
    }
}

/// Generate `count` random-walk bars for one symbol.
pub fn random_walk(symbol: &str, count: usize, seed: u64, params: &WalkParams) -> Vec<Bar> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut close = params.start_price;
    let mut bars = Vec::with_capacity(count);

    for i in 0..count {
        let open = close;
        // Symmetric uniform step; enough structure for pipeline tests
        // without pretending to be a market model.
        let step: f64 = rng.gen_range(-params.volatility..params.volatility);
        close = (open * (1.0 + step)).max(0.01);
        let spread = open.max(close) * params.volatility;
        let volume = params.base_volume * rng.gen_range(0.5..1.5);

        bars.push(Bar {
            symbol: symbol.to_string(),
            timestamp: params.start + params.bar_spacing * i as i32,
            open,
            high: open.max(close) + spread,
            low: (open.min(close) - spread).max(0.005),
            close,
            volume,
        });
    }

    bars
}

/// Random walk with a deliberate breakout injected at `breakout_at`: the bar
/// jumps `jump_pct` above the running range on several times normal volume.
pub fn walk_with_breakout(
    symbol: &str,
    count: usize,
    breakout_at: usize,
    jump_pct: f64,
    seed: u64,
    params: &WalkParams,
) -> Vec<Bar> {
    let mut bars = random_walk(symbol, count, seed, params);
    if let Some(bar) = bars.get_mut(breakout_at) {
        let jumped = bar.open * (1.0 + jump_pct);
        bar.close = jumped;
        bar.high = jumped * 1.005;
        bar.volume *= 8.0;
    }
    // Keep the walk continuous after the jump.
    for i in (breakout_at + 1)..count {
        let scale = 1.0 + jump_pct;
        bars[i].open *= scale;
        bars[i].high *= scale;
        bars[i].low *= scale;
        bars[i].close *= scale;
    }
    bars
}
