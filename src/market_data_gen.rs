//! Synthetic order stream generator.
//!
//! Deterministic, configurable order stream for replay tests and benchmarks.
//! Same seed ⇒ same sequence of orders.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

use crate::error::BookError;
use crate::execution::Fill;
use crate::matching::match_crossing;
use crate::order_book::OrderBook;
use crate::types::{OrderKind, OrderRequest, Side};

/// Configuration for the synthetic order generator.
/// All ranges are inclusive. Same config + seed produces the same stream.
#[derive(Clone, Debug)]
pub struct GeneratorConfig {
    /// RNG seed. Same seed ⇒ same order stream.
    pub seed: u64,
    pub ticker: String,
    /// Number of orders returned by [`Generator::all_orders`].
    pub num_orders: usize,
    /// Probability of Buy (0.0..=1.0). Sell otherwise.
    pub buy_ratio: f64,
    /// Relative weights of market, limit, GTC and FOK orders.
    pub kind_weights: [u32; 4],
    /// Price range in cents (inclusive).
    pub price_min_cents: i64,
    pub price_max_cents: i64,
    pub size_min: u64,
    pub size_max: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            ticker: "QQQ".to_string(),
            num_orders: 1000,
            buy_ratio: 0.5,
            kind_weights: [1, 3, 4, 2],
            price_min_cents: 9_500,
            price_max_cents: 10_500,
            size_min: 1,
            size_max: 100,
        }
    }
}

const KINDS: [OrderKind; 4] = [OrderKind::Market, OrderKind::Limit, OrderKind::Gtc, OrderKind::Fok];

/// Deterministic order stream. Create with [`Generator::new`].
pub struct Generator {
    rng: StdRng,
    config: GeneratorConfig,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self { rng, config }
    }

    pub fn next_order(&mut self) -> OrderRequest {
        let side = if self.rng.gen::<f64>() < self.config.buy_ratio {
            Side::Buy
        } else {
            Side::Sell
        };
        let kind = self.next_kind();
        let cents = self
            .rng
            .gen_range(self.config.price_min_cents.max(1)..=self.config.price_max_cents.max(1));
        let size = self
            .rng
            .gen_range(self.config.size_min.max(1)..=self.config.size_max.max(1));
        OrderRequest::new(side, kind, Decimal::new(cents, 2), size, self.config.ticker.clone())
    }

    fn next_kind(&mut self) -> OrderKind {
        let total: u32 = self.config.kind_weights.iter().sum();
        if total == 0 {
            return OrderKind::Gtc;
        }
        let mut pick = self.rng.gen_range(0..total);
        for (kind, weight) in KINDS.iter().zip(self.config.kind_weights) {
            if pick < weight {
                return *kind;
            }
            pick -= weight;
        }
        OrderKind::Gtc
    }

    pub fn take_orders(&mut self, n: usize) -> Vec<OrderRequest> {
        (0..n).map(|_| self.next_order()).collect()
    }

    /// Returns `config.num_orders` orders.
    pub fn all_orders(&mut self) -> Vec<OrderRequest> {
        self.take_orders(self.config.num_orders)
    }
}

/// Feeds `orders` into `book`, running a matching pass after every `match_every`
/// submissions and once at the end. Timestamps are a plain counter so replays are
/// reproducible. Returns all fills.
pub fn replay_into_book(
    book: &mut OrderBook,
    orders: impl IntoIterator<Item = OrderRequest>,
    match_every: usize,
) -> Result<Vec<Fill>, BookError> {
    let match_every = match_every.max(1);
    let mut fills = Vec::new();
    for (i, order) in orders.into_iter().enumerate() {
        book.add_order(order, i as u64 + 1)?;
        if (i + 1) % match_every == 0 {
            fills.extend(match_crossing(book));
        }
    }
    fills.extend(match_crossing(book));
    Ok(fills)
}
