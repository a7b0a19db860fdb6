//! Synthetic order stream generator.
//!
//! Deterministic, configurable order stream for property tests, stress tests,
//! and benchmarks. Same seed and config produce the same sequence of orders.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::types::{Order, OrderType, Side};

/// Configuration for the synthetic order generator. All ranges are inclusive.
#[derive(Clone, Debug)]
pub struct GeneratorConfig {
    /// RNG seed. Same seed, same order stream.
    pub seed: u64,
    /// Symbols to spread orders across (picked uniformly).
    pub symbols: Vec<String>,
    /// Number of orders produced by [`Generator::all_orders`].
    pub num_orders: usize,
    /// Probability of Buy (0.0..=1.0). Sell otherwise.
    pub buy_ratio: f64,
    /// Probability of a limit order (0.0..=1.0). Market otherwise.
    pub limit_ratio: f64,
    /// Price range for limit orders. Ignored for market.
    pub price_min: i64,
    pub price_max: i64,
    /// Quantity range, whole units.
    pub quantity_min: i64,
    pub quantity_max: i64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            symbols: vec!["BTCUSD".to_string()],
            num_orders: 1000,
            buy_ratio: 0.5,
            limit_ratio: 0.9,
            price_min: 95,
            price_max: 105,
            quantity_min: 1,
            quantity_max: 100,
        }
    }
}

/// Deterministic order stream. Ids are `gen-1`, `gen-2`, ... in arrival order.
pub struct Generator {
    rng: StdRng,
    config: GeneratorConfig,
    next_seq: u64,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            rng,
            config,
            next_seq: 1,
        }
    }

    /// Generates the next order, advancing the sequence and RNG state.
    pub fn next_order(&mut self) -> Order {
        let id = format!("gen-{}", self.next_seq);
        self.next_seq += 1;

        let symbol = self.config.symbols[self.rng.gen_range(0..self.config.symbols.len())].clone();
        let side = if self.rng.gen::<f64>() < self.config.buy_ratio {
            Side::Buy
        } else {
            Side::Sell
        };
        let (order_type, price) = if self.rng.gen::<f64>() < self.config.limit_ratio {
            (
                OrderType::Limit,
                self.rng
                    .gen_range(self.config.price_min..=self.config.price_max),
            )
        } else {
            (OrderType::Market, 0)
        };
        let quantity = self
            .rng
            .gen_range(self.config.quantity_min..=self.config.quantity_max);

        Order::new(id, symbol, side, order_type, price, quantity)
    }

    /// Generates `config.num_orders` orders.
    pub fn all_orders(mut self) -> Vec<Order> {
        (0..self.config.num_orders)
            .map(|_| self.next_order())
            .collect()
    }
}
