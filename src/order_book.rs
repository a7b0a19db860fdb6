//! Per-symbol order book: price-ordered bid/ask maps with FIFO levels.
//!
//! Bids and asks are `BTreeMap`s keyed by price; the best bid is the highest
//! key (walked in reverse), the best ask the lowest. A `by_id` index gives
//! O(1) membership checks for cancellation. The whole book sits behind one
//! `RwLock`: matching and cancellation take the write guard, depth the read
//! guard.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::price_level::PriceLevel;
use crate::types::{Order, Side};

/// Aggregated `(price, quantity)` pair for one depth level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DepthLevel {
    pub price: i64,
    pub quantity: i64,
}

/// Snapshot of aggregated book depth, best price first on both sides.
#[derive(Clone, Debug, serde::Serialize)]
pub struct BookDepth {
    pub symbol: String,
    /// Snapshot time, milliseconds since the epoch.
    pub timestamp: i64,
    pub bids: Vec<DepthLevel>,
    pub asks: Vec<DepthLevel>,
}

/// Book contents. Only reachable through [`OrderBook::read`] and
/// [`OrderBook::write`], so every access holds the book lock.
#[derive(Debug, Default)]
pub struct BookState {
    bids: BTreeMap<i64, PriceLevel>,
    asks: BTreeMap<i64, PriceLevel>,
    /// Resting orders by id; authoritative for "is this order resting here".
    by_id: HashMap<String, Arc<Order>>,
}

impl BookState {
    fn levels_mut(&mut self, side: Side) -> &mut BTreeMap<i64, PriceLevel> {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    /// Rests an order on its `(side, price)` level, creating the level if
    /// needed. Adding an id the book already holds is a no-op.
    pub fn add(&mut self, order: Arc<Order>) {
        if self.by_id.contains_key(&order.id) {
            return;
        }
        self.by_id.insert(order.id.clone(), order.clone());
        self.levels_mut(order.side)
            .entry(order.price)
            .or_default()
            .append(order);
    }

    /// Removes a resting order by id, deleting its level if that empties it.
    /// Returns `None` when the order is not resting in this book.
    pub fn remove(&mut self, order_id: &str) -> Option<Arc<Order>> {
        let order = self.by_id.remove(order_id)?;
        let levels = self.levels_mut(order.side);
        if let Some(level) = levels.get_mut(&order.price) {
            level.remove_by_id(order_id);
            if level.is_empty() {
                levels.remove(&order.price);
            }
        }
        Some(order)
    }

    /// Head order of the highest-priced bid level.
    pub fn best_bid(&self) -> Option<Arc<Order>> {
        self.bids.values().next_back().and_then(|l| l.head()).cloned()
    }

    /// Head order of the lowest-priced ask level.
    pub fn best_ask(&self) -> Option<Arc<Order>> {
        self.asks.values().next().and_then(|l| l.head()).cloned()
    }

    /// Remaining quantity available to an incoming `taker_side` order, summed
    /// over the opposite side best-price-first and short-circuited once `cap`
    /// is reached. Must run under the write lock so the result stays
    /// consistent with the match that follows.
    pub fn liquidity(&self, taker_side: Side, cap: i64) -> i64 {
        let levels: Box<dyn Iterator<Item = &PriceLevel> + '_> = match taker_side {
            Side::Buy => Box::new(self.asks.values()),
            Side::Sell => Box::new(self.bids.values().rev()),
        };
        let mut available: i64 = 0;
        for level in levels {
            for order in level.iter() {
                available += order.remaining_quantity();
                if available >= cap {
                    return available;
                }
            }
        }
        available
    }

    /// Number of resting orders across both sides.
    pub fn order_count(&self) -> usize {
        self.by_id.len()
    }

    /// Resting-order lookup by id.
    pub fn get(&self, order_id: &str) -> Option<&Arc<Order>> {
        self.by_id.get(order_id)
    }

    pub fn bids_empty(&self) -> bool {
        self.bids.is_empty()
    }

    pub fn asks_empty(&self) -> bool {
        self.asks.is_empty()
    }
}

/// One symbol's book behind a shared/exclusive lock.
#[derive(Debug)]
pub struct OrderBook {
    symbol: String,
    state: RwLock<BookState>,
}

impl OrderBook {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            state: RwLock::new(BookState::default()),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Exclusive access, for matching and book mutation.
    pub fn write(&self) -> RwLockWriteGuard<'_, BookState> {
        self.state.write().expect("book lock")
    }

    /// Shared access, for reads.
    pub fn read(&self) -> RwLockReadGuard<'_, BookState> {
        self.state.read().expect("book lock")
    }

    /// Aggregated `(price, quantity)` snapshot of up to `limit` best levels
    /// per side; `limit == 0` means all levels.
    pub fn depth(&self, limit: usize) -> BookDepth {
        let state = self.read();
        BookDepth {
            symbol: self.symbol.clone(),
            timestamp: now_millis(),
            bids: aggregate(state.bids.iter().rev(), limit),
            asks: aggregate(state.asks.iter(), limit),
        }
    }
}

fn aggregate<'a>(
    levels: impl Iterator<Item = (&'a i64, &'a PriceLevel)>,
    limit: usize,
) -> Vec<DepthLevel> {
    let mut out = Vec::new();
    for (price, level) in levels {
        if limit > 0 && out.len() >= limit {
            break;
        }
        out.push(DepthLevel {
            price: *price,
            quantity: level.total_remaining(),
        });
    }
    out
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
