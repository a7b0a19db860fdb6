//! Multi-symbol matching engine facade.
//!
//! Routes submissions and cancels to per-symbol books, keeps the process-wide
//! order registry, and feeds the metrics sink. Lock order is always registry
//! lock first (held only to look up or create a book), then the book's lock;
//! the registry lock is never held across matching.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use dashmap::DashMap;

use crate::error::EngineError;
use crate::ids::{IdSource, UuidSource};
use crate::matching::match_order;
use crate::metrics::Metrics;
use crate::order_book::{BookDepth, OrderBook};
use crate::types::{Order, OrderStatus, OrderType, Trade};

/// Result of a successful submission: the submitted order and the trades it
/// produced, in execution order.
#[derive(Clone, Debug)]
pub struct MatchResult {
    pub order: Arc<Order>,
    pub trades: Vec<Trade>,
}

/// The matching engine.
///
/// All operations are synchronous and internally synchronized: submissions
/// and cancels for one symbol are linearized by that book's write lock, while
/// distinct symbols progress in parallel. Orders stay in the global registry
/// after filling or cancellation so [`Engine::get_order`] remains answerable.
pub struct Engine {
    /// symbol -> book, created lazily on first reference.
    books: RwLock<HashMap<String, Arc<OrderBook>>>,
    /// Every order ever accepted, keyed by id. Authoritative existence check
    /// for cancels; the per-book index is the authoritative resting check.
    orders: DashMap<String, Arc<Order>>,
    metrics: Arc<Metrics>,
    trade_ids: Arc<dyn IdSource>,
}

impl Engine {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self::with_id_source(metrics, Arc::new(UuidSource))
    }

    pub fn with_id_source(metrics: Arc<Metrics>, trade_ids: Arc<dyn IdSource>) -> Self {
        Self {
            books: RwLock::new(HashMap::new()),
            orders: DashMap::new(),
            metrics,
            trade_ids,
        }
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// The book for `symbol`, created on first use.
    fn book(&self, symbol: &str) -> Arc<OrderBook> {
        if let Some(book) = self.books.read().expect("books lock").get(symbol) {
            return book.clone();
        }
        let mut books = self.books.write().expect("books lock");
        books
            .entry(symbol.to_string())
            .or_insert_with(|| Arc::new(OrderBook::new(symbol)))
            .clone()
    }

    /// Submits an order and matches it against the opposite side of its book.
    ///
    /// Limit orders rest any unfilled remainder. Market orders are
    /// all-or-none: a pre-scan of available liquidity under the book's write
    /// lock either admits the order for full execution or rejects it with
    /// [`EngineError::InsufficientLiquidity`], leaving the book untouched.
    pub fn submit(&self, order: Order) -> Result<MatchResult, EngineError> {
        let start = Instant::now();
        self.metrics.inc_orders_received();
        let result = self.submit_locked(order);
        self.metrics
            .observe_latency(start.elapsed().as_micros() as i64);
        result
    }

    fn submit_locked(&self, order: Order) -> Result<MatchResult, EngineError> {
        order.validate()?;

        let order = Arc::new(order);
        // Registered before matching so concurrent cancels can observe it.
        self.orders.insert(order.id.clone(), order.clone());

        let book = self.book(&order.symbol);
        let mut state = book.write();

        // A concurrent cancel may have observed the order between
        // registration and this lock; honor it instead of matching a
        // cancelled order.
        if order.status() == OrderStatus::Cancelled {
            return Ok(MatchResult {
                order,
                trades: Vec::new(),
            });
        }

        if order.order_type == OrderType::Market {
            let available = state.liquidity(order.side, order.original_quantity);
            if available < order.original_quantity {
                self.orders.remove(&order.id);
                return Err(EngineError::InsufficientLiquidity {
                    available,
                    requested: order.original_quantity,
                });
            }
        }

        let trades = match_order(&mut state, &order, self.trade_ids.as_ref(), &self.metrics);

        if order.remaining_quantity() == 0 {
            order.set_status(OrderStatus::Filled);
        } else if order.filled_quantity() > 0 {
            order.set_status(OrderStatus::PartialFill);
        }

        if order.remaining_quantity() > 0 {
            // The all-or-none pre-check ran under this same lock, so a market
            // order cannot have residue here.
            debug_assert!(order.is_limit(), "market order residue after matching");
            if order.is_limit() {
                state.add(order.clone());
                self.metrics.inc_orders_in_book();
            }
        }
        drop(state);

        self.metrics.add_trades_executed(trades.len() as i64);
        if !trades.is_empty() {
            // The taker plus one per counterparty trade.
            self.metrics.add_orders_matched(trades.len() as i64 + 1);
        }

        Ok(MatchResult { order, trades })
    }

    /// Cancels an order by id.
    ///
    /// Cancelling an already-cancelled order is an idempotent success;
    /// cancelling a filled order is rejected. An order that is registered but
    /// not resting (it lost a race with a concurrent fill of its final lot)
    /// is still marked cancelled.
    pub fn cancel(&self, order_id: &str) -> Result<Arc<Order>, EngineError> {
        let order = self
            .orders
            .get(order_id)
            .map(|entry| entry.value().clone())
            .ok_or(EngineError::NotFound)?;

        if order.status() == OrderStatus::Filled {
            return Err(EngineError::AlreadyFilled);
        }
        if order.status() == OrderStatus::Cancelled {
            return Ok(order);
        }

        let book = self.book(&order.symbol);
        let mut state = book.write();

        // Matching may have finished the order between the check above and
        // taking the lock.
        if order.status() == OrderStatus::Filled {
            return Err(EngineError::AlreadyFilled);
        }

        match state.remove(order_id) {
            Some(resting) => {
                resting.set_status(OrderStatus::Cancelled);
                self.metrics.inc_orders_cancelled();
                self.metrics.dec_orders_in_book();
                Ok(resting)
            }
            None => {
                if order.status() == OrderStatus::Cancelled {
                    // A concurrent cancel won the race under this lock.
                    return Ok(order);
                }
                order.set_status(OrderStatus::Cancelled);
                self.metrics.inc_orders_cancelled();
                Ok(order)
            }
        }
    }

    /// O(1) registry lookup. Filled and cancelled orders stay addressable.
    pub fn get_order(&self, order_id: &str) -> Result<Arc<Order>, EngineError> {
        self.orders
            .get(order_id)
            .map(|entry| entry.value().clone())
            .ok_or(EngineError::NotFound)
    }

    /// Aggregated depth for `symbol`, up to `limit` levels per side
    /// (`limit == 0` means all). An unknown symbol gets an empty book created
    /// on first reference, mirroring submission's lazy creation.
    pub fn depth(&self, symbol: &str, limit: usize) -> BookDepth {
        self.book(symbol).depth(limit)
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("orders", &self.orders.len())
            .field("metrics", &self.metrics)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Side;

    fn engine() -> Engine {
        Engine::new(Arc::new(Metrics::new()))
    }

    fn limit(id: &str, side: Side, price: i64, quantity: i64) -> Order {
        Order::new(id, "X", side, OrderType::Limit, price, quantity)
    }

    fn market(id: &str, side: Side, quantity: i64) -> Order {
        Order::new(id, "X", side, OrderType::Market, 0, quantity)
    }

    #[test]
    fn exact_match_fills_both_and_empties_book() {
        let engine = engine();

        let rest = engine.submit(limit("s1", Side::Sell, 100, 10)).unwrap();
        assert_eq!(rest.order.status(), OrderStatus::Accepted);
        assert!(rest.trades.is_empty());

        let result = engine.submit(limit("b1", Side::Buy, 100, 10)).unwrap();
        assert_eq!(result.order.status(), OrderStatus::Filled);
        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].price, 100);
        assert_eq!(result.trades[0].quantity, 10);

        let depth = engine.depth("X", 0);
        assert!(depth.bids.is_empty());
        assert!(depth.asks.is_empty());

        let seller = engine.get_order("s1").unwrap();
        assert_eq!(seller.status(), OrderStatus::Filled);
    }

    #[test]
    fn partial_fill_rests_the_remainder() {
        let engine = engine();
        engine.submit(limit("s1", Side::Sell, 100, 5)).unwrap();

        let result = engine.submit(limit("b1", Side::Buy, 100, 10)).unwrap();
        assert_eq!(result.order.status(), OrderStatus::PartialFill);
        assert_eq!(result.order.filled_quantity(), 5);
        assert_eq!(result.order.remaining_quantity(), 5);
        assert_eq!(result.trades.len(), 1);

        let depth = engine.depth("X", 0);
        assert_eq!(depth.bids.len(), 1);
        assert_eq!((depth.bids[0].price, depth.bids[0].quantity), (100, 5));
        assert!(depth.asks.is_empty());
    }

    #[test]
    fn multi_level_walk_consumes_best_price_first() {
        let engine = engine();
        engine.submit(limit("s1", Side::Sell, 100, 5)).unwrap();
        engine.submit(limit("s2", Side::Sell, 101, 5)).unwrap();

        let result = engine.submit(limit("b1", Side::Buy, 101, 8)).unwrap();
        assert_eq!(result.order.status(), OrderStatus::Filled);
        assert_eq!(result.trades.len(), 2);
        assert_eq!((result.trades[0].price, result.trades[0].quantity), (100, 5));
        assert_eq!((result.trades[1].price, result.trades[1].quantity), (101, 3));

        let depth = engine.depth("X", 0);
        assert_eq!(depth.asks, vec![crate::order_book::DepthLevel { price: 101, quantity: 2 }]);
        let s2 = engine.get_order("s2").unwrap();
        assert_eq!(s2.remaining_quantity(), 2);
        assert_eq!(s2.status(), OrderStatus::PartialFill);
    }

    #[test]
    fn market_order_rejected_all_or_none() {
        let engine = engine();
        engine.submit(limit("s1", Side::Sell, 100, 5)).unwrap();

        let err = engine.submit(market("m1", Side::Buy, 10)).unwrap_err();
        assert_eq!(
            err,
            EngineError::InsufficientLiquidity {
                available: 5,
                requested: 10
            }
        );

        // Resting order untouched; rejected order absent from the registry.
        let depth = engine.depth("X", 0);
        assert_eq!((depth.asks[0].price, depth.asks[0].quantity), (100, 5));
        assert_eq!(engine.get_order("m1").unwrap_err(), EngineError::NotFound);
        let s1 = engine.get_order("s1").unwrap();
        assert_eq!(s1.remaining_quantity(), 5);
        assert_eq!(s1.status(), OrderStatus::Accepted);
    }

    #[test]
    fn market_order_with_exact_liquidity_fills_completely() {
        let engine = engine();
        engine.submit(limit("s1", Side::Sell, 100, 4)).unwrap();
        engine.submit(limit("s2", Side::Sell, 105, 6)).unwrap();

        let result = engine.submit(market("m1", Side::Buy, 10)).unwrap();
        assert_eq!(result.order.status(), OrderStatus::Filled);
        assert_eq!(result.order.remaining_quantity(), 0);
        assert_eq!(result.trades.len(), 2);
        assert!(engine.depth("X", 0).asks.is_empty());
    }

    #[test]
    fn time_priority_within_a_level() {
        let engine = engine();
        engine.submit(limit("s1", Side::Sell, 100, 5)).unwrap();
        engine.submit(limit("s2", Side::Sell, 100, 5)).unwrap();

        let result = engine.submit(limit("b1", Side::Buy, 100, 5)).unwrap();
        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].seller_order_id, "s1");

        assert_eq!(engine.get_order("s1").unwrap().status(), OrderStatus::Filled);
        let s2 = engine.get_order("s2").unwrap();
        assert_eq!(s2.status(), OrderStatus::Accepted);
        assert_eq!(s2.remaining_quantity(), 5);
    }

    #[test]
    fn cancel_resting_order_then_recancel_is_idempotent() {
        let engine = engine();
        engine.submit(limit("b1", Side::Buy, 100, 10)).unwrap();

        let cancelled = engine.cancel("b1").unwrap();
        assert_eq!(cancelled.status(), OrderStatus::Cancelled);
        assert!(engine.depth("X", 0).bids.is_empty());

        let again = engine.cancel("b1").unwrap();
        assert_eq!(again.status(), OrderStatus::Cancelled);
        assert_eq!(engine.metrics().orders_cancelled(), 1);
    }

    #[test]
    fn cancel_unknown_order_is_not_found() {
        let engine = engine();
        assert_eq!(engine.cancel("ghost").unwrap_err(), EngineError::NotFound);
    }

    #[test]
    fn cancel_filled_order_is_rejected() {
        let engine = engine();
        engine.submit(limit("s1", Side::Sell, 100, 10)).unwrap();
        engine.submit(limit("b1", Side::Buy, 100, 10)).unwrap();

        assert_eq!(engine.cancel("s1").unwrap_err(), EngineError::AlreadyFilled);
        assert_eq!(engine.cancel("b1").unwrap_err(), EngineError::AlreadyFilled);
    }

    #[test]
    fn cancel_partial_fill_removes_the_residual() {
        let engine = engine();
        engine.submit(limit("s1", Side::Sell, 100, 5)).unwrap();
        engine.submit(limit("b1", Side::Buy, 100, 10)).unwrap();

        let cancelled = engine.cancel("b1").unwrap();
        assert_eq!(cancelled.status(), OrderStatus::Cancelled);
        assert_eq!(cancelled.filled_quantity(), 5);
        assert_eq!(cancelled.remaining_quantity(), 5);
        assert!(engine.depth("X", 0).bids.is_empty());
    }

    #[test]
    fn validation_rejects_bad_price_and_quantity() {
        let engine = engine();
        assert_eq!(
            engine.submit(limit("x1", Side::Buy, 0, 10)).unwrap_err(),
            EngineError::InvalidPrice
        );
        assert_eq!(
            engine.submit(limit("x2", Side::Buy, 100, 0)).unwrap_err(),
            EngineError::InvalidQuantity
        );
        // Rejected orders never enter the registry.
        assert_eq!(engine.get_order("x1").unwrap_err(), EngineError::NotFound);
    }

    #[test]
    fn symbols_route_to_independent_books() {
        let engine = engine();
        engine
            .submit(Order::new("a1", "AAA", Side::Sell, OrderType::Limit, 100, 5))
            .unwrap();
        engine
            .submit(Order::new("b1", "BBB", Side::Buy, OrderType::Limit, 100, 5))
            .unwrap();

        let aaa = engine.depth("AAA", 0);
        assert_eq!(aaa.asks.len(), 1);
        assert!(aaa.bids.is_empty());
        let bbb = engine.depth("BBB", 0);
        assert_eq!(bbb.bids.len(), 1);
        assert!(bbb.asks.is_empty());
    }

    #[test]
    fn depth_on_unknown_symbol_returns_empty_snapshot() {
        let engine = engine();
        let depth = engine.depth("NEW", 5);
        assert_eq!(depth.symbol, "NEW");
        assert!(depth.bids.is_empty());
        assert!(depth.asks.is_empty());
        assert!(depth.timestamp > 0);
    }

    #[test]
    fn book_is_never_crossed_after_submissions() {
        let engine = engine();
        engine.submit(limit("s1", Side::Sell, 101, 10)).unwrap();
        engine.submit(limit("b1", Side::Buy, 99, 10)).unwrap();
        engine.submit(limit("s2", Side::Sell, 100, 10)).unwrap();
        engine.submit(limit("b2", Side::Buy, 100, 10)).unwrap();

        let depth = engine.depth("X", 0);
        if let (Some(bid), Some(ask)) = (depth.bids.first(), depth.asks.first()) {
            assert!(bid.price < ask.price, "crossed book: {depth:?}");
        }
    }

    #[test]
    fn counters_follow_the_matching_discipline() {
        let engine = engine();
        engine.submit(limit("s1", Side::Sell, 100, 5)).unwrap();
        engine.submit(limit("s2", Side::Sell, 101, 5)).unwrap();
        engine.submit(limit("b1", Side::Buy, 101, 8)).unwrap();

        let metrics = engine.metrics();
        assert_eq!(metrics.orders_received(), 3);
        assert_eq!(metrics.trades_executed(), 2);
        // Two counterparty trades plus the taker.
        assert_eq!(metrics.orders_matched(), 3);
        // s1 filled and left the book, s2 rests partially filled.
        assert_eq!(metrics.orders_in_book(), 1);

        engine.cancel("s2").unwrap();
        assert_eq!(metrics.orders_in_book(), 0);
        assert_eq!(metrics.orders_cancelled(), 1);
    }

    #[test]
    fn trade_ids_come_from_the_configured_source() {
        use std::sync::atomic::{AtomicU64, Ordering};

        struct SeqSource(AtomicU64);
        impl crate::ids::IdSource for SeqSource {
            fn next_id(&self) -> String {
                format!("trade-{}", self.0.fetch_add(1, Ordering::Relaxed))
            }
        }

        let engine = Engine::with_id_source(
            Arc::new(Metrics::new()),
            Arc::new(SeqSource(AtomicU64::new(1))),
        );
        engine.submit(limit("s1", Side::Sell, 100, 5)).unwrap();
        engine.submit(limit("s2", Side::Sell, 101, 5)).unwrap();
        let result = engine.submit(limit("b1", Side::Buy, 101, 10)).unwrap();

        let ids: Vec<&str> = result.trades.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["trade-1", "trade-2"]);
    }

    #[test]
    fn rejected_market_order_leaves_counters_consistent() {
        let engine = engine();
        engine.submit(limit("s1", Side::Sell, 100, 5)).unwrap();
        let _ = engine.submit(market("m1", Side::Buy, 10));

        let metrics = engine.metrics();
        assert_eq!(metrics.orders_received(), 2);
        assert_eq!(metrics.trades_executed(), 0);
        assert_eq!(metrics.orders_in_book(), 1);
    }
}
