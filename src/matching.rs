//! Price-time priority matching.
//!
//! [`match_order`] runs one incoming order against the opposite side of the
//! book: best price first, earliest arrival first within a price. The caller
//! holds the book's write lock for the whole call.

use std::sync::Arc;

use crate::ids::IdSource;
use crate::metrics::Metrics;
use crate::order_book::BookState;
use crate::types::{Order, OrderStatus, OrderType, Side, Trade};

/// Matches `taker` against resting orders, mutating both sides in place.
///
/// Limit orders stop once the best opposing price no longer crosses; market
/// orders never stop on price. Each trade executes at the maker's resting
/// price. Fully filled makers are removed from the book (and the in-book
/// gauge decremented); partially filled makers stay at the head of their
/// level. Returns the trades in execution order.
pub fn match_order(
    book: &mut BookState,
    taker: &Arc<Order>,
    trade_ids: &dyn IdSource,
    metrics: &Metrics,
) -> Vec<Trade> {
    let mut trades = Vec::new();

    // Market orders cross every price.
    let price_limit = match (taker.order_type, taker.side) {
        (OrderType::Limit, _) => taker.price,
        (OrderType::Market, Side::Buy) => i64::MAX,
        (OrderType::Market, Side::Sell) => i64::MIN,
    };

    while taker.remaining_quantity() > 0 {
        let Some(maker) = (match taker.side {
            Side::Buy => book.best_ask(),
            Side::Sell => book.best_bid(),
        }) else {
            break;
        };
        let crosses = match taker.side {
            Side::Buy => maker.price <= price_limit,
            Side::Sell => maker.price >= price_limit,
        };
        if !crosses {
            break;
        }

        let quantity = taker.remaining_quantity().min(maker.remaining_quantity());
        let (buyer, seller) = match taker.side {
            Side::Buy => (taker, &maker),
            Side::Sell => (&maker, taker),
        };
        let trade = Trade::new(
            trade_ids.next_id(),
            buyer.id.clone(),
            seller.id.clone(),
            maker.price,
            quantity,
        );

        taker.fill(quantity);
        maker.fill(quantity);

        if maker.remaining_quantity() == 0 {
            maker.set_status(OrderStatus::Filled);
            book.remove(&maker.id);
            metrics.dec_orders_in_book();
        } else {
            maker.set_status(OrderStatus::PartialFill);
        }
        trades.push(trade);
    }

    trades
}
