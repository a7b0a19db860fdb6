//! Core order and trade models.
//!
//! [`Order`] carries immutable identity fields plus fill state that is mutated
//! only by the owning book while its write lock is held. Readers take value
//! copies via [`Order::snapshot`] without touching any book lock.

use std::sync::atomic::{AtomicI64, AtomicU8, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::EngineError;

/// Order side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

/// Order type: limit (with price) or market (take best available).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    Limit,
    Market,
}

/// Order lifecycle status.
///
/// Transitions: ACCEPTED -> PARTIAL_FILL -> FILLED, with CANCELLED reachable
/// from ACCEPTED and PARTIAL_FILL. FILLED and CANCELLED are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum OrderStatus {
    Accepted = 0,
    PartialFill = 1,
    Filled = 2,
    Cancelled = 3,
}

impl OrderStatus {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => OrderStatus::Accepted,
            1 => OrderStatus::PartialFill,
            2 => OrderStatus::Filled,
            _ => OrderStatus::Cancelled,
        }
    }
}

/// A single order.
///
/// `remaining`, `filled`, and `status` are atomics: writers change them only
/// while holding the owning book's write lock, readers snapshot them without
/// that lock. `filled` is read before `remaining`, so a read that races a fill
/// can under-report the fill but never invent one.
#[derive(Debug)]
pub struct Order {
    /// Unique id, assigned at creation by the id source.
    pub id: String,
    /// Opaque symbol identifying the book this order trades in.
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    /// Price in minor units. Positive for limit orders; unused for market.
    pub price: i64,
    pub original_quantity: i64,
    /// Creation time in nanoseconds since the epoch. Informational; time
    /// priority within a price level is insertion order, not this field.
    pub timestamp: i64,
    remaining: AtomicI64,
    filled: AtomicI64,
    status: AtomicU8,
}

impl Order {
    pub fn new(
        id: impl Into<String>,
        symbol: impl Into<String>,
        side: Side,
        order_type: OrderType,
        price: i64,
        quantity: i64,
    ) -> Self {
        Self {
            id: id.into(),
            symbol: symbol.into(),
            side,
            order_type,
            price,
            original_quantity: quantity,
            timestamp: now_nanos(),
            remaining: AtomicI64::new(quantity),
            filled: AtomicI64::new(0),
            status: AtomicU8::new(OrderStatus::Accepted as u8),
        }
    }

    /// Rejects limit orders without a positive price and any order without a
    /// positive quantity.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.order_type == OrderType::Limit && self.price <= 0 {
            return Err(EngineError::InvalidPrice);
        }
        if self.original_quantity <= 0 {
            return Err(EngineError::InvalidQuantity);
        }
        Ok(())
    }

    pub fn is_limit(&self) -> bool {
        matches!(self.order_type, OrderType::Limit)
    }

    pub fn is_market(&self) -> bool {
        matches!(self.order_type, OrderType::Market)
    }

    pub fn remaining_quantity(&self) -> i64 {
        self.remaining.load(Ordering::Acquire)
    }

    pub fn filled_quantity(&self) -> i64 {
        self.filled.load(Ordering::Acquire)
    }

    pub fn status(&self) -> OrderStatus {
        OrderStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    /// Moves `quantity` from remaining to filled. Book write lock held.
    pub(crate) fn fill(&self, quantity: i64) {
        debug_assert!(quantity > 0 && quantity <= self.remaining_quantity());
        self.remaining.fetch_sub(quantity, Ordering::AcqRel);
        self.filled.fetch_add(quantity, Ordering::AcqRel);
    }

    /// Sets the status. Book write lock held; terminal states cannot be left.
    pub(crate) fn set_status(&self, next: OrderStatus) {
        debug_assert!(
            match self.status() {
                OrderStatus::Accepted => true,
                OrderStatus::PartialFill => next != OrderStatus::Accepted,
                OrderStatus::Filled | OrderStatus::Cancelled => false,
            },
            "illegal status transition {:?} -> {:?}",
            self.status(),
            next
        );
        self.status.store(next as u8, Ordering::Release);
    }

    /// Point-in-time value copy, safe to serialize and compare.
    pub fn snapshot(&self) -> OrderSnapshot {
        let filled = self.filled_quantity();
        let remaining = self.remaining_quantity();
        OrderSnapshot {
            order_id: self.id.clone(),
            symbol: self.symbol.clone(),
            side: self.side,
            order_type: self.order_type,
            price: self.price,
            quantity: self.original_quantity,
            remaining_quantity: remaining,
            filled_quantity: filled,
            status: self.status(),
            timestamp: self.timestamp,
        }
    }
}

/// Value copy of an order's state at the moment of read.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OrderSnapshot {
    pub order_id: String,
    pub symbol: String,
    pub side: Side,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub price: i64,
    pub quantity: i64,
    pub remaining_quantity: i64,
    pub filled_quantity: i64,
    pub status: OrderStatus,
    pub timestamp: i64,
}

/// A matched trade. Immutable once created; carries order ids, never order
/// handles.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Trade {
    pub id: String,
    pub buyer_order_id: String,
    pub seller_order_id: String,
    pub price: i64,
    pub quantity: i64,
    pub timestamp: i64,
}

impl Trade {
    pub fn new(
        id: impl Into<String>,
        buyer_order_id: impl Into<String>,
        seller_order_id: impl Into<String>,
        price: i64,
        quantity: i64,
    ) -> Self {
        Self {
            id: id.into(),
            buyer_order_id: buyer_order_id.into(),
            seller_order_id: seller_order_id.into(),
            price,
            quantity,
            timestamp: now_nanos(),
        }
    }
}

pub(crate) fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}
