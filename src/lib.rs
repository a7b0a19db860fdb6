//! # Matchbook
//!
//! In-memory limit-order-book matching engine: per-symbol books under strict
//! price-time priority, all-or-none market orders, and an atomic metrics
//! sink.
//!
//! ## Entry point
//!
//! Use [`Engine`] as the single entry point: create with [`Engine::new`],
//! then [`Engine::submit`], [`Engine::cancel`], [`Engine::get_order`], and
//! [`Engine::depth`]. Orders for distinct symbols progress in parallel; one
//! symbol's submissions and cancels are linearized by its book's write lock.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use matchbook::{Engine, Metrics, Order, OrderType, Side};
//!
//! let engine = Engine::new(Arc::new(Metrics::new()));
//! engine
//!     .submit(Order::new("s1", "BTCUSD", Side::Sell, OrderType::Limit, 100, 10))
//!     .unwrap();
//! let result = engine
//!     .submit(Order::new("b1", "BTCUSD", Side::Buy, OrderType::Limit, 100, 10))
//!     .unwrap();
//! assert_eq!(result.trades.len(), 1);
//! assert_eq!(result.trades[0].price, 100);
//! ```
//!
//! ## Lower-level API
//!
//! [`OrderBook`] and [`matching::match_order`] are exposed for callers that
//! manage books and trade ids themselves.

pub mod api;
pub mod engine;
pub mod error;
pub mod ids;
pub mod matching;
pub mod metrics;
pub mod order_book;
pub mod order_gen;
pub mod price_level;
pub mod types;

pub use engine::{Engine, MatchResult};
pub use error::EngineError;
pub use ids::{IdSource, UuidSource};
pub use metrics::{Metrics, MetricsSnapshot};
pub use order_book::{BookDepth, DepthLevel, OrderBook};
pub use price_level::PriceLevel;
pub use types::{Order, OrderSnapshot, OrderStatus, OrderType, Side, Trade};
