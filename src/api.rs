//! REST API router for the matching engine.
//!
//! Used by the binary and by integration tests. Build state with
//! [`create_app_state`] and the router with [`create_router`]. Uses Extension
//! for state so the router is `Router<()>` and works with
//! `into_make_service()`.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use crate::engine::Engine;
use crate::error::EngineError;
use crate::ids::{IdSource, UuidSource};
use crate::metrics::Metrics;
use crate::types::{Order, OrderStatus, OrderType, Side, Trade};

/// Shared app state: the engine (internally synchronized, no outer mutex
/// needed) and the order-id source.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub order_ids: Arc<dyn IdSource>,
}

/// Builds shared app state with a fresh engine, metrics sink, and UUID ids.
pub fn create_app_state() -> AppState {
    let metrics = Arc::new(Metrics::new());
    AppState {
        engine: Arc::new(Engine::new(metrics)),
        order_ids: Arc::new(UuidSource),
    }
}

/// Builds the REST router with the given state.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/orders", post(create_order))
        .route("/api/v1/orders/{id}", get(get_order).delete(cancel_order))
        .route("/api/v1/orderbook/{symbol}", get(order_book_depth))
        .route("/health", get(health))
        .route("/metrics", get(metrics_snapshot))
        .layer(Extension(state))
}

#[derive(Debug, serde::Deserialize)]
struct CreateOrderRequest {
    symbol: String,
    side: Side,
    #[serde(rename = "type")]
    order_type: OrderType,
    /// Required for LIMIT, omitted for MARKET.
    #[serde(default)]
    price: i64,
    quantity: i64,
}

#[derive(serde::Serialize)]
struct TradeView {
    trade_id: String,
    price: i64,
    quantity: i64,
    timestamp: i64,
}

impl From<&Trade> for TradeView {
    fn from(trade: &Trade) -> Self {
        Self {
            trade_id: trade.id.clone(),
            price: trade.price,
            quantity: trade.quantity,
            timestamp: trade.timestamp,
        }
    }
}

#[derive(serde::Serialize)]
struct CreateOrderResponse {
    order_id: String,
    status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filled_quantity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    remaining_quantity: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    trades: Vec<TradeView>,
}

#[derive(serde::Serialize)]
struct CancelOrderResponse {
    order_id: String,
    status: OrderStatus,
}

#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_seconds: i64,
    orders_processed: i64,
}

#[derive(Debug, serde::Deserialize)]
struct DepthParams {
    depth: Option<String>,
}

async fn create_order(
    Extension(state): Extension<AppState>,
    Json(req): Json<CreateOrderRequest>,
) -> Response {
    let order = Order::new(
        state.order_ids.next_id(),
        req.symbol,
        req.side,
        req.order_type,
        req.price,
        req.quantity,
    );

    let result = match state.engine.submit(order) {
        Ok(result) => result,
        Err(err) => {
            tracing::debug!(error = %err, "order rejected");
            return error_response(err);
        }
    };

    let snapshot = result.order.snapshot();
    let trades: Vec<TradeView> = result.trades.iter().map(TradeView::from).collect();
    let (code, message, filled, remaining) = match snapshot.status {
        OrderStatus::Accepted => (StatusCode::CREATED, Some("Order added to book"), None, None),
        OrderStatus::PartialFill => (
            StatusCode::ACCEPTED,
            None,
            Some(snapshot.filled_quantity),
            Some(snapshot.remaining_quantity),
        ),
        _ => (StatusCode::OK, None, Some(snapshot.filled_quantity), None),
    };

    (
        code,
        Json(CreateOrderResponse {
            order_id: snapshot.order_id,
            status: snapshot.status,
            message,
            filled_quantity: filled,
            remaining_quantity: remaining,
            trades,
        }),
    )
        .into_response()
}

async fn cancel_order(
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
) -> Response {
    match state.engine.cancel(&id) {
        Ok(order) => (
            StatusCode::OK,
            Json(CancelOrderResponse {
                order_id: order.id.clone(),
                status: order.status(),
            }),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

async fn get_order(Extension(state): Extension<AppState>, Path(id): Path<String>) -> Response {
    match state.engine.get_order(&id) {
        Ok(order) => (StatusCode::OK, Json(order.snapshot())).into_response(),
        Err(err) => error_response(err),
    }
}

async fn order_book_depth(
    Extension(state): Extension<AppState>,
    Path(symbol): Path<String>,
    Query(params): Query<DepthParams>,
) -> Response {
    // Malformed or missing depth falls back to unlimited.
    let limit = params
        .depth
        .and_then(|s| s.parse::<i64>().ok())
        .unwrap_or(0)
        .max(0) as usize;
    (StatusCode::OK, Json(state.engine.depth(&symbol, limit))).into_response()
}

async fn health(Extension(state): Extension<AppState>) -> Response {
    let metrics = state.engine.metrics();
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy",
            uptime_seconds: metrics.uptime().as_secs() as i64,
            orders_processed: metrics.orders_received(),
        }),
    )
        .into_response()
}

async fn metrics_snapshot(Extension(state): Extension<AppState>) -> Response {
    (StatusCode::OK, Json(state.engine.metrics().snapshot())).into_response()
}

fn error_response(err: EngineError) -> Response {
    let code = match err {
        EngineError::NotFound => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_REQUEST,
    };
    (code, Json(serde_json::json!({ "error": err.to_string() }))).into_response()
}
