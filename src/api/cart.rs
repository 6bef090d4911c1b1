use axum::{extract::{Path, State}, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json as SqlJson;
use uuid::Uuid;
use validator::Validate;

use crate::api::bundles::bundle_for_gate;
use crate::api::{fail, publish_events, ApiResult, AppState};
use crate::domain::aggregates::{Bundle, Cart, CartItem, LineKind, Order};
use crate::domain::value_objects::{Money, SessionId};
use crate::StoreError;

#[derive(Debug, sqlx::FromRow)]
struct CartRow { line_key: String, kind: String, product_id: i64, name: String, quantity: i32, unit_price: Decimal, currency: String, bundle: Option<SqlJson<Bundle>> }

impl CartRow {
    fn into_item(self) -> Option<CartItem> {
        let Some(kind) = LineKind::parse(&self.kind) else {
            tracing::warn!(line_key = %self.line_key, kind = %self.kind, "ignoring cart line of unknown kind");
            return None;
        };
        Some(CartItem {
            line_key: self.line_key, kind, product_id: self.product_id, name: self.name,
            quantity: u32::try_from(self.quantity).unwrap_or(0), unit_price: Money::new(self.unit_price, &self.currency),
            bundle: self.bundle.map(|b| b.0),
        })
    }
}

const CART_LINES_SQL: &str = "SELECT line_key, kind, product_id, name, quantity, unit_price, currency, bundle FROM cart_items WHERE session_id = $1 ORDER BY created_at";
/// Checkout holds the lines it reads until the order commits.
const CART_LINES_LOCKED_SQL: &str = "SELECT line_key, kind, product_id, name, quantity, unit_price, currency, bundle FROM cart_items WHERE session_id = $1 ORDER BY created_at FOR UPDATE";
/// Removes only the lines that went into the order; anything added meanwhile stays in the cart.
const DELETE_ORDERED_LINES_SQL: &str = "DELETE FROM cart_items WHERE session_id = $1 AND line_key = ANY($2)";

async fn load_cart<'e>(db: impl sqlx::PgExecutor<'e>, sql: &str, currency: &str, session: &SessionId) -> Result<Cart, StoreError> {
    let rows = sqlx::query_as::<_, CartRow>(sql).bind(session.as_str()).fetch_all(db).await?;
    Ok(Cart::restore(session.clone(), currency, rows.into_iter().filter_map(CartRow::into_item)))
}

async fn store_line(s: &AppState, session: &SessionId, item: &CartItem) -> Result<(), StoreError> {
    sqlx::query("INSERT INTO cart_items (id, session_id, line_key, kind, product_id, name, quantity, unit_price, currency, bundle, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW()) ON CONFLICT (session_id, line_key) DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity, name = EXCLUDED.name, unit_price = EXCLUDED.unit_price, currency = EXCLUDED.currency, bundle = EXCLUDED.bundle")
        .bind(Uuid::now_v7()).bind(session.as_str()).bind(&item.line_key).bind(item.kind.as_str()).bind(item.product_id).bind(&item.name)
        .bind(i32::try_from(item.quantity).map_err(|_| StoreError::Validation("quantity too large".into()))?)
        .bind(item.unit_price.amount()).bind(item.unit_price.currency()).bind(item.bundle.as_ref().map(SqlJson))
        .execute(&s.db).await?;
    Ok(())
}

fn ordered_line_keys(order: &Order) -> Vec<String> { order.items().iter().map(|i| i.line_key.clone()).collect() }

fn session(raw: &str) -> Result<SessionId, (StatusCode, String)> { SessionId::new(raw).map_err(fail) }

pub async fn get_cart(State(s): State<AppState>, Path(raw): Path<String>) -> ApiResult<Json<Cart>> {
    let session = session(&raw)?;
    load_cart(&s.db, CART_LINES_SQL, &s.config.currency, &session).await.map(Json).map_err(fail)
}

pub async fn clear_cart(State(s): State<AppState>, Path(raw): Path<String>) -> ApiResult<StatusCode> {
    let session = session(&raw)?;
    sqlx::query("DELETE FROM cart_items WHERE session_id = $1").bind(session.as_str()).execute(&s.db).await.map_err(fail)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddItemRequest {
    pub kind: LineKind,
    pub product_id: i64,
    #[validate(range(min = 1, max = 99))]
    pub quantity: u32,
}

pub async fn add_item(State(s): State<AppState>, Path(raw): Path<String>, Json(r): Json<AddItemRequest>) -> ApiResult<(StatusCode, Json<Cart>)> {
    let session = session(&raw)?;
    r.validate().map_err(fail)?;
    let currency = s.config.currency.as_str();
    let item = match r.kind {
        LineKind::Gate => CartItem::for_gate(&s.catalog.gate_by_id(r.product_id).await.map_err(fail)?, r.quantity, currency),
        LineKind::Extension => CartItem::for_extension(&s.catalog.extension_by_id(r.product_id).await.map_err(fail)?, r.quantity, currency),
        LineKind::Bundle => return Err(fail(StoreError::Validation("bundles are added through the bundles endpoint".into()))),
    };
    add_line(&s, &session, item).await
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddBundleRequest {
    pub gate_id: i64,
    #[validate(range(min = 1.0, max = 1000.0))]
    pub width: f32,
    #[serde(default = "one")]
    #[validate(range(min = 1, max = 99))]
    pub quantity: u32,
}

fn one() -> u32 { 1 }

pub async fn add_bundle(State(s): State<AppState>, Path(raw): Path<String>, Json(r): Json<AddBundleRequest>) -> ApiResult<(StatusCode, Json<Cart>)> {
    let session = session(&raw)?;
    r.validate().map_err(fail)?;
    let bundle = bundle_for_gate(&s, r.gate_id, r.width).await.map_err(fail)?;
    let item = CartItem::for_bundle(&bundle, r.quantity, &s.config.currency);
    add_line(&s, &session, item).await
}

async fn add_line(s: &AppState, session: &SessionId, item: CartItem) -> ApiResult<(StatusCode, Json<Cart>)> {
    let mut cart = load_cart(&s.db, CART_LINES_SQL, &s.config.currency, session).await.map_err(fail)?;
    cart.add_item(item.clone()).map_err(fail)?;
    store_line(s, session, &item).await.map_err(fail)?;
    Ok((StatusCode::CREATED, Json(cart)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateLineRequest {
    /// Zero removes the line.
    #[validate(range(max = 99))]
    pub quantity: u32,
}

pub async fn update_line(State(s): State<AppState>, Path((raw, line_key)): Path<(String, String)>, Json(r): Json<UpdateLineRequest>) -> ApiResult<Json<Cart>> {
    let session = session(&raw)?;
    r.validate().map_err(fail)?;
    let mut cart = load_cart(&s.db, CART_LINES_SQL, &s.config.currency, &session).await.map_err(fail)?;
    cart.update_quantity(&line_key, r.quantity).map_err(fail)?;
    if r.quantity == 0 {
        delete_line(&s, &session, &line_key).await.map_err(fail)?;
    } else {
        sqlx::query("UPDATE cart_items SET quantity = $3 WHERE session_id = $1 AND line_key = $2")
            .bind(session.as_str()).bind(&line_key).bind(i32::try_from(r.quantity).unwrap_or(i32::MAX))
            .execute(&s.db).await.map_err(fail)?;
    }
    Ok(Json(cart))
}

pub async fn remove_line(State(s): State<AppState>, Path((raw, line_key)): Path<(String, String)>) -> ApiResult<Json<Cart>> {
    let session = session(&raw)?;
    let mut cart = load_cart(&s.db, CART_LINES_SQL, &s.config.currency, &session).await.map_err(fail)?;
    cart.remove_item(&line_key).map_err(fail)?;
    delete_line(&s, &session, &line_key).await.map_err(fail)?;
    Ok(Json(cart))
}

async fn delete_line(s: &AppState, session: &SessionId, line_key: &str) -> Result<(), StoreError> {
    sqlx::query("DELETE FROM cart_items WHERE session_id = $1 AND line_key = $2").bind(session.as_str()).bind(line_key).execute(&s.db).await?;
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[validate(email)]
    pub customer_email: String,
    #[serde(default)]
    pub shipping_address: serde_json::Value,
}

/// Turns the session's cart into a confirmed order awaiting payment.
pub async fn checkout(State(s): State<AppState>, Path(raw): Path<String>, Json(r): Json<CheckoutRequest>) -> ApiResult<(StatusCode, Json<Order>)> {
    let session = session(&raw)?;
    r.validate().map_err(fail)?;
    let mut tx = s.db.begin().await.map_err(fail)?;
    let cart = load_cart(&mut *tx, CART_LINES_LOCKED_SQL, &s.config.currency, &session).await.map_err(fail)?;
    if cart.is_empty() { return Err(fail(StoreError::EmptyCart)); }
    let mut order = Order::from_cart(&cart, r.customer_email.trim(), r.shipping_address).map_err(fail)?;
    order.confirm().map_err(fail)?;

    sqlx::query("INSERT INTO orders (id, order_number, session_id, customer_email, status, payment_status, fulfillment_status, subtotal, total, currency, shipping_address, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NOW(), NOW())")
        .bind(order.id()).bind(order.order_number()).bind(order.session_id()).bind(order.email())
        .bind(order.status().as_str()).bind(order.payment_status().as_str()).bind(order.fulfillment_status().as_str())
        .bind(order.subtotal().amount()).bind(order.total().amount()).bind(order.total().currency()).bind(order.shipping_address())
        .execute(&mut *tx).await.map_err(fail)?;
    for i in order.items() {
        sqlx::query("INSERT INTO order_items (id, order_id, line_key, kind, product_id, name, quantity, unit_price, total) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)")
            .bind(i.id).bind(order.id()).bind(&i.line_key).bind(i.kind.as_str()).bind(i.product_id).bind(&i.name)
            .bind(i32::try_from(i.quantity).unwrap_or(i32::MAX)).bind(i.unit_price.amount()).bind(i.total.amount())
            .execute(&mut *tx).await.map_err(fail)?;
    }
    sqlx::query(DELETE_ORDERED_LINES_SQL).bind(session.as_str()).bind(ordered_line_keys(&order)).execute(&mut *tx).await.map_err(fail)?;
    tx.commit().await.map_err(fail)?;

    tracing::info!(order_id = %order.id(), order_number = order.order_number(), total = %order.total(), "order placed");
    publish_events(s.nats.as_ref(), order.take_events()).await;
    Ok((StatusCode::CREATED, Json(order)))
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct OrderRow {
    pub id: Uuid, pub order_number: String, pub session_id: String, pub customer_email: String,
    pub status: String, pub payment_status: String, pub fulfillment_status: String,
    pub subtotal: Decimal, pub total: Decimal, pub currency: String, pub shipping_address: serde_json::Value,
    pub created_at: DateTime<Utc>, pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct OrderItemRow { pub id: Uuid, pub line_key: String, pub kind: String, pub product_id: i64, pub name: String, pub quantity: i32, pub unit_price: Decimal, pub total: Decimal }

#[derive(Debug, Serialize)]
pub struct OrderView { #[serde(flatten)] pub order: OrderRow, pub items: Vec<OrderItemRow> }

pub async fn get_order(State(s): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<OrderView>> {
    let order = sqlx::query_as::<_, OrderRow>("SELECT id, order_number, session_id, customer_email, status, payment_status, fulfillment_status, subtotal, total, currency, shipping_address, created_at, updated_at FROM orders WHERE id = $1")
        .bind(id).fetch_optional(&s.db).await.map_err(fail)?.ok_or_else(|| fail(StoreError::OrderNotFound))?;
    let items = sqlx::query_as::<_, OrderItemRow>("SELECT id, line_key, kind, product_id, name, quantity, unit_price, total FROM order_items WHERE order_id = $1 ORDER BY line_key")
        .bind(id).fetch_all(&s.db).await.map_err(fail)?;
    Ok(Json(OrderView { order, items }))
}
