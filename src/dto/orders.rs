use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::cart::Cart;
use crate::models::{Order, OrderItem};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub user_id: Uuid,
    /// Cart snapshot at checkout time, in wire form.
    pub cart_items: Cart,
    /// Total as displayed by the client. Kept for wire compatibility; the
    /// stored total is recomputed server-side from catalog prices.
    pub total_amount: Decimal,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub order: Order,
    pub order_items: Vec<OrderItem>,
}
