use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::cart::Cart;

// Legacy wire shapes: camelCase bodies, cart maps as flat
// `"productId-size"` objects.

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub item_id: i32,
    pub size: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoveFromCartRequest {
    pub item_id: i32,
    pub size: String,
    #[serde(default)]
    pub remove_all: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartResponse {
    pub message: String,
    pub cart_data: Cart,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoveFromCartResponse {
    pub success: bool,
    pub cart_data: Cart,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LogoutResponse {
    pub success: bool,
    pub message: String,
}
