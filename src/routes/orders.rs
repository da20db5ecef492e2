use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::orders::{CreateOrderRequest, CreateOrderResponse},
    error::AppResult,
    middleware::auth::AuthUser,
    services::order_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/create", post(create_order))
}

#[utoipa::path(
    post,
    path = "/api/orders/create",
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Order header and lines created, cart cleared", body = CreateOrderResponse),
        (status = 400, description = "Empty or unresolvable cart snapshot"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Body userId does not match the token identity"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<Json<CreateOrderResponse>> {
    let resp = order_service::create_order(&state, &user, payload).await?;
    Ok(Json(resp))
}
