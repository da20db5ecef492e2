use axum::{Json, Router, extract::State, routing::post};

use crate::{
    cart::{Cart, CartKey},
    dto::cart::{
        AddToCartRequest, AddToCartResponse, LogoutResponse, RemoveFromCartRequest,
        RemoveFromCartResponse,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    services::cart_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/addtocart", post(add_to_cart))
        .route("/removefromcart", post(remove_from_cart))
        .route("/getcart", post(get_cart))
        .route("/logout", post(logout))
}

fn cart_key(item_id: i32, size: String) -> AppResult<CartKey> {
    if size.trim().is_empty() {
        return Err(AppError::BadRequest("size must not be empty".to_string()));
    }
    Ok(CartKey::new(item_id, size))
}

#[utoipa::path(
    post,
    path = "/addtocart",
    request_body = AddToCartRequest,
    responses(
        (status = 200, description = "Item added, full updated cart returned", body = AddToCartResponse),
        (status = 400, description = "Malformed request body"),
        (status = 401, description = "Missing or invalid token"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddToCartRequest>,
) -> AppResult<Json<AddToCartResponse>> {
    let key = cart_key(payload.item_id, payload.size)?;
    let cart = cart_service::add_to_cart(&state, &user, key).await?;

    Ok(Json(AddToCartResponse {
        message: "Item added successfully".to_string(),
        cart_data: cart,
    }))
}

#[utoipa::path(
    post,
    path = "/removefromcart",
    request_body = RemoveFromCartRequest,
    responses(
        (status = 200, description = "Item decremented or deleted; removing an absent key is a no-op", body = RemoveFromCartResponse),
        (status = 400, description = "Malformed request body"),
        (status = 401, description = "Missing or invalid token"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<RemoveFromCartRequest>,
) -> AppResult<Json<RemoveFromCartResponse>> {
    let key = cart_key(payload.item_id, payload.size)?;
    let cart = cart_service::remove_from_cart(&state, &user, key, payload.remove_all).await?;

    Ok(Json(RemoveFromCartResponse {
        success: true,
        cart_data: cart,
    }))
}

#[utoipa::path(
    post,
    path = "/getcart",
    responses(
        (status = 200, description = "The cart as a flat JSON object", body = Cart),
        (status = 401, description = "Missing or invalid token"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn get_cart(State(state): State<AppState>, user: AuthUser) -> AppResult<Json<Cart>> {
    let cart = cart_service::get_cart(&state, &user).await?;
    Ok(Json(cart))
}

#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 200, description = "Session ended, cart cleared", body = LogoutResponse),
        (status = 401, description = "Missing or invalid token"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn logout(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<LogoutResponse>> {
    cart_service::clear_cart(&state, &user).await?;

    if let Err(err) = crate::audit::log_audit(
        &state.orm,
        Some(user.user_id),
        "user_logout",
        Some("users"),
        None,
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(Json(LogoutResponse {
        success: true,
        message: "Logged out and cart cleared".to_string(),
    }))
}
