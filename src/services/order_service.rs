use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, EntityTrait, Set, TransactionTrait};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    cart::{Cart, CartKey},
    dto::orders::{CreateOrderRequest, CreateOrderResponse},
    entity::{
        order_items::ActiveModel as OrderItemActive,
        orders::ActiveModel as OrderActive,
        products::{Entity as Products, Model as ProductModel},
        users::ActiveModel as UserActive,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, OrderItem},
    services::cart_service::locked_user,
    state::AppState,
};

struct ResolvedLine {
    key: CartKey,
    quantity: i64,
    product: ProductModel,
}

/// Turn a cart snapshot into a durable, price-frozen order.
///
/// Header, lines and the cart-clear run in one transaction: a line failure
/// can never leave an order header with no lines. Unit prices are copied
/// from the catalog at resolution time and never change afterwards. A line
/// whose product vanished between add and checkout is skipped, not an
/// error; a snapshot with no resolvable line at all is rejected.
pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<CreateOrderResponse> {
    if payload.user_id != user.user_id {
        return Err(AppError::Forbidden);
    }
    if payload.cart_items.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }

    let txn = state.orm.begin().await?;
    let user_row = locked_user(&txn, user.user_id).await?;

    let mut lines: Vec<ResolvedLine> = Vec::new();
    for (raw_key, quantity) in payload.cart_items.iter() {
        if quantity < 1 {
            return Err(AppError::BadRequest(format!(
                "Invalid quantity for cart item {raw_key}"
            )));
        }
        let key: CartKey = raw_key
            .parse()
            .map_err(|_| AppError::BadRequest(format!("Invalid cart key {raw_key:?}")))?;

        match Products::find_by_id(key.product_id).one(&txn).await? {
            Some(product) => lines.push(ResolvedLine {
                key,
                quantity,
                product,
            }),
            None => {
                tracing::warn!(key = %raw_key, "product no longer in catalog, skipping line");
            }
        }
    }

    if lines.is_empty() {
        return Err(AppError::BadRequest(
            "No purchasable items in cart".into(),
        ));
    }

    let total_amount: Decimal = lines
        .iter()
        .map(|line| line.product.new_price * Decimal::from(line.quantity))
        .sum();
    if total_amount != payload.total_amount {
        tracing::warn!(
            declared = %payload.total_amount,
            computed = %total_amount,
            "declared total does not match catalog prices, storing computed total"
        );
    }

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        total_amount: Set(total_amount),
        status: Set("pending".into()),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut order_items: Vec<OrderItem> = Vec::new();
    for line in &lines {
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(line.key.product_id),
            size: Set(line.key.size.clone()),
            quantity: Set(line.quantity as i32),
            price: Set(line.product.new_price),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;

        order_items.push(item.into());
    }

    // The successful checkout consumes the stored cart.
    let mut active: UserActive = user_row.into();
    active.cart_data = Set(Cart::new().to_value());
    active.update(&txn).await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.orm,
        Some(user.user_id),
        "checkout",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "lines": order_items.len() })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(CreateOrderResponse {
        order: Order::from(order),
        order_items,
    })
}
