use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QuerySelect,
    Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    cart::{Cart, CartKey},
    entity::users::{ActiveModel as UserActive, Column as UserCol, Entity as Users, Model as UserModel},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    state::AppState,
};

/// Load the identity's row under a row-level lock. Cart mutations are
/// read-modify-write on the JSONB cart document; the lock serializes
/// concurrent writers for the same identity so increments are never lost.
/// A token whose user no longer exists resolves to 401, not 404.
pub(crate) async fn locked_user(
    txn: &DatabaseTransaction,
    user_id: Uuid,
) -> AppResult<UserModel> {
    Users::find()
        .filter(UserCol::Id.eq(user_id))
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or(AppError::Unauthorized)
}

async fn persist_cart(
    txn: &DatabaseTransaction,
    user_row: UserModel,
    cart: &Cart,
) -> AppResult<()> {
    let mut active: UserActive = user_row.into();
    active.cart_data = Set(cart.to_value());
    active.update(txn).await?;
    Ok(())
}

/// Increment the quantity at `(product, size)` by one, creating the key at
/// quantity 1 if absent. Returns the full updated cart. No stock or upper
/// bound is enforced here; availability is a catalog concern.
pub async fn add_to_cart(state: &AppState, user: &AuthUser, key: CartKey) -> AppResult<Cart> {
    let txn = state.orm.begin().await?;
    let user_row = locked_user(&txn, user.user_id).await?;

    let mut cart = Cart::from_value(&user_row.cart_data);
    cart.add(&key);
    persist_cart(&txn, user_row, &cart).await?;
    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.orm,
        Some(user.user_id),
        "cart_add",
        Some("users"),
        Some(serde_json::json!({ "key": key.to_string() })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(cart)
}

/// Decrement-or-delete. With `remove_all`, or at quantity <= 1, the key is
/// deleted outright. Removing an absent key is a defined no-op that still
/// returns the (unchanged) cart: the caller may race another tab that
/// already removed it.
pub async fn remove_from_cart(
    state: &AppState,
    user: &AuthUser,
    key: CartKey,
    remove_all: bool,
) -> AppResult<Cart> {
    let txn = state.orm.begin().await?;
    let user_row = locked_user(&txn, user.user_id).await?;

    let mut cart = Cart::from_value(&user_row.cart_data);
    cart.remove(&key, remove_all);
    persist_cart(&txn, user_row, &cart).await?;
    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.orm,
        Some(user.user_id),
        "cart_remove",
        Some("users"),
        Some(serde_json::json!({ "key": key.to_string(), "remove_all": remove_all })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(cart)
}

/// The current cart, `{}` if the identity never added anything.
pub async fn get_cart(state: &AppState, user: &AuthUser) -> AppResult<Cart> {
    let user_row = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::Unauthorized)?;

    Ok(Cart::from_value(&user_row.cart_data))
}

/// Reset the cart to empty. Called on logout and after a successful order.
pub async fn clear_cart(state: &AppState, user: &AuthUser) -> AppResult<()> {
    let txn = state.orm.begin().await?;
    let user_row = locked_user(&txn, user.user_id).await?;
    persist_cart(&txn, user_row, &Cart::new()).await?;
    txn.commit().await?;

    Ok(())
}
