use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, Set, Statement};
use storefront_api::{
    cart::{Cart, CartKey},
    db::{create_orm_conn, create_pool, run_migrations},
    dto::orders::CreateOrderRequest,
    entity::{
        products::{ActiveModel as ProductActive, Entity as Products},
        users::ActiveModel as UserActive,
    },
    error::AppError,
    middleware::auth::AuthUser,
    services::{cart_service, order_service},
    state::AppState,
};
use uuid::Uuid;

// Integration flow against a real Postgres: cart mutations, checkout with
// price freezing, vanished products, and rejection cases. Kept as one
// sequential test because it truncates shared tables. Skipped when no
// database is configured.
#[tokio::test]
async fn cart_and_checkout_flow() -> anyhow::Result<()> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    let pool = create_pool(&database_url).await?;
    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&orm).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE order_items, orders, audit_logs, products, users RESTART IDENTITY CASCADE",
    ))
    .await?;

    let state = AppState { pool, orm };

    let user = create_user(&state, "cart-flow@example.com").await?;
    let p1 = create_product(&state, "Blouse", Decimal::new(1000, 2)).await?;
    let p2 = create_product(&state, "Jacket", Decimal::new(2000, 2)).await?;

    // --- cart store semantics ---

    // two adds accumulate to quantity two
    cart_service::add_to_cart(&state, &user, CartKey::new(p1, "M")).await?;
    let cart = cart_service::add_to_cart(&state, &user, CartKey::new(p1, "M")).await?;
    assert_eq!(cart.quantity(&CartKey::new(p1, "M")), 2);

    let cart = cart_service::add_to_cart(&state, &user, CartKey::new(p2, "L")).await?;
    assert_eq!(cart.total_items(), 3);

    let fetched = cart_service::get_cart(&state, &user).await?;
    assert_eq!(fetched, cart);

    // decrement at quantity two keeps the key with exactly one fewer
    let cart =
        cart_service::remove_from_cart(&state, &user, CartKey::new(p1, "M"), false).await?;
    assert_eq!(cart.quantity(&CartKey::new(p1, "M")), 1);
    cart_service::add_to_cart(&state, &user, CartKey::new(p1, "M")).await?;

    // removing the last unit deletes the key
    let cart =
        cart_service::remove_from_cart(&state, &user, CartKey::new(p2, "L"), false).await?;
    assert_eq!(cart.quantity(&CartKey::new(p2, "L")), 0);

    // remove_all deletes outright
    let cart = cart_service::remove_from_cart(&state, &user, CartKey::new(p1, "M"), true).await?;
    assert!(cart.is_empty());

    // removing an absent key is a no-op, not an error
    let cart =
        cart_service::remove_from_cart(&state, &user, CartKey::new(p1, "M"), false).await?;
    assert!(cart.is_empty());

    cart_service::add_to_cart(&state, &user, CartKey::new(p1, "S")).await?;
    cart_service::clear_cart(&state, &user).await?;
    let cart = cart_service::get_cart(&state, &user).await?;
    assert!(cart.is_empty());

    // --- identity failures ---

    let ghost = AuthUser {
        user_id: Uuid::new_v4(),
        role: "user".into(),
    };
    let result = cart_service::add_to_cart(&state, &ghost, CartKey::new(p1, "M")).await;
    assert!(matches!(result, Err(AppError::Unauthorized)));
    let result = cart_service::get_cart(&state, &ghost).await;
    assert!(matches!(result, Err(AppError::Unauthorized)));

    // --- checkout: price-frozen order, cart cleared ---

    cart_service::add_to_cart(&state, &user, CartKey::new(p1, "M")).await?;
    cart_service::add_to_cart(&state, &user, CartKey::new(p1, "M")).await?;
    let snapshot = cart_service::add_to_cart(&state, &user, CartKey::new(p2, "L")).await?;

    let resp = order_service::create_order(
        &state,
        &user,
        CreateOrderRequest {
            user_id: user.user_id,
            cart_items: snapshot,
            total_amount: Decimal::new(4000, 2),
        },
    )
    .await?;

    assert_eq!(resp.order.status, "pending");
    assert_eq!(resp.order.total_amount, Decimal::new(4000, 2));
    assert_eq!(resp.order_items.len(), 2);

    let mut line_amounts: Vec<Decimal> = resp
        .order_items
        .iter()
        .map(|item| item.price * Decimal::from(item.quantity))
        .collect();
    line_amounts.sort();
    assert_eq!(
        line_amounts,
        vec![Decimal::new(2000, 2), Decimal::new(2000, 2)]
    );

    // unit prices were copied from the catalog at creation time
    let frozen: Vec<Decimal> = resp.order_items.iter().map(|item| item.price).collect();
    assert!(frozen.contains(&Decimal::new(1000, 2)));
    assert!(frozen.contains(&Decimal::new(2000, 2)));

    // the successful checkout consumed the stored cart
    let cart = cart_service::get_cart(&state, &user).await?;
    assert!(cart.is_empty());

    // --- checkout with a vanished product: line skipped, order still made ---

    cart_service::add_to_cart(&state, &user, CartKey::new(p1, "M")).await?;
    let snapshot = cart_service::add_to_cart(&state, &user, CartKey::new(p2, "L")).await?;

    // p2 disappears from the catalog between add and checkout
    Products::delete_by_id(p2).exec(&state.orm).await?;

    let resp = order_service::create_order(
        &state,
        &user,
        CreateOrderRequest {
            user_id: user.user_id,
            cart_items: snapshot,
            total_amount: Decimal::new(3000, 2),
        },
    )
    .await?;

    assert_eq!(resp.order_items.len(), 1);
    assert_eq!(resp.order_items[0].product_id, p1);
    // the stored total reflects the lines actually written
    assert_eq!(resp.order.total_amount, Decimal::new(1000, 2));

    let cart = cart_service::get_cart(&state, &user).await?;
    assert!(cart.is_empty());

    // --- rejection cases ---

    // empty snapshot
    let result = order_service::create_order(
        &state,
        &user,
        CreateOrderRequest {
            user_id: user.user_id,
            cart_items: Cart::new(),
            total_amount: Decimal::ZERO,
        },
    )
    .await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));

    // every product in the snapshot vanished: no zero-line order
    let snapshot = Cart::from_value(&serde_json::json!({ "999999-M": 1 }));
    let result = order_service::create_order(
        &state,
        &user,
        CreateOrderRequest {
            user_id: user.user_id,
            cart_items: snapshot,
            total_amount: Decimal::new(1000, 2),
        },
    )
    .await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));

    // a body userId that is not the token identity is refused
    let other = create_user(&state, "other@example.com").await?;
    let snapshot = Cart::from_value(&serde_json::json!({ "1-M": 1 }));
    let result = order_service::create_order(
        &state,
        &user,
        CreateOrderRequest {
            user_id: other.user_id,
            cart_items: snapshot,
            total_amount: Decimal::new(1000, 2),
        },
    )
    .await;
    assert!(matches!(result, Err(AppError::Forbidden)));

    Ok(())
}

async fn create_user(state: &AppState, email: &str) -> anyhow::Result<AuthUser> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        name: Set("Test User".into()),
        email: Set(email.to_string()),
        password_hash: Set("dummy".into()),
        cart_data: Set(serde_json::json!({})),
        role: Set("user".into()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(AuthUser {
        user_id: user.id,
        role: user.role,
    })
}

async fn create_product(state: &AppState, name: &str, price: Decimal) -> anyhow::Result<i32> {
    let product = ProductActive {
        id: NotSet,
        name: Set(name.to_string()),
        image: Set(None),
        category: Set(Some("women".into())),
        new_price: Set(price),
        old_price: Set(price),
        available: Set(true),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(product.id)
}
